mod envelope_codec;
mod envelope_compressor;
mod envelope_stream_decoder;
mod envelope_struct;
mod unframe;

pub use envelope_codec::EnvelopeCodec;
pub use envelope_compressor::EnvelopeCompressor;
pub use envelope_stream_decoder::{EnvelopeDecoderIterator, EnvelopeStreamDecoder};
pub use envelope_struct::Envelope;
pub use unframe::{frame_messages, unframe};
