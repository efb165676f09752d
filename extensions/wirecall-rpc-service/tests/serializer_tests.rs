use serde::{Deserialize, Serialize};
use wirecall::Code;
use wirecall_rpc_service::{
    BitcodeCodec, Encoding, JsonCodec, MessageCodec, MethodDescriptor, MethodKind, RpcMethod,
    Serializer,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Greeting {
    name: String,
    times: u32,
}

struct Greet;

impl RpcMethod for Greet {
    const DESCRIPTOR: MethodDescriptor = MethodDescriptor::new(
        "test.v1.GreetService",
        "Greet",
        MethodKind::Unary,
        "test.v1.Greeting",
        "test.v1.Greeting",
    );

    type Input = Greeting;
    type Output = Greeting;
}

fn sample() -> Greeting {
    Greeting {
        name: "ada".into(),
        times: 3,
    }
}

#[test]
fn test_lookup_follows_encoding() {
    assert_eq!(Greet::input_serializer(Encoding::Binary).encoding(), Encoding::Binary);
    assert_eq!(Greet::output_serializer(Encoding::Json).encoding(), Encoding::Json);
}

#[test]
fn test_json_serializer_emits_readable_json() {
    let serializer = Serializer::<Greeting>::for_encoding(Encoding::Json);
    let bytes = serializer.serialize(&sample()).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["name"], "ada");
    assert_eq!(value["times"], 3);
    assert_eq!(serializer.parse(&bytes).unwrap(), sample());
}

#[test]
fn test_binary_serializer_matches_codec() {
    let serializer = Greet::input_serializer(Encoding::Binary);
    let bytes = serializer.serialize(&sample()).unwrap();
    assert_eq!(bytes.as_ref(), BitcodeCodec::encode(&sample()).unwrap().as_slice());
    assert_eq!(serializer.parse(&bytes).unwrap(), sample());
}

#[test]
fn test_parse_failure_is_invalid_argument() {
    let json = Serializer::<Greeting>::for_encoding(Encoding::Json);
    let err = json.parse(b"{not json").unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let binary = Serializer::<Greeting>::for_encoding(Encoding::Binary);
    let err = binary.parse(&[]).unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[test]
fn test_codecs_declare_their_encoding() {
    assert_eq!(BitcodeCodec::ENCODING, Encoding::Binary);
    assert_eq!(JsonCodec::ENCODING, Encoding::Json);
}

#[test]
fn test_json_codec_rejects_wrong_shape() {
    let err = JsonCodec::decode::<Greeting>(br#"{"name": 7}"#).unwrap_err();
    assert!(!err.is_empty());
}
