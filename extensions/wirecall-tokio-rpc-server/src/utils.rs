use http::Uri;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Binds a `TcpListener` to an OS-assigned port on `127.0.0.1`.
///
/// Returns the listener with the address it actually bound to.
pub async fn bind_tcp_listener_on_random_port() -> io::Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    Ok((listener, address))
}

/// The `http://host:port` base URI a client uses to reach `listener`.
pub fn tcp_listener_to_base_uri(listener: &TcpListener) -> io::Result<Uri> {
    let address = listener.local_addr()?;
    format!("http://{address}")
        .parse()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
}
