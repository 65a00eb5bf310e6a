//! The fixed request every verified client receives first.

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Sent verbatim right after the handshake: the JSON line, its CRLF and the
/// NUL terminator of the fixed-size buffer it lives in.
pub const PING_REQUEST: &[u8] = b"{\"path\": \"/v1/ping/\", \"method\": \"GET\"}\r\n\0";

/// Write the ping request and flush it to the transport.
pub async fn send_ping_request<W>(stream: &mut W) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(PING_REQUEST).await?;
    stream.flush().await?;
    Ok(PING_REQUEST.len())
}
