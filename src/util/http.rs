use futures::StreamExt;
use thiserror::Error;

/// Failure while draining an HTTP response body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Response too large (exceeds {0} bytes)")]
    TooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
}

/// Reads a response body as text, refusing to buffer more than `limit` bytes.
///
/// The Content-Length header is checked up front when present; the streamed
/// size is checked regardless since the header can lie or be absent.
pub async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, BodyError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(BodyError::TooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BodyError::TooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| BodyError::InvalidUtf8)
}

/// Local server whose responses promise a body that never finishes arriving.
#[cfg(test)]
pub(crate) async fn stalled_body_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 8192];
                let _ = socket.read(&mut request).await;
                let head = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 1024\r\n\r\n{\"documents\": [";
                let _ = socket.write_all(head.as_bytes()).await;
                // Hold the connection open without sending the rest
                std::future::pending::<()>().await;
                drop(socket);
            });
        }
    });
    format!("http://{addr}")
}
