//! Line-oriented connection shared by the IMAP and POP3 clients.
//!
//! Plain TCP or implicit TLS (rustls + webpki roots). Lines are read as
//! bytes so that 8-bit message content survives intact.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

use mailwatch_core::error::{MonitorError, Result};

/// Async read+write stream marker.
pub(crate) trait MailStream: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}
impl<T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> MailStream for T {}

pub(crate) struct Connection {
    reader: BufReader<ReadHalf<Box<dyn MailStream>>>,
    writer: WriteHalf<Box<dyn MailStream>>,
}

impl Connection {
    /// Open a TCP connection, wrapping it in TLS when `use_tls` is set.
    pub(crate) async fn open(host: &str, port: u16, use_tls: bool) -> Result<Self> {
        if host.is_empty() {
            return Err(MonitorError::Connection("no host configured".into()));
        }

        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| MonitorError::Connection(format!("{host}:{port}: {e}")))?;

        let stream: Box<dyn MailStream> = if use_tls {
            let mut root_store = rustls::RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let config = rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();

            let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
            let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
                .map_err(|e| MonitorError::Connection(format!("invalid server name '{host}': {e}")))?;
            let tls = connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| MonitorError::Connection(format!("TLS handshake with {host}: {e}")))?;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        let (read, write) = tokio::io::split(stream);
        Ok(Self {
            reader: BufReader::new(read),
            writer: write,
        })
    }

    /// Read one line as raw bytes, without the trailing CRLF.
    pub(crate) async fn read_line_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Err(MonitorError::Connection("connection closed unexpectedly".into()));
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(buf)
    }

    /// Read one line, lossily decoded.
    pub(crate) async fn read_line(&mut self) -> Result<String> {
        let bytes = self.read_line_bytes().await?;
        let line = String::from_utf8_lossy(&bytes).into_owned();
        trace!(line = %line, "<<");
        Ok(line)
    }

    /// Read exactly `n` bytes.
    pub(crate) async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.reader.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Write one CRLF-terminated line.
    pub(crate) async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_host_is_connection_error() {
        let err = Connection::open("", 993, false).await.err().unwrap();
        assert!(matches!(err, MonitorError::Connection(_)));
    }

    #[tokio::test]
    async fn test_refused_is_connection_error() {
        // Bind and drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connection::open("127.0.0.1", port, false).await.err().unwrap();
        assert!(matches!(err, MonitorError::Connection(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_read_line_strips_crlf() {
        let (port, server) = testing::serve("hello\r\n", vec![testing::step("PING", "PONG\r\n")]).await;
        let mut conn = Connection::open("127.0.0.1", port, false).await.unwrap();

        assert_eq!(conn.read_line().await.unwrap(), "hello");
        conn.write_line("PING").await.unwrap();
        assert_eq!(conn.read_line().await.unwrap(), "PONG");
        assert_eq!(server.await.unwrap(), vec!["PING"]);
    }
}
