use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::{Request, Response, header};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::task::JoinHandle;
use tokio_util::io::StreamReader;
use tower::ServiceExt;

use super::connector::UnixConnector;
use super::models::{ContainerSummary, ErrorMessage};
use super::{Error, Result, Runtime, StatsStream};
use crate::container::ContainerID;

const UNIX_SCHEME: &str = "unix://";

/// Client for the Docker Engine API on a Unix socket.
///
/// Every request uses its own connection, so a long-lived stats stream never
/// blocks other requests.
#[derive(Debug, Clone)]
pub struct DockerClient {
    connector: UnixConnector,
    connect_timeout: Duration,
}

impl DockerClient {
    /// Creates a client for a `unix://<path>` address.
    ///
    /// `connect_timeout` bounds connecting and waiting for response headers, not the
    /// streaming of a response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAddress`] for any other address scheme.
    pub fn new(address: &str, connect_timeout: Duration) -> Result<Self> {
        let path = address
            .strip_prefix(UNIX_SCHEME)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| Error::UnsupportedAddress(address.to_owned()))?;

        Ok(Self {
            connector: UnixConnector::new(path),
            connect_timeout,
        })
    }

    async fn send(&self, path_and_query: &str) -> Result<(Response<Incoming>, ConnectionGuard)> {
        let request = Request::get(path_and_query)
            .header(header::HOST, "docker")
            .body(Empty::<Bytes>::new())
            .map_err(Error::BuildRequest)?;

        let exchange = async {
            let io = self
                .connector
                .clone()
                .oneshot(hyper::Uri::from_static("http://docker"))
                .await
                .map_err(|source| Error::SocketConnect {
                    path: self.connector.path().to_path_buf(),
                    source,
                })?;
            let (mut sender, connection) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(Error::Handshake)?;
            let guard = ConnectionGuard(tokio::spawn(async move {
                if let Err(err) = connection.await {
                    log::debug!("runtime connection closed with error: {}", err);
                }
            }));
            let response = sender.send_request(request).await.map_err(Error::Request)?;
            Ok::<_, Error>((response, guard))
        };

        let (response, guard) = tokio::time::timeout(self.connect_timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(self.connect_timeout))??;
        log::trace!("GET {} -> {}", path_and_query, response.status());

        if !response.status().is_success() {
            let status = response.status();
            let body = collect_body(response).await?;
            let message = serde_json::from_slice::<ErrorMessage>(&body)
                .map(|err| err.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_owned());
            return Err(Error::Status { status, message });
        }

        Ok((response, guard))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let (response, _guard) = self.send(path_and_query).await?;
        let body = collect_body(response).await?;
        serde_json::from_slice(&body).map_err(Error::Decode)
    }
}

impl Runtime for DockerClient {
    async fn ping(&self) -> Result<()> {
        let (response, _guard) = self.send("/_ping").await?;
        collect_body(response).await?;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        self.get_json("/containers/json").await
    }

    async fn info(&self) -> Result<serde_json::Value> {
        self.get_json("/info").await
    }

    async fn open_stats(&self, container_id: &ContainerID) -> Result<StatsStream> {
        let (response, guard) = self.send(&stats_path(container_id)?).await?;
        log::debug!("Opened stats stream for container `{}`", container_id);

        let body = response
            .into_body()
            .into_data_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        Ok(Box::pin(GuardedReader {
            reader: Box::pin(StreamReader::new(body)),
            _guard: guard,
        }))
    }
}

/// Builds `/containers/<id>/stats?stream=true` with the id encoded as one path segment.
fn stats_path(container_id: &ContainerID) -> Result<String> {
    let mut url = url::Url::parse("http://docker/containers").map_err(Error::InvalidUrl)?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(container_id.as_ref()).push("stats");
    }
    url.set_query(Some("stream=true"));

    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

async fn collect_body(response: Response<Incoming>) -> Result<Bytes> {
    Ok(response
        .into_body()
        .collect()
        .await
        .map_err(Error::Body)?
        .to_bytes())
}

/// Aborts the task driving a runtime connection once the response is no longer needed.
#[derive(Debug)]
struct ConnectionGuard(JoinHandle<()>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A response body reader that keeps its connection alive exactly as long as itself.
struct GuardedReader {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    _guard: ConnectionGuard,
}

impl AsyncRead for GuardedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{UnixListener, UnixStream};

    use super::*;

    fn web() -> ContainerID {
        ContainerID::new("web").unwrap()
    }

    fn serve(dir: &tempfile::TempDir, timeout: Duration) -> (DockerClient, UnixListener) {
        let path = dir.path().join("docker.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let client = DockerClient::new(&format!("unix://{}", path.display()), timeout).unwrap();
        (client, listener)
    }

    async fn read_request(stream: &mut UnixStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed the connection before sending a request");
            request.extend_from_slice(&chunk[..n]);
        }
    }

    #[test]
    fn test_unix_address() {
        let client = DockerClient::new("unix:///var/run/docker.sock", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.connector.path(),
            std::path::Path::new("/var/run/docker.sock")
        );
    }

    #[test]
    fn test_unsupported_address() {
        for address in ["tcp://127.0.0.1:2375", "/var/run/docker.sock", "unix://"] {
            match DockerClient::new(address, Duration::from_secs(1)) {
                Err(Error::UnsupportedAddress(addr)) => assert_eq!(addr, address),
                other => panic!("Expected UnsupportedAddress error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_stats_path_encodes_container_id() {
        let id = ContainerID::new("web").unwrap();
        assert_eq!(stats_path(&id).unwrap(), "/containers/web/stats?stream=true");

        let id = ContainerID::new("a b/c").unwrap();
        assert_eq!(
            stats_path(&id).unwrap(),
            "/containers/a%20b%2Fc/stats?stream=true"
        );
    }

    #[tokio::test]
    async fn test_open_stats_without_daemon() {
        let client = DockerClient::new(
            "unix:///definitely/does/not/exist.sock",
            Duration::from_secs(1),
        )
        .unwrap();
        let id = ContainerID::new("web").unwrap();
        let err = client.open_stats(&id).await.err().unwrap();
        assert!(matches!(err, Error::SocketConnect { .. }));
    }

    #[tokio::test]
    async fn test_open_stats_times_out_on_silent_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let (client, listener) = serve(&dir, Duration::from_millis(200));
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            // keep the connection open without ever answering
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let started = tokio::time::Instant::now();
        let err = client.open_stats(&web()).await.err().unwrap();
        assert!(matches!(err, Error::Timeout(timeout) if timeout == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(2));
        server.abort();
    }

    #[tokio::test]
    async fn test_timeout_does_not_bound_streaming() {
        let dir = tempfile::tempdir().unwrap();
        let (client, listener) = serve(&dir, Duration::from_millis(200));
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 5\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;
            stream.write_all(b"hello").await.unwrap();
        });

        let mut stats = client.open_stats(&web()).await.unwrap();
        let mut body = String::new();
        stats.read_to_string(&mut body).await.unwrap();
        assert_eq!(body, "hello");
        server.await.unwrap();
    }
}
