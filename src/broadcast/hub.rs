use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::registry::{Registry, Subscriber};
use super::relay::Relay;
use super::session::{MetricStream, Session};
use crate::container::ContainerID;
use crate::runtime::{self, Runtime};
use crate::stats::{Deriver, StatsDecoder};

/// Starts observer sessions against a shared [`Registry`].
///
/// Every session token is a child of the hub's shutdown token, so [`Hub::shutdown`]
/// ends all sessions through their regular teardown.
#[derive(Debug, Clone)]
pub struct Hub {
    registry: Arc<Registry>,
    shutdown: CancellationToken,
    interface: Arc<str>,
    buffer: usize,
}

impl Hub {
    /// Creates a hub relaying the counters of `interface`, with `buffer` metrics of
    /// capacity per delivery channel.
    ///
    /// # Panics
    ///
    /// Panics if `buffer` is zero.
    pub fn new(registry: Arc<Registry>, interface: impl Into<Arc<str>>, buffer: usize) -> Self {
        assert!(buffer > 0, "delivery channel capacity must be at least 1");
        Self {
            registry,
            shutdown: CancellationToken::new(),
            interface: interface.into(),
            buffer,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Opens the stats stream of `container_id` and starts relaying it to a new subscriber.
    ///
    /// Nothing is registered if the stream cannot be opened.
    ///
    /// # Errors
    ///
    /// Returns the runtime error if the stats stream cannot be opened.
    pub async fn subscribe<R: Runtime>(
        &self,
        runtime: &R,
        container_id: ContainerID,
    ) -> runtime::Result<MetricStream> {
        let source = runtime.open_stats(&container_id).await?;

        let (tx, rx) = mpsc::channel(self.buffer);
        let handle = self.registry.register(container_id.clone(), tx.clone());
        let session = Arc::new(Session::new(
            container_id,
            handle,
            Arc::clone(&self.registry),
            self.shutdown.child_token(),
        ));
        log::info!(
            target: "session",
            "Subscriber {} connected for container `{}`",
            handle,
            session.container_id()
        );

        let relay = Relay::new(
            StatsDecoder::new(source),
            Deriver::new(Arc::clone(&self.interface)),
            tx,
            Arc::clone(&session),
        );
        tokio::spawn(relay.run());

        Ok(MetricStream::new(rx, session))
    }

    /// Returns the currently active subscribers.
    pub fn subscribers(&self) -> Vec<Subscriber> {
        self.registry.snapshot()
    }

    /// Cancels every running and future session.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::io::{AsyncWriteExt, DuplexStream};

    use super::*;
    use crate::runtime::{ContainerSummary, StatsStream};

    /// Hands out one duplex pipe per `open_stats` call; `None` simulates a missing container.
    #[derive(Default)]
    struct PipeRuntime {
        pipe: Mutex<Option<DuplexStream>>,
    }

    impl PipeRuntime {
        fn with_pipe() -> (Self, DuplexStream) {
            let (source, reader) = tokio::io::duplex(4096);
            let runtime = Self {
                pipe: Mutex::new(Some(reader)),
            };
            (runtime, source)
        }
    }

    impl Runtime for PipeRuntime {
        async fn ping(&self) -> runtime::Result<()> {
            Ok(())
        }

        async fn list_containers(&self) -> runtime::Result<Vec<ContainerSummary>> {
            Ok(Vec::new())
        }

        async fn info(&self) -> runtime::Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        async fn open_stats(&self, container_id: &ContainerID) -> runtime::Result<StatsStream> {
            match self.pipe.lock().unwrap().take() {
                Some(reader) => Ok(Box::pin(reader)),
                None => Err(runtime::Error::Status {
                    status: hyper::StatusCode::NOT_FOUND,
                    message: format!("No such container: {container_id}"),
                }),
            }
        }
    }

    const FIRST: &str = r#"{"cpu_stats":{"cpu_usage":{"total_usage":100},"system_cpu_usage":1000,"online_cpus":2},"memory_stats":{"usage":50,"limit":100}}"#;
    const SECOND: &str = r#"{"cpu_stats":{"cpu_usage":{"total_usage":150},"system_cpu_usage":1100,"online_cpus":2},"memory_stats":{"usage":60,"limit":100}}"#;

    fn hub() -> Hub {
        Hub::new(Arc::new(Registry::default()), "eth0", 4)
    }

    fn web() -> ContainerID {
        ContainerID::new("web").unwrap()
    }

    #[tokio::test]
    async fn test_unavailable_source_registers_nothing() {
        let hub = hub();
        let runtime = PipeRuntime::default();

        let err = hub.subscribe(&runtime, web()).await.err().unwrap();
        assert!(matches!(err, runtime::Error::Status { .. }));
        assert!(hub.registry().is_empty());
    }

    #[tokio::test]
    async fn test_source_end_closes_stream() {
        let hub = hub();
        let (runtime, mut source) = PipeRuntime::with_pipe();

        let mut stream = hub.subscribe(&runtime, web()).await.unwrap();
        assert_eq!(hub.subscribers().len(), 1);
        assert_eq!(hub.subscribers()[0].container_id().as_ref(), "web");

        source.write_all(format!("{FIRST}\n{SECOND}\n").as_bytes()).await.unwrap();
        drop(source);

        let metric = stream.recv().await.unwrap();
        assert_eq!(metric.cpu_usage_percent, 100.0);
        assert_eq!(metric.memory_usage_percent, 60.0);
        assert!(stream.recv().await.is_none());
        assert!(hub.registry().is_empty());
    }

    #[tokio::test]
    async fn test_observer_disconnect_releases_source() {
        let hub = hub();
        let (runtime, mut source) = PipeRuntime::with_pipe();

        let stream = hub.subscribe(&runtime, web()).await.unwrap();
        source.write_all(FIRST.as_bytes()).await.unwrap();
        drop(stream);
        assert!(hub.registry().is_empty());

        // the relay notices the cancellation and drops the stats stream
        tokio::time::timeout(Duration::from_secs(5), async {
            while source.write_all(b"\n").await.is_ok() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_ends_all_sessions() {
        let hub = hub();
        let (runtime_a, _source_a) = PipeRuntime::with_pipe();
        let (runtime_b, _source_b) = PipeRuntime::with_pipe();

        let mut a = hub.subscribe(&runtime_a, web()).await.unwrap();
        let mut b = hub.subscribe(&runtime_b, web()).await.unwrap();
        assert_eq!(hub.subscribers().len(), 2);

        hub.shutdown();
        let ended = tokio::time::timeout(Duration::from_secs(5), async {
            (a.recv().await, b.recv().await)
        })
        .await
        .unwrap();
        assert_eq!(ended, (None, None));
        assert!(hub.registry().is_empty());
    }
}
