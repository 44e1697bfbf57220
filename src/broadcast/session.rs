use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::registry::{Registry, SubscriberHandle};
use crate::container::ContainerID;
use crate::stats::DerivedMetric;

/// Shared state of one observer's subscription.
///
/// Both the relay task and the observer's [`MetricStream`] hold the session; whichever
/// side stops first runs [`Session::teardown`], the other side only observes the
/// cancelled token.
#[derive(Debug)]
pub struct Session {
    container_id: ContainerID,
    handle: SubscriberHandle,
    registry: Arc<Registry>,
    token: CancellationToken,
    closed: AtomicBool,
}

impl Session {
    pub(super) fn new(
        container_id: ContainerID,
        handle: SubscriberHandle,
        registry: Arc<Registry>,
        token: CancellationToken,
    ) -> Self {
        Self {
            container_id,
            handle,
            registry,
            token,
            closed: AtomicBool::new(false),
        }
    }

    pub fn container_id(&self) -> &ContainerID {
        &self.container_id
    }

    pub fn handle(&self) -> SubscriberHandle {
        self.handle
    }

    /// Cancelled once the session is torn down or the process shuts down.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Unregisters the subscriber and cancels the session.
    ///
    /// Only the first call has an effect; it returns `true`.
    pub fn teardown(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.registry.unregister(self.handle);
        self.token.cancel();
        log::debug!(
            target: "session",
            "Tore down subscriber {} of container `{}`",
            self.handle,
            self.container_id
        );
        true
    }
}

/// The observer's end of a session: the derived metrics in the order they were produced.
///
/// Ends when the relay stops. Dropping it tears the session down, which is how an
/// observer disconnect reaches the relay task.
#[derive(Debug)]
pub struct MetricStream {
    rx: mpsc::Receiver<DerivedMetric>,
    session: Arc<Session>,
}

impl MetricStream {
    pub(super) fn new(rx: mpsc::Receiver<DerivedMetric>, session: Arc<Session>) -> Self {
        Self { rx, session }
    }

    pub async fn recv(&mut self) -> Option<DerivedMetric> {
        self.rx.recv().await
    }
}

impl futures::Stream for MetricStream {
    type Item = DerivedMetric;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for MetricStream {
    fn drop(&mut self) {
        if self.session.teardown() {
            log::info!(
                target: "session",
                "Observer of container `{}` disconnected",
                self.session.container_id()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(registry: &Arc<Registry>) -> (Arc<Session>, mpsc::Receiver<DerivedMetric>) {
        let (tx, rx) = mpsc::channel(1);
        let container_id = ContainerID::new("web").unwrap();
        let handle = registry.register(container_id.clone(), tx);
        let session = Session::new(
            container_id,
            handle,
            Arc::clone(registry),
            CancellationToken::new(),
        );
        (Arc::new(session), rx)
    }

    #[test]
    fn test_teardown_runs_once() {
        let registry = Arc::new(Registry::default());
        let (session, _rx) = session(&registry);
        assert_eq!(registry.len(), 1);

        assert!(session.teardown());
        assert!(session.token().is_cancelled());
        assert!(registry.is_empty());

        assert!(!session.teardown());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_teardown_runs_once() {
        let registry = Arc::new(Registry::default());
        let (session, _rx) = session(&registry);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.teardown() })
            })
            .collect();
        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropping_stream_tears_down() {
        let registry = Arc::new(Registry::default());
        let (session, rx) = session(&registry);
        let stream = MetricStream::new(rx, Arc::clone(&session));

        drop(stream);
        assert!(session.token().is_cancelled());
        assert!(registry.is_empty());
    }
}
