use std::fmt;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use super::session::Session;
use crate::stats::{DecodeError, DerivedMetric, Deriver, StatsDecoder};

/// Why a session's relay stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The runtime closed the stats stream.
    SourceExhausted,
    /// The observer went away or the process is shutting down.
    Cancelled,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::SourceExhausted => f.write_str("stats stream ended"),
            SessionEnd::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Pulls raw samples of one container, derives metrics and pushes them to the observer.
///
/// Pushing waits for channel capacity, so a slow observer throttles reads from its own
/// stats stream instead of losing samples. Every wait is raced against the session token.
pub struct Relay<R> {
    decoder: StatsDecoder<R>,
    deriver: Deriver,
    tx: mpsc::Sender<DerivedMetric>,
    session: Arc<Session>,
}

impl<R> Relay<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        decoder: StatsDecoder<R>,
        deriver: Deriver,
        tx: mpsc::Sender<DerivedMetric>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            decoder,
            deriver,
            tx,
            session,
        }
    }

    /// Relays until the source ends, the session is cancelled or decoding fails, then
    /// tears the session down. The stats stream and the channel are released on return.
    pub async fn run(mut self) -> Result<SessionEnd, DecodeError> {
        let outcome = self.relay().await;
        let container_id = self.session.container_id();
        match &outcome {
            Ok(end) => log::info!(
                target: "session",
                "Session for container `{}` finished: {}",
                container_id,
                end
            ),
            Err(err) => log::error!(
                target: "session",
                "Session for container `{}` aborted: {}",
                container_id,
                err
            ),
        }
        self.session.teardown();
        outcome
    }

    async fn relay(&mut self) -> Result<SessionEnd, DecodeError> {
        let token = self.session.token().clone();
        loop {
            let sample = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(SessionEnd::Cancelled),
                next = self.decoder.next_sample() => match next? {
                    Some(sample) => sample,
                    None => return Ok(SessionEnd::SourceExhausted),
                },
            };

            let metric = match self.deriver.push(sample) {
                None => continue,
                Some(Ok(metric)) => metric,
                Some(Err(err)) => {
                    log::debug!(
                        target: "session",
                        "Skipping sample of container `{}`: {}",
                        self.session.container_id(),
                        err
                    );
                    continue;
                }
            };
            log::trace!(
                target: "session",
                "Relaying {:?} to subscriber {}",
                metric,
                self.session.handle()
            );

            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(SessionEnd::Cancelled),
                sent = self.tx.send(metric) => {
                    if sent.is_err() {
                        return Ok(SessionEnd::Cancelled);
                    }
                }
            }
        }
    }
}
