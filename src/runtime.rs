//! Boundary to the container runtime that produces inventory, daemon info and raw stats.
//!
//! [`Runtime`] is the seam the HTTP layer and the sessions depend on; [`DockerClient`]
//! implements it against the Docker Engine API.

use std::pin::Pin;

use tokio::io::AsyncRead;

use crate::container::ContainerID;

mod connector;
mod docker;
mod error;
mod models;

pub use docker::DockerClient;
pub use error::{Error, Result};
pub use models::ContainerSummary;

/// A continuous byte stream of raw stats records. Dropping it releases the connection.
pub type StatsStream = Pin<Box<dyn AsyncRead + Send>>;

pub trait Runtime: Send + Sync + 'static {
    /// Checks that the runtime is reachable.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Lists the running containers.
    fn list_containers(&self) -> impl Future<Output = Result<Vec<ContainerSummary>>> + Send;

    /// Returns the runtime's daemon info document.
    fn info(&self) -> impl Future<Output = Result<serde_json::Value>> + Send;

    /// Opens the never-ending raw stats stream of one container.
    fn open_stats(
        &self,
        container_id: &ContainerID,
    ) -> impl Future<Output = Result<StatsStream>> + Send;
}
