//! Stats relay: streams live CPU, memory and network metrics of a container to any
//! number of HTTP observers as server-sent events.
//!
//! The raw, cumulative statistics come from the container runtime (Docker Engine API).
//! Each observer gets its own session that decodes the runtime's stats stream, derives
//! normalized metrics from consecutive samples and pushes them to the observer until
//! either side goes away.

use std::sync::Arc;

use error::ResultOkLogExt;
use runtime::Runtime;

pub mod api;
pub mod broadcast;
pub mod config;
pub mod container;
pub mod error;
pub mod runtime;
pub mod stats;

/// Runs the stats relay.
///
/// Reads the configuration, checks that the container runtime is reachable and serves
/// the HTTP API until Ctrl-C is received.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid environment variables.
/// - An unsupported or unreachable container runtime address.
/// - Failure to bind the listen address.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {:?}", config);

    let docker = runtime::DockerClient::new(&config.docker_host, config.connect_timeout)?;
    docker.ping().await.map_err(|err| {
        format!(
            "failed to connect to container runtime at `{}`: {}",
            config.docker_host, err
        )
    })?;
    log::info!("Connected to container runtime at {}", config.docker_host);

    let registry = Arc::new(broadcast::Registry::default());
    let hub = broadcast::Hub::new(
        registry,
        config.interface.as_str(),
        config.subscriber_buffer,
    );

    let shutdown = {
        let hub = hub.clone();
        async move {
            if tokio::signal::ctrl_c()
                .await
                .ok_log("failed to listen for shutdown signal")
                .is_none()
            {
                std::future::pending::<()>().await;
            }
            let subscribers = hub.subscribers();
            log::info!(
                "Shutting down, closing {} active subscriber(s)",
                subscribers.len()
            );
            for subscriber in &subscribers {
                log::debug!("Closing subscriber of container `{}`", subscriber.container_id());
            }
            hub.shutdown();
        }
    };

    api::APIServer::new(Arc::new(docker), hub)
        .listen(config.listen_addr, shutdown)
        .await?;

    Ok(())
}
