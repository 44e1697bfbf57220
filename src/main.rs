/// Entry point for the stats relay.
///
/// Connects to the container runtime (Docker Engine API), then serves live
/// per-container resource metrics to observers as server-sent events.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid environment
/// variables or an unreachable container runtime).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info DOCKER_HOST=unix:///var/run/docker.sock cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    stats_relay::run().await
}
