//! Runtime configuration read from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_INTERFACE: &str = "eth0";
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for environment variable `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP server binds to (`LISTEN_ADDR`).
    pub listen_addr: SocketAddr,
    /// Address of the container runtime (`DOCKER_HOST`).
    pub docker_host: String,
    /// Bound on connecting to the runtime and waiting for response headers (`DOCKER_CONNECT_TIMEOUT_MS`).
    pub connect_timeout: Duration,
    /// Network interface whose counters are relayed (`STATS_INTERFACE`).
    pub interface: String,
    /// Capacity of each observer's delivery channel (`SUBSCRIBER_BUFFER`).
    pub subscriber_buffer: usize,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup. Unset or empty
    /// variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a set variable cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stats_relay::config::Config;
    /// let config = Config::from_lookup(|key| match key {
    ///     "STATS_INTERFACE" => Some("ens3".to_owned()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.interface, "ens3");
    /// assert_eq!(config.subscriber_buffer, 16);
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let listen_addr = match var("LISTEN_ADDR") {
            Some(value) => parse("LISTEN_ADDR", value)?,
            None => DEFAULT_LISTEN_ADDR,
        };
        let connect_timeout = match var("DOCKER_CONNECT_TIMEOUT_MS") {
            Some(value) => Duration::from_millis(parse("DOCKER_CONNECT_TIMEOUT_MS", value)?),
            None => DEFAULT_CONNECT_TIMEOUT,
        };
        let subscriber_buffer = match var("SUBSCRIBER_BUFFER") {
            Some(value) => {
                let buffer: usize = parse("SUBSCRIBER_BUFFER", value.clone())?;
                if buffer == 0 {
                    return Err(Error::InvalidValue {
                        key: "SUBSCRIBER_BUFFER",
                        value,
                        reason: "must be at least 1".to_owned(),
                    });
                }
                buffer
            }
            None => DEFAULT_SUBSCRIBER_BUFFER,
        };

        Ok(Self {
            listen_addr,
            docker_host: var("DOCKER_HOST").unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_owned()),
            connect_timeout,
            interface: var("STATS_INTERFACE").unwrap_or_else(|| DEFAULT_INTERFACE.to_owned()),
            subscriber_buffer,
        })
    }
}

fn parse<T>(key: &'static str, value: String) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| Error::InvalidValue {
        key,
        reason: err.to_string(),
        value,
    })
}
