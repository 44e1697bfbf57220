//! Derivation of normalized metrics from consecutive raw samples.

use std::sync::Arc;

use super::{DeriveError, RawSample};

/// A normalized metric sample as delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DerivedMetric {
    /// CPU utilization since the previous sample, scaled by core count (`100.0` = one full core).
    pub cpu_usage_percent: f64,
    /// Memory usage relative to the memory limit.
    pub memory_usage_percent: f64,
    /// Cumulative bytes received on the configured interface.
    pub rx_network_bytes: u64,
    /// Cumulative bytes transmitted on the configured interface.
    pub tx_network_bytes: u64,
}

/// Derives a [`DerivedMetric`] from two consecutive samples of the same container.
///
/// The CPU percentage is only computed if both the container and the system CPU
/// counters advanced; otherwise it is exactly `0.0`. Network counters are taken from
/// `current` for `interface` and are zero if the interface is absent.
///
/// # Errors
///
/// Returns [`DeriveError::ZeroMemoryLimit`] if `current` reports a memory limit of zero.
///
/// # Examples
///
/// ```
/// # use stats_relay::stats::{derive, RawSample};
/// let previous = RawSample { cpu_total: 100, system_total: 1000, cores: 2, memory_usage: 50, memory_limit: 100, ..Default::default() };
/// let current = RawSample { cpu_total: 150, system_total: 1100, cores: 2, memory_usage: 60, memory_limit: 100, ..Default::default() };
///
/// let metric = derive(&previous, &current, "eth0").unwrap();
/// assert_eq!(metric.cpu_usage_percent, 100.0);
/// assert_eq!(metric.memory_usage_percent, 60.0);
/// ```
pub fn derive(
    previous: &RawSample,
    current: &RawSample,
    interface: &str,
) -> Result<DerivedMetric, DeriveError> {
    if current.memory_limit == 0 {
        return Err(DeriveError::ZeroMemoryLimit);
    }
    let memory_usage_percent = current.memory_usage as f64 / current.memory_limit as f64 * 100.0;
    let network = current.interface(interface);

    Ok(DerivedMetric {
        cpu_usage_percent: cpu_percent(previous, current),
        memory_usage_percent,
        rx_network_bytes: network.rx_bytes,
        tx_network_bytes: network.tx_bytes,
    })
}

fn cpu_percent(previous: &RawSample, current: &RawSample) -> f64 {
    if current.cpu_total <= previous.cpu_total || current.system_total <= previous.system_total {
        return 0.0;
    }
    let cpu_delta = (current.cpu_total - previous.cpu_total) as f64;
    let system_delta = (current.system_total - previous.system_total) as f64;

    cpu_delta / system_delta * f64::from(current.cores) * 100.0
}

/// Per-session derivation state: holds the previous sample as seed for the next one.
#[derive(Debug)]
pub struct Deriver {
    interface: Arc<str>,
    seed: Option<RawSample>,
}

impl Deriver {
    pub fn new(interface: Arc<str>) -> Self {
        Self {
            interface,
            seed: None,
        }
    }

    /// Feeds the next raw sample.
    ///
    /// Returns `None` for the first sample of a session, which only becomes the seed.
    /// Every later sample yields one derivation result and replaces the seed, even if
    /// the derivation failed.
    pub fn push(&mut self, sample: RawSample) -> Option<Result<DerivedMetric, DeriveError>> {
        let previous = self.seed.replace(sample)?;
        let current = self.seed.as_ref()?;
        Some(derive(&previous, current, &self.interface))
    }
}
