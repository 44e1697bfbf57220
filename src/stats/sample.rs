//! Raw per-container samples as emitted by the runtime's statistics stream.
//!
//! The wire format is the Docker Engine `/containers/{id}/stats` document. Only the
//! counters needed for metric derivation are kept; every missing field defaults to zero
//! so that samples of stopped containers (which carry mostly empty objects) still decode.

use std::collections::HashMap;

/// Cumulative receive/transmit byte counters of one network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub struct InterfaceCounters {
    /// Bytes received.
    #[serde(default)]
    pub rx_bytes: u64,
    /// Bytes transmitted.
    #[serde(default)]
    pub tx_bytes: u64,
}

/// One point-in-time snapshot of a container's cumulative resource counters.
#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize)]
#[serde(from = "wire::Stats")]
pub struct RawSample {
    /// Total CPU time consumed by the container (nanoseconds).
    pub cpu_total: u64,
    /// Total CPU time consumed by the whole host (nanoseconds).
    pub system_total: u64,
    /// Number of CPU cores available to the container.
    pub cores: u32,
    /// Current memory usage in bytes.
    pub memory_usage: u64,
    /// Memory limit in bytes.
    pub memory_limit: u64,
    /// Per-interface network counters, keyed by interface name.
    pub networks: HashMap<String, InterfaceCounters>,
}

impl RawSample {
    /// Returns the counters of `interface`, or zeroed counters if the sample has none.
    pub fn interface(&self, interface: &str) -> InterfaceCounters {
        self.networks.get(interface).copied().unwrap_or_default()
    }
}

impl From<wire::Stats> for RawSample {
    fn from(value: wire::Stats) -> Self {
        let cpu = value.cpu_stats;
        let cores = match cpu.online_cpus {
            Some(n) if n > 0 => n,
            _ => cpu
                .cpu_usage
                .percpu_usage
                .as_ref()
                .map_or(0, |per_cpu| u32::try_from(per_cpu.len()).unwrap_or(u32::MAX)),
        };

        Self {
            cpu_total: cpu.cpu_usage.total_usage,
            system_total: cpu.system_cpu_usage,
            cores,
            memory_usage: value.memory_stats.usage,
            memory_limit: value.memory_stats.limit,
            networks: value.networks,
        }
    }
}

mod wire {
    use std::collections::HashMap;

    use super::InterfaceCounters;

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(default)]
    pub struct Stats {
        pub cpu_stats: CpuStats,
        pub memory_stats: MemoryStats,
        pub networks: HashMap<String, InterfaceCounters>,
    }

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(default)]
    pub struct CpuStats {
        pub cpu_usage: CpuUsage,
        pub system_cpu_usage: u64,
        pub online_cpus: Option<u32>,
    }

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(default)]
    pub struct CpuUsage {
        pub total_usage: u64,
        pub percpu_usage: Option<Vec<u64>>,
    }

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(default)]
    pub struct MemoryStats {
        pub usage: u64,
        pub limit: u64,
    }
}
