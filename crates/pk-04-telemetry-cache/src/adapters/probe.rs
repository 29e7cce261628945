//! Host `SystemProbe` backed by `/proc` and `num_cpus`.
//!
//! On hosts without `/proc` the readings are zero.

use std::fs;

use crate::domain::ProbeReading;
use crate::ports::SystemProbe;

#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl HostProbe {
    /// One-minute load average as a percentage of available cores.
    fn cpu_usage() -> f64 {
        let cores = num_cpus::get().max(1) as f64;
        fs::read_to_string("/proc/loadavg")
            .ok()
            .and_then(|raw| raw.split_whitespace().next()?.parse::<f64>().ok())
            .map_or(0.0, |load| (load / cores * 100.0).min(100.0))
    }

    fn memory() -> (u64, u64) {
        let Ok(raw) = fs::read_to_string("/proc/meminfo") else {
            return (0, 0);
        };
        let field = |name: &str| -> u64 {
            raw.lines()
                .find(|line| line.starts_with(name))
                .and_then(|line| line.split_whitespace().nth(1)?.parse::<u64>().ok())
                .map_or(0, |kib| kib * 1024)
        };
        let total = field("MemTotal:");
        let available = field("MemAvailable:");
        (total.saturating_sub(available), total)
    }
}

impl SystemProbe for HostProbe {
    fn read(&self) -> ProbeReading {
        let (used, total) = Self::memory();
        ProbeReading {
            cpu_usage: Self::cpu_usage(),
            memory_used_bytes: used,
            memory_total_bytes: total,
        }
    }
}

/// Fixed readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProbe(pub ProbeReading);

impl SystemProbe for StaticProbe {
    fn read(&self) -> ProbeReading {
        self.0
    }
}
