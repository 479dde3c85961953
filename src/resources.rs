use std::fs;

use sysinfo::System;

const PROC_STAT: &str = "/proc/stat";

/// Scheduler tick counters for one core, restricted to the classes the
/// busy-fraction formula uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub irq: u64,
}

impl CoreTimes {
    fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.irq
    }
}

/// Point-in-time capture of every core's tick counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSnapshot {
    cores: Vec<CoreTimes>,
}

impl CpuSnapshot {
    /// Capture the current counters. Returns `None` on hosts without a
    /// readable `/proc/stat`, in which case CPU usage reports as `N/A`.
    pub fn capture() -> Option<Self> {
        let raw = fs::read_to_string(PROC_STAT).ok()?;
        let snapshot = Self::parse(&raw);
        if snapshot.cores.is_empty() {
            None
        } else {
            Some(snapshot)
        }
    }

    fn parse(raw: &str) -> Self {
        let mut cores = Vec::new();
        for line in raw.lines() {
            let mut fields = line.split_whitespace();
            let Some(label) = fields.next() else {
                continue;
            };
            // Per-core lines only; the "cpu" aggregate line is skipped.
            if !label.starts_with("cpu") || label == "cpu" {
                continue;
            }
            let ticks: Vec<u64> = fields.map(|field| field.parse().unwrap_or(0)).collect();
            // user nice system idle iowait irq ...
            if ticks.len() < 6 {
                continue;
            }
            cores.push(CoreTimes {
                user: ticks[0],
                nice: ticks[1],
                system: ticks[2],
                idle: ticks[3],
                irq: ticks[5],
            });
        }
        Self { cores }
    }
}

/// Busy fraction across all cores between two snapshots:
/// `1 − Σ idle_delta / Σ total_delta`.
///
/// This attributes busyness to the whole interval, not an instant, and the
/// readings are host-level: parallel workers share the same counters, so
/// concurrent load is conflated. Returns `None` when no ticks elapsed
/// between the snapshots or the core sets do not line up, so callers render
/// `N/A` instead of a NaN.
pub fn busy_fraction(start: &CpuSnapshot, end: &CpuSnapshot) -> Option<f64> {
    if start.cores.is_empty() || start.cores.len() != end.cores.len() {
        return None;
    }
    let mut idle_delta = 0u64;
    let mut total_delta = 0u64;
    for (before, after) in start.cores.iter().zip(&end.cores) {
        idle_delta += after.idle.saturating_sub(before.idle);
        total_delta += after.total().saturating_sub(before.total());
    }
    if total_delta == 0 {
        return None;
    }
    Some(1.0 - idle_delta as f64 / total_delta as f64)
}

/// Resident set size of the current process as a percentage of total
/// physical memory, formatted for the result record.
pub fn rss_percent() -> String {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return "N/A".to_string();
    };
    let system = System::new_all();
    let total = system.total_memory();
    let Some(process) = system.process(pid) else {
        return "N/A".to_string();
    };
    if total == 0 {
        return "N/A".to_string();
    }
    format!("{:.2}%", process.memory() as f64 / total as f64 * 100.0)
}
