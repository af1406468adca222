// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! System-load metrics that each channel's volume follows.
//!
//! Every source returns a fraction in `[0, 1]`. When the underlying counters
//! cannot be read the source logs a warning and reports zero; the tone must
//! keep playing even with degraded telemetry.

use std::fs;

use log::warn;

/// Something that can report the current load as a fraction in `[0, 1]`.
pub trait MetricSource {
    fn sample(&mut self) -> f64;
}

/// The metrics a channel can be calibrated against, as they are named in the
/// configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Ram,
}

impl Metric {
    pub const ALL: &'static [Metric] = &[Metric::Cpu, Metric::Ram];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Ram => "RAM",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Instantiate the source once; it owns whatever state the sampling
    /// needs across cycles.
    pub fn source(self) -> Box<dyn MetricSource> {
        match self {
            Metric::Cpu => Box::new(CpuUsage::default()),
            Metric::Ram => Box::new(RamUsage),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuCounters {
    total_since_boot: u64,
    idle_since_boot: u64,
}

/// CPU usage averaged since the previous call, from the aggregate `cpu `
/// line of `/proc/stat`. Somewhat similar to what psutil does.
#[derive(Debug, Default)]
pub struct CpuUsage {
    prev: Option<CpuCounters>,
}

impl MetricSource for CpuUsage {
    fn sample(&mut self) -> f64 {
        match fs::read_to_string("/proc/stat") {
            Ok(contents) => self.update(&contents),
            Err(err) => {
                warn!("failed to read /proc/stat: {}", err);
                0.0
            }
        }
    }
}

impl CpuUsage {
    fn update(&mut self, proc_stat: &str) -> f64 {
        let cur = match parse_proc_stat(proc_stat) {
            Some(counters) => counters,
            None => {
                warn!("failed to find 'cpu ' line in /proc/stat");
                return 0.0;
            }
        };

        let prev = self.prev.replace(cur);
        match prev {
            // The very first call has no baseline, and identical counters
            // leave nothing to average over.
            None => 0.0,
            Some(prev) if prev.total_since_boot == cur.total_since_boot => 0.0,
            Some(prev) => {
                let total = cur.total_since_boot - prev.total_since_boot;
                let idle = cur.idle_since_boot - prev.idle_since_boot;
                (total - idle) as f64 / total as f64
            }
        }
    }
}

/// First five fields of the `cpu ` line: user, nice, system, idle, iowait.
/// The remaining fields are ignored, like htop does.
fn parse_proc_stat(contents: &str) -> Option<CpuCounters> {
    let line = contents
        .lines()
        .find(|line| line.starts_with("cpu "))?;
    let mut fields = line
        .split_whitespace()
        .skip(1)
        .map(|field| field.parse::<u64>());

    let mut take = || fields.next()?.ok();
    let user = take()?;
    let nice = take()?;
    let system = take()?;
    let idle = take()?;
    let iowait = take()?;

    Some(CpuCounters {
        total_since_boot: user + nice + system + idle + iowait,
        idle_since_boot: idle + iowait,
    })
}

/// RAM usage from `/proc/meminfo`.
///
/// Looks at what Linux calls "available" rather than "free", so file system
/// caches count as usable memory.
#[derive(Debug)]
pub struct RamUsage;

impl MetricSource for RamUsage {
    fn sample(&mut self) -> f64 {
        match fs::read_to_string("/proc/meminfo") {
            Ok(contents) => match parse_meminfo(&contents) {
                Some((total, available)) => (total - available) as f64 / total as f64,
                None => {
                    warn!("failed to parse /proc/meminfo");
                    0.0
                }
            },
            Err(err) => {
                warn!("failed to read /proc/meminfo: {}", err);
                0.0
            }
        }
    }
}

/// Returns (MemTotal, MemAvailable) in kB.
fn parse_meminfo(contents: &str) -> Option<(u64, u64)> {
    let mut total = None;
    let mut available = None;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = rest.trim().trim_end_matches(" kB").trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = rest.trim().trim_end_matches(" kB").trim().parse().ok();
        }
    }
    Some((total?, available?))
}

#[cfg(test)]
mod test {
    use super::*;

    const STAT_A: &str = "cpu  100 0 100 700 100 0 0 0 0 0\n\
                          cpu0 50 0 50 350 50 0 0 0 0 0\n";
    const STAT_B: &str = "cpu  200 0 200 800 100 0 0 0 0 0\n";

    #[test]
    fn first_cpu_sample_has_no_baseline() {
        let mut cpu = CpuUsage::default();
        assert_eq!(cpu.update(STAT_A), 0.0);
    }

    #[test]
    fn cpu_usage_is_averaged_between_calls() {
        let mut cpu = CpuUsage::default();
        cpu.update(STAT_A);
        // deltas: total 300, idle 100, so 200/300 busy
        let usage = cpu.update(STAT_B);
        assert!((usage - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn unchanged_counters_read_as_idle() {
        let mut cpu = CpuUsage::default();
        cpu.update(STAT_A);
        assert_eq!(cpu.update(STAT_A), 0.0);
    }

    #[test]
    fn aggregate_line_wins_over_per_core_lines() {
        let contents = "intr 12345\ncpu0 1 2 3 4 5\ncpu  10 20 30 40 50\n";
        let counters = parse_proc_stat(contents).unwrap();
        assert_eq!(counters.total_since_boot, 150);
        assert_eq!(counters.idle_since_boot, 90);
    }

    #[test]
    fn malformed_proc_stat_falls_back_to_zero() {
        let mut cpu = CpuUsage::default();
        assert_eq!(cpu.update("cpu  broken fields here\n"), 0.0);
        assert_eq!(cpu.update(""), 0.0);
    }

    #[test]
    fn ram_usage_counts_available_as_free() {
        let contents = "MemTotal:       1000 kB\n\
                        MemFree:         100 kB\n\
                        MemAvailable:    750 kB\n";
        let (total, available) = parse_meminfo(contents).unwrap();
        assert_eq!((total, available), (1000, 750));
        assert_eq!((total - available) as f64 / total as f64, 0.25);
    }

    #[test]
    fn meminfo_without_available_is_rejected() {
        assert_eq!(parse_meminfo("MemTotal: 1000 kB\n"), None);
    }

    #[test]
    fn metric_names_round_trip() {
        for &metric in Metric::ALL {
            assert_eq!(Metric::from_name(metric.name()), Some(metric));
        }
        assert_eq!(Metric::from_name("FluxCapacitor"), None);
    }
}
