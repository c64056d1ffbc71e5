//! Telemetry utilities for formatting and emitting per-pass counters.
//! Kept independent of `PageContext` internals; callers pass counters explicitly.

use hit_region::SamplingStats;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerfCounters {
    pub passes_completed: u64,
    pub passes_aborted: u64,
    pub sampling_time_last_ms: u64,
    pub sampling_time_total_ms: u64,
    pub samples_last: u64,
    pub hits_last: u64,
    pub elements_last: u64,
    /// Triggers merged into an already pending recalculation.
    pub coalesced_triggers: u64,
}

impl PerfCounters {
    pub fn record_completed(&mut self, stats: &SamplingStats) {
        let millis = stats.duration.as_millis() as u64;
        self.passes_completed += 1;
        self.sampling_time_last_ms = millis;
        self.sampling_time_total_ms = self.sampling_time_total_ms.saturating_add(millis);
        self.samples_last = stats.sampled as u64;
        self.hits_last = stats.hits as u64;
        self.elements_last = stats.elements as u64;
    }

    pub fn record_aborted(&mut self) {
        self.passes_aborted += 1;
    }
}

pub fn perf_counters_json(counters: &PerfCounters) -> String {
    serde_json::to_string(counters).unwrap_or_else(|err| format!("{{\"error\":\"{err}\"}}"))
}

pub fn maybe_emit(enabled: bool, json_line: &str) {
    if enabled {
        info!(target: "hitmap::telemetry", "{json_line}");
    }
}
