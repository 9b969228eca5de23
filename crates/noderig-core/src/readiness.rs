//! Startup readiness detection.
//!
//! Converts the workload's asynchronous, unstructured startup into a bounded
//! decision: after a fixed warm-up, the current log buffer is polled up to a
//! fixed number of times for substrings known to indicate the node reached a
//! live state. Exhausting the budget is *not* a failure of the provisioning
//! run — a slow-starting node (long state sync) is an expected outcome that
//! is surfaced to the operator, not an error.
//!
//! The log buffer is abstracted behind [`LogSource`] so the matching strings
//! can be swapped and the source mocked in tests without touching the poll
//! loop.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A time-bounded source of the workload's current log buffer.
///
/// Implementations fetch whatever the workload has logged so far; the
/// detector only ever reads, never interprets beyond substring matching.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Return the current log buffer, best effort. An unreadable buffer
    /// degrades to an empty string rather than failing the detector.
    async fn fetch(&mut self) -> String;
}

/// Terminal classification of the startup watch. Both are success outcomes
/// of the provisioning run, distinguished only by operator messaging; the
/// outcome is recorded in the JSON run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessSignal {
    /// A readiness marker appeared in the log buffer.
    Confirmed {
        /// The marker that matched.
        marker: String,
        /// 1-based poll iteration at which it matched.
        iteration: u32,
    },
    /// The poll budget was exhausted without a match.
    TimedOut,
}

/// Poll-loop budget and the markers that count as evidence of liveness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessConfig {
    /// Sleep before the first poll so the process can attach its log
    /// stream; polling immediately produces false negatives.
    pub warmup: Duration,

    /// Sleep between poll iterations.
    pub interval: Duration,

    /// Maximum number of poll iterations.
    pub max_polls: u32,

    /// Substrings indicating the workload reached a live state.
    pub markers: Vec<String>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(10),
            interval: Duration::from_secs(2),
            max_polls: 30,
            markers: vec![
                "applied block".to_string(),
                "metrics server listening".to_string(),
                "probing peer latencies".to_string(),
            ],
        }
    }
}

impl ReadinessConfig {
    /// First marker contained in `buffer`, if any.
    pub fn match_marker(&self, buffer: &str) -> Option<&str> {
        self.markers
            .iter()
            .map(String::as_str)
            .find(|marker| buffer.contains(marker))
    }
}

/// Watch the workload's startup until a marker appears or the budget runs
/// out. The caller has already pulled the image and issued the start
/// command; this covers warm-up and polling only.
pub async fn watch_startup(config: &ReadinessConfig, source: &mut dyn LogSource) -> ReadinessSignal {
    debug!(warmup = ?config.warmup, "waiting for workload to attach its log stream");
    tokio::time::sleep(config.warmup).await;

    for iteration in 1..=config.max_polls {
        tokio::time::sleep(config.interval).await;

        let buffer = source.fetch().await;
        if let Some(marker) = config.match_marker(&buffer) {
            info!(marker, iteration, "workload confirmed live");
            return ReadinessSignal::Confirmed {
                marker: marker.to_string(),
                iteration,
            };
        }
        debug!(iteration, max = config.max_polls, "no readiness marker yet");
    }

    warn!(
        polls = config.max_polls,
        "startup not confirmed within budget; node may still be syncing"
    );
    ReadinessSignal::TimedOut
}
