use indexmap::IndexMap;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::stats::Stat;
use crate::types::TypeKey;

#[derive(Debug, Clone, Default)]
struct TimerState {
    total: Duration,
    started: Option<Instant>,
    runs: u32,
}

impl TimerState {
    fn start(&mut self) -> bool {
        if self.started.is_some() {
            return false;
        }
        self.started = Some(Instant::now());
        self.runs += 1;
        true
    }

    fn stop(&mut self) -> Option<Duration> {
        let started = self.started.take()?;
        let elapsed = started.elapsed();
        self.total += elapsed;
        Some(elapsed)
    }
}

/// Wall-clock timers and counters keyed by [`Stat`].
///
/// Timers sum every start/stop pair. Stopping a timer that is not running is
/// a no-op, so call sites with early returns may stop unconditionally.
#[derive(Debug, Default)]
pub struct StatsTracker {
    timers: IndexMap<Stat, TimerState>,
    counters: IndexMap<Stat, u64>,
    details: IndexMap<(Stat, TypeKey), TimerState>,
}

impl StatsTracker {
    /// Create a new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or resume) a timer
    pub fn start(&mut self, stat: Stat) {
        if !stat.is_timer() {
            tracing::debug!(target: "weave::stats", "{:?} is a counter and can't be started", stat);
            return;
        }
        if !self.timers.entry(stat).or_default().start() {
            tracing::debug!(target: "weave::stats", "Timer {:?} is already running", stat);
        }
    }

    /// Stop a running timer, returning the measured span; no-op when stopped
    pub fn stop(&mut self, stat: Stat) -> Option<Duration> {
        self.timers.get_mut(&stat).and_then(TimerState::stop)
    }

    /// Start a per-type detail timer (e.g. a single bundle's initialization)
    pub fn start_detail(&mut self, stat: Stat, key: TypeKey) {
        self.details.entry((stat, key)).or_default().start();
    }

    pub fn stop_detail(&mut self, stat: Stat, key: TypeKey) -> Option<Duration> {
        self.details.get_mut(&(stat, key)).and_then(TimerState::stop)
    }

    /// Increment a counter
    pub fn count(&mut self, stat: Stat, amount: u64) {
        if stat.is_timer() {
            tracing::debug!(target: "weave::stats", "{:?} is a timer and can't be counted", stat);
            return;
        }
        *self.counters.entry(stat).or_insert(0) += amount;
    }

    /// Accumulated time of completed start/stop pairs
    pub fn time(&self, stat: Stat) -> Duration {
        self.timers
            .get(&stat)
            .map(|timer| timer.total)
            .unwrap_or(Duration::ZERO)
    }

    pub fn detail_time(&self, stat: Stat, key: TypeKey) -> Duration {
        self.details
            .get(&(stat, key))
            .map(|timer| timer.total)
            .unwrap_or(Duration::ZERO)
    }

    pub fn counter(&self, stat: Stat) -> u64 {
        self.counters.get(&stat).copied().unwrap_or(0)
    }

    pub fn is_running(&self, stat: Stat) -> bool {
        self.timers
            .get(&stat)
            .map(|timer| timer.started.is_some())
            .unwrap_or(false)
    }

    /// Timers that were started but never stopped
    pub fn unfinished(&self) -> Vec<Stat> {
        self.timers
            .iter()
            .filter(|(_, timer)| timer.started.is_some())
            .map(|(stat, _)| *stat)
            .collect()
    }

    /// Immutable copy of all values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            timers: self
                .timers
                .iter()
                .map(|(stat, timer)| TimerStat {
                    stat: *stat,
                    type_name: None,
                    duration: timer.total,
                    runs: timer.runs,
                })
                .collect(),
            details: self
                .details
                .iter()
                .map(|((stat, key), timer)| TimerStat {
                    stat: *stat,
                    type_name: Some(key.name()),
                    duration: timer.total,
                    runs: timer.runs,
                })
                .collect(),
            counters: self
                .counters
                .iter()
                .map(|(stat, value)| CounterStat {
                    stat: *stat,
                    value: *value,
                })
                .collect(),
        }
    }
}

/// Timer value in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerStat {
    pub stat: Stat,
    pub type_name: Option<&'static str>,
    pub duration: Duration,
    pub runs: u32,
}

/// Counter value in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterStat {
    pub stat: Stat,
    pub value: u64,
}

/// Frozen stats for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub timers: Vec<TimerStat>,
    pub details: Vec<TimerStat>,
    pub counters: Vec<CounterStat>,
}

impl StatsSnapshot {
    pub fn time(&self, stat: Stat) -> Duration {
        self.timers
            .iter()
            .find(|timer| timer.stat == stat)
            .map(|timer| timer.duration)
            .unwrap_or(Duration::ZERO)
    }

    pub fn counter(&self, stat: Stat) -> u64 {
        self.counters
            .iter()
            .find(|counter| counter.stat == stat)
            .map(|counter| counter.value)
            .unwrap_or(0)
    }
}
