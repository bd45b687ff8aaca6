//! Per-layer event filtering: severity threshold and 1-in-N sampling.

use slogging_types::LogLevel;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Filter};

/// Keeps exactly one event out of every `every`, starting with the first.
#[derive(Debug)]
pub struct BasicSampler {
    every: u32,
    counter: AtomicU32,
}

impl BasicSampler {
    /// Sampler keeping one event in `every`. Values up to 1 keep everything.
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            counter: AtomicU32::new(0),
        }
    }

    /// Whether the next event should be kept.
    pub fn sample(&self) -> bool {
        self.every <= 1 || self.counter.fetch_add(1, Ordering::Relaxed) % self.every == 0
    }
}

/// Filter applied to the formatting layer.
///
/// Spans always pass, since they only carry fields and must exist for events
/// to find them. Events pass when they are at or above the threshold and the
/// sampler keeps them; suppressed events never consume a sample slot.
#[derive(Debug)]
pub struct EventFilter {
    threshold: LevelFilter,
    sampler: Option<BasicSampler>,
}

impl EventFilter {
    /// Build a filter for `level`, sampling one event in `sample_every` when
    /// given.
    pub fn new(level: LogLevel, sample_every: Option<u32>) -> Self {
        Self {
            threshold: level.into(),
            sampler: sample_every.map(BasicSampler::new),
        }
    }
}

impl<S: Subscriber> Filter<S> for EventFilter {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        meta.is_span() || *meta.level() <= self.threshold
    }

    fn event_enabled(&self, _event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        self.sampler.as_ref().map_or(true, BasicSampler::sample)
    }
}
