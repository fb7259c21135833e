use std::sync::atomic::{AtomicI64, Ordering};

/// Observability counters bumped while inspecting requests. These never
/// influence control flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    ExtensionBasic,
    ExtensionTlsFeature,
    ExtensionTlsFeatureInvalid,
    ExtensionOther,
}

impl Counter {
    pub const ALL: [Counter; 4] = [
        Counter::ExtensionBasic,
        Counter::ExtensionTlsFeature,
        Counter::ExtensionTlsFeatureInvalid,
        Counter::ExtensionOther,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Counter::ExtensionBasic => "extension-basic",
            Counter::ExtensionTlsFeature => "extension-tls-feature",
            Counter::ExtensionTlsFeatureInvalid => "extension-tls-feature-invalid",
            Counter::ExtensionOther => "extension-other",
        }
    }

    fn index(&self) -> usize {
        match self {
            Counter::ExtensionBasic => 0,
            Counter::ExtensionTlsFeature => 1,
            Counter::ExtensionTlsFeatureInvalid => 2,
            Counter::ExtensionOther => 3,
        }
    }
}

/// To export counters somewhere, implement `inc` and hand the sink to the
/// certificate authority.
pub trait StatsSink {
    fn inc(&self, counter: Counter, delta: i64);
}

/// In process counters, readable at any time
#[derive(Default)]
pub struct CounterStats {
    counters: [AtomicI64; 4],
}

impl CounterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: Counter) -> i64 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<(&'static str, i64)> {
        Counter::ALL.iter().map(|c| (c.name(), self.get(*c))).collect()
    }
}

impl StatsSink for CounterStats {
    fn inc(&self, counter: Counter, delta: i64) {
        self.counters[counter.index()].fetch_add(delta, Ordering::Relaxed);
    }
}
