//! Per-definition statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by a saga definition across its open and sealed phases
pub struct DefinitionStats {
    /// Handler bindings appended while open
    pub bindings_registered: AtomicU64,
    /// Subscriptions the registrar refused
    pub registrar_failures: AtomicU64,
    /// Instances built by `new_instance`
    pub instances_created: AtomicU64,
    /// Messages allowed to start a new instance
    pub trigger_hits: AtomicU64,
    /// Messages not allowed to start a new instance
    pub trigger_misses: AtomicU64,
}

impl DefinitionStats {
    /// All counters at zero
    pub fn new() -> Self {
        Self {
            bindings_registered: AtomicU64::new(0),
            registrar_failures: AtomicU64::new(0),
            instances_created: AtomicU64::new(0),
            trigger_hits: AtomicU64::new(0),
            trigger_misses: AtomicU64::new(0),
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> DefinitionStatsSnapshot {
        DefinitionStatsSnapshot {
            bindings_registered: self.bindings_registered.load(Ordering::Relaxed),
            registrar_failures: self.registrar_failures.load(Ordering::Relaxed),
            instances_created: self.instances_created.load(Ordering::Relaxed),
            trigger_hits: self.trigger_hits.load(Ordering::Relaxed),
            trigger_misses: self.trigger_misses.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for DefinitionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain values read from [`DefinitionStats`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefinitionStatsSnapshot {
    /// Handler bindings appended while open
    pub bindings_registered: u64,
    /// Subscriptions the registrar refused
    pub registrar_failures: u64,
    /// Instances built by `new_instance`
    pub instances_created: u64,
    /// Messages allowed to start a new instance
    pub trigger_hits: u64,
    /// Messages not allowed to start a new instance
    pub trigger_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reads_counters() {
        let stats = DefinitionStats::new();
        DefinitionStats::incr(&stats.instances_created);
        DefinitionStats::incr(&stats.instances_created);
        DefinitionStats::incr(&stats.trigger_misses);

        assert_eq!(
            stats.snapshot(),
            DefinitionStatsSnapshot {
                instances_created: 2,
                trigger_misses: 1,
                ..Default::default()
            }
        );
    }
}
