use std::sync::{Arc, Mutex, MutexGuard};

/// Gas used by one mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasUsage {
    pub name: String,
    pub gas_used: u64,
}

/// Immutable view of a [`GasLedger`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub cumulative_gas_used: u64,
    pub per_function: Vec<GasUsage>,
}

/// Record of gas used by transactions sent through one
/// [`crate::contracts::Contracts`] instance.
///
/// Cloning shares the ledger.
#[derive(Clone, Debug, Default)]
pub struct GasLedger {
    inner: Arc<Mutex<LedgerSnapshot>>,
}

impl GasLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: impl Into<String>, gas_used: u64) {
        let mut ledger = self.lock();
        ledger.cumulative_gas_used = ledger.cumulative_gas_used.saturating_add(gas_used);
        ledger.per_function.push(GasUsage {
            name: name.into(),
            gas_used,
        });
    }

    pub fn reset(&self) {
        *self.lock() = LedgerSnapshot::default();
    }

    pub fn cumulative_gas_used(&self) -> u64 {
        self.lock().cumulative_gas_used
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerSnapshot> {
        // The ledger holds plain counters, a panic mid-update leaves them usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reset() {
        let ledger = GasLedger::new();
        let shared = ledger.clone();
        ledger.record("trade", 120_000);
        shared.record("trade", 80_000);

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.cumulative_gas_used, 200_000);
        assert_eq!(snapshot.per_function.len(), 2);
        assert_eq!(snapshot.per_function[1].gas_used, 80_000);

        ledger.reset();
        assert_eq!(shared.cumulative_gas_used(), 0);
        assert!(shared.snapshot().per_function.is_empty());
        // snapshots taken earlier are unaffected
        assert_eq!(snapshot.cumulative_gas_used, 200_000);
    }
}
