use std::sync::Mutex;

use crate::err::Result;

/// Receives byte counters from the executor after each coder step.
pub trait DecodeProgress {
    /// `packed` is the number of pack stream bytes consumed so far,
    /// `unpacked` the number of bytes handed to the sink so far.
    ///
    /// Returning an error stops decoding.
    fn coder_finished(&mut self, packed: u64, unpacked: u64) -> Result<()>;
}

/// Progress sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl DecodeProgress for NoProgress {
    fn coder_finished(&mut self, _packed: u64, _unpacked: u64) -> Result<()> {
        return Ok(());
    }
}

#[derive(Debug, Default)]
struct Totals {
    total: u64,
    completed: u64,
}

/// Running totals of an extraction run.
///
/// Shared between folder jobs, so both counters sit behind one lock.
/// Neither counter ever decreases.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    totals: Mutex<Totals>,
}

impl ProgressAggregator {
    pub fn new() -> ProgressAggregator {
        return ProgressAggregator::default();
    }

    /// Raise the total. Lower values are ignored.
    pub fn set_total(&self, total: u64) -> u64 {
        let mut t = self.lock();
        t.total = t.total.max(total);
        return t.total;
    }

    /// Add the bytes of a finished step and return the new completed count.
    pub fn advance(&self, bytes: u64) -> u64 {
        let mut t = self.lock();
        t.completed = t.completed.saturating_add(bytes);
        return t.completed;
    }

    pub fn total(&self) -> u64 {
        return self.lock().total;
    }

    pub fn completed(&self) -> u64 {
        return self.lock().completed;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Totals> {
        // The counters stay consistent even if a holder panicked.
        match self.totals.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
