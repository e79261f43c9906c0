//! Run-wide mutable state, guarded by a single lock in the orchestrator.

use plpharvest_core::CanonicalProduct;

use crate::dedup::Deduplicator;

/// Counters reported when a run is flushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub saved: usize,
    pub pages_handled: usize,
    pub empty_pages: usize,
    pub duplicates_dropped: usize,
    pub filtered_out: usize,
}

/// Why a candidate record was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    /// The target is already met or fully reserved.
    TargetMet,
    Duplicate,
}

#[derive(Debug)]
pub(crate) struct CrawlState {
    dedup: Deduplicator,
    target: usize,
    saved: usize,
    /// Slots held by listing records waiting for their detail page.
    reserved: usize,
    stopped: bool,
    buffer: Vec<CanonicalProduct>,
    pages_handled: usize,
    empty_pages: usize,
    duplicates_dropped: usize,
    filtered_out: usize,
}

impl CrawlState {
    pub(crate) fn new(target: usize) -> Self {
        Self {
            dedup: Deduplicator::new(),
            target,
            saved: 0,
            reserved: 0,
            stopped: false,
            buffer: Vec::new(),
            pages_handled: 0,
            empty_pages: 0,
            duplicates_dropped: 0,
            filtered_out: 0,
        }
    }

    /// The target has been reached by saved records.
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Saved plus reserved records cover the target: no new listing work
    /// should be started.
    pub(crate) fn target_committed(&self) -> bool {
        self.stopped || self.saved + self.reserved >= self.target
    }

    pub(crate) fn saved(&self) -> usize {
        self.saved
    }

    pub(crate) fn record_page(&mut self, empty: bool) {
        self.pages_handled += 1;
        if empty {
            self.empty_pages += 1;
        }
    }

    pub(crate) fn record_filtered(&mut self) {
        self.filtered_out += 1;
    }

    /// Claims the record's id. Checks the target before the id so records
    /// past the target never consume an identity.
    pub(crate) fn admit(&mut self, id: &str) -> Result<(), Rejection> {
        if self.target_committed() {
            return Err(Rejection::TargetMet);
        }
        if !self.dedup.mark(id) {
            self.duplicates_dropped += 1;
            return Err(Rejection::Duplicate);
        }
        Ok(())
    }

    /// Admits a record and buffers it for the sink.
    pub(crate) fn save(&mut self, record: CanonicalProduct) -> Result<(), Rejection> {
        self.admit(&record.id)?;
        self.push_saved(record);
        Ok(())
    }

    /// Admits a record and holds a slot for it until its detail page is
    /// handled or released.
    pub(crate) fn reserve(&mut self, id: &str) -> Result<(), Rejection> {
        self.admit(id)?;
        self.reserved += 1;
        Ok(())
    }

    /// Converts a reservation into a saved record. Returns `false` when the
    /// run already stopped and the record was discarded.
    pub(crate) fn commit_reserved(&mut self, record: CanonicalProduct) -> bool {
        self.reserved = self.reserved.saturating_sub(1);
        if self.stopped {
            return false;
        }
        self.push_saved(record);
        true
    }

    fn push_saved(&mut self, record: CanonicalProduct) {
        self.buffer.push(record);
        self.saved += 1;
        if self.saved >= self.target {
            self.stopped = true;
        }
    }

    /// Removes every complete batch from the buffer, oldest first.
    pub(crate) fn drain_full_batches(&mut self, batch_size: usize) -> Vec<Vec<CanonicalProduct>> {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::new();
        while self.buffer.len() >= batch_size {
            batches.push(self.buffer.drain(..batch_size).collect());
        }
        batches
    }

    /// Puts batches the sink rejected back at the front of the buffer, ahead
    /// of anything saved since, so the next persist retries them in order.
    pub(crate) fn restore_unsent(&mut self, batches: Vec<Vec<CanonicalProduct>>) {
        let mut restored: Vec<CanonicalProduct> = batches.into_iter().flatten().collect();
        restored.append(&mut self.buffer);
        self.buffer = restored;
    }

    /// Takes whatever is buffered and reports the run counters.
    pub(crate) fn finish(&mut self) -> (Vec<CanonicalProduct>, RunSummary, usize) {
        let remaining = std::mem::take(&mut self.buffer);
        let summary = RunSummary {
            saved: self.saved,
            pages_handled: self.pages_handled,
            empty_pages: self.empty_pages,
            duplicates_dropped: self.duplicates_dropped,
            filtered_out: self.filtered_out,
        };
        (remaining, summary, self.reserved)
    }
}
