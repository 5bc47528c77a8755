use common::Listing;

use crate::models::Batch;

/// Collects accepted listings into batches of at most `capacity` records.
pub struct Batcher {
    capacity: usize,
    records: Vec<Listing>,
    next_seq: u64,
}

impl Batcher {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Vec::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Appends a listing and returns a full batch once the cap is reached.
    pub fn push(&mut self, listing: Listing) -> Option<Batch> {
        self.records.push(listing);
        if self.records.len() >= self.capacity {
            Some(self.take())
        } else {
            None
        }
    }

    /// Flushes whatever is left, possibly undersized. `None` when empty.
    pub fn finish(&mut self) -> Option<Batch> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    pub fn pending(&self) -> usize {
        self.records.len()
    }

    fn take(&mut self) -> Batch {
        let records = std::mem::replace(&mut self.records, Vec::with_capacity(self.capacity));
        let seq = self.next_seq;
        self.next_seq += 1;
        Batch { seq, records }
    }
}
