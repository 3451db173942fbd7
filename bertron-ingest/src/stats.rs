use std::ops::AddAssign;

/// Per-batch ingestion counters. `inserted` counts newly created documents;
/// an in-place replacement of an existing `uri` is success without the
/// counter. `error` covers unreadable files and per-record hard failures
/// (bad coordinates, store write failure).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub processed: u64,
    pub valid: u64,
    pub invalid: u64,
    pub inserted: u64,
    pub error: u64,
}

impl AddAssign for IngestStats {
    fn add_assign(&mut self, rhs: Self) {
        self.processed += rhs.processed;
        self.valid += rhs.valid;
        self.invalid += rhs.invalid;
        self.inserted += rhs.inserted;
        self.error += rhs.error;
    }
}
