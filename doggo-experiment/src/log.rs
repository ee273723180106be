use doggo_core::{TrialRecord, TrialType};
use std::io::Write;

/// Append-only record of every resolved trial in a level.
#[derive(Debug, Clone, Default)]
pub struct TrialLog {
    records: Vec<TrialRecord>,
}

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Records appended after the first `seen`, for incremental consumers.
    pub fn since(&self, seen: usize) -> &[TrialRecord] {
        self.records.get(seen..).unwrap_or(&[])
    }

    pub fn last(&self) -> Option<&TrialRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, trial_type: TrialType) -> usize {
        self.records
            .iter()
            .filter(|r| r.trial_type == trial_type)
            .count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, &self.records)
    }
}
