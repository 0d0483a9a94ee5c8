//! Record sinks: where finished batches go.
//!
//! RULE: A batch is written whole or not at all. `completed_batches`
//! reports exactly the batches whose records were fully written.

use crate::{assemble::MonthlyRecord, error::PanelResult, types::RunId};
use std::collections::{BTreeMap, BTreeSet};

pub trait RecordSink {
    /// Indexes of the batches of `run_id` already persisted.
    fn completed_batches(&self, run_id: &str) -> PanelResult<BTreeSet<usize>>;

    /// Persist one batch's records, in order, and mark the batch complete.
    fn write_batch(
        &mut self,
        run_id: &str,
        batch_index: usize,
        records: &[MonthlyRecord],
    ) -> PanelResult<()>;
}

/// Keeps batches in memory. Used in tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: BTreeMap<(RunId, usize), Vec<MonthlyRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of `run_id`, batches concatenated in index order.
    pub fn records(&self, run_id: &str) -> Vec<MonthlyRecord> {
        self.batches
            .iter()
            .filter(|((run, _), _)| run == run_id)
            .flat_map(|(_, records)| records.iter().cloned())
            .collect()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

impl RecordSink for MemorySink {
    fn completed_batches(&self, run_id: &str) -> PanelResult<BTreeSet<usize>> {
        Ok(self
            .batches
            .keys()
            .filter(|(run, _)| run == run_id)
            .map(|(_, index)| *index)
            .collect())
    }

    fn write_batch(
        &mut self,
        run_id: &str,
        batch_index: usize,
        records: &[MonthlyRecord],
    ) -> PanelResult<()> {
        self.batches
            .insert((run_id.to_string(), batch_index), records.to_vec());
        Ok(())
    }
}
