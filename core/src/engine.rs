//! The panel engine: turns subjects' episodes into monthly records.
//!
//! PIPELINE PER SUBJECT (fixed order):
//!   1. Validate episode intervals
//!   2. Classify every episode (primary, secondary, overlap)
//!   3. Apportion and resolve primary contributions
//!   4. Apportion secondary contributions, add the secondary-job
//!      leftovers from step 3, rank
//!   5. Untangle and apportion both overlap categories
//!   6. Assemble over the observation window
//!
//! RULES:
//!   - Subjects are independent. Workers share only the immutable config.
//!   - Batch output is ordered like the input, whatever the worker count.
//!   - A batch is persisted before the next one starts.
//!   - One failing subject fails its batch; the error names the subject.

use crate::{
    assemble::{assemble, MonthlyRecord, SubjectStreams},
    calendar::observation_window,
    classify::Classifier,
    config::PanelConfig,
    episode::SubjectEpisodes,
    error::{PanelError, PanelResult},
    overlap::overlap_months,
    primary::{primary_contributions, resolve_primary},
    secondary::{rank_secondary, secondary_contributions},
    sink::RecordSink,
    types::{MonthKey, RunId},
};
use crossbeam::channel;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Build the monthly records of one subject.
pub fn pivot_subject(
    subject: &SubjectEpisodes,
    config: &PanelConfig,
) -> PanelResult<Vec<MonthlyRecord>> {
    for ep in &subject.episodes {
        ep.validate()?;
    }
    let Some(first_start) = subject.first_start() else {
        return Ok(Vec::new());
    };
    let window = observation_window(first_start, config.reporting_year);
    let window_end = MonthKey::december(config.reporting_year);

    let classified = Classifier::new(&config.rules).classify_subject(&subject.episodes)?;

    let primary = resolve_primary(
        primary_contributions(
            &classified.primary,
            window_end,
            &config.adjusted_labels,
            &config.adjustment,
        )?,
        &config.secondary_job_label,
    );

    let mut secondary = secondary_contributions(&classified.secondary, window_end)?;
    secondary.extend(primary.secondary_job);
    let secondary = rank_secondary(secondary, &config.priority)?;

    let overlap_a = overlap_months(&classified.overlap_days, false)?;
    let overlap_b = overlap_months(&classified.overlap_points, true)?;

    log::debug!(
        "subject={} episodes={} months={} primary_months={}",
        subject.subject_id,
        subject.episodes.len(),
        window.len(),
        primary.slots.len()
    );

    Ok(assemble(
        &subject.subject_id,
        &window,
        SubjectStreams {
            primary: primary.slots,
            secondary,
            overlap_a,
            overlap_b,
        },
    ))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub subjects:        usize,
    pub batches_total:   usize,
    pub batches_written: usize,
    pub batches_skipped: usize,
    pub records_written: usize,
}

pub struct PanelEngine {
    pub run_id: RunId,
    config:     PanelConfig,
}

impl PanelEngine {
    pub fn new(run_id: RunId, config: PanelConfig) -> Self {
        Self { run_id, config }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Process `subjects` batch by batch, persisting each batch to `sink`.
    /// Batches the sink already holds for this run are skipped.
    pub fn run(
        &self,
        subjects: &[SubjectEpisodes],
        sink: &mut dyn RecordSink,
    ) -> PanelResult<RunSummary> {
        let done = sink.completed_batches(&self.run_id)?;
        let batch_size = self.config.batch_size.max(1);
        let mut summary = RunSummary {
            subjects: subjects.len(),
            batches_total: subjects.len().div_ceil(batch_size),
            ..Default::default()
        };
        log::info!(
            "run={} year={} subjects={} batches={} workers={}",
            self.run_id,
            self.config.reporting_year,
            summary.subjects,
            summary.batches_total,
            self.config.workers
        );

        for (index, batch) in subjects.chunks(batch_size).enumerate() {
            if done.contains(&index) {
                log::warn!(
                    "batch {}/{} already persisted for run {}; skipping",
                    index + 1,
                    summary.batches_total,
                    self.run_id
                );
                summary.batches_skipped += 1;
                continue;
            }
            let started = Instant::now();
            let records = self.process_batch(batch)?;
            sink.write_batch(&self.run_id, index, &records)?;
            summary.batches_written += 1;
            summary.records_written += records.len();
            log::info!(
                "batch {}/{}: {} subjects, {} records in {:.3}s",
                index + 1,
                summary.batches_total,
                batch.len(),
                records.len(),
                started.elapsed().as_secs_f64()
            );
        }
        Ok(summary)
    }

    /// Pivot one batch on a fixed pool of worker threads.
    ///
    /// Workers drain a shared queue of subjects; results are put back in
    /// input order. If several subjects fail, the first in input order is
    /// reported.
    pub fn process_batch(&self, batch: &[SubjectEpisodes]) -> PanelResult<Vec<MonthlyRecord>> {
        let workers = self.config.workers.clamp(1, batch.len().max(1));

        let (job_tx, job_rx) = channel::unbounded::<(usize, &SubjectEpisodes)>();
        for job in batch.iter().enumerate() {
            job_tx
                .send(job)
                .map_err(|e| PanelError::WorkerPool(e.to_string()))?;
        }
        drop(job_tx);

        let (result_tx, result_rx) = channel::unbounded();
        let config = &self.config;
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, subject) in job_rx.iter() {
                        let result = pivot_subject(subject, config).map_err(|e| {
                            PanelError::SubjectFailed {
                                subject_id: subject.subject_id.clone(),
                                source:     Box::new(e),
                            }
                        });
                        if result_tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<PanelResult<Vec<MonthlyRecord>>>> =
            (0..batch.len()).map(|_| None).collect();
        for (index, result) in result_rx.iter() {
            slots[index] = Some(result);
        }

        let mut records = Vec::new();
        for (slot, subject) in slots.into_iter().zip(batch) {
            let result = slot.ok_or_else(|| {
                PanelError::WorkerPool(format!("no result for subject {}", subject.subject_id))
            })?;
            records.extend(result?);
        }
        Ok(records)
    }
}
