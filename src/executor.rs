//! Parallel work-stealing execution over elution groups (§4.9
//! `ParallelExecutor`).
//!
//! Grounded on `ParallelConversionConfig`/`SharedDecodeContext` in the
//! teacher's `src/formats/tdf/parallel_converter.rs` and on
//! `TimsTofSyntheticsFrameBuilderDIA::build_frames` in
//! `rustims/rustdf/src/sim/dia.rs`: a dedicated `rayon` thread pool runs a
//! `par_iter().map(...)` over independent units of work, and the results are
//! sorted back into a deterministic order afterward rather than relying on
//! the parallel iterator to preserve it.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::SelectionConfig;
use crate::data_model::{Candidate, FragmentTable, PrecursorTable};
use crate::diagnostics::ScoreGroupObserver;
use crate::error::EngineError;
use crate::groups::{build_elution_groups, build_score_groups};
use crate::raw_index::RawIndex;
use crate::score_group::ScoreGroupEngine;

/// Runs [`ScoreGroupEngine`] over every elution group in a precursor table,
/// in parallel, with deterministic output ordering.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelExecutor;

impl ParallelExecutor {
    /// Validate the input tables, partition them into elution and score
    /// groups, and process every group. Output is sorted by ascending
    /// `elution_group_idx` regardless of worker count or scheduling order,
    /// and within a group, candidates preserve the order
    /// [`ScoreGroupEngine::process`] produced them in.
    ///
    /// Returns [`EngineError::Schema`] if validation fails, or
    /// [`EngineError::WorkerPanic`] if a worker panics while processing a
    /// group — the run aborts and no partial output is returned.
    pub fn run(
        &self,
        precursors: &PrecursorTable,
        fragments: &FragmentTable,
        raw: &RawIndex,
        config: &SelectionConfig,
        observer: &(dyn ScoreGroupObserver + Sync),
    ) -> Result<Vec<Candidate>, EngineError> {
        precursors.validate(config.column_choice)?;
        fragments.validate()?;

        if precursors.is_empty() {
            debug!("empty precursor table, skipping run");
            return Ok(Vec::new());
        }

        let mut elution_groups = build_elution_groups(precursors);
        if config.debug {
            if let Some(limit) = config.debug_max_groups {
                elution_groups.truncate(limit);
            }
            debug!("debug mode: {} elution groups, single worker", elution_groups.len());
        }

        let thread_count = if config.debug { 1 } else { config.thread_count.max(1) };
        info!(
            "running {} elution groups on {} worker(s)",
            elution_groups.len(),
            thread_count
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .map_err(|err| EngineError::WorkerPanic {
                elution_group_idx: 0,
                message: err.to_string(),
            })?;

        let results: Vec<Result<(u32, Vec<Candidate>), EngineError>> = pool.install(|| {
            elution_groups
                .par_iter()
                .map(|group| {
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let score_groups =
                            build_score_groups(precursors, group, config.grouping_policy);
                        let mut candidates = Vec::new();
                        for score_group in &score_groups {
                            let mut produced = ScoreGroupEngine.process(
                                precursors,
                                fragments,
                                raw,
                                config,
                                &score_group.precursor_rows,
                                observer,
                            );
                            candidates.append(&mut produced);
                        }
                        candidates
                    }));

                    match outcome {
                        Ok(candidates) => Ok((group.elution_group_idx, candidates)),
                        Err(payload) => {
                            let message = panic_message(&payload);
                            warn!(
                                "worker panicked on elution group {}: {message}",
                                group.elution_group_idx
                            );
                            Err(EngineError::WorkerPanic {
                                elution_group_idx: group.elution_group_idx,
                                message,
                            })
                        }
                    }
                })
                .collect()
        });

        let mut ordered: Vec<(u32, Vec<Candidate>)> = Vec::with_capacity(results.len());
        for result in results {
            ordered.push(result?);
        }
        ordered.sort_by_key(|(elution_group_idx, _)| *elution_group_idx);

        let mut out = Vec::new();
        for (_, mut candidates) in ordered {
            out.append(&mut candidates);
        }
        Ok(out)
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}
