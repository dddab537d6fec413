//! Peptide candidate-apex selection for DIA TIMS-TOF acquisitions.
//!
//! Given a library of expected precursors and fragments, and a sparse 4-D
//! ion tensor from a single acquisition, this crate locates where in
//! (retention time, ion mobility) space each precursor's elution apex most
//! plausibly occurred, by cross-correlating a dense precursor window against
//! a dense fragment window after Gaussian smoothing.
//!
//! The entry point is [`select_candidates`]. It takes a [`PrecursorTable`],
//! a [`FragmentTable`], a [`RawIndex`] view over the acquisition, and a
//! [`SelectionConfig`], and returns a flat [`Candidate`] table.
//!
//! ```no_run
//! use diapex::prelude::*;
//!
//! fn run(precursors: PrecursorTable, fragments: FragmentTable, raw: RawIndex) {
//!     let config = SelectionConfig::default();
//!     let candidates = select_candidates(&precursors, &fragments, &raw, &config)
//!         .expect("well-formed input tables");
//!     println!("found {} candidates", candidates.len());
//! }
//! ```

#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod data_model;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod groups;
pub mod ion_groups;
pub mod kernel;
pub mod peak_picker;
pub mod raw_index;
pub mod score_group;
pub mod smoothing;
pub mod window;

use diagnostics::NullObserver;
use error::EngineError;

/// Commonly used types, re-exported for convenient `use diapex::prelude::*`.
pub mod prelude {
    pub use crate::config::{ColumnChoice, PeakPickerConfig, ScoreGroupingPolicy, SelectionConfig};
    pub use crate::data_model::{Candidate, FragmentTable, PrecursorTable};
    pub use crate::diagnostics::{NullObserver, ScoreGroupObserver};
    pub use crate::error::{EngineError, SchemaError};
    pub use crate::executor::ParallelExecutor;
    pub use crate::raw_index::RawIndex;
    pub use crate::select_candidates;
}

/// Select candidate elution apexes for every precursor in `precursors`.
///
/// This is the library's single entry point: it validates the input tables,
/// partitions them into elution groups and score groups, and runs
/// [`executor::ParallelExecutor`] over them with no diagnostics collection.
/// For instrumented runs (feature `diagnostics`), use
/// [`executor::ParallelExecutor::run`] directly with a
/// [`diagnostics::JsonDumpObserver`].
pub fn select_candidates(
    precursors: &data_model::PrecursorTable,
    fragments: &data_model::FragmentTable,
    raw: &raw_index::RawIndex,
    config: &config::SelectionConfig,
) -> Result<Vec<data_model::Candidate>, EngineError> {
    executor::ParallelExecutor.run(precursors, fragments, raw, config, &NullObserver)
}
