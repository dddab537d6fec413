//! Optional per-score-group diagnostics (SPEC_FULL §E).
//!
//! Grounded on the observer-style hooks used for debug tooling across the
//! corpus (e.g. the teacher's conversion progress callbacks): a trait the
//! engine calls into at fixed points, with a no-op default implementation so
//! the instrumentation costs nothing when unused.

use crate::peak_picker::PickedPeak;
use crate::window::DenseWindow;

/// Receives callbacks at fixed points in [`crate::score_group::ScoreGroupEngine::process`].
/// The default [`NullObserver`] does nothing; enable the `diagnostics`
/// feature and use [`JsonDumpObserver`] to capture a trace.
pub trait ScoreGroupObserver: Sync {
    /// Called after both dense windows have been materialized for a score
    /// group, before smoothing or peak picking.
    fn on_windows_extracted(
        &self,
        _elution_group_idx: u32,
        _precursor_window: &DenseWindow,
        _fragment_window: Option<&DenseWindow>,
    ) {
    }

    /// Called after peak picking, with the apexes selected for this score
    /// group (before rank-expansion across precursor rows).
    fn on_peaks_picked(&self, _elution_group_idx: u32, _peaks: &[PickedPeak]) {}
}

/// Observer that does nothing. Used whenever the caller has not asked for
/// diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ScoreGroupObserver for NullObserver {}

/// Observer that records a JSON-serializable summary of each score group's
/// windows and picked peaks. Requires the `diagnostics` feature.
#[cfg(feature = "diagnostics")]
pub mod json_dump {
    use std::sync::Mutex;

    use serde::Serialize;

    use super::ScoreGroupObserver;
    use crate::peak_picker::PickedPeak;
    use crate::window::DenseWindow;

    /// One score group's recorded diagnostics entry.
    #[derive(Debug, Serialize)]
    pub struct ScoreGroupTrace {
        /// Elution group the score group belongs to.
        pub elution_group_idx: u32,
        /// `(n_ions, n_obs, n_scans, n_cycles)` of the precursor window.
        pub precursor_window_shape: (usize, usize, usize, usize),
        /// `(n_ions, n_obs, n_scans, n_cycles)` of the fragment window, if
        /// one was extracted.
        pub fragment_window_shape: Option<(usize, usize, usize, usize)>,
        /// Picked apex positions and values.
        pub peaks: Vec<(usize, usize, f32)>,
    }

    /// Accumulates a [`ScoreGroupTrace`] per score group processed,
    /// serializable to JSON via [`JsonDumpObserver::to_json`].
    #[derive(Debug, Default)]
    pub struct JsonDumpObserver {
        traces: Mutex<Vec<ScoreGroupTrace>>,
    }

    impl JsonDumpObserver {
        /// Create an empty observer.
        pub fn new() -> Self {
            Self::default()
        }

        /// Serialize all recorded traces to a JSON string.
        pub fn to_json(&self) -> serde_json::Result<String> {
            let traces = self.traces.lock().expect("trace lock poisoned");
            serde_json::to_string_pretty(&*traces)
        }
    }

    impl ScoreGroupObserver for JsonDumpObserver {
        fn on_windows_extracted(
            &self,
            elution_group_idx: u32,
            precursor_window: &DenseWindow,
            fragment_window: Option<&DenseWindow>,
        ) {
            let mut traces = self.traces.lock().expect("trace lock poisoned");
            traces.push(ScoreGroupTrace {
                elution_group_idx,
                precursor_window_shape: precursor_window.shape(),
                fragment_window_shape: fragment_window.map(DenseWindow::shape),
                peaks: Vec::new(),
            });
        }

        fn on_peaks_picked(&self, elution_group_idx: u32, peaks: &[PickedPeak]) {
            let mut traces = self.traces.lock().expect("trace lock poisoned");
            if let Some(trace) = traces
                .iter_mut()
                .rev()
                .find(|t| t.elution_group_idx == elution_group_idx)
            {
                trace.peaks = peaks
                    .iter()
                    .map(|p| (p.scan_center, p.cycle_center, p.apex_value))
                    .collect();
            }
        }
    }
}

#[cfg(feature = "diagnostics")]
pub use json_dump::JsonDumpObserver;
