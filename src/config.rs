//! Configuration for the candidate-selection engine.

/// Which rt/mobility/mz column variant the engine should read from the
/// precursor table: the library-predicted value, or a calibrated value
/// produced upstream by a calibration workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnChoice {
    /// Use `rt_library` / `mobility_library` / `mz_library`.
    #[default]
    Library,
    /// Use `rt_calibrated` / `mobility_calibrated` / `mz_calibrated`.
    Calibrated,
}

/// How precursors within one elution group are partitioned into score
/// groups (§3 "ScoreGroup").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreGroupingPolicy {
    /// One precursor per score group.
    #[default]
    Ungrouped,
    /// All targets in one group, all decoys in another.
    GroupedByDecoy,
    /// One group per channel.
    GroupedByChannel,
}

/// Top-level configuration for a selection run. `Default` reproduces every
/// default enumerated in the external interface contract.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Half-width of the retention-time window, in seconds.
    pub rt_tolerance: f32,
    /// Half-width of the mobility window, in 1/K0 units.
    pub mobility_tolerance: f32,
    /// Mass tolerance, in ppm, used for both precursor and fragment tof
    /// range lookups.
    pub mz_tolerance: f32,
    /// Number of candidates emitted per precursor.
    pub candidate_count: usize,
    /// Width and height of the Gaussian smoothing kernel.
    pub kernel_size: usize,
    /// Kernel standard deviation along the rt (cycle) axis.
    pub kernel_sigma_rt: f32,
    /// Kernel standard deviation along the mobility (scan) axis.
    pub kernel_sigma_mobility: f32,
    /// Worker count for the [`crate::executor::ParallelExecutor`].
    pub thread_count: usize,
    /// Reduces the executor to a single worker and a bounded iteration
    /// count; intended for interactive debugging, not throughput.
    pub debug: bool,
    /// If set, `debug` additionally caps the number of elution groups
    /// processed to this many (ignored unless `debug` is `true`).
    pub debug_max_groups: Option<usize>,
    /// How precursors in an elution group are partitioned into score groups.
    pub grouping_policy: ScoreGroupingPolicy,
    /// Drop fragments shared by more than `max_fragment_cardinality`
    /// precursors in the run before scoring.
    pub exclude_shared_fragments: bool,
    /// Cardinality ceiling used by [`crate::ion_groups::IonGroupMapper`]
    /// when `exclude_shared_fragments` is set. Exposed as a parameter per
    /// the open question in spec.md §9; defaults to 10 to match the
    /// original implementation's hard-coded value.
    pub max_fragment_cardinality: u8,
    /// Retain at most this many fragment ions per score group.
    pub top_k_fragments: usize,
    /// Retain at most this many isotope ions per score group.
    pub top_k_precursors: usize,
    /// Which rt/mobility/mz columns to read from the precursor table.
    pub column_choice: ColumnChoice,
    /// Peak-picking and boundary-estimation parameters.
    pub peak_picker: PeakPickerConfig,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            rt_tolerance: 30.0,
            mobility_tolerance: 0.03,
            mz_tolerance: 120.0,
            candidate_count: 3,
            kernel_size: 20,
            kernel_sigma_rt: 5.0,
            kernel_sigma_mobility: 12.0,
            thread_count: 20,
            debug: false,
            debug_max_groups: None,
            grouping_policy: ScoreGroupingPolicy::Ungrouped,
            exclude_shared_fragments: false,
            max_fragment_cardinality: 10,
            top_k_fragments: 12,
            top_k_precursors: 3,
            column_choice: ColumnChoice::Library,
            peak_picker: PeakPickerConfig::default(),
        }
    }
}

/// Configuration for [`crate::peak_picker::PeakPicker`].
#[derive(Debug, Clone, Copy)]
pub struct PeakPickerConfig {
    /// Boundary-descent fraction along the mobility (scan) axis.
    pub f_mobility: f32,
    /// Boundary-descent fraction along the rt (cycle) axis.
    pub f_rt: f32,
    /// Minimum fraction of the global max an apex must reach to be kept.
    pub center_fraction: f32,
    /// Minimum half-extent of the scan boundary.
    pub min_size_mobility: i64,
    /// Minimum half-extent of the cycle boundary.
    pub min_size_rt: i64,
    /// Maximum half-extent of the scan boundary.
    pub max_size_mobility: i64,
    /// Maximum half-extent of the cycle boundary.
    pub max_size_rt: i64,
}

impl Default for PeakPickerConfig {
    fn default() -> Self {
        Self {
            f_mobility: 0.95,
            f_rt: 0.99,
            center_fraction: 0.05,
            min_size_mobility: 6,
            min_size_rt: 3,
            max_size_mobility: 40,
            max_size_rt: 30,
        }
    }
}
