//! Read-only view over the sparse 4-D acquisition tensor (§4.1 `RawIndex`).
//!
//! `RawIndex` is handed to the engine fully assembled by an out-of-scope
//! collaborator (the raw-file reader); this crate never reads a vendor file
//! itself. It owns the compressed-sparse push layout plus the lookup tables
//! needed to translate between physical units (rt, mobility, m/z) and the
//! tensor's integer coordinates (frame, scan, tof bin).

use ndarray::Array4;

/// A single quadrupole selection window: `(mz_low, mz_high)`. `(-1.0, -1.0)`
/// denotes MS1 (no quadrupole selection active).
pub type QuadWindow = (f64, f64);

/// Read-only view over a TIMS-TOF sparse acquisition.
#[derive(Debug, Clone)]
pub struct RawIndex {
    /// CSR-style offsets into `tof_indices`/`intensity_values`, one entry
    /// per push plus a trailing sentinel.
    push_indptr: Vec<u64>,
    /// TOF bin index per stored ion, ascending within a push.
    tof_indices: Vec<u32>,
    /// Intensity per stored ion, aligned with `tof_indices`.
    intensity_values: Vec<f32>,
    /// TOF bin -> m/z lookup table, ascending.
    mz_values: Vec<f64>,
    /// Frame -> rt (seconds) lookup table, ascending.
    rt_values: Vec<f32>,
    /// Scan -> mobility (1/K0) lookup table, descending (larger mobility,
    /// smaller scan index).
    mobility_values: Vec<f32>,
    /// Acquisition cycle descriptor, shape
    /// `(n_subcycles, n_frames_per_subcycle, n_scans, 2)`.
    cycle: Array4<f64>,
    /// Whether push index 0 belongs to an ignored calibration frame.
    zeroth_frame: bool,
}

impl RawIndex {
    /// Assemble a view over already-decoded sparse arrays and lookup
    /// tables. Callers (raw-file readers) are responsible for every
    /// invariant described in §3/§4.1; this constructor does not
    /// re-validate vendor data.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        push_indptr: Vec<u64>,
        tof_indices: Vec<u32>,
        intensity_values: Vec<f32>,
        mz_values: Vec<f64>,
        rt_values: Vec<f32>,
        mobility_values: Vec<f32>,
        cycle: Array4<f64>,
        zeroth_frame: bool,
    ) -> Self {
        Self {
            push_indptr,
            tof_indices,
            intensity_values,
            mz_values,
            rt_values,
            mobility_values,
            cycle,
            zeroth_frame,
        }
    }

    /// Number of scans per frame.
    pub fn scan_max_index(&self) -> usize {
        self.mobility_values.len()
    }

    /// Number of frames in the acquisition.
    pub fn n_frames(&self) -> usize {
        self.rt_values.len()
    }

    /// Whether push index 0 belongs to an ignored calibration frame.
    pub fn zeroth_frame(&self) -> bool {
        self.zeroth_frame
    }

    /// Number of subcycles in the acquisition cycle descriptor.
    pub fn n_subcycles(&self) -> usize {
        self.cycle.dim().0
    }

    /// Number of frames per subcycle.
    pub fn n_frames_per_subcycle(&self) -> usize {
        self.cycle.dim().1
    }

    /// Total frames spanned by one full repeat of the DIA cycle.
    pub fn full_cycle_frames(&self) -> usize {
        self.n_subcycles() * self.n_frames_per_subcycle()
    }

    /// Quadrupole window active for `(subcycle, frame_in_subcycle, scan)`.
    pub fn cycle_entry(&self, subcycle: usize, frame_in_subcycle: usize, scan: usize) -> QuadWindow {
        let row = &self.cycle[[subcycle, frame_in_subcycle, scan, 0]];
        let col = &self.cycle[[subcycle, frame_in_subcycle, scan, 1]];
        (*row, *col)
    }

    /// Read-only access to the push offsets (CSR layout).
    pub fn push_indptr(&self) -> &[u64] {
        &self.push_indptr
    }

    /// Read-only access to the tof-bin indices.
    pub fn tof_indices(&self) -> &[u32] {
        &self.tof_indices
    }

    /// Read-only access to the intensity values.
    pub fn intensity_values(&self) -> &[f32] {
        &self.intensity_values
    }

    /// Measured m/z for a tof bin index.
    pub fn tof_to_mz(&self, tof: u32) -> f64 {
        self.mz_values[(tof as usize).min(self.mz_values.len().saturating_sub(1))]
    }

    /// Binary-searches `mz_values` for the nearest tof bin to `mz`. Clips to
    /// axis bounds rather than erroring (§4.1 failure policy).
    pub fn mz_to_tof(&self, mz: f64) -> u32 {
        if self.mz_values.is_empty() {
            return 0;
        }
        let idx = self
            .mz_values
            .partition_point(|&v| v < mz)
            .min(self.mz_values.len() - 1);
        idx as u32
    }

    /// Tof-bin range `[start, stop)` covering `mz` within `ppm` tolerance.
    pub fn mz_range_to_tof_range(&self, mz: f64, ppm: f32) -> (u32, u32) {
        let delta = mz * ppm as f64 * 1e-6;
        let lo = self.mz_to_tof(mz - delta);
        let hi_exclusive = self.mz_to_tof(mz + delta) + 1;
        let max = self.mz_values.len() as u32;
        (lo.min(max), hi_exclusive.min(max))
    }

    /// Tof-bin ranges for a batch of m/z values, in input order (§4.1:
    /// "given a vector of m/z and a ppm tolerance returns per-m/z tof
    /// ranges").
    pub fn mz_ranges_to_tof_ranges(&self, mzs: &[f32], ppm: f32) -> Vec<(u32, u32)> {
        mzs.iter()
            .map(|&mz| self.mz_range_to_tof_range(mz as f64, ppm))
            .collect()
    }

    /// Frame range `[start, stop)` covering `[rt - tolerance, rt +
    /// tolerance]`, with `stop - start` forced even (expanded by one frame
    /// if odd). Clips to axis bounds.
    pub fn rt_to_frame_range(&self, rt: f32, tolerance: f32) -> (usize, usize) {
        let lo = rt - tolerance;
        let hi = rt + tolerance;
        let n = self.rt_values.len();
        if n == 0 {
            return (0, 0);
        }
        let start = self.rt_values.partition_point(|&v| v < lo);
        let stop = self.rt_values.partition_point(|&v| v <= hi);
        let start = start.min(n);
        let mut stop = stop.max(start).min(n);
        if (stop - start) % 2 == 1 {
            stop = (stop + 1).min(n);
        }
        (start, stop)
    }

    /// Scan range `[start, stop)` covering `[mobility - tolerance, mobility
    /// + tolerance]`. The mobility axis is descending (larger mobility maps
    /// to a smaller scan index), so the high end of the physical window
    /// maps to the low end of the scan range.
    pub fn mobility_to_scan_range(&self, mobility: f32, tolerance: f32) -> (usize, usize) {
        let hi = mobility + tolerance;
        let lo = mobility - tolerance;
        let n = self.mobility_values.len();
        if n == 0 {
            return (0, 0);
        }
        // mobility_values is descending: partition_point needs a predicate
        // that is true on a prefix, so negate the comparison.
        let start = self.mobility_values.partition_point(|&v| v > hi);
        let stop = self.mobility_values.partition_point(|&v| v >= lo);
        let start = start.min(n);
        let stop = stop.max(start).min(n);
        (start, stop)
    }

    /// Ion-index slice `[start, stop)` within `tof_indices`/
    /// `intensity_values` for push `push_index`.
    pub fn push_range(&self, push_index: usize) -> (usize, usize) {
        let start = self.push_indptr[push_index] as usize;
        let stop = self.push_indptr[push_index + 1] as usize;
        (start, stop)
    }

    /// Decompose an absolute frame index into `(repeat_index, subcycle,
    /// frame_in_subcycle)`, honoring `zeroth_frame`. Returns `None` if the
    /// frame is the ignored calibration frame (frame 0 when `zeroth_frame`
    /// is set).
    pub fn decompose_frame(&self, frame_index: usize) -> Option<(i64, usize, usize)> {
        let adjusted = frame_index as i64 - self.zeroth_frame as i64;
        if adjusted < 0 {
            return None;
        }
        let full_cycle_frames = self.full_cycle_frames() as i64;
        if full_cycle_frames == 0 {
            return None;
        }
        let repeat_index = adjusted.div_euclid(full_cycle_frames);
        let within_cycle = adjusted.rem_euclid(full_cycle_frames) as usize;
        let subcycle = within_cycle / self.n_frames_per_subcycle();
        let frame_in_subcycle = within_cycle % self.n_frames_per_subcycle();
        Some((repeat_index, subcycle, frame_in_subcycle))
    }
}
