//! Dense window materialization (§4.5 `WindowExtractor`).
//!
//! Grounded on `get_push_indices` and `assemble_push` in the original
//! implementation's `hybridselection.py`: for a frame/scan region and a set
//! of target ions, walk the compressed-sparse pushes that the acquisition's
//! cycle descriptor marks as matching the requested quadrupole window, and
//! accumulate per-ion intensity plus an intensity-weighted ppm mass error
//! into a dense `(2, n_ions, n_obs, n_scans, n_cycles)` tensor.

use ndarray::Array5;

use crate::ion_groups::WeightedIon;
use crate::raw_index::RawIndex;

/// A materialized dense window. Channel 0 is summed intensity, channel 1 is
/// the intensity-weighted ppm mass error of the ions landing in each cell,
/// defaulting to the mz tolerance passed to [`WindowExtractor::extract`] for
/// cells with no ion hit at all.
#[derive(Debug, Clone)]
pub struct DenseWindow {
    /// Shape `(2, n_ions, n_obs, n_scans, n_cycles)`.
    pub data: Array5<f32>,
    /// Absolute scan index of `data`'s scan axis position 0.
    pub scan_start: usize,
    /// For each cycle-axis position, the absolute frame index at which the
    /// requested quadrupole window was observed. Populated unambiguously by
    /// precursor (MS1) windows, where the window occurs exactly once per DIA
    /// cycle repeat; fragment windows populate it too but callers should
    /// prefer the co-extracted precursor window's mapping when the two
    /// disagree.
    pub frame_for_cycle: Vec<usize>,
}

impl DenseWindow {
    /// `(n_ions, n_obs, n_scans, n_cycles)`.
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        let dim = self.data.dim();
        (dim.1, dim.2, dim.3, dim.4)
    }

    /// True if any axis (other than the fixed channel axis) is zero-length
    /// (§7 `DegenerateWindow`).
    pub fn is_degenerate(&self) -> bool {
        let (n_ions, n_obs, n_scans, n_cycles) = self.shape();
        n_ions == 0 || n_obs == 0 || n_scans == 0 || n_cycles == 0
    }
}

/// Materializes dense windows from a [`RawIndex`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowExtractor;

impl WindowExtractor {
    /// Extract the dense window for `ions` over `frame_range`/`scan_range`,
    /// restricted to pushes whose cycle-descriptor quadrupole entry matches
    /// `quad_window`: `None` selects MS1 entries (`q_low < 0`), `Some((lo,
    /// hi))` selects entries overlapping `[lo, hi]`.
    pub fn extract(
        &self,
        raw: &RawIndex,
        ions: &[WeightedIon],
        frame_range: (usize, usize),
        scan_range: (usize, usize),
        quad_window: Option<(f64, f64)>,
        ppm: f32,
    ) -> DenseWindow {
        let (frame_start, frame_stop) = frame_range;
        let (scan_start, scan_stop) = scan_range;
        let n_scans = scan_stop.saturating_sub(scan_start);
        let n_ions = ions.len();

        if frame_start >= frame_stop || n_scans == 0 || n_ions == 0 {
            return DenseWindow {
                data: Array5::zeros((2, n_ions, 0, n_scans, 0)),
                scan_start,
                frame_for_cycle: Vec::new(),
            };
        }

        let tof_ranges = raw.mz_ranges_to_tof_ranges(
            &ions.iter().map(|ion| ion.mz).collect::<Vec<_>>(),
            ppm,
        );

        let decompositions: Vec<Option<(i64, usize, usize)>> = (frame_start..frame_stop)
            .map(|f| raw.decompose_frame(f))
            .collect();

        let cycle0 = decompositions
            .iter()
            .flatten()
            .map(|&(repeat, _, _)| repeat)
            .min();
        let Some(cycle0) = cycle0 else {
            return DenseWindow {
                data: Array5::zeros((2, n_ions, 0, n_scans, 0)),
                scan_start,
                frame_for_cycle: Vec::new(),
            };
        };
        let cycle_max = decompositions
            .iter()
            .flatten()
            .map(|&(repeat, _, _)| repeat)
            .max()
            .unwrap();
        let n_cycles = (cycle_max - cycle0 + 1) as usize;

        let passes = |window: (f64, f64)| -> bool {
            match quad_window {
                None => window.0 < 0.0,
                Some((lo, hi)) => window.0 <= hi && window.1 >= lo,
            }
        };

        let mut subcycles: Vec<usize> = Vec::new();
        for (frame, decomposition) in decompositions.iter().enumerate() {
            let Some((_, subcycle, frame_in_subcycle)) = decomposition else {
                continue;
            };
            let _ = frame;
            for scan in scan_start..scan_stop {
                if passes(raw.cycle_entry(*subcycle, *frame_in_subcycle, scan)) && !subcycles.contains(subcycle) {
                    subcycles.push(*subcycle);
                }
            }
        }
        subcycles.sort_unstable();
        let n_obs = subcycles.len();

        if n_obs == 0 {
            return DenseWindow {
                data: Array5::zeros((2, n_ions, 0, n_scans, n_cycles)),
                scan_start,
                frame_for_cycle: vec![0; n_cycles],
            };
        }

        let mut data = Array5::<f32>::zeros((2, n_ions, n_obs, n_scans, n_cycles));
        // Cells with no ion hit keep the mz tolerance as their "background"
        // ppm error rather than a spurious zero (§4.5); cells that do get a
        // hit overwrite this below, weighted against an accumulated
        // intensity that starts at 0, so the background value never leaks
        // into the weighted-mean computation.
        data.slice_mut(ndarray::s![1, .., .., .., ..]).fill(ppm);
        let mut frame_for_cycle = vec![usize::MAX; n_cycles];

        let scan_max_index = raw.scan_max_index();
        for (offset, decomposition) in decompositions.iter().enumerate() {
            let frame = frame_start + offset;
            let Some((repeat, subcycle, frame_in_subcycle)) = decomposition else {
                continue;
            };
            let cycle_coord = (*repeat - cycle0) as usize;
            let Ok(obs_idx) = subcycles.binary_search(subcycle) else {
                continue;
            };

            for scan in scan_start..scan_stop {
                let window = raw.cycle_entry(*subcycle, *frame_in_subcycle, scan);
                if !passes(window) {
                    continue;
                }
                if frame_for_cycle[cycle_coord] == usize::MAX {
                    frame_for_cycle[cycle_coord] = frame;
                }

                let push_index = frame * scan_max_index + scan;
                let (start, stop) = raw.push_range(push_index);
                let tof = &raw.tof_indices()[start..stop];
                let intensity = &raw.intensity_values()[start..stop];
                let scan_rel = scan - scan_start;

                for (ion_idx, &(tlo, thi)) in tof_ranges.iter().enumerate() {
                    let lo = tof.partition_point(|&t| t < tlo);
                    let hi = tof.partition_point(|&t| t < thi);
                    for k in lo..hi {
                        let observed_mz = raw.tof_to_mz(tof[k]);
                        let target_mz = ions[ion_idx].mz as f64;
                        let ppm_error = ((observed_mz - target_mz) / target_mz * 1e6) as f32;
                        let new_intensity = intensity[k];

                        let cell_intensity = &mut data[[0, ion_idx, obs_idx, scan_rel, cycle_coord]];
                        let acc_intensity = *cell_intensity;
                        let total_intensity = acc_intensity + new_intensity;
                        let acc_error = data[[1, ion_idx, obs_idx, scan_rel, cycle_coord]];
                        let weighted_error = if total_intensity > 0.0 {
                            (acc_error * acc_intensity + ppm_error * new_intensity) / total_intensity
                        } else {
                            0.0
                        };
                        data[[0, ion_idx, obs_idx, scan_rel, cycle_coord]] = total_intensity;
                        data[[1, ion_idx, obs_idx, scan_rel, cycle_coord]] = weighted_error;
                    }
                }
            }
        }

        for slot in frame_for_cycle.iter_mut() {
            if *slot == usize::MAX {
                *slot = frame_start;
            }
        }

        DenseWindow {
            data,
            scan_start,
            frame_for_cycle,
        }
    }
}
