//! Local-maxima detection and boundary estimation (§4.7 `PeakPicker`).
//!
//! Grounded on `find_peaks` and `estimate_peak_boundaries_symmetric` in the
//! original implementation's `candidateselection.py`: apexes are 8-neighbor
//! local maxima of the smoothed score map, gated against a fraction of the
//! map's global maximum, and each apex's boundary is estimated independently
//! per axis by descending outward from the apex until the profile drops
//! below a fraction of the apex value, clamped to a configured min/max size.

use ndarray::ArrayView2;

use crate::config::PeakPickerConfig;

/// One picked apex with its estimated boundary, in (scan, cycle) index
/// coordinates local to the score map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickedPeak {
    /// Scan index of the apex.
    pub scan_center: usize,
    /// Cycle index of the apex.
    pub cycle_center: usize,
    /// Inclusive lower scan boundary.
    pub scan_start: usize,
    /// Exclusive upper scan boundary.
    pub scan_stop: usize,
    /// Inclusive lower cycle boundary.
    pub cycle_start: usize,
    /// Exclusive upper cycle boundary.
    pub cycle_stop: usize,
    /// Score-map value at the apex.
    pub apex_value: f32,
}

/// Finds local-maxima apexes in a smoothed score map and estimates their
/// boundaries.
#[derive(Debug, Clone, Copy)]
pub struct PeakPicker {
    config: PeakPickerConfig,
}

impl PeakPicker {
    /// Build a picker with the given boundary-estimation parameters.
    pub fn new(config: PeakPickerConfig) -> Self {
        Self { config }
    }

    /// Find up to `count` apexes in `map`, ranked by descending apex value,
    /// each above `center_fraction` of the map's global maximum.
    pub fn pick(&self, map: ArrayView2<f32>, count: usize) -> Vec<PickedPeak> {
        let (n_scans, n_cycles) = map.dim();
        if n_scans == 0 || n_cycles == 0 {
            return Vec::new();
        }

        let global_max = map.iter().cloned().fold(f32::MIN, f32::max);
        if global_max <= 0.0 {
            return Vec::new();
        }
        let gate = global_max * self.config.center_fraction;

        let mut maxima: Vec<(usize, usize, f32)> = Vec::new();
        for scan in 0..n_scans {
            for cycle in 0..n_cycles {
                let value = map[[scan, cycle]];
                if value < gate {
                    continue;
                }
                let mut is_max = true;
                for ds in -1i64..=1 {
                    for dc in -1i64..=1 {
                        if ds == 0 && dc == 0 {
                            continue;
                        }
                        let ns = scan as i64 + ds;
                        let nc = cycle as i64 + dc;
                        if ns < 0 || nc < 0 || ns >= n_scans as i64 || nc >= n_cycles as i64 {
                            continue;
                        }
                        if map[[ns as usize, nc as usize]] > value {
                            is_max = false;
                            break;
                        }
                    }
                    if !is_max {
                        break;
                    }
                }
                if is_max {
                    maxima.push((scan, cycle, value));
                }
            }
        }

        maxima.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        maxima.truncate(count);

        maxima
            .into_iter()
            .map(|(scan, cycle, value)| self.boundary_for(map, scan, cycle, value))
            .collect()
    }

    fn boundary_for(
        &self,
        map: ArrayView2<f32>,
        scan: usize,
        cycle: usize,
        apex_value: f32,
    ) -> PickedPeak {
        let scan_column: Vec<f32> = map.column(cycle).to_vec();
        let cycle_row: Vec<f32> = map.row(scan).to_vec();

        let scan_half = descent_half_width(
            &scan_column,
            scan,
            apex_value,
            self.config.f_mobility,
            self.config.min_size_mobility,
            self.config.max_size_mobility,
        );
        let cycle_half = descent_half_width(
            &cycle_row,
            cycle,
            apex_value,
            self.config.f_rt,
            self.config.min_size_rt,
            self.config.max_size_rt,
        );

        let n_scans = map.dim().0;
        let n_cycles = map.dim().1;
        PickedPeak {
            scan_center: scan,
            cycle_center: cycle,
            scan_start: scan.saturating_sub(scan_half),
            scan_stop: (scan + scan_half + 1).min(n_scans),
            cycle_start: cycle.saturating_sub(cycle_half),
            cycle_stop: (cycle + cycle_half + 1).min(n_cycles),
            apex_value,
        }
    }
}

/// Descend outward from `center` in both directions along `profile` until
/// the value drops below `f * apex_value`, taking the larger of the two
/// distances for a symmetric boundary, clamped to `[min_size, max_size]`.
fn descent_half_width(
    profile: &[f32],
    center: usize,
    apex_value: f32,
    f: f32,
    min_size: i64,
    max_size: i64,
) -> usize {
    let threshold = apex_value * f;
    let n = profile.len() as i64;

    let mut right = 0i64;
    while right < max_size && center as i64 + right + 1 < n && profile[(center as i64 + right + 1) as usize] >= threshold {
        right += 1;
    }
    let mut left = 0i64;
    while left < max_size && center as i64 - left - 1 >= 0 && profile[(center as i64 - left - 1) as usize] >= threshold {
        left += 1;
    }

    left.max(right).max(min_size).min(max_size).max(0) as usize
}
