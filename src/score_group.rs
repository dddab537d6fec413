//! Per-score-group orchestration (§4.8 `ScoreGroupEngine`).
//!
//! Grounded on `HybridElutionGroup.process` in the original implementation's
//! `hybridselection.py`: assemble isotope envelopes, determine the frame and
//! scan region to extract, build the precursor and fragment ion groups,
//! smooth each ion's slice of their dense windows, reduce the (now smoothed)
//! ion axis into a combined score map weighted by each ion's abundance, and
//! pick apexes from it. Mass error and fraction-nonzero are recovered
//! separately from the raw, unsmoothed precursor channel (§4.7 step 7).

use ndarray::{Array2, Array3};
use log::debug;

use crate::config::SelectionConfig;
use crate::data_model::{Candidate, FragmentTable, PrecursorTable};
use crate::diagnostics::ScoreGroupObserver;
use crate::groups::IsotopeEnvelope;
use crate::ion_groups::{IonGroupMapper, PRECURSOR_ABUNDANCE_SCALE};
use crate::kernel::KernelBuilder;
use crate::peak_picker::PeakPicker;
use crate::raw_index::RawIndex;
use crate::smoothing::FourierSmoother;
use crate::window::{DenseWindow, WindowExtractor};

/// Runs the full candidate-selection pipeline for one score group.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoreGroupEngine;

impl ScoreGroupEngine {
    /// Process one score group, emitting up to
    /// `config.candidate_count * precursor_rows.len()` candidates (§4.8).
    pub fn process(
        &self,
        precursors: &PrecursorTable,
        fragments: &FragmentTable,
        raw: &RawIndex,
        config: &SelectionConfig,
        precursor_rows: &[usize],
        observer: &dyn ScoreGroupObserver,
    ) -> Vec<Candidate> {
        if precursor_rows.is_empty() {
            return Vec::new();
        }

        let column_choice = config.column_choice;

        let mono_mz: Vec<f32> = precursor_rows.iter().map(|&row| precursors.mz(row, column_choice)).collect();
        let charges: Vec<u8> = precursor_rows.iter().map(|&row| precursors.charge[row]).collect();
        let n_isotopes = precursors.isotope_intensity.ncols();
        let mut isotope_matrix = Array2::<f32>::zeros((precursor_rows.len(), n_isotopes));
        for (local, &row) in precursor_rows.iter().enumerate() {
            isotope_matrix.row_mut(local).assign(&precursors.isotope_intensity.row(row));
        }
        let envelopes: Vec<IsotopeEnvelope> =
            IsotopeEnvelope::assemble_group(&mono_mz, &charges, isotope_matrix.view());

        // Per-precursor abundance (§G): channel 0 is weighted ahead of other
        // channels, carried from the original's `precursor_abundance[channel
        // == 0] = 10`; every other channel gets the neutral weight of 1.0.
        let precursor_abundance: Vec<f32> = precursor_rows
            .iter()
            .map(|&row| {
                if precursors.channel[row] == 0 {
                    PRECURSOR_ABUNDANCE_SCALE
                } else {
                    1.0
                }
            })
            .collect();

        let rt_center = mean(precursor_rows.iter().map(|&row| precursors.rt(row, column_choice)));
        let mobility_center = mean(
            precursor_rows
                .iter()
                .map(|&row| precursors.mobility(row, column_choice)),
        );

        let frame_range = raw.rt_to_frame_range(rt_center, config.rt_tolerance);
        let scan_range = raw.mobility_to_scan_range(mobility_center, config.mobility_tolerance);

        let mapper = IonGroupMapper;

        let mut iso_owner = Vec::new();
        let mut iso_mz = Vec::new();
        let mut iso_relative = Vec::new();
        for (local, envelope) in envelopes.iter().enumerate() {
            for (&mz, &relative) in envelope.mz.iter().zip(envelope.relative_intensity.iter()) {
                iso_owner.push(local);
                iso_mz.push(mz);
                iso_relative.push(relative.max(0.0));
            }
        }
        let isotope_ions = mapper.isotope_ions(
            &iso_owner,
            &iso_mz,
            &iso_relative,
            &precursor_abundance,
            config.top_k_precursors,
        );

        let (frag_owner, frag_mz, frag_intensity, frag_cardinality) =
            gather_fragments(precursors, fragments, precursor_rows, column_choice);
        let fragment_ions = mapper.fragment_ions(
            &frag_owner,
            &frag_mz,
            &frag_intensity,
            &frag_cardinality,
            &precursor_abundance,
            config.exclude_shared_fragments,
            config.max_fragment_cardinality,
            config.top_k_fragments,
        );

        let quad_window = envelopes
            .iter()
            .map(|env| env.mz[0])
            .fold(None, |acc: Option<(f64, f64)>, mz| {
                let mz = mz as f64;
                Some(acc.map_or((mz, mz), |(lo, hi)| (lo.min(mz), hi.max(mz))))
            });

        let extractor = WindowExtractor;
        let precursor_window = extractor.extract(
            raw,
            &isotope_ions,
            frame_range,
            scan_range,
            None,
            config.mz_tolerance,
        );
        let fragment_window = if fragment_ions.is_empty() {
            None
        } else {
            quad_window.map(|window| {
                extractor.extract(
                    raw,
                    &fragment_ions,
                    frame_range,
                    scan_range,
                    Some(window),
                    config.mz_tolerance,
                )
            })
        };

        observer.on_windows_extracted(
            precursors.elution_group_idx[precursor_rows[0]],
            &precursor_window,
            fragment_window.as_ref(),
        );

        if precursor_window.is_degenerate() {
            debug!(
                "elution group {}: degenerate precursor window, skipping",
                precursors.elution_group_idx[precursor_rows[0]]
            );
            return Vec::new();
        }

        let kernel_builder = KernelBuilder::new(
            config.kernel_size,
            config.kernel_sigma_rt,
            config.kernel_sigma_mobility,
        );
        let kernel = kernel_builder.build();

        let (_, _, precursor_scans, precursor_cycles) = precursor_window.shape();
        // A window smaller than the kernel along either axis has no
        // meaningful apex to smooth toward (§7 `DegenerateWindow`): rather
        // than pad it up to kernel size and report a spurious candidate,
        // skip the group.
        if precursor_scans < kernel_builder.size() || precursor_cycles < kernel_builder.size() {
            debug!(
                "elution group {}: window ({}, {}) smaller than kernel size {}, skipping",
                precursors.elution_group_idx[precursor_rows[0]],
                precursor_scans,
                precursor_cycles,
                kernel_builder.size()
            );
            return Vec::new();
        }

        // Raw (unsmoothed, unweighted) precursor channel reduction, used
        // only to recover mass_error/fraction_nonzero from real sensor
        // coverage (§4.7 step 7) -- smoothing would spread a sparse window
        // into near-total coverage and make fraction_nonzero meaningless.
        let (precursor_intensity, precursor_error) = reduce_window_raw(&precursor_window);

        let isotope_weights: Vec<f32> = isotope_ions.iter().map(|ion| ion.weight).collect();
        let precursor_smoothed = FourierSmoother.fourier_a1(precursor_window.data.view(), kernel.view());
        let precursor_score = weighted_ion_sum(&precursor_smoothed, &isotope_weights);
        let precursor_norm = normalize(&precursor_score);

        let smoothed = match fragment_window {
            Some(ref fw) if !fw.is_degenerate() => {
                let fragment_weights: Vec<f32> = fragment_ions.iter().map(|ion| ion.weight).collect();
                let fragment_smoothed = FourierSmoother.fourier_a1(fw.data.view(), kernel.view());
                let fragment_score = weighted_ion_sum(&fragment_smoothed, &fragment_weights);
                let fragment_norm = normalize(&fragment_score);
                if fragment_norm.dim() == precursor_norm.dim() {
                    &precursor_norm * &fragment_norm
                } else {
                    precursor_norm.clone()
                }
            }
            _ => precursor_norm.clone(),
        };

        let picker = PeakPicker::new(config.peak_picker);
        let peaks = picker.pick(smoothed.view(), config.candidate_count);

        observer.on_peaks_picked(precursors.elution_group_idx[precursor_rows[0]], &peaks);

        let mut candidates = Vec::with_capacity(peaks.len() * precursor_rows.len());
        for (rank, peak) in peaks.iter().enumerate() {
            let n_cycles = precursor_window.frame_for_cycle.len();
            let cycle_start = peak.cycle_start.min(n_cycles.saturating_sub(1));
            let cycle_center = peak.cycle_center.min(n_cycles.saturating_sub(1));
            let cycle_stop = (peak.cycle_stop.saturating_sub(1)).min(n_cycles.saturating_sub(1));

            let frame_start = precursor_window.frame_for_cycle[cycle_start];
            let frame_center = precursor_window.frame_for_cycle[cycle_center];
            let frame_stop = precursor_window.frame_for_cycle[cycle_stop] + 1;

            let scan_start = (precursor_window.scan_start + peak.scan_start) as u32;
            let scan_center = (precursor_window.scan_start + peak.scan_center) as u32;
            let scan_stop = (precursor_window.scan_start + peak.scan_stop) as u32;

            let mass_error = *precursor_error
                .get((peak.scan_center, peak.cycle_center))
                .unwrap_or(&0.0);

            let mut nonzero = 0usize;
            let mut total = 0usize;
            for scan in peak.scan_start..peak.scan_stop {
                for cycle in peak.cycle_start..peak.cycle_stop {
                    total += 1;
                    if precursor_intensity[[scan, cycle]] > 0.0 {
                        nonzero += 1;
                    }
                }
            }
            let fraction_nonzero = if total > 0 {
                nonzero as f32 / total as f32
            } else {
                0.0
            };

            for &row in precursor_rows {
                candidates.push(Candidate {
                    elution_group_idx: precursors.elution_group_idx[row],
                    precursor_idx: precursors.precursor_idx[row],
                    rank: rank as u32,
                    decoy: precursors.decoy[row],
                    flat_frag_start_idx: precursors.flat_frag_start_idx[row],
                    flat_frag_stop_idx: precursors.flat_frag_stop_idx[row],
                    scan_start,
                    scan_center,
                    scan_stop,
                    frame_start: frame_start as u32,
                    frame_center: frame_center as u32,
                    frame_stop: frame_stop as u32,
                    mass_error,
                    fraction_nonzero,
                    intensity: peak.apex_value,
                    rt_library: precursors.rt_library[row],
                    mobility_library: precursors.mobility_library[row],
                });
            }
        }

        candidates
    }
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0u32;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Gather one score group's fragments across all its precursor rows,
/// returning the local (within `precursor_rows`) owner index of each
/// fragment alongside its m/z, intensity, and cardinality.
fn gather_fragments(
    precursors: &PrecursorTable,
    fragments: &FragmentTable,
    precursor_rows: &[usize],
    column_choice: crate::config::ColumnChoice,
) -> (Vec<usize>, Vec<f32>, Vec<f32>, Vec<u8>) {
    let mut owner = Vec::new();
    let mut mz = Vec::new();
    let mut intensity = Vec::new();
    let mut cardinality = Vec::new();
    for (local, &row) in precursor_rows.iter().enumerate() {
        let start = precursors.flat_frag_start_idx[row] as usize;
        let stop = precursors.flat_frag_stop_idx[row] as usize;
        for i in start..stop.min(fragments.len()) {
            owner.push(local);
            mz.push(fragments.mz(i, column_choice));
            intensity.push(fragments.intensity[i]);
            cardinality.push(fragments.cardinality[i]);
        }
    }
    (owner, mz, intensity, cardinality)
}

/// Collapse a dense window's ion and observation axes into a single
/// `(scan, cycle)` intensity map and a matching intensity-weighted ppm error
/// map, unweighted by ion abundance -- this is the raw sensor view used to
/// recover mass_error/fraction_nonzero (§4.7 step 7), not the score.
fn reduce_window_raw(window: &DenseWindow) -> (Array2<f32>, Array2<f32>) {
    let (n_ions, n_obs, n_scans, n_cycles) = window.shape();
    let mut intensity = Array2::<f32>::zeros((n_scans, n_cycles));
    let mut error = Array2::<f32>::zeros((n_scans, n_cycles));

    for scan in 0..n_scans {
        for cycle in 0..n_cycles {
            let mut acc_intensity = 0.0f32;
            let mut acc_error = 0.0f32;
            for ion in 0..n_ions {
                for obs in 0..n_obs {
                    let cell_intensity = window.data[[0, ion, obs, scan, cycle]];
                    if cell_intensity <= 0.0 {
                        continue;
                    }
                    let cell_error = window.data[[1, ion, obs, scan, cycle]];
                    let total = acc_intensity + cell_intensity;
                    acc_error = (acc_error * acc_intensity + cell_error * cell_intensity) / total;
                    acc_intensity = total;
                }
            }
            intensity[[scan, cycle]] = acc_intensity;
            error[[scan, cycle]] = acc_error;
        }
    }

    (intensity, error)
}

/// Sum a smoothed `(n_ions, n_scans, n_cycles)` tensor's ion axis, weighting
/// ion `i`'s slice by `weights[i]` (§4.7 step 6, "sum precursor slices
/// weighted by precursor intensity").
fn weighted_ion_sum(smoothed: &Array3<f32>, weights: &[f32]) -> Array2<f32> {
    let (n_ions, n_scans, n_cycles) = smoothed.dim();
    let mut out = Array2::<f32>::zeros((n_scans, n_cycles));
    for ion in 0..n_ions {
        let weight = weights.get(ion).copied().unwrap_or(1.0);
        if weight == 0.0 {
            continue;
        }
        for scan in 0..n_scans {
            for cycle in 0..n_cycles {
                out[[scan, cycle]] += weight * smoothed[[ion, scan, cycle]];
            }
        }
    }
    out
}

/// Normalize a map by its own mean, matching the original implementation's
/// `build_score` (`map / (map.mean() + 0.001)`).
fn normalize(map: &Array2<f32>) -> Array2<f32> {
    let mean = map.mean().unwrap_or(0.0);
    map.mapv(|v| v / (mean + 0.001))
}
