//! End-to-end scenario tests (spec §8 "End-to-end scenarios"), adapted to a
//! tractable fixture scale: a handful of frames/scans with synthetic
//! Gaussian-shaped blobs rather than the spec's illustrative
//! production-scale coordinates.

use diapex::prelude::*;
use ndarray::{Array2, Array4};

const TOF_BIN: u32 = 500;
const TARGET_MZ: f32 = 700.0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn gaussian(dx: f32, dy: f32, sigma: f32) -> f32 {
    (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
}

/// Build a single-subcycle MS1-only `RawIndex` with Gaussian blobs centered
/// at each `(frame, scan)` pair in `blobs`, each scaled by its intensity.
fn build_raw_index(n_frames: usize, n_scans: usize, blobs: &[(usize, usize, f32)]) -> RawIndex {
    let rt_values: Vec<f32> = (0..n_frames).map(|f| f as f32).collect();
    let mobility_values: Vec<f32> = (0..n_scans).map(|s| 1.5 - s as f32 * 0.01).collect();
    let mz_values: Vec<f64> = (0..1000)
        .map(|t| TARGET_MZ as f64 + (t as i64 - TOF_BIN as i64) as f64 * 0.001)
        .collect();
    let cycle = Array4::from_elem((1, 1, n_scans, 2), -1.0);

    let mut grid = vec![0.0f32; n_frames * n_scans];
    for &(cf, cs, height) in blobs {
        for f in 0..n_frames {
            for s in 0..n_scans {
                let v = height * gaussian((f as f32 - cf as f32), (s as f32 - cs as f32), 2.0);
                grid[f * n_scans + s] += v;
            }
        }
    }

    let mut push_indptr = vec![0u64; n_frames * n_scans + 1];
    let mut tof_indices = Vec::new();
    let mut intensity_values = Vec::new();
    for push in 0..n_frames * n_scans {
        push_indptr[push] = tof_indices.len() as u64;
        if grid[push] > 0.01 {
            tof_indices.push(TOF_BIN);
            intensity_values.push(grid[push]);
        }
    }
    push_indptr[n_frames * n_scans] = tof_indices.len() as u64;

    RawIndex::new(
        push_indptr,
        tof_indices,
        intensity_values,
        mz_values,
        rt_values,
        mobility_values,
        cycle,
        false,
    )
}

fn single_precursor(rt: f32, mobility: f32) -> PrecursorTable {
    PrecursorTable {
        elution_group_idx: vec![0],
        score_group_idx: vec![0],
        precursor_idx: vec![0],
        channel: vec![0],
        decoy: vec![0],
        flat_frag_start_idx: vec![0],
        flat_frag_stop_idx: vec![0],
        charge: vec![2],
        rt_library: vec![rt],
        mobility_library: vec![mobility],
        mz_library: vec![TARGET_MZ],
        rt_calibrated: None,
        mobility_calibrated: None,
        mz_calibrated: None,
        isotope_intensity: Array2::from_shape_vec((1, 1), vec![1.0]).unwrap(),
    }
}

fn no_fragments() -> FragmentTable {
    FragmentTable {
        mz_library: vec![],
        mz_calibrated: None,
        intensity: vec![],
        cardinality: vec![],
        kind: vec![],
        loss_type: vec![],
        charge: vec![],
        number: vec![],
        position: vec![],
    }
}

fn base_config() -> SelectionConfig {
    SelectionConfig {
        rt_tolerance: 15.0,
        mobility_tolerance: 0.1,
        mz_tolerance: 200.0,
        candidate_count: 3,
        kernel_size: 5,
        kernel_sigma_rt: 1.5,
        kernel_sigma_mobility: 1.5,
        ..SelectionConfig::default()
    }
}

#[test]
fn s1_single_ms1_peak_yields_one_confident_candidate() {
    init_logging();
    let raw = build_raw_index(30, 20, &[(15, 10, 100.0)]);
    let precursors = single_precursor(15.0, mobility_at(&raw, 10));
    let fragments = no_fragments();
    let config = base_config();

    let candidates = select_candidates(&precursors, &fragments, &raw, &config).unwrap();

    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert_eq!(candidate.rank, 0);
    assert!((candidate.scan_center as i64 - 10).abs() <= 1);
    assert!((candidate.frame_center as i64 - 15).abs() <= 1);
    assert!(candidate.fraction_nonzero > 0.0);
    assert!(candidate.mass_error.abs() < 200.0);
}

#[test]
fn s2_two_resolved_peaks_yield_two_ranked_candidates() {
    let raw = build_raw_index(40, 30, &[(8, 8, 100.0), (30, 22, 60.0)]);
    let precursors = single_precursor(20.0, mobility_at(&raw, 15));
    let fragments = no_fragments();
    let config = SelectionConfig {
        rt_tolerance: 25.0,
        mobility_tolerance: 0.2,
        candidate_count: 3,
        ..base_config()
    };

    let candidates = select_candidates(&precursors, &fragments, &raw, &config).unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].rank, 0);
    assert_eq!(candidates[1].rank, 1);
    assert!(candidates[0].intensity >= candidates[1].intensity);
}

#[test]
fn s3_two_merged_peaks_yield_one_candidate_spanning_both() {
    let raw = build_raw_index(30, 20, &[(14, 10, 100.0), (16, 10, 90.0)]);
    let precursors = single_precursor(15.0, mobility_at(&raw, 10));
    let fragments = no_fragments();
    let config = base_config();

    let candidates = select_candidates(&precursors, &fragments, &raw, &config).unwrap();

    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert!(candidate.frame_start <= 14 && candidate.frame_stop >= 16);
}

#[test]
fn s4_window_outside_raw_range_yields_no_candidates_and_no_error() {
    let raw = build_raw_index(20, 15, &[(10, 7, 100.0)]);
    let precursors = single_precursor(10_000.0, mobility_at(&raw, 7));
    let fragments = no_fragments();
    let config = base_config();

    let candidates = select_candidates(&precursors, &fragments, &raw, &config).unwrap();
    assert!(candidates.is_empty());
}

#[test]
fn s5_frame_range_smaller_than_kernel_yields_no_candidates_and_no_error() {
    let raw = build_raw_index(20, 15, &[(10, 7, 100.0)]);
    let precursors = single_precursor(10.0, mobility_at(&raw, 7));
    let fragments = no_fragments();
    let config = SelectionConfig {
        rt_tolerance: 0.5,
        kernel_size: 25,
        ..base_config()
    };

    let candidates = select_candidates(&precursors, &fragments, &raw, &config).unwrap();
    assert!(candidates.is_empty());
}

/// Frame/scan grid spacing for the two-frame-type (MS1 + fragment) fixture
/// used by `s6`.
const FRAG_PRECURSOR_MZ: f32 = 700.0;
const FRAG_ION_MZ: f32 = 300.0;
const FRAG_SHARED_ION_MZ: f32 = 320.0;
const FRAG_QUAD_LO: f64 = 690.0;
const FRAG_QUAD_HI: f64 = 710.0;

/// Build a two-frame-type `RawIndex`: every DIA cycle repeat contributes one
/// MS1 frame (`frame_in_subcycle == 0`, no quadrupole selection) carrying the
/// precursor ion, followed by one fragment frame (`frame_in_subcycle == 1`,
/// quad window `[690, 710]`, bracketing `FRAG_PRECURSOR_MZ`) carrying two
/// fragment ions: a low-cardinality one that is always kept, and a
/// high-cardinality ("shared") one that `exclude_shared_fragments` drops.
/// Both fragment ions' blobs are centered at the same (repeat, scan) as the
/// precursor's so that excluding the shared one changes score intensity
/// without moving the apex.
fn build_raw_index_with_fragments(
    n_repeats: usize,
    n_scans: usize,
    apex_repeat: usize,
    apex_scan: usize,
) -> RawIndex {
    let n_frames = n_repeats * 2;
    let rt_values: Vec<f32> = (0..n_frames).map(|f| f as f32).collect();
    let mobility_values: Vec<f32> = (0..n_scans).map(|s| 1.5 - s as f32 * 0.01).collect();

    // One ascending mz lookup table, spaced finely enough around each of the
    // three distinct target m/z values that a tof bin exists exactly at each.
    let mz_base = 299.0;
    let mz_step = 0.01;
    let mz_len = 41000usize;
    let mz_values: Vec<f64> = (0..mz_len).map(|t| mz_base + t as f64 * mz_step).collect();
    let tof_for = |mz: f32| -> u32 { ((mz as f64 - mz_base) / mz_step).round() as u32 };
    let precursor_tof = tof_for(FRAG_PRECURSOR_MZ);
    let frag_tof = tof_for(FRAG_ION_MZ);
    let frag_shared_tof = tof_for(FRAG_SHARED_ION_MZ);

    let mut cycle = Array4::from_elem((1, 2, n_scans, 2), -1.0);
    for scan in 0..n_scans {
        cycle[[0, 1, scan, 0]] = FRAG_QUAD_LO;
        cycle[[0, 1, scan, 1]] = FRAG_QUAD_HI;
    }

    let mut push_indptr = vec![0u64; n_frames * n_scans + 1];
    let mut tof_indices = Vec::new();
    let mut intensity_values = Vec::new();
    for frame in 0..n_frames {
        let is_fragment_frame = frame % 2 == 1;
        let repeat = frame / 2;
        for scan in 0..n_scans {
            let push = frame * n_scans + scan;
            push_indptr[push] = tof_indices.len() as u64;
            let weight = gaussian(repeat as f32 - apex_repeat as f32, scan as f32 - apex_scan as f32, 2.0);
            if !is_fragment_frame {
                let v = 100.0 * weight;
                if v > 0.01 {
                    tof_indices.push(precursor_tof);
                    intensity_values.push(v);
                }
            } else {
                let frag_v = 20.0 * weight;
                let shared_v = 80.0 * weight;
                if frag_v > 0.01 {
                    tof_indices.push(frag_tof);
                    intensity_values.push(frag_v);
                }
                if shared_v > 0.01 {
                    tof_indices.push(frag_shared_tof);
                    intensity_values.push(shared_v);
                }
            }
        }
    }
    push_indptr[n_frames * n_scans] = tof_indices.len() as u64;

    RawIndex::new(
        push_indptr,
        tof_indices,
        intensity_values,
        mz_values,
        rt_values,
        mobility_values,
        cycle,
        false,
    )
}

fn precursor_with_fragments(rt: f32, mobility: f32) -> PrecursorTable {
    PrecursorTable {
        elution_group_idx: vec![0],
        score_group_idx: vec![0],
        precursor_idx: vec![0],
        channel: vec![0],
        decoy: vec![0],
        flat_frag_start_idx: vec![0],
        flat_frag_stop_idx: vec![2],
        charge: vec![2],
        rt_library: vec![rt],
        mobility_library: vec![mobility],
        mz_library: vec![FRAG_PRECURSOR_MZ],
        rt_calibrated: None,
        mobility_calibrated: None,
        mz_calibrated: None,
        isotope_intensity: Array2::from_shape_vec((1, 1), vec![1.0]).unwrap(),
    }
}

fn two_fragments() -> FragmentTable {
    FragmentTable {
        mz_library: vec![FRAG_ION_MZ, FRAG_SHARED_ION_MZ],
        mz_calibrated: None,
        intensity: vec![1.0, 1.0],
        cardinality: vec![2, 11],
        kind: vec![0, 0],
        loss_type: vec![0, 0],
        charge: vec![1, 1],
        number: vec![1, 2],
        position: vec![1, 2],
    }
}

#[test]
fn s6_fragment_above_cardinality_ceiling_is_excluded_but_apex_unchanged() {
    let n_repeats = 16;
    let n_scans = 20;
    let apex_repeat = 8;
    let apex_scan = 10;
    let raw = build_raw_index_with_fragments(n_repeats, n_scans, apex_repeat, apex_scan);
    let precursors = precursor_with_fragments((apex_repeat * 2) as f32, mobility_at(&raw, apex_scan));
    let fragments = two_fragments();

    let config_without_filter = SelectionConfig {
        exclude_shared_fragments: false,
        max_fragment_cardinality: 10,
        ..base_config()
    };
    let config_with_filter = SelectionConfig {
        exclude_shared_fragments: true,
        max_fragment_cardinality: 10,
        ..base_config()
    };

    let without = select_candidates(&precursors, &fragments, &raw, &config_without_filter).unwrap();
    let with = select_candidates(&precursors, &fragments, &raw, &config_with_filter).unwrap();

    assert_eq!(without.len(), with.len());
    assert!(!without.is_empty());
    assert_eq!(without[0].scan_center, with[0].scan_center);
    assert_eq!(without[0].frame_center, with[0].frame_center);
    // excluding the cardinality-11 fragment measurably changes the score
    assert_ne!(without[0].intensity, with[0].intensity);
}

/// Mobility value for `scan` under the fixture's `1.5 - scan * 0.01` axis.
fn mobility_at(_raw: &RawIndex, scan: usize) -> f32 {
    1.5 - scan as f32 * 0.01
}
