//! Elution-group/score-group data model and assembly (§3 "ElutionGroup",
//! "ScoreGroup", "IsotopeEnvelope").
//!
//! Grounded on `HybridElutionGroup` in the original implementation's
//! `hybridselection.py`: `sort_by_mz`, `assemble_isotope_mz`, `trim_isotopes`
//! and `determine_score_groups` are reproduced here as free functions over
//! the columnar [`PrecursorTable`] rather than methods on a per-group
//! object, matching this crate's struct-of-arrays style.

use std::collections::HashMap;

use ndarray::ArrayView2;

use crate::config::ScoreGroupingPolicy;
use crate::data_model::PrecursorTable;

/// Isotopic distance between consecutive isotopologues, in Da.
pub const ISOTOPE_SPACING: f64 = 1.0033548350700006;

/// Minimum mean relative intensity (fraction of the monoisotopic peak) an
/// isotope channel must reach to be retained.
const ISOTOPE_TRIM_THRESHOLD: f32 = 0.1;

/// One row's isotope envelope: m/z and relative intensity for each retained
/// isotopologue, monoisotopic peak first.
#[derive(Debug, Clone)]
pub struct IsotopeEnvelope {
    /// m/z of each retained isotopologue.
    pub mz: Vec<f32>,
    /// Intensity of each isotopologue relative to the row's own isotope
    /// intensity vector (not renormalized after trimming).
    pub relative_intensity: Vec<f32>,
}

impl IsotopeEnvelope {
    /// Assemble one envelope per row of a score group, trimmed to a single
    /// channel count shared by every row in the group (`trim_isotopes` in
    /// the original operates on the whole `HybridElutionGroup` at once, not
    /// per precursor).
    ///
    /// `mono_mz`/`charge` are per-row; `intensities` is the group's stacked
    /// `(n_rows, n_isotopes)` isotope intensity matrix. The trim point is
    /// the last channel whose *column-wise mean* across all rows exceeds
    /// [`ISOTOPE_TRIM_THRESHOLD`] relative to the group's peak mean channel;
    /// that one `keep` count is applied uniformly to every row so all rows
    /// in a group carry isotope envelopes of equal length. At least one
    /// channel (the monoisotopic peak) is always kept.
    pub fn assemble_group(mono_mz: &[f32], charge: &[u8], intensities: ArrayView2<f32>) -> Vec<Self> {
        let n_rows = intensities.nrows();
        let n_isotopes = intensities.ncols();

        let keep = if n_isotopes == 0 {
            0
        } else {
            let column_means: Vec<f32> = (0..n_isotopes)
                .map(|k| intensities.column(k).mean().unwrap_or(0.0))
                .collect();
            let max_mean = column_means.iter().cloned().fold(0.0f32, f32::max);

            let mut last_kept = 0;
            for (k, &mean) in column_means.iter().enumerate() {
                let relative = if max_mean > 0.0 { mean / max_mean } else { 0.0 };
                if relative > ISOTOPE_TRIM_THRESHOLD {
                    last_kept = k;
                }
            }
            (last_kept + 1).max(1).min(n_isotopes)
        };

        (0..n_rows)
            .map(|row| {
                let charge = charge.get(row).copied().unwrap_or(1).max(1) as f64;
                let mono_mz = mono_mz.get(row).copied().unwrap_or(0.0);
                let mz = (0..keep)
                    .map(|k| (mono_mz as f64 + k as f64 * ISOTOPE_SPACING / charge) as f32)
                    .collect();
                let relative_intensity = intensities.row(row).iter().take(keep).copied().collect();
                IsotopeEnvelope { mz, relative_intensity }
            })
            .collect()
    }
}

/// A set of precursor-table rows sharing one `elution_group_idx`, ordered by
/// ascending library m/z (`sort_by_mz` in the original).
#[derive(Debug, Clone)]
pub struct ElutionGroup {
    /// Shared elution-group id.
    pub elution_group_idx: u32,
    /// Row indices into the source [`PrecursorTable`], sorted by m/z.
    pub precursor_rows: Vec<usize>,
}

/// Group precursor-table rows by `elution_group_idx`, preserving the order
/// in which each group id is first seen and sorting each group's rows by
/// ascending library m/z.
pub fn build_elution_groups(table: &PrecursorTable) -> Vec<ElutionGroup> {
    let mut order: Vec<u32> = Vec::new();
    let mut buckets: HashMap<u32, Vec<usize>> = HashMap::new();

    for row in 0..table.len() {
        let group_id = table.elution_group_idx[row];
        buckets.entry(group_id).or_insert_with(|| {
            order.push(group_id);
            Vec::new()
        });
        buckets.get_mut(&group_id).unwrap().push(row);
    }

    order
        .into_iter()
        .map(|group_id| {
            let mut rows = buckets.remove(&group_id).unwrap();
            rows.sort_by(|&a, &b| {
                table.mz_library[a]
                    .partial_cmp(&table.mz_library[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            ElutionGroup {
                elution_group_idx: group_id,
                precursor_rows: rows,
            }
        })
        .collect()
}

/// A partition of one elution group's rows that is scored as a single unit
/// (§3 "ScoreGroup"). `score_group_idx` values are consecutive starting at 0
/// within the elution group, independent of the table's original
/// `score_group_idx` column.
#[derive(Debug, Clone)]
pub struct ScoreGroup {
    /// Elution group this score group belongs to.
    pub elution_group_idx: u32,
    /// Score-group id, consecutive starting at 0 within the elution group.
    pub score_group_idx: u32,
    /// Row indices into the source [`PrecursorTable`].
    pub precursor_rows: Vec<usize>,
}

/// Partition one elution group's rows into score groups per `policy`
/// (`determine_score_groups` in the original implementation).
pub fn build_score_groups(
    table: &PrecursorTable,
    group: &ElutionGroup,
    policy: ScoreGroupingPolicy,
) -> Vec<ScoreGroup> {
    let key = |row: usize| -> u32 {
        match policy {
            ScoreGroupingPolicy::Ungrouped => row as u32,
            ScoreGroupingPolicy::GroupedByDecoy => table.decoy[row] as u32,
            ScoreGroupingPolicy::GroupedByChannel => table.channel[row],
        }
    };

    let mut order: Vec<u32> = Vec::new();
    let mut buckets: HashMap<u32, Vec<usize>> = HashMap::new();
    for &row in &group.precursor_rows {
        let k = key(row);
        buckets.entry(k).or_insert_with(|| {
            order.push(k);
            Vec::new()
        });
        buckets.get_mut(&k).unwrap().push(row);
    }

    order
        .into_iter()
        .enumerate()
        .map(|(idx, k)| ScoreGroup {
            elution_group_idx: group.elution_group_idx,
            score_group_idx: idx as u32,
            precursor_rows: buckets.remove(&k).unwrap(),
        })
        .collect()
}
