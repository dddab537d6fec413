//! Fragment and isotope ion selection (§4.4 `IonGroupMapper`).
//!
//! Grounded on the fragment-selection portion of `HybridElutionGroup.process`
//! in the original implementation's `hybridselection.py`: cardinality-based
//! down-weighting of shared fragments, abundance-weighted merging of ions
//! that land on (nearly) the same m/z, and retaining only the top-K ions by
//! weighted abundance.
//!
//! Both fragment and isotope ions are weighted by the *owning precursor's*
//! abundance (§4.4, §"SPEC_FULL" G): `weight = raw_weight *
//! precursor_abundance[owner] / cardinality`. Isotope ions go through the
//! same routine with `cardinality` fixed at 1 for every channel, so a
//! precursor's own abundance — not a flat additive bump shared by every
//! precursor in the group — is what distinguishes its isotope ions from its
//! neighbors'.

use crate::groups::IsotopeEnvelope;

/// One ion selected for window extraction: its target m/z and the weight
/// used to rank it against sibling ions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedIon {
    /// Target m/z for tof-range lookup.
    pub mz: f32,
    /// Ranking weight (abundance, optionally down-weighted by cardinality).
    pub weight: f32,
}

/// Selects and merges the ions (fragment or isotope) that a score group
/// extracts a dense window for.
#[derive(Debug, Default, Clone, Copy)]
pub struct IonGroupMapper;

/// Abundance assigned to a precursor's channel-0 monoisotopic peak before
/// ranking, placing it ahead of other channels' abundances (§G, carried
/// from the original's `precursor_abundance[channel == 0] = 10`).
pub const PRECURSOR_ABUNDANCE_SCALE: f32 = 10.0;

impl IonGroupMapper {
    /// Build the fragment ion group for one score group: weight each
    /// fragment by `intensity * precursor_abundance[owner_precursor_idx] /
    /// cardinality`, optionally dropping fragments shared across the run
    /// above `max_cardinality`, merge ions with equal m/z by summing their
    /// weights, then keep the `top_k` heaviest, sorted by ascending m/z.
    ///
    /// `owner_precursor_idx[i]` indexes into `precursor_abundance`, which
    /// carries one abundance value per precursor row in the score group.
    pub fn fragment_ions(
        &self,
        owner_precursor_idx: &[usize],
        mz: &[f32],
        intensity: &[f32],
        cardinality: &[u8],
        precursor_abundance: &[f32],
        exclude_shared_fragments: bool,
        max_cardinality: u8,
        top_k: usize,
    ) -> Vec<WeightedIon> {
        let mut ions = Vec::with_capacity(mz.len());
        for i in 0..mz.len() {
            let card = cardinality[i];
            if exclude_shared_fragments && card > max_cardinality {
                continue;
            }
            let abundance = precursor_abundance
                .get(owner_precursor_idx[i])
                .copied()
                .unwrap_or(1.0);
            let weight = intensity[i] * abundance / card.max(1) as f32;
            ions.push(WeightedIon { mz: mz[i], weight });
        }
        merge_and_select(&mut ions, top_k)
    }

    /// Build the isotope ion group for one score group: flatten every
    /// precursor row's trimmed [`IsotopeEnvelope`] and run the same routine
    /// as [`Self::fragment_ions`] with `cardinality` fixed at 1 for every
    /// isotope channel, so each channel's weight is its relative intensity
    /// scaled by its own precursor's abundance.
    ///
    /// `owner_precursor_idx[i]` is the local row index (within
    /// `precursor_abundance`) that isotope ion `i` belongs to.
    pub fn isotope_ions(
        &self,
        owner_precursor_idx: &[usize],
        mz: &[f32],
        relative_intensity: &[f32],
        precursor_abundance: &[f32],
        top_k: usize,
    ) -> Vec<WeightedIon> {
        let cardinality = vec![1u8; mz.len()];
        self.fragment_ions(
            owner_precursor_idx,
            mz,
            relative_intensity,
            &cardinality,
            precursor_abundance,
            false,
            u8::MAX,
            top_k,
        )
    }
}

/// Merge ions at (near-)equal m/z by summing weight, keep the `top_k`
/// heaviest, return sorted by ascending m/z.
fn merge_and_select(ions: &mut [WeightedIon], top_k: usize) -> Vec<WeightedIon> {
    ions.sort_by(|a, b| a.mz.partial_cmp(&b.mz).unwrap_or(std::cmp::Ordering::Equal));

    const MERGE_EPSILON: f32 = 1e-4;
    let mut merged: Vec<WeightedIon> = Vec::with_capacity(ions.len());
    for &ion in ions.iter() {
        if let Some(last) = merged.last_mut() {
            if (last.mz - ion.mz).abs() <= MERGE_EPSILON {
                last.weight += ion.weight;
                continue;
            }
        }
        merged.push(ion);
    }

    merged.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(top_k);
    merged.sort_by(|a, b| a.mz.partial_cmp(&b.mz).unwrap_or(std::cmp::Ordering::Equal));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_owner(n: usize) -> Vec<usize> {
        vec![0; n]
    }

    #[test]
    fn shared_fragments_are_excluded_above_cardinality_ceiling() {
        let mapper = IonGroupMapper;
        let owner = single_owner(3);
        let mz = vec![100.0, 200.0, 300.0];
        let intensity = vec![1.0, 1.0, 1.0];
        let cardinality = vec![1, 5, 20];
        let abundance = vec![1.0];
        let ions = mapper.fragment_ions(&owner, &mz, &intensity, &cardinality, &abundance, true, 10, 10);
        assert_eq!(ions.len(), 2);
        assert!(ions.iter().all(|i| i.mz != 300.0));
    }

    #[test]
    fn cardinality_filter_is_noop_when_disabled() {
        let mapper = IonGroupMapper;
        let owner = single_owner(3);
        let mz = vec![100.0, 200.0, 300.0];
        let intensity = vec![1.0, 1.0, 1.0];
        let cardinality = vec![1, 5, 20];
        let abundance = vec![1.0];
        let ions = mapper.fragment_ions(&owner, &mz, &intensity, &cardinality, &abundance, false, 10, 10);
        assert_eq!(ions.len(), 3);
    }

    #[test]
    fn equal_mz_ions_are_merged_by_summing_weight() {
        let mapper = IonGroupMapper;
        let owner = single_owner(3);
        let mz = vec![100.0, 100.0, 200.0];
        let intensity = vec![1.0, 2.0, 0.5];
        let cardinality = vec![1, 1, 1];
        let abundance = vec![1.0];
        let ions = mapper.fragment_ions(&owner, &mz, &intensity, &cardinality, &abundance, false, 10, 10);
        assert_eq!(ions.len(), 2);
        let merged = ions.iter().find(|i| i.mz == 100.0).unwrap();
        assert!((merged.weight - 3.0).abs() < 1e-6);
    }

    #[test]
    fn top_k_keeps_heaviest_ions_sorted_by_mz() {
        let mapper = IonGroupMapper;
        let owner = single_owner(4);
        let mz = vec![100.0, 200.0, 300.0, 400.0];
        let intensity = vec![0.1, 0.9, 0.5, 0.2];
        let cardinality = vec![1, 1, 1, 1];
        let abundance = vec![1.0];
        let ions = mapper.fragment_ions(&owner, &mz, &intensity, &cardinality, &abundance, false, 10, 2);
        assert_eq!(ions.len(), 2);
        assert_eq!(ions[0].mz, 200.0);
        assert_eq!(ions[1].mz, 300.0);
    }

    #[test]
    fn fragment_weight_is_divided_by_cardinality() {
        let mapper = IonGroupMapper;
        let owner = single_owner(1);
        let abundance = vec![1.0];
        let solo = mapper.fragment_ions(&owner, &[100.0], &[1.0], &[1], &abundance, false, 10, 10);
        let shared = mapper.fragment_ions(&owner, &[100.0], &[1.0], &[4], &abundance, false, 10, 10);
        assert!((solo[0].weight - 1.0).abs() < 1e-6);
        assert!((shared[0].weight - 0.25).abs() < 1e-6);
    }

    #[test]
    fn isotope_ions_scale_by_owning_precursor_abundance() {
        let mapper = IonGroupMapper;
        // two precursors, channel-0 abundance boosted, channel-1 left at 1.0
        let owner = vec![0, 0, 1, 1];
        let mz = vec![500.0, 501.0, 600.0, 601.0];
        let relative_intensity = vec![1.0, 0.3, 1.0, 0.3];
        let abundance = vec![PRECURSOR_ABUNDANCE_SCALE, 1.0];
        let ions = mapper.isotope_ions(&owner, &mz, &relative_intensity, &abundance, 10);
        let mono_a = ions.iter().find(|i| i.mz == 500.0).unwrap();
        let mono_b = ions.iter().find(|i| i.mz == 600.0).unwrap();
        assert!(mono_a.weight > mono_b.weight);
        assert!((mono_a.weight - PRECURSOR_ABUNDANCE_SCALE).abs() < 1e-6);
        assert!((mono_b.weight - 1.0).abs() < 1e-6);
    }
}
