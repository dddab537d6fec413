//! Caller-supplied input tables and the engine's flat output table.
//!
//! Tables are struct-of-arrays, mirroring the columnar layout the rest of
//! the corpus uses for per-row scientific records (c.f. `PeakArrays` /
//! `SpectrumArrays` in the sibling mzPeak writer) rather than a `Vec` of
//! per-row structs.

use ndarray::Array2;

use crate::config::ColumnChoice;
use crate::error::SchemaError;

/// Validated precursor table (§6 "Precursor table").
///
/// All `Vec` fields must share the same length (the row count). Isotope
/// intensities are stored as a dense `(n_rows, n_isotopes)` matrix since the
/// source schema is columns `i_0..i_9`: at most 10, but commonly fewer.
#[derive(Debug, Clone)]
pub struct PrecursorTable {
    /// Shared elution-group id per row.
    pub elution_group_idx: Vec<u32>,
    /// Score-group id per row, consecutive starting at 0 within a run.
    pub score_group_idx: Vec<u32>,
    /// Unique precursor id per row.
    pub precursor_idx: Vec<u32>,
    /// Multiplex channel id per row.
    pub channel: Vec<u32>,
    /// 1 if the row is a decoy, 0 if target.
    pub decoy: Vec<u8>,
    /// Inclusive start of this precursor's fragment range in the flat
    /// fragment table.
    pub flat_frag_start_idx: Vec<u32>,
    /// Exclusive stop of this precursor's fragment range.
    pub flat_frag_stop_idx: Vec<u32>,
    /// Precursor charge state.
    pub charge: Vec<u8>,
    /// Library-predicted retention time, seconds.
    pub rt_library: Vec<f32>,
    /// Library-predicted mobility, 1/K0.
    pub mobility_library: Vec<f32>,
    /// Library-predicted m/z.
    pub mz_library: Vec<f32>,
    /// Calibrated retention time, if the caller supplied it.
    pub rt_calibrated: Option<Vec<f32>>,
    /// Calibrated mobility, if the caller supplied it.
    pub mobility_calibrated: Option<Vec<f32>>,
    /// Calibrated m/z, if the caller supplied it.
    pub mz_calibrated: Option<Vec<f32>>,
    /// Isotope intensity matrix, shape `(n_rows, n_isotopes)`, `n_isotopes`
    /// in `0..=10`.
    pub isotope_intensity: Array2<f32>,
}

impl PrecursorTable {
    /// Number of rows (precursors) in the table.
    pub fn len(&self) -> usize {
        self.elution_group_idx.len()
    }

    /// Whether the table has zero rows (§7 `EmptyInput`, handled by the
    /// caller returning an empty candidate table rather than an error).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate column lengths, fragment-range contiguity, and the presence
    /// of any calibrated column the caller has selected.
    pub fn validate(&self, column_choice: ColumnChoice) -> Result<(), SchemaError> {
        let n = self.len();
        let check = |name: &str, len: usize| -> Result<(), SchemaError> {
            if len != n {
                Err(SchemaError::LengthMismatch {
                    column: name.to_string(),
                    expected: n,
                    found: len,
                })
            } else {
                Ok(())
            }
        };

        check("score_group_idx", self.score_group_idx.len())?;
        check("precursor_idx", self.precursor_idx.len())?;
        check("channel", self.channel.len())?;
        check("decoy", self.decoy.len())?;
        check("flat_frag_start_idx", self.flat_frag_start_idx.len())?;
        check("flat_frag_stop_idx", self.flat_frag_stop_idx.len())?;
        check("charge", self.charge.len())?;
        check("rt_library", self.rt_library.len())?;
        check("mobility_library", self.mobility_library.len())?;
        check("mz_library", self.mz_library.len())?;

        if self.isotope_intensity.nrows() != n {
            return Err(SchemaError::LengthMismatch {
                column: "isotope_intensity".to_string(),
                expected: n,
                found: self.isotope_intensity.nrows(),
            });
        }

        if column_choice == ColumnChoice::Calibrated {
            if self.rt_calibrated.as_ref().map(Vec::len).unwrap_or(0) != n {
                return Err(SchemaError::MissingCalibratedColumn("rt_calibrated".into()));
            }
            if self.mobility_calibrated.as_ref().map(Vec::len).unwrap_or(0) != n {
                return Err(SchemaError::MissingCalibratedColumn(
                    "mobility_calibrated".into(),
                ));
            }
            if self.mz_calibrated.as_ref().map(Vec::len).unwrap_or(0) != n {
                return Err(SchemaError::MissingCalibratedColumn("mz_calibrated".into()));
            }
        }

        for row in 0..n {
            let start = self.flat_frag_start_idx[row];
            let stop = self.flat_frag_stop_idx[row];
            if stop < start {
                return Err(SchemaError::InvalidFragmentRange { row, start, stop });
            }
        }

        Ok(())
    }

    /// The rt value to use for row `i`, honoring `column_choice`.
    ///
    /// Panics if `column_choice` is `Calibrated` and `validate` was not
    /// called first with that same choice.
    pub fn rt(&self, i: usize, column_choice: ColumnChoice) -> f32 {
        match column_choice {
            ColumnChoice::Library => self.rt_library[i],
            ColumnChoice::Calibrated => self.rt_calibrated.as_ref().unwrap()[i],
        }
    }

    /// The mobility value to use for row `i`, honoring `column_choice`.
    pub fn mobility(&self, i: usize, column_choice: ColumnChoice) -> f32 {
        match column_choice {
            ColumnChoice::Library => self.mobility_library[i],
            ColumnChoice::Calibrated => self.mobility_calibrated.as_ref().unwrap()[i],
        }
    }

    /// The m/z value to use for row `i`, honoring `column_choice`.
    pub fn mz(&self, i: usize, column_choice: ColumnChoice) -> f32 {
        match column_choice {
            ColumnChoice::Library => self.mz_library[i],
            ColumnChoice::Calibrated => self.mz_calibrated.as_ref().unwrap()[i],
        }
    }
}

/// Validated fragment table (§6 "Fragment table").
#[derive(Debug, Clone)]
pub struct FragmentTable {
    /// Library-predicted fragment m/z.
    pub mz_library: Vec<f32>,
    /// Calibrated fragment m/z, if supplied.
    pub mz_calibrated: Option<Vec<f32>>,
    /// Library fragment intensity.
    pub intensity: Vec<f32>,
    /// Number of library precursors in the run sharing this fragment.
    pub cardinality: Vec<u8>,
    /// Ion series type (e.g. b/y), caller-defined encoding.
    pub kind: Vec<u8>,
    /// Neutral-loss type, caller-defined encoding.
    pub loss_type: Vec<u8>,
    /// Fragment charge state.
    pub charge: Vec<u8>,
    /// Fragment ion number (e.g. the "6" in b6).
    pub number: Vec<u8>,
    /// Fragment ion position in the sequence.
    pub position: Vec<u8>,
}

impl FragmentTable {
    /// Number of rows (fragments) in the table.
    pub fn len(&self) -> usize {
        self.mz_library.len()
    }

    /// Whether the table has zero rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate column lengths.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let n = self.len();
        let check = |name: &str, len: usize| -> Result<(), SchemaError> {
            if len != n {
                Err(SchemaError::LengthMismatch {
                    column: name.to_string(),
                    expected: n,
                    found: len,
                })
            } else {
                Ok(())
            }
        };
        check("intensity", self.intensity.len())?;
        check("cardinality", self.cardinality.len())?;
        check("type", self.kind.len())?;
        check("loss_type", self.loss_type.len())?;
        check("charge", self.charge.len())?;
        check("number", self.number.len())?;
        check("position", self.position.len())?;
        Ok(())
    }

    /// The m/z value to use for fragment `i`, honoring `column_choice`.
    pub fn mz(&self, i: usize, column_choice: ColumnChoice) -> f32 {
        match column_choice {
            ColumnChoice::Library => self.mz_library[i],
            ColumnChoice::Calibrated => self
                .mz_calibrated
                .as_ref()
                .map(|v| v[i])
                .unwrap_or(self.mz_library[i]),
        }
    }
}

/// One emitted candidate apex (§3 "Candidate", §6 output columns).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Candidate {
    /// Elution group this candidate was found in.
    pub elution_group_idx: u32,
    /// Precursor this candidate belongs to.
    pub precursor_idx: u32,
    /// Intensity rank among this precursor's candidates, 0 = best.
    pub rank: u32,
    /// 1 if the precursor is a decoy, 0 if target.
    pub decoy: u8,
    /// Start of this precursor's fragment range, passed through unchanged.
    pub flat_frag_start_idx: u32,
    /// Stop of this precursor's fragment range, passed through unchanged.
    pub flat_frag_stop_idx: u32,
    /// Absolute scan index of the lower boundary.
    pub scan_start: u32,
    /// Absolute scan index of the apex.
    pub scan_center: u32,
    /// Absolute scan index of the upper boundary (exclusive).
    pub scan_stop: u32,
    /// Absolute frame index of the lower boundary.
    pub frame_start: u32,
    /// Absolute frame index of the apex.
    pub frame_center: u32,
    /// Absolute frame index of the upper boundary (exclusive).
    pub frame_stop: u32,
    /// Signed ppm mass error of the apex relative to the library m/z.
    pub mass_error: f32,
    /// Fraction of non-zero precursor-channel pixels under the apex.
    pub fraction_nonzero: f32,
    /// Smoothed score-map intensity at the apex.
    pub intensity: f32,
    /// Library retention time of the precursor, passed through for
    /// downstream convenience.
    pub rt_library: f32,
    /// Library mobility of the precursor, passed through for downstream
    /// convenience.
    pub mobility_library: f32,
}
