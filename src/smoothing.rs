//! 2-D FFT-based Gaussian smoothing of dense windows (§4.3 `FourierSmoother`).
//!
//! Grounded on `fourier_filter` in the original implementation's
//! `candidateselection.py`, which computes `irfft2(rfft2(map) *
//! rfft2(kernel))` with even-dimension padding and a circular roll-back by
//! `(-k0 // 2, -k1 // 2)` to undo the kernel's implicit centering. `numpy`'s
//! `rfft2`/`irfft2` (one real-to-complex FFT along the last axis, one
//! complex FFT along the other) is reproduced here as a real-to-complex FFT
//! along the cycle axis via `realfft`, followed by a complex FFT along the
//! scan axis via `rustfft`.
//!
//! §4.3 smooths channel 0 of the full `(2, n_ions, n_obs, n_scans, n_cycles)`
//! dense window independently per `(ion, obs)` slice, before any reduction
//! collapses the ion axis: [`FourierSmoother::fourier_a0`] returns the
//! smoothed `(n_ions, n_obs, n_scans, n_cycles)` tensor, and
//! [`FourierSmoother::fourier_a1`] additionally sums the observation axis,
//! returning `(n_ions, n_scans, n_cycles)`.

use ndarray::{Array2, Array3, Array4, ArrayView2, ArrayView5, Axis};
use num_complex::Complex32;
use realfft::RealFftPlanner;
use rustfft::FftPlanner;

fn make_even(n: usize) -> usize {
    if n % 2 == 0 {
        n
    } else {
        n + 1
    }
}

/// Embed `src` into the top-left corner of a zero-filled `(rows, cols)`
/// array.
fn embed(src: ndarray::ArrayView2<f32>, rows: usize, cols: usize) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros((rows, cols));
    let (src_rows, src_cols) = src.dim();
    out.slice_mut(ndarray::s![0..src_rows, 0..src_cols]).assign(&src);
    out
}

/// Real-to-complex 2-D forward FFT: real FFT along axis 1 (cycle), complex
/// FFT along axis 0 (scan). Returns a `(rows, cols / 2 + 1)` complex array.
fn rfft2(data: &Array2<f32>) -> Array2<Complex32> {
    let (rows, cols) = data.dim();
    let freq_cols = cols / 2 + 1;

    let mut real_planner = RealFftPlanner::<f32>::new();
    let r2c = real_planner.plan_fft_forward(cols);

    let mut half = Array2::<Complex32>::zeros((rows, freq_cols));
    for r in 0..rows {
        let mut row: Vec<f32> = data.row(r).to_vec();
        let mut spectrum = r2c.make_output_vec();
        r2c.process(&mut row, &mut spectrum)
            .expect("row length matches planned transform");
        for c in 0..freq_cols {
            half[[r, c]] = spectrum[c];
        }
    }

    let mut complex_planner = FftPlanner::<f32>::new();
    let fft = complex_planner.plan_fft_forward(rows);
    for c in 0..freq_cols {
        let mut column: Vec<Complex32> = (0..rows).map(|r| half[[r, c]]).collect();
        fft.process(&mut column);
        for r in 0..rows {
            half[[r, c]] = column[r];
        }
    }

    half
}

/// Inverse of [`rfft2`]: complex inverse FFT along axis 0, real inverse FFT
/// along axis 1. `cols` is the original (unpadded... already even) column
/// count, needed because the half-spectrum's width does not recover it.
fn irfft2(spectrum: &Array2<Complex32>, rows: usize, cols: usize) -> Array2<f32> {
    let freq_cols = cols / 2 + 1;
    let mut half = spectrum.clone();

    let mut complex_planner = FftPlanner::<f32>::new();
    let ifft = complex_planner.plan_fft_inverse(rows);
    for c in 0..freq_cols {
        let mut column: Vec<Complex32> = (0..rows).map(|r| half[[r, c]]).collect();
        ifft.process(&mut column);
        for r in 0..rows {
            half[[r, c]] = column[r] / rows as f32;
        }
    }

    let mut real_planner = RealFftPlanner::<f32>::new();
    let c2r = real_planner.plan_fft_inverse(cols);

    let mut out = Array2::<f32>::zeros((rows, cols));
    for r in 0..rows {
        let mut spectrum_row: Vec<Complex32> = (0..freq_cols).map(|c| half[[r, c]]).collect();
        let mut row = c2r.make_output_vec();
        c2r.process(&mut spectrum_row, &mut row)
            .expect("spectrum length matches planned transform");
        for c in 0..cols {
            out[[r, c]] = row[c] / cols as f32;
        }
    }

    out
}

/// Circularly roll `data` by `(shift_rows, shift_cols)`, numpy `roll`
/// semantics (positive shift moves elements toward higher indices).
fn roll2(data: &Array2<f32>, shift_rows: i64, shift_cols: i64) -> Array2<f32> {
    let (rows, cols) = data.dim();
    let mut out = Array2::<f32>::zeros((rows, cols));
    let row_shift = shift_rows.rem_euclid(rows as i64) as usize;
    let col_shift = shift_cols.rem_euclid(cols as i64) as usize;
    for r in 0..rows {
        let src_r = (r + rows - row_shift) % rows;
        for c in 0..cols {
            let src_c = (c + cols - col_shift) % cols;
            out[[r, c]] = data[[src_r, src_c]];
        }
    }
    out
}

/// Performs 2-D FFT-based Gaussian smoothing of dense score maps.
#[derive(Debug, Default, Clone, Copy)]
pub struct FourierSmoother;

impl FourierSmoother {
    /// Convolve `map` with `kernel` via an FFT-domain multiply, returning a
    /// result the same shape as `map`.
    ///
    /// Both operands are embedded into a shared zero-padded buffer (each
    /// axis length the max of the two inputs' lengths, rounded up to even)
    /// before transforming, and the circular shift introduced by placing
    /// the kernel at the origin rather than centered is undone afterward.
    pub fn smooth(&self, map: ArrayView2<f32>, kernel: ArrayView2<f32>) -> Array2<f32> {
        let (map_rows, map_cols) = map.dim();
        let (k_rows, k_cols) = kernel.dim();
        if map_rows == 0 || map_cols == 0 {
            return Array2::zeros((map_rows, map_cols));
        }

        let rows = make_even(map_rows.max(k_rows));
        let cols = make_even(map_cols.max(k_cols));

        let padded_map = embed(map, rows, cols);
        let padded_kernel = embed(kernel, rows, cols);

        let map_spectrum = rfft2(&padded_map);
        let kernel_spectrum = rfft2(&padded_kernel);
        let product = &map_spectrum * &kernel_spectrum;

        let convolved = irfft2(&product, rows, cols);
        let centered = roll2(&convolved, -((k_rows / 2) as i64), -((k_cols / 2) as i64));

        centered
            .slice(ndarray::s![0..map_rows, 0..map_cols])
            .to_owned()
    }

    /// Smooth channel 0 of `window` independently for every `(ion, obs)`
    /// slice, returning `(n_ions, n_obs, n_scans, n_cycles)` (§4.3
    /// `fourier_a0`). `window` is the full `(2, n_ions, n_obs, n_scans,
    /// n_cycles)` dense tensor; channel 1 (ppm error) is not touched.
    pub fn fourier_a0(&self, window: ArrayView5<f32>, kernel: ArrayView2<f32>) -> Array4<f32> {
        let (_, n_ions, n_obs, n_scans, n_cycles) = window.dim();
        let mut out = Array4::<f32>::zeros((n_ions, n_obs, n_scans, n_cycles));
        for ion in 0..n_ions {
            for obs in 0..n_obs {
                let slice = window.slice(ndarray::s![0, ion, obs, .., ..]);
                let smoothed = self.smooth(slice, kernel);
                out.slice_mut(ndarray::s![ion, obs, .., ..]).assign(&smoothed);
            }
        }
        out
    }

    /// As [`Self::fourier_a0`], but sums the observation axis after
    /// smoothing, returning `(n_ions, n_scans, n_cycles)` (§4.3
    /// `fourier_a1`), used for fragment windows where multiple DIA-cycle
    /// observations per cycle must collapse to one slice per ion before the
    /// ion axis itself is reduced.
    pub fn fourier_a1(&self, window: ArrayView5<f32>, kernel: ArrayView2<f32>) -> Array3<f32> {
        self.fourier_a0(window, kernel).sum_axis(Axis(1))
    }
}
