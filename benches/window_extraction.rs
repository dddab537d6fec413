use criterion::{black_box, criterion_group, criterion_main, Criterion};
use diapex::ion_groups::WeightedIon;
use diapex::kernel::KernelBuilder;
use diapex::raw_index::RawIndex;
use diapex::smoothing::FourierSmoother;
use diapex::window::WindowExtractor;
use ndarray::Array4;

fn synthetic_index(n_frames: usize, n_scans: usize) -> RawIndex {
    let rt_values: Vec<f32> = (0..n_frames).map(|f| f as f32).collect();
    let mobility_values: Vec<f32> = (0..n_scans).map(|s| 1.5 - s as f32 * 0.01).collect();
    let mz_values: Vec<f64> = (0..4000).map(|t| 300.0 + t as f64 * 0.05).collect();
    let cycle = Array4::from_elem((1, 1, n_scans, 2), -1.0);

    let n_pushes = n_frames * n_scans;
    let mut push_indptr = vec![0u64; n_pushes + 1];
    let mut tof_indices = Vec::with_capacity(n_pushes * 4);
    let mut intensity_values = Vec::with_capacity(n_pushes * 4);
    for push in 0..n_pushes {
        push_indptr[push] = tof_indices.len() as u64;
        for k in 0..4 {
            tof_indices.push((1000 + k * 37 + push % 50) as u32);
            intensity_values.push(10.0 + (push % 13) as f32);
        }
    }
    push_indptr[n_pushes] = tof_indices.len() as u64;

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

fn bench_window_extraction(c: &mut Criterion) {
    let raw = synthetic_index(200, 100);
    let ions: Vec<WeightedIon> = (0..12)
        .map(|i| WeightedIon {
            mz: 350.0 + i as f32 * 2.0,
            weight: 1.0,
        })
        .collect();

    c.bench_function("extract_dense_window_200x100", |b| {
        b.iter(|| {
            let window = WindowExtractor.extract(
                black_box(&raw),
                black_box(&ions),
                (0, 200),
                (0, 100),
                None,
                black_box(50.0),
            );
            black_box(window);
        });
    });
}

fn bench_fourier_smoothing(c: &mut Criterion) {
    let kernel = KernelBuilder::new(20, 5.0, 12.0).build();
    let map = ndarray::Array2::<f32>::from_elem((100, 200), 1.0);

    c.bench_function("fourier_smooth_100x200", |b| {
        b.iter(|| {
            let smoothed = FourierSmoother.smooth(black_box(map.view()), black_box(kernel.view()));
            black_box(smoothed);
        });
    });
}

criterion_group!(benches, bench_window_extraction, bench_fourier_smoothing);
criterion_main!(benches);
