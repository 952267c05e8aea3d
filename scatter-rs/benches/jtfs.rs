use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scatter_rs::kernel::KernelLifecycle;
use scatter_rs::scattering1d::{
    JtfsConfig, OutType, Scatter1D, Scattering1D, ScatteringConfig, TimeFrequencyScattering1D,
};

fn chirp(n: usize) -> Vec<f64> {
    // linear sweep from 0.02 to 0.4 cycles per sample
    (0..n)
        .map(|t| {
            let u = t as f64 / n as f64;
            let phase = 2.0 * std::f64::consts::PI * (0.02 * t as f64 + 0.19 * u * t as f64);
            phase.cos()
        })
        .collect()
}

fn jtfs_forward_2048(c: &mut Criterion) {
    let jtfs = TimeFrequencyScattering1D::try_new(JtfsConfig::new(2048))
        .expect("valid jtfs config");
    let x = chirp(2048);
    c.bench_function("jtfs_forward_2048_list", |b| {
        b.iter(|| {
            black_box(
                jtfs.run(x.as_slice())
                    .expect("benchmark input should satisfy jtfs preconditions"),
            );
        });
    });
}

fn jtfs_forward_2048_grouped(c: &mut Criterion) {
    let jtfs = TimeFrequencyScattering1D::try_new(JtfsConfig {
        average_fr: true,
        out_3d: true,
        out_type: OutType::Array,
        ..JtfsConfig::new(2048)
    })
    .expect("valid jtfs config");
    let x = chirp(2048);
    c.bench_function("jtfs_forward_2048_3d_array", |b| {
        b.iter(|| {
            black_box(
                jtfs.run(x.as_slice())
                    .expect("benchmark input should satisfy jtfs preconditions"),
            );
        });
    });
}

fn scattering_forward_2048(c: &mut Criterion) {
    let sc = Scattering1D::try_new(ScatteringConfig::new(2048)).expect("valid scattering config");
    let x = chirp(2048);
    c.bench_function("scattering_forward_2048", |b| {
        b.iter(|| {
            black_box(
                sc.run(x.as_slice())
                    .expect("benchmark input should satisfy scattering preconditions"),
            );
        });
    });
}

criterion_group!(
    benches,
    jtfs_forward_2048,
    jtfs_forward_2048_grouped,
    scattering_forward_2048
);
criterion_main!(benches);
