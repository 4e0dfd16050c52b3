use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use loadnode_core::{FilterCfg, ForceFilter};

// Load-cell-like trace: slow ramp, a step, white noise
fn synth_trace(n: usize, noise_amp: f32, seed: u32) -> Vec<f32> {
    let mut state = seed.max(1);
    let mut next_f32 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x as f32) / (u32::MAX as f32 + 1.0)
    };
    (0..n)
        .map(|i| {
            let base = if i < n / 2 { i as f32 * 0.01 } else { 50.0 };
            base + (next_f32() * 2.0 - 1.0) * noise_amp
        })
        .collect()
}

pub fn bench_filter_update(c: &mut Criterion) {
    let mut g = c.benchmark_group("force_filter");
    // BENCH_SAMPLE_SIZE=10 cargo bench -p loadnode_core --bench filter
    if let Ok(n) = std::env::var("BENCH_SAMPLE_SIZE").map(|s| s.parse::<usize>()) {
        g.sample_size(n.unwrap_or(50).max(10));
    }

    let trace = synth_trace(4096, 0.2, 0xC0FFEE);

    g.bench_function("update_default_window", |b| {
        b.iter_batched(
            ForceFilter::default,
            |mut f| {
                for &x in &trace {
                    black_box(f.update(black_box(x), true));
                }
                f
            },
            BatchSize::SmallInput,
        )
    });

    for window in [4usize, 64, 512] {
        g.bench_function(format!("update_window_{window}"), |b| {
            b.iter_batched(
                || ForceFilter::new(FilterCfg { window, ..FilterCfg::default() }),
                |mut f| {
                    for &x in &trace {
                        black_box(f.update(black_box(x), false));
                    }
                    f
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(benches, bench_filter_update);
criterion_main!(benches);
