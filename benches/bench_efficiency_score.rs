// benches/bench_efficiency_score.rs

use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use junction_sim::flow_analyzer::{efficiency_score, DirectionMetrics};
use junction_sim::Direction;

/// Per-direction metrics with waits that grow with `load`.
/// Every fourth direction processed nothing, so the missing-value path runs too.
fn dummy_metrics(load: usize) -> Vec<DirectionMetrics> {
    Direction::ALL
        .iter()
        .enumerate()
        .map(|(i, &direction)| {
            let idle = (load + i) % 4 == 0;
            DirectionMetrics {
                direction,
                average_waiting_time: (!idle).then(|| 2.0 + (load * (i + 1)) as f64 * 0.3),
                max_waiting_time: (!idle).then(|| 6.0 + (load * (i + 1)) as f64 * 0.9),
                max_queue_length: load / (i + 1),
                vehicles_processed: if idle { 0 } else { load },
            }
        })
        .collect()
}

fn bench_efficiency_score(c: &mut Criterion) {
    let loads = [10, 50, 200];

    let mut group = c.benchmark_group("Efficiency_Score_Benchmarks");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    for &load in loads.iter() {
        let metrics = dummy_metrics(load);
        group.bench_with_input(
            BenchmarkId::new("efficiency_score", load),
            &load,
            |b, &_load| {
                b.iter(|| {
                    let score = efficiency_score(black_box(&metrics));
                    black_box(score);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_efficiency_score);
criterion_main!(benches);
