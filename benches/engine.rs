//! Benchmarks for the streaming engine.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fibwave::prelude::*;

/// Generate swinging bars with deterministic noise
fn generate_bars(n: usize) -> Vec<Bar> {
  let mut bars = Vec::with_capacity(n);

  for i in 0..n {
    let swing = ((i as f64) * 0.07).sin() * 20.0 + ((i as f64) * 0.013).sin() * 35.0;
    let noise = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let mid = 200.0 + swing + noise;
    let half = 0.5 + ((i * 3) % 10) as f64 / 10.0;

    bars.push(Bar::new(i, mid + half, mid - half, mid));
  }

  bars
}

fn bench_run(c: &mut Criterion) {
  let bars = generate_bars(1000);

  c.bench_function("run_1000_bars", |b| {
    b.iter(|| {
      let mut engine = EngineBuilder::new().pivot_length(5).build().unwrap();
      let _ = black_box(engine.run(black_box(&bars)));
    })
  });
}

fn bench_on_bar(c: &mut Criterion) {
  let bars = generate_bars(5000);
  let mut warmed = EngineBuilder::new().build().unwrap();
  warmed.run(&bars[..4999]).unwrap();
  let forming = Bar::unconfirmed(4999, bars[4999].high, bars[4999].low, bars[4999].close);

  c.bench_function("on_bar_forming", |b| {
    b.iter(|| {
      let _ = black_box(warmed.on_bar(black_box(&forming)));
    })
  });
}

fn bench_scaling(c: &mut Criterion) {
  let mut group = c.benchmark_group("scaling");

  for length in [2, 5, 10, 20].iter() {
    let bars = generate_bars(5000);

    group.bench_with_input(BenchmarkId::new("pivot_length", length), length, |b, &length| {
      b.iter(|| {
        let mut engine = EngineBuilder::new().pivot_length(length).build().unwrap();
        let _ = black_box(engine.run(black_box(&bars)));
      })
    });
  }

  group.finish();
}

fn bench_parallel_replay(c: &mut Criterion) {
  let bars1 = generate_bars(1000);
  let bars2 = generate_bars(1000);
  let bars3 = generate_bars(1000);
  let bars4 = generate_bars(1000);

  let config = EngineConfig::default();

  let instruments: Vec<(&str, &[Bar])> =
    vec![("SYM1", &bars1[..]), ("SYM2", &bars2[..]), ("SYM3", &bars3[..]), ("SYM4", &bars4[..])];

  c.bench_function("parallel_replay_4_instruments", |b| {
    b.iter(|| {
      let _ = black_box(replay_parallel(black_box(&config), black_box(instruments.clone())));
    })
  });
}

fn bench_checkpoint(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let mut engine = EngineBuilder::new().build().unwrap();
  engine.run(&bars).unwrap();

  c.bench_function("checkpoint_restore", |b| {
    b.iter(|| {
      let _ = black_box(FibWaveEngine::restore(black_box(engine.checkpoint())));
    })
  });
}

criterion_group!(benches, bench_run, bench_on_bar, bench_scaling, bench_parallel_replay, bench_checkpoint,);

criterion_main!(benches);
