use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_runtime::{Action, Engine, SimConfig};

fn bench_advance(c: &mut Criterion) {
    let engine0 = Engine::new(SimConfig { rng_seed: 42 });
    c.bench_function("advance 40 quarters", |b| {
        b.iter(|| {
            let mut engine = engine0.clone();
            for _ in 0..40 {
                if engine.state().game_over {
                    break;
                }
                let _ = black_box(engine.perform(Action::AdvanceQuarter));
            }
        })
    });
}

criterion_group!(benches, bench_advance);
criterion_main!(benches);
