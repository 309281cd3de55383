use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use labelmodel::labeling::augment::{LabelMatrixBuilder, SourceVote};
use labelmodel::ml::label_model::{
    LabelModel, SecondMomentAccumulator, independent_sources_mask, uniform_class_balance,
};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROWS: usize = 2_000;
const CLASSES: usize = 4;

fn votes(sources: usize) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(42);
    let rows: Vec<Vec<SourceVote>> = (0..ROWS)
        .map(|_| {
            let label = rng.random_range(0..CLASSES);
            (0..sources)
                .map(|_| match rng.random_range(0..10) {
                    0..=2 => SourceVote::Abstain,
                    3..=8 => SourceVote::Class(label),
                    _ => SourceVote::Class(rng.random_range(0..CLASSES)),
                })
                .collect()
        })
        .collect();
    LabelMatrixBuilder::new(sources, CLASSES)
        .augment(&rows)
        .expect("augment votes")
}

fn trained_model(l_aug: &Array2<f32>, sources: usize) -> LabelModel {
    let mut acc = SecondMomentAccumulator::new(l_aug.ncols());
    for row in l_aug.rows() {
        acc.push(row).expect("push row");
    }
    let mut model = LabelModel::new();
    model
        .initialize(
            acc.finish().expect("second moment"),
            independent_sources_mask(sources, CLASSES),
            uniform_class_balance(CLASSES),
            Array1::from_elem(sources, 0.7),
            0.01,
        )
        .expect("initialize");
    model
}

fn bench_train_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_step");
    for sources in [5usize, 20, 50] {
        let l_aug = votes(sources);
        let model = trained_model(&l_aug, sources);
        group.bench_with_input(BenchmarkId::from_parameter(sources), &model, |b, model| {
            b.iter_batched(
                || model.clone(),
                |mut model| black_box(model.train_step().expect("train_step")),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_infer(c: &mut Criterion) {
    let sources = 20;
    let l_aug = votes(sources);
    let model = trained_model(&l_aug, sources);
    c.bench_with_input(BenchmarkId::new("infer", ROWS), &l_aug, |b, l_aug| {
        b.iter(|| black_box(model.infer(black_box(l_aug.view())).expect("infer")));
    });
}

criterion_group!(benches, bench_train_step, bench_infer);
criterion_main!(benches);
