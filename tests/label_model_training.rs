mod support;

use std::sync::{Arc, RwLock};
use std::thread;

use labelmodel::labeling::augment::{LabelMatrixBuilder, SourceVote};
use labelmodel::ml::label_model::persist::{load_state, save_state};
use labelmodel::ml::label_model::train::{TrainOptions, fit, train_from_votes};
use labelmodel::ml::label_model::{
    LabelModel, StoreState, independent_sources_mask, predict_class_indices, second_moment,
    uniform_class_balance,
};
use ndarray::Array1;
use support::synthetic::synthetic_votes;
use tempfile::tempdir;

const SOURCES: usize = 4;
const CLASSES: usize = 3;

fn train_options() -> TrainOptions {
    TrainOptions {
        epochs: 200,
        learning_rate: 0.05,
        ..TrainOptions::default()
    }
}

#[test]
fn recovers_labels_from_accurate_sources() {
    let data = synthetic_votes(7, 1000, SOURCES, CLASSES, 0.8, 0.3);
    let builder = LabelMatrixBuilder::new(SOURCES, CLASSES);
    let (model, report) = train_from_votes(&builder, &data.rows, &train_options()).unwrap();
    assert!(report.final_loss().unwrap() < report.losses[0]);

    let l_aug = builder.augment(&data.rows).unwrap();
    let probs = model.infer(l_aug.view()).unwrap();
    for row in probs.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-5);
        assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
    }
    let predicted = predict_class_indices(probs.view());
    let hits = predicted
        .iter()
        .zip(&data.truth)
        .filter(|(pred, truth)| pred == truth)
        .count();
    let accuracy = hits as f32 / data.truth.len() as f32;
    assert!(accuracy > 0.8, "accuracy {accuracy}");

    // P(vote = y | label = y) is 0.7 * 0.8 for every source.
    let table = model.conditional_probabilities().unwrap();
    for source in 0..SOURCES {
        for label in 0..CLASSES {
            let p = table.get(source, label + 1, label).unwrap();
            assert!((p - 0.56).abs() < 0.1, "source {source} label {label}: {p}");
        }
    }
}

#[test]
fn streaming_and_batch_statistics_train_the_same_model() {
    let data = synthetic_votes(11, 300, SOURCES, CLASSES, 0.75, 0.2);
    let builder = LabelMatrixBuilder::new(SOURCES, CLASSES);
    let options = train_options();
    let (streamed, _) = train_from_votes(&builder, &data.rows, &options).unwrap();

    let l_aug = builder.augment(&data.rows).unwrap();
    let mut batch = LabelModel::new();
    batch
        .initialize(
            second_moment(l_aug.view()).unwrap(),
            independent_sources_mask(SOURCES, CLASSES),
            uniform_class_balance(CLASSES),
            Array1::from_elem(SOURCES, options.initial_precision),
            options.learning_rate,
        )
        .unwrap();
    fit(&mut batch, &options).unwrap();

    let a = streamed.infer(l_aug.view()).unwrap();
    let b = batch.infer(l_aug.view()).unwrap();
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-3, "{x} vs {y}");
    }
}

#[test]
fn saved_model_predicts_identically_after_reload() {
    let data = synthetic_votes(3, 200, SOURCES, CLASSES, 0.8, 0.3);
    let builder = LabelMatrixBuilder::new(SOURCES, CLASSES);
    let (model, _) = train_from_votes(&builder, &data.rows, &train_options()).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("models").join("model.json");
    let mut state = model.snapshot();
    state.classes = vec!["a".into(), "b".into(), "c".into()];
    save_state(&path, &state).unwrap();

    let loaded = load_state(&path).unwrap();
    assert_eq!(loaded.classes, state.classes);
    let restored = LabelModel::restore(&loaded).unwrap();
    assert_eq!(restored.state(), StoreState::Trainable);

    let l_aug = builder.augment(&data.rows).unwrap();
    let before = model.infer(l_aug.view()).unwrap();
    let after = restored.infer(l_aug.view()).unwrap();
    for (x, y) in before.iter().zip(after.iter()) {
        assert!((x - y).abs() < 1e-6);
    }
}

#[test]
fn shared_model_serves_concurrent_readers() {
    let data = synthetic_votes(5, 200, SOURCES, CLASSES, 0.8, 0.3);
    let builder = LabelMatrixBuilder::new(SOURCES, CLASSES);
    let (model, _) = train_from_votes(&builder, &data.rows, &train_options()).unwrap();
    let shared = Arc::new(RwLock::new(model));
    let l_aug = Arc::new(builder.augment(&data.rows).unwrap());
    let expected = shared.read().unwrap().infer(l_aug.view()).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&shared);
            let l_aug = Arc::clone(&l_aug);
            thread::spawn(move || shared.read().unwrap().infer(l_aug.view()).unwrap())
        })
        .collect();
    {
        let mut model = shared.write().unwrap();
        model.train_step().unwrap();
    }
    for reader in readers {
        let probs = reader.join().unwrap();
        assert_eq!(probs.dim(), expected.dim());
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
    }
}

#[test]
fn all_abstain_row_falls_back_to_prior() {
    let data = synthetic_votes(9, 200, SOURCES, CLASSES, 0.8, 0.3);
    let builder = LabelMatrixBuilder::new(SOURCES, CLASSES);
    let (model, _) = train_from_votes(&builder, &data.rows, &train_options()).unwrap();
    let silent = builder
        .augment(&[vec![SourceVote::Abstain; SOURCES]])
        .unwrap();
    let probs = model.infer(silent.view()).unwrap();
    for p in probs.row(0) {
        assert!((p - 1.0 / CLASSES as f32).abs() < 1e-6);
    }
}
