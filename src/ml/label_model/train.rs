//! Standard training loop around [`LabelModel::train_step`].

use ndarray::Array1;
use thiserror::Error;
use tracing::{debug, info};

use super::{
    DEFAULT_INITIAL_PRECISION, DEFAULT_LEARNING_RATE, LabelModel, LabelModelError,
    SecondMomentAccumulator, independent_sources_mask, uniform_class_balance,
};
use crate::labeling::augment::{AugmentError, LabelMatrixBuilder, SourceVote};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f32,
    /// Precision assumed for every source when building the starting `mu`.
    pub initial_precision: f32,
    /// Stop once `|loss_t - loss_{t-1}|` drops below this value.
    pub tolerance: Option<f32>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: DEFAULT_LEARNING_RATE,
            initial_precision: DEFAULT_INITIAL_PRECISION,
            tolerance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitReport {
    /// Loss observed before each step, in step order.
    pub losses: Vec<f32>,
    pub stopped_early: bool,
}

impl FitReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.losses.last().copied()
    }
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Augment(#[from] AugmentError),
    #[error(transparent)]
    Model(#[from] LabelModelError),
}

/// Run up to `options.epochs` gradient steps on an already trainable model.
///
/// `options.learning_rate` and `options.initial_precision` are not applied here; the
/// model keeps whatever was bound at initialization.
pub fn fit(model: &mut LabelModel, options: &TrainOptions) -> Result<FitReport, LabelModelError> {
    let mut report = FitReport::default();
    for epoch in 0..options.epochs {
        let loss = model.train_step()?;
        debug!(epoch, loss, "Label model step");
        let converged = match (options.tolerance, report.losses.last()) {
            (Some(tolerance), Some(previous)) => (previous - loss).abs() < tolerance,
            _ => false,
        };
        report.losses.push(loss);
        if converged {
            report.stopped_early = true;
            break;
        }
    }
    info!(
        steps = report.losses.len(),
        final_loss = report.final_loss(),
        stopped_early = report.stopped_early,
        "Label model training finished"
    );
    Ok(report)
}

/// Build the second moment from raw votes, initialize a fresh model, and fit it.
///
/// Rows are streamed through the accumulator, so the full augmented matrix is never
/// materialized.
pub fn train_from_votes<R: AsRef<[SourceVote]>>(
    builder: &LabelMatrixBuilder,
    rows: &[R],
    options: &TrainOptions,
) -> Result<(LabelModel, FitReport), TrainError> {
    let mut acc = SecondMomentAccumulator::new(builder.width());
    for (row_idx, votes) in rows.iter().enumerate() {
        let row = builder.augment_row(row_idx, votes.as_ref())?;
        acc.push(row.view())?;
    }
    let second_moment = acc.finish()?;
    info!(
        rows = rows.len(),
        sources = builder.num_sources(),
        classes = builder.num_classes(),
        "Accumulated label statistics"
    );

    let mut model = LabelModel::new();
    model.initialize(
        second_moment,
        independent_sources_mask(builder.num_sources(), builder.num_classes()),
        uniform_class_balance(builder.num_classes()),
        Array1::from_elem(builder.num_sources(), options.initial_precision),
        options.learning_rate,
    )?;
    let report = fit(&mut model, options)?;
    Ok((model, report))
}
