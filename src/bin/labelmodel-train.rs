//! Trains a label model from a votes file and saves the state bundle.

use std::path::PathBuf;

use labelmodel::config;
use labelmodel::labeling::votes::VotesFile;
use labelmodel::logging;
use labelmodel::ml::label_model::ConditionalProbabilities;
use labelmodel::ml::label_model::persist::save_state;
use labelmodel::ml::label_model::train::{TrainOptions, train_from_votes};
use tracing::warn;

fn main() {
    if let Err(err) = logging::init_for("labelmodel-train") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = parse_args(std::env::args().skip(1).collect())?;
    let config = config::load_or_default().map_err(|err| err.to_string())?;
    let options = cli.apply(config.train_options());

    let votes = VotesFile::load(&cli.votes).map_err(|err| err.to_string())?;
    let rows = votes.source_votes().map_err(|err| err.to_string())?;
    let builder = votes.builder();
    let (model, report) =
        train_from_votes(&builder, &rows, &options).map_err(|err| err.to_string())?;

    let mut state = model.snapshot();
    state.classes = votes.classes.clone();
    state.sources = votes.sources.clone();
    save_state(&cli.model_out, &state).map_err(|err| err.to_string())?;

    println!(
        "trained on {} rows: {} steps, final loss {}{}",
        rows.len(),
        report.losses.len(),
        report
            .final_loss()
            .map(|loss| format!("{loss:.6}"))
            .unwrap_or_else(|| "n/a".to_string()),
        if report.stopped_early {
            " (converged)"
        } else {
            ""
        }
    );
    println!("saved model to {}", cli.model_out.display());
    match model.conditional_probabilities() {
        Ok(table) => print_conditional_table(&table, &votes),
        Err(err) => warn!("Skipping conditional probability table: {err}"),
    }
    Ok(())
}

fn print_conditional_table(table: &ConditionalProbabilities, votes: &VotesFile) {
    println!("P(vote | label), rows=(source, label):");
    let mut header = format!("{:<16} {:<12} {:>8}", "source", "label", "abstain");
    for class in &votes.classes {
        header.push_str(&format!(" {:>8}", truncate(class, 8)));
    }
    println!("{header}");
    for row in table.rows() {
        let mut line = format!(
            "{:<16} {:<12}",
            truncate(&votes.sources[row.source], 16),
            truncate(&votes.classes[row.label], 12)
        );
        for p in &row.probabilities {
            line.push_str(&format!(" {p:>8.3}"));
        }
        println!("{line}");
    }
}

fn truncate(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}

#[derive(Debug, Clone)]
struct CliOptions {
    votes: PathBuf,
    model_out: PathBuf,
    epochs: Option<usize>,
    learning_rate: Option<f32>,
    initial_precision: Option<f32>,
    tolerance: Option<f32>,
}

impl CliOptions {
    /// Flags override values that came from the config file.
    fn apply(&self, mut options: TrainOptions) -> TrainOptions {
        if let Some(epochs) = self.epochs {
            options.epochs = epochs;
        }
        if let Some(learning_rate) = self.learning_rate {
            options.learning_rate = learning_rate;
        }
        if let Some(initial_precision) = self.initial_precision {
            options.initial_precision = initial_precision;
        }
        if self.tolerance.is_some() {
            options.tolerance = self.tolerance;
        }
        options
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut votes: Option<PathBuf> = None;
    let mut model_out = PathBuf::from("model.json");
    let mut epochs = None;
    let mut learning_rate = None;
    let mut initial_precision = None;
    let mut tolerance = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--votes" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--votes requires a value".to_string())?;
                votes = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                model_out = PathBuf::from(value);
            }
            "--epochs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--epochs requires a value".to_string())?;
                epochs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --epochs value: {value}"))?,
                );
            }
            "--learning-rate" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--learning-rate requires a value".to_string())?;
                learning_rate = Some(
                    value
                        .parse::<f32>()
                        .map_err(|_| format!("Invalid --learning-rate value: {value}"))?,
                );
            }
            "--initial-precision" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--initial-precision requires a value".to_string())?;
                initial_precision = Some(
                    value
                        .parse::<f32>()
                        .map_err(|_| format!("Invalid --initial-precision value: {value}"))?,
                );
            }
            "--tolerance" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--tolerance requires a value".to_string())?;
                tolerance = Some(
                    value
                        .parse::<f32>()
                        .map_err(|_| format!("Invalid --tolerance value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let votes = votes.ok_or_else(help_text)?;
    Ok(CliOptions {
        votes,
        model_out,
        epochs,
        learning_rate,
        initial_precision,
        tolerance,
    })
}

fn help_text() -> String {
    [
        "labelmodel-train",
        "",
        "Estimates weak-source accuracies from a votes file and saves the label model.",
        "",
        "Usage:",
        "  labelmodel-train --votes <file> [--out model.json] [options]",
        "",
        "Options:",
        "  --votes <file>             Votes JSON with classes, sources and rows (required).",
        "  --out <file>               Output model bundle (default: model.json).",
        "  --epochs <n>               Gradient steps (default from label_model.toml: 100).",
        "  --learning-rate <f32>      Step size (default: 0.01).",
        "  --initial-precision <f32>  Assumed source precision at start (default: 0.7).",
        "  --tolerance <f32>          Stop when the loss changes less than this.",
    ]
    .join("\n")
}
