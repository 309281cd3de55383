//! Applies a saved label model to a votes file and writes per-row class probabilities.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use labelmodel::labeling::votes::VotesFile;
use labelmodel::logging;
use labelmodel::ml::label_model::persist::load_state;
use labelmodel::ml::label_model::{LabelModel, predict_class_indices};
use serde_json::{Map, Value, json};

fn main() {
    if let Err(err) = logging::init_for("labelmodel-predict") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = parse_args(std::env::args().skip(1).collect())?;
    let state = load_state(&cli.model).map_err(|err| err.to_string())?;
    let model = LabelModel::restore(&state).map_err(|err| err.to_string())?;

    let votes = VotesFile::load(&cli.votes).map_err(|err| err.to_string())?;
    if !state.classes.is_empty() && state.classes != votes.classes {
        return Err(format!(
            "Votes classes {:?} do not match model classes {:?}",
            votes.classes, state.classes
        ));
    }
    if !state.sources.is_empty() && state.sources != votes.sources {
        return Err(format!(
            "Votes sources {:?} do not match model sources {:?}",
            votes.sources, state.sources
        ));
    }
    let rows = votes.source_votes().map_err(|err| err.to_string())?;
    let l_aug = votes
        .builder()
        .augment(&rows)
        .map_err(|err| err.to_string())?;
    let probs = model.infer(l_aug.view()).map_err(|err| err.to_string())?;
    let predicted = predict_class_indices(probs.view());

    let sink: Box<dyn Write> = match &cli.out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
                }
            }
            Box::new(std::fs::File::create(path).map_err(|err| err.to_string())?)
        }
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = BufWriter::new(sink);
    for (row_idx, (row, label)) in probs.rows().into_iter().zip(predicted).enumerate() {
        let mut by_class = Map::new();
        for (class, p) in votes.classes.iter().zip(row.iter()) {
            by_class.insert(class.clone(), json!(p));
        }
        let line = json!({
            "row": row_idx,
            "label": votes.classes[label],
            "probabilities": Value::Object(by_class),
        });
        writeln!(writer, "{line}").map_err(|err| err.to_string())?;
    }
    writer.flush().map_err(|err| err.to_string())?;
    if let Some(path) = &cli.out {
        eprintln!("wrote {} rows to {}", probs.nrows(), path.display());
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    model: PathBuf,
    votes: PathBuf,
    out: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model: Option<PathBuf> = None;
    let mut votes: Option<PathBuf> = None;
    let mut out: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model = Some(PathBuf::from(value));
            }
            "--votes" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--votes requires a value".to_string())?;
                votes = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let model = model.ok_or_else(help_text)?;
    let votes = votes.ok_or_else(help_text)?;
    Ok(CliOptions { model, votes, out })
}

fn help_text() -> String {
    [
        "labelmodel-predict",
        "",
        "Writes one JSON line of class probabilities per votes row.",
        "",
        "Usage:",
        "  labelmodel-predict --model <file> --votes <file> [--out probs.jsonl]",
        "",
        "Options:",
        "  --model <file>   Model bundle written by labelmodel-train (required).",
        "  --votes <file>   Votes JSON with the same classes and sources (required).",
        "  --out <file>     Output JSON lines path (default: stdout).",
    ]
    .join("\n")
}
