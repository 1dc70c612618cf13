use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, warn};

use vest_detect::cli::{self, Args};
use vest_detect::{
    Classification, DetectError, LabelSet, Normalization, OnnxModel, PreprocessConfig,
    Preprocessor, interpret,
};

#[derive(Serialize)]
struct ImageReport {
    image: PathBuf,
    #[serde(flatten)]
    classification: Classification,
}

#[derive(Serialize)]
struct BenchReport {
    normalization: String,
    tested: usize,
    detected: usize,
    skipped: usize,
    images: Vec<ImageReport>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::init_tracing(args.verbose);

    let normalization: Normalization = args.normalize.parse()?;

    if !args.json {
        println!("{}", "=".repeat(60));
        println!("Vest Detection Model Test Bench");
        println!("{}", "=".repeat(60));
    }

    let labels = LabelSet::load(&args.labels)?;
    let model = OnnxModel::new(args.cuda)
        .load(&args.model)
        .with_context(|| format!("loading {}", args.model.display()))?;

    if args.json {
        debug!("graph io:\n{}", model.describe());
    } else {
        println!("[OK] Model loaded from {}", args.model.display());
        println!("\n=== Model Information ===");
        print!("{}", model.describe());
        println!("\nUsing normalization: {normalization}");
        println!("Testing {} image(s)\n", args.images.len());
    }

    let pre = Preprocessor::new(PreprocessConfig::new(normalization));
    let mut reports = Vec::new();
    let mut skipped = 0usize;

    for path in &args.images {
        // Unreadable files are reported and skipped; everything after a
        // successful decode is a real fault and aborts the run.
        let tensor = match pre.load(path) {
            Ok(tensor) => tensor,
            Err(err @ DetectError::ImageDecode { .. }) => {
                warn!("{err}, skipping");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let output = model.infer(tensor)?;
        let classification = interpret(&output, &labels)?;

        if !args.json {
            println!("{}:", path.display());
            println!(
                "  Prediction: {} (confidence: {:.2}%)",
                classification.prediction(),
                classification.confidence * 100.0
            );
            for score in &classification.results {
                println!("  {}: {:.2}%", score.label, score.confidence * 100.0);
            }
            println!();
        }

        reports.push(ImageReport {
            image: path.clone(),
            classification,
        });
    }

    let detected = reports
        .iter()
        .filter(|r| r.classification.detected)
        .count();

    if args.json {
        let report = BenchReport {
            normalization: normalization.to_string(),
            tested: reports.len(),
            detected,
            skipped,
            images: reports,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", "=".repeat(60));
        println!("Test Summary");
        println!("{}", "=".repeat(60));
        println!(
            "{} image(s) tested, {} detected, {} skipped",
            reports.len(),
            detected,
            skipped
        );
    }

    Ok(())
}
