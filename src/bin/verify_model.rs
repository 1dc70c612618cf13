//! Post-conversion sanity check. Runs one image through a converted graph
//! and confirms the output head is one this toolkit can interpret, before
//! the model ships anywhere.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;

use vest_detect::cli::init_tracing;
use vest_detect::{
    LabelSet, Normalization, OnnxModel, PreprocessConfig, Preprocessor, interpret,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ONNX model to verify
    #[arg(long)]
    model: PathBuf,

    /// Test image to run through the graph
    #[arg(long)]
    image: PathBuf,

    /// Label file, one class name per line
    #[arg(long, default_value = "models/labels.txt")]
    labels: PathBuf,

    /// Fail unless the prediction matches this label
    #[arg(long)]
    expect: Option<String>,

    /// Run on the CUDA execution provider instead of the CPU
    #[arg(long)]
    cuda: bool,

    /// Diagnostic verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let labels = LabelSet::load(&args.labels)?;
    if let Some(expect) = &args.expect {
        if expect != labels.negative() && expect != labels.positive() {
            bail!(
                "--expect {expect} is not one of the labels ({}, {})",
                labels.negative(),
                labels.positive()
            );
        }
    }

    let model = OnnxModel::new(args.cuda)
        .load(&args.model)
        .with_context(|| format!("loading {}", args.model.display()))?;
    println!("graph io:");
    print!("{}", model.describe());

    // Verification always runs under the training-time normalization.
    let pre = Preprocessor::new(PreprocessConfig::new(Normalization::Centered));
    let tensor = pre.load(&args.image)?;
    let output = model.infer(tensor)?;
    println!("raw output: {output:?}");

    let classification = interpret(&output, &labels)?;
    println!(
        "prediction: {} (confidence: {:.2}%)",
        classification.prediction(),
        classification.confidence * 100.0
    );

    if let Some(expect) = &args.expect {
        if classification.prediction() != expect {
            bail!("expected {expect}, got {}", classification.prediction());
        }
        println!("[OK] prediction matches {expect}");
    }

    Ok(())
}
