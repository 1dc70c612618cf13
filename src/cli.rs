use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

/// Command line surface of the test bench.
#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Images to classify
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// ONNX model path
    #[arg(long, default_value = "models/vest_model.onnx")]
    pub model: PathBuf,

    /// Label file, one class name per line
    #[arg(long, default_value = "models/labels.txt")]
    pub labels: PathBuf,

    /// Pixel normalization: centered, unit or imagenet
    #[arg(long, default_value = "centered")]
    pub normalize: String,

    /// Run on the CUDA execution provider instead of the CPU
    #[arg(long)]
    pub cuda: bool,

    /// Emit the per-image reports as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Diagnostic verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Logging goes to stderr so `--json` output on stdout stays parseable.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
