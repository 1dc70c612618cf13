//! Organizes a directory of labeled images into the train/val layout the
//! training pipeline expects:
//!
//! ```text
//! output/
//!   train/vest/  train/no_vest/
//!   val/vest/    val/no_vest/
//! ```
//!
//! Class membership comes from the file path: any path containing
//! `no_vest` is negative, any other path containing `vest` is positive,
//! everything else is ignored. Zero-byte files are skipped.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::info;

use vest_detect::cli::init_tracing;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source directory to scan recursively for images
    #[arg(long)]
    source: PathBuf,

    /// Output directory for the organized split
    #[arg(long)]
    output: PathBuf,

    /// Fraction of each class used for training
    #[arg(long, default_value_t = 0.8)]
    split: f64,

    /// Shuffle seed, for reproducible splits
    #[arg(long)]
    seed: Option<u64>,

    /// Diagnostic verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Vest,
    NoVest,
}

impl Bucket {
    fn dir_name(self) -> &'static str {
        match self {
            Bucket::Vest => "vest",
            Bucket::NoVest => "no_vest",
        }
    }
}

/// Class of a file judged by its path. `vest` is a substring of `no_vest`,
/// so the negative class must be checked first.
fn bucket_for(path: &Path) -> Option<Bucket> {
    let lower = path.to_string_lossy().to_lowercase();
    if lower.contains("no_vest") {
        Some(Bucket::NoVest)
    } else if lower.contains("vest") {
        Some(Bucket::Vest)
    } else {
        None
    }
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg" | "png")
    )
}

fn collect_images(
    dir: &Path,
    vest: &mut Vec<PathBuf>,
    no_vest: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_images(&path, vest, no_vest)?;
        } else if is_image(&path) && entry.metadata()?.len() != 0 {
            match bucket_for(&path) {
                Some(Bucket::Vest) => vest.push(path),
                Some(Bucket::NoVest) => no_vest.push(path),
                None => {}
            }
        }
    }
    Ok(())
}

/// Shuffle one class, carve off the training share and copy both halves
/// into place. Returns the (train, val) counts.
fn split_and_copy(
    mut images: Vec<PathBuf>,
    output: &Path,
    bucket: Bucket,
    train_split: f64,
    rng: &mut StdRng,
) -> anyhow::Result<(usize, usize)> {
    images.shuffle(rng);
    let train_count = (images.len() as f64 * train_split) as usize;

    let train_dir = output.join("train").join(bucket.dir_name());
    let val_dir = output.join("val").join(bucket.dir_name());
    fs::create_dir_all(&train_dir)?;
    fs::create_dir_all(&val_dir)?;

    let jobs: Vec<(PathBuf, PathBuf)> = images
        .iter()
        .enumerate()
        .map(|(i, src)| {
            let dir = if i < train_count { &train_dir } else { &val_dir };
            let name = src.file_name().unwrap_or(src.as_os_str());
            (src.clone(), dir.join(name))
        })
        .collect();

    jobs.par_iter().try_for_each(|(src, dst)| {
        fs::copy(src, dst)
            .map(|_| ())
            .with_context(|| format!("copying {} to {}", src.display(), dst.display()))
    })?;

    Ok((train_count, images.len() - train_count))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if !(0.0..=1.0).contains(&args.split) {
        bail!("--split must be between 0 and 1, got {}", args.split);
    }
    if !args.source.is_dir() {
        bail!("source directory not found: {}", args.source.display());
    }

    let mut vest = Vec::new();
    let mut no_vest = Vec::new();
    collect_images(&args.source, &mut vest, &mut no_vest)
        .with_context(|| format!("walking {}", args.source.display()))?;
    info!("found {} vest and {} no_vest images", vest.len(), no_vest.len());

    // Directory iteration order is not stable across filesystems; sort so a
    // fixed seed reproduces the same split anywhere.
    vest.sort();
    no_vest.sort();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (train_vest, val_vest) =
        split_and_copy(vest, &args.output, Bucket::Vest, args.split, &mut rng)?;
    let (train_no_vest, val_no_vest) =
        split_and_copy(no_vest, &args.output, Bucket::NoVest, args.split, &mut rng)?;

    println!("train: {train_vest} vest, {train_no_vest} no_vest");
    println!("val:   {val_vest} vest, {val_no_vest} no_vest");
    println!("dataset written to {}", args.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_class_is_not_swallowed_by_positive_substring() {
        assert_eq!(
            bucket_for(Path::new("data/no_vest_01.jpg")),
            Some(Bucket::NoVest)
        );
        assert_eq!(bucket_for(Path::new("data/vest_01.jpg")), Some(Bucket::Vest));
        assert_eq!(
            bucket_for(Path::new("data/no_vest/img_01.jpg")),
            Some(Bucket::NoVest)
        );
        assert_eq!(
            bucket_for(Path::new("data/vest/img_01.jpg")),
            Some(Bucket::Vest)
        );
        assert_eq!(bucket_for(Path::new("data/background.jpg")), None);
    }

    #[test]
    fn only_image_extensions_are_collected() {
        assert!(is_image(Path::new("a.jpg")));
        assert!(is_image(Path::new("a.JPEG")));
        assert!(is_image(Path::new("a.PNG")));
        assert!(!is_image(Path::new("a.txt")));
        assert!(!is_image(Path::new("a.gif")));
        assert!(!is_image(Path::new("jpg")));
    }

    #[test]
    fn split_counts_follow_the_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let output = dir.path().join("output");

        fs::create_dir_all(source.join("vest")).unwrap();
        fs::create_dir_all(source.join("no_vest")).unwrap();
        for i in 0..10 {
            fs::write(source.join("vest").join(format!("img_{i}.jpg")), b"x").unwrap();
        }
        for i in 0..5 {
            fs::write(source.join("no_vest").join(format!("img_{i}.jpg")), b"x").unwrap();
        }
        fs::write(source.join("notes.txt"), b"not an image").unwrap();
        fs::write(source.join("unrelated.jpg"), b"no class in path").unwrap();
        fs::write(source.join("vest").join("empty.jpg"), b"").unwrap();

        let mut vest = Vec::new();
        let mut no_vest = Vec::new();
        collect_images(&source, &mut vest, &mut no_vest).unwrap();
        assert_eq!(vest.len(), 10);
        assert_eq!(no_vest.len(), 5);

        let mut rng = StdRng::seed_from_u64(7);
        let (train_v, val_v) = split_and_copy(vest, &output, Bucket::Vest, 0.8, &mut rng).unwrap();
        let (train_n, val_n) =
            split_and_copy(no_vest, &output, Bucket::NoVest, 0.8, &mut rng).unwrap();

        // int(10 * 0.8) = 8 and int(5 * 0.8) = 4, remainder goes to val.
        assert_eq!((train_v, val_v), (8, 2));
        assert_eq!((train_n, val_n), (4, 1));

        let count = |p: &Path| fs::read_dir(p).unwrap().count();
        assert_eq!(count(&output.join("train").join("vest")), 8);
        assert_eq!(count(&output.join("val").join("vest")), 2);
        assert_eq!(count(&output.join("train").join("no_vest")), 4);
        assert_eq!(count(&output.join("val").join("no_vest")), 1);
    }

    #[test]
    fn same_seed_gives_same_split() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("vest")).unwrap();
        for i in 0..20 {
            fs::write(source.join("vest").join(format!("img_{i}.jpg")), b"x").unwrap();
        }

        let mut runs = Vec::new();
        for run in 0..2 {
            let output = dir.path().join(format!("out_{run}"));
            let mut vest = Vec::new();
            let mut no_vest = Vec::new();
            collect_images(&source, &mut vest, &mut no_vest).unwrap();
            vest.sort();
            let mut rng = StdRng::seed_from_u64(42);
            split_and_copy(vest, &output, Bucket::Vest, 0.5, &mut rng).unwrap();

            let mut names: Vec<String> = fs::read_dir(output.join("train").join("vest"))
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            runs.push(names);
        }
        assert_eq!(runs[0], runs[1]);
    }
}
