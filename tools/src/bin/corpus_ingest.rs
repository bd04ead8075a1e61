use anyhow::Context;
use clap::Parser;
use corpus_dataset::{summarize_with_thresholds, AnchorGrid, Corpus, ValidationThresholds};
use corpus_tools::report::report_lines;
use corpus_tools::ToolConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "corpus_ingest",
    about = "Create (or reopen) a corpus and ingest frame sequences into it"
)]
struct Args {
    /// Image directory (or, with --multi, a root of per-sequence image directories).
    #[arg(long)]
    images: PathBuf,
    /// Annotation file (or, with --multi, the directory holding one file per sequence).
    #[arg(long)]
    annotations: PathBuf,
    /// Parent directory for a new corpus (defaults to corpora_root from the tools config).
    #[arg(long)]
    savedir: Option<PathBuf>,
    /// Name for a new corpus; random when omitted.
    #[arg(long)]
    name: Option<String>,
    /// Append to an existing corpus directory instead of creating one.
    #[arg(long, conflicts_with_all = ["savedir", "name"])]
    open: Option<PathBuf>,
    /// Divisor applied to box coordinates before truncation.
    #[arg(long)]
    correction: Option<f64>,
    /// Treat --images and --annotations as roots holding several sequences.
    #[arg(long, default_value_t = false)]
    multi: bool,
    /// Annotation file extension used with --multi.
    #[arg(long)]
    ext: Option<String>,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    let cfg = ToolConfig::load();
    let correction = args.correction.unwrap_or(cfg.downsample_correction);

    let mut corpus = match &args.open {
        Some(root) => {
            Corpus::open(root).with_context(|| format!("opening corpus {}", root.display()))?
        }
        None => {
            let savedir = args.savedir.as_ref().unwrap_or(&cfg.corpora_root);
            Corpus::create(savedir, args.name.as_deref())
                .with_context(|| format!("creating corpus under {}", savedir.display()))?
        }
    };

    let loaded = if args.multi {
        let ext = args.ext.as_deref().unwrap_or(&cfg.annotation_ext);
        corpus.load_dirs(&args.images, &args.annotations, ext, correction)
    } else {
        corpus
            .load_dir(&args.images, &args.annotations, correction)
            .map(|r| vec![r])
    };
    let reports = loaded.with_context(|| format!("ingesting {}", args.images.display()))?;

    for r in &reports {
        println!(
            "Loaded {} annotations and {} images (first key {})",
            r.annotations, r.images, r.first_key
        );
    }
    println!(
        "Corpus {} at {}: {} frames, {} images",
        corpus.name(),
        corpus.root().display(),
        corpus.frame_count(),
        corpus.image_count()?
    );

    let manager_cfg = cfg.manager_config();
    let grid = AnchorGrid::new(manager_cfg.geometry, manager_cfg.anchor_factor)?;
    let report = summarize_with_thresholds(&corpus, &grid, &ValidationThresholds::from_env())?;
    for line in report_lines(&report) {
        println!("{line}");
    }
    Ok(())
}
