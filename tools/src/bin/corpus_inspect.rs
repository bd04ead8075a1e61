use anyhow::Context;
use clap::Parser;
use corpus_dataset::{summarize_with_thresholds, Corpus, CorpusManager, ValidationThresholds};
use corpus_tools::report::{batch_lines, report_lines};
use corpus_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "corpus_inspect",
    about = "Summarize a corpus and show the layout of one batch"
)]
struct Args {
    #[command(flatten)]
    corpus: cli_support::common::CorpusPathArgs,
    #[command(flatten)]
    manager: cli_support::common::ManagerArgs,
    /// Batch index to show (requires a compiled corpus).
    #[arg(long)]
    batch: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    let cfg = ToolConfig::load();

    let root = &args.corpus.corpus;
    let corpus =
        Corpus::open(root).with_context(|| format!("opening corpus {}", root.display()))?;
    let manager = CorpusManager::new(&corpus, args.manager.apply(cfg.manager_config()))?;

    println!(
        "Corpus {}: {} frames, {} images, compiled={}",
        corpus.name(),
        corpus.frame_count(),
        corpus.image_count()?,
        manager.is_compiled()
    );
    let grid = manager.anchor_grid()?;
    let report = summarize_with_thresholds(&corpus, &grid, &ValidationThresholds::from_env())?;
    for line in report_lines(&report) {
        println!("{line}");
    }
    println!(
        "Anchors: {} (spacing {}); batches: {} of {}",
        grid.len(),
        manager.anchor_factor(),
        manager.batch_count(),
        manager.batch_size()
    );

    if let Some(index) = args.batch {
        let batch = manager
            .batch(index)
            .with_context(|| format!("loading batch {index}"))?;
        for line in batch_lines(&batch) {
            println!("{line}");
        }
    }
    Ok(())
}
