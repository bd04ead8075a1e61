use anyhow::Context;
use clap::Parser;
use corpus_dataset::{Corpus, CorpusManager};
use corpus_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "corpus_compile",
    about = "Assign ground-truth boxes to the anchor grid (once per corpus)"
)]
struct Args {
    #[command(flatten)]
    corpus: cli_support::common::CorpusPathArgs,
    #[command(flatten)]
    manager: cli_support::common::ManagerArgs,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    let cfg = ToolConfig::load();

    let root = &args.corpus.corpus;
    let corpus =
        Corpus::open(root).with_context(|| format!("opening corpus {}", root.display()))?;
    let mut manager = CorpusManager::new(&corpus, args.manager.apply(cfg.manager_config()))?;
    let anchors = manager.anchor_count();
    let output = manager
        .compile()
        .with_context(|| format!("compiling {}", root.display()))?;
    println!(
        "Compiled {} frames onto {} anchors (spacing {}, grid {}x{})",
        output.frames(),
        anchors,
        output.anchor_factor,
        output.geometry.width,
        output.geometry.height
    );
    Ok(())
}
