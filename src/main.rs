use anyhow::Context as _;
use clap::Parser;
use std::{fs, path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of the grammar definition file.
    grammar: PathBuf,

    /// The token string to parse (whitespace separated; empty means end of
    /// input only).
    #[arg(short, long, default_value = "")]
    input: String,

    /// Emit the artifact bundle on a single line.
    #[arg(long)]
    compact: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    let source = fs::read_to_string(&args.grammar)
        .with_context(|| anyhow::anyhow!("failed to read {}", args.grammar.display()))?;

    let s = Instant::now();
    let analysis = lr1_studio::analyze(&source, &args.input)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.grammar.display()))?;
    tracing::info!("analyze: {:?} elapsed", s.elapsed());

    let rendered = if args.compact {
        serde_json::to_string(&analysis)?
    } else {
        serde_json::to_string_pretty(&analysis)?
    };
    println!("{rendered}");

    Ok(())
}
