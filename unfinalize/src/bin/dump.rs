use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;

use unfinalize::{classfile, summary::ClassSummary, HolderMatcher, TransformerConfig};

/// Print a JSON overview of a class file
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input .class file
    class: PathBuf,

    /// Output JSON, stdout when omitted
    output: Option<PathBuf>,

    /// Transformer config (JSON) used to resolve holder markers
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => TransformerConfig::load(path)?,
        None => TransformerConfig::default(),
    };

    let bytes = fs::read(&args.class)
        .with_context(|| format!("failed to read {}", args.class.display()))?;
    let class = classfile::parse(&bytes)
        .with_context(|| format!("{} is not a class file", args.class.display()))?;
    let summary = ClassSummary::new(&class, &HolderMatcher::new(&config))?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &summary)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}
