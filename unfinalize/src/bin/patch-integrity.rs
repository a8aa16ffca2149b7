use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

use unfinalize::{classfile, ClassTransformer, TransformResult, TransformerConfig};

/// Transform a class and check the result is sound: it parses, validates,
/// and a second pass leaves it alone
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input .class file
    class: PathBuf,

    /// Dotted class name to match on, taken from the class itself when omitted
    #[arg(long)]
    name: Option<String>,

    /// Transformer config (JSON)
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
    let transformer = ClassTransformer::new(&config);

    let input = fs::read(&args.class)
        .with_context(|| format!("failed to read {}", args.class.display()))?;
    let name = match args.name {
        Some(name) => name,
        None => classfile::parse(&input)?.name()?.replace('/', "."),
    };
    println!("input  {:x}  {}", md5::compute(&input), name);

    let (output, mutations) = match transformer.transform_class(&name, &input)? {
        TransformResult::Unchanged => {
            println!("unchanged");
            return Ok(());
        }
        TransformResult::Modified { bytes, mutations } => (bytes, mutations),
    };
    println!("output {:x}  {} mutations", md5::compute(&output), mutations.total());

    let class = classfile::parse(&output).context("output does not parse")?;
    class.validate().context("output does not validate")?;
    if classfile::serialize(&class)? != output {
        bail!("output does not round-trip byte for byte");
    }
    if transformer.transform_class(&name, &output)?.is_modified() {
        bail!("second pass changed the output again");
    }

    println!("ok");
    Ok(())
}
