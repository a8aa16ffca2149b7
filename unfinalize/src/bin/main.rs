use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use unfinalize::{
    classfile,
    config::MatchMode,
    jar::{transform_jar, JarEvent, StageProgress},
    ClassTransformer, TransformResult, TransformerConfig,
};

/// Unfinalize holder fields and open up enums in a jar or a single class
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input JAR or .class file
    input: PathBuf,

    /// Output path
    output: PathBuf,

    /// Transformer config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the annotation matching mode
    #[arg(long)]
    match_mode: Option<MatchMode>,

    /// Leave enum classes alone
    #[arg(long)]
    no_enums: bool,

    /// Write the jar report as JSON here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TransformerConfig::load(path)?,
        None => TransformerConfig::default(),
    };
    if let Some(match_mode) = args.match_mode {
        config.match_mode = match_mode;
    }
    if args.no_enums {
        config.extensible_enums = false;
    }
    let transformer = ClassTransformer::new(&config);

    let is_class = args
        .input
        .extension()
        .is_some_and(|extension| extension == "class");
    if is_class {
        return transform_single_class(&args, &transformer);
    }

    let bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    bar.set_style(ProgressStyle::with_template(
        "{msg:22} {bar:40.cyan/blue} {pos:>3}%",
    )?);
    let report = transform_jar(&args.input, &args.output, &transformer, |event: JarEvent| {
        bar.set_message(event.stage.as_str());
        match event.progress {
            StageProgress::Unknown => {}
            StageProgress::Percentage(progress) => bar.set_position((progress * 100.0) as u64),
            StageProgress::Done => bar.set_position(100),
        }
    })?;
    bar.finish_and_clear();

    println!(
        "Modified {} of {} classes ({} failed)",
        report.classes_modified, report.classes_seen, report.classes_failed
    );
    for (mutation, count) in &report.mutations {
        println!("  {mutation}: {count}");
    }
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}

fn transform_single_class(args: &Args, transformer: &ClassTransformer) -> anyhow::Result<()> {
    let bytes = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let class = classfile::parse(&bytes)
        .with_context(|| format!("{} is not a class file", args.input.display()))?;
    let class_name = class.name()?.replace('/', ".");

    match transformer.transform_or_original(&class_name, &class_name, &bytes) {
        TransformResult::Unchanged => {
            println!("{class_name}: unchanged");
            fs::write(&args.output, &bytes)?;
        }
        TransformResult::Modified { bytes, mutations } => {
            println!("{class_name}: {} mutations", mutations.total());
            for (mutation, count) in mutations.iter() {
                println!("  {mutation}: {count}");
            }
            fs::write(&args.output, bytes)?;
        }
    }
    Ok(())
}
