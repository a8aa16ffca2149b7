use std::{
    fs::File,
    io::{Read, Seek, Write},
    path::Path,
};

use anyhow::Context;
use tracing::{debug, info};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{
    jar::types::{JarEvent, JarReport, Stage, StageProgress},
    transform::{log_failure, ClassTransformer, TransformResult},
};

const CLASS_SUFFIX: &str = ".class";
const VERSIONED_PREFIX: &str = "META-INF/versions/";
// About a hundred reports for a large jar
const PROGRESS_EVERY: usize = 200;

/// Dotted class name for a jar entry, or `None` when the entry is not a
/// loadable class. Multi-release entries map to the class they shadow.
pub fn class_name_for_entry(entry_name: &str) -> Option<String> {
    let mut stem = entry_name.strip_suffix(CLASS_SUFFIX)?;
    if let Some(versioned) = stem.strip_prefix(VERSIONED_PREFIX) {
        stem = versioned.split_once('/')?.1;
    }
    if stem.is_empty() || stem.ends_with('/') || stem.rsplit('/').next() == Some("module-info") {
        return None;
    }
    Some(stem.replace('/', "."))
}

pub fn transform_jar(
    jar_in: impl AsRef<Path>,
    jar_out: impl AsRef<Path>,
    transformer: &ClassTransformer,
    report_progress: impl FnMut(JarEvent),
) -> anyhow::Result<JarReport> {
    let (jar_in, jar_out) = (jar_in.as_ref(), jar_out.as_ref());
    let file =
        File::open(jar_in).with_context(|| format!("failed to open {}", jar_in.display()))?;
    let mut zip = ZipArchive::new(file)
        .with_context(|| format!("{} is not a readable jar", jar_in.display()))?;
    let out =
        File::create(jar_out).with_context(|| format!("failed to create {}", jar_out.display()))?;

    let report = transform_archive(&mut zip, out, transformer, report_progress)?;
    info!(
        "Rewrote {} of {} classes from {} into {}",
        report.classes_modified,
        report.classes_seen,
        jar_in.display(),
        jar_out.display()
    );
    Ok(report)
}

/// Copies `zip` into a new archive written to `out`, transforming classes
/// on the way. Entry order is preserved.
pub fn transform_archive<R: Read + Seek, W: Write + Seek>(
    zip: &mut ZipArchive<R>,
    out: W,
    transformer: &ClassTransformer,
    mut report_progress: impl FnMut(JarEvent),
) -> anyhow::Result<JarReport> {
    report_progress(Stage::LoadingEntries.into());

    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut report = JarReport {
        entries: zip.len(),
        ..Default::default()
    };
    let mut buffer = Vec::new();

    report_progress(JarEvent {
        stage: Stage::TransformingClasses,
        progress: StageProgress::Percentage(0.0),
    });
    for idx in 0..zip.len() {
        let mut file = zip.by_index(idx)?;
        let entry_name = file.name().to_owned();

        let patched = match class_name_for_entry(&entry_name) {
            Some(class_name) if file.is_file() => {
                report.classes_seen += 1;
                buffer.clear();
                buffer.reserve(file.size() as usize);
                file.read_to_end(&mut buffer)
                    .with_context(|| format!("failed to read {entry_name}"))?;

                match transformer.transform_class(&class_name, &buffer) {
                    Ok(TransformResult::Modified { bytes, mutations }) => {
                        report.record(&entry_name, &mutations);
                        Some(bytes)
                    }
                    Ok(TransformResult::Unchanged) => None,
                    Err(err) => {
                        log_failure(&entry_name, &class_name, &err);
                        report.classes_failed += 1;
                        None
                    }
                }
            }
            _ => None,
        };
        drop(file);

        match patched {
            Some(bytes) => {
                debug!("Writing patched {}", entry_name);
                writer.start_file(entry_name.as_str(), options)?;
                writer.write_all(&bytes)?;
            }
            None => writer.raw_copy_file(zip.by_index_raw(idx)?)?,
        }

        if idx % PROGRESS_EVERY == 0 {
            report_progress(JarEvent {
                stage: Stage::TransformingClasses,
                progress: StageProgress::Percentage(idx as f32 / zip.len() as f32),
            });
        }
    }
    report_progress(JarEvent {
        stage: Stage::TransformingClasses,
        progress: StageProgress::Done,
    });

    report_progress(Stage::WritingJar.into());
    writer.finish()?;
    report_progress(JarEvent {
        stage: Stage::WritingJar,
        progress: StageProgress::Done,
    });

    Ok(report)
}
