mod common;

use std::{
    fs,
    io::{Cursor, Read},
};

use common::*;
use tempfile::tempdir;
use unfinalize::{
    classfile,
    jar::{transform_archive, transform_jar, JarEvent, Stage, StageProgress},
    ClassTransformer, Mutation,
};
use zip::ZipArchive;

const MANIFEST: &[u8] = b"Manifest-Version: 1.0\r\n\r\n";

fn entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..zip.len())
        .map(|idx| {
            let mut file = zip.by_index(idx).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_owned(), data)
        })
        .collect()
}

#[test]
fn jar_pass_rewrites_only_what_it_must() {
    let blocks = blocks_class();
    let plain = plain_class();
    let broken = b"\xca\xfe\xba\xbe not a class".to_vec();
    let input = jar_bytes(&[
        ("META-INF/MANIFEST.MF", MANIFEST),
        ("net/minecraft/init/Blocks.class", blocks.as_slice()),
        ("com/example/Plain.class", plain.as_slice()),
        ("com/example/Color.class", color_enum().as_slice()),
        ("com/example/Broken.class", broken.as_slice()),
    ]);

    let dir = tempdir().unwrap();
    let jar_in = dir.path().join("in.jar");
    let jar_out = dir.path().join("out.jar");
    fs::write(&jar_in, &input).unwrap();

    let mut events = Vec::new();
    let report = transform_jar(&jar_in, &jar_out, &ClassTransformer::default(), |event| {
        events.push(event)
    })
    .unwrap();

    assert_eq!(report.entries, 5);
    assert_eq!(report.classes_seen, 4);
    assert_eq!(report.classes_modified, 2);
    assert_eq!(report.classes_failed, 1);
    assert_eq!(
        report.modified,
        vec!["net/minecraft/init/Blocks.class", "com/example/Color.class"]
    );
    assert_eq!(report.mutations[&Mutation::HolderFieldUnfinalized], 3);
    assert_eq!(report.mutations[&Mutation::EnumAppendMethodAdded], 1);
    assert_eq!(report.total_mutations(), 6);

    let output = entries(fs::read(&jar_out).unwrap());
    let names: Vec<_> = output.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "META-INF/MANIFEST.MF",
            "net/minecraft/init/Blocks.class",
            "com/example/Plain.class",
            "com/example/Color.class",
            "com/example/Broken.class",
        ]
    );
    assert_eq!(output[0].1, MANIFEST);
    assert_ne!(output[1].1, blocks);
    assert!(classfile::parse(&output[1].1)
        .unwrap()
        .fields
        .iter()
        .all(|field| !field.is_final()));
    assert_eq!(output[2].1, plain);
    assert_eq!(output[4].1, broken);

    assert_eq!(events.first().map(|event| event.stage), Some(Stage::LoadingEntries));
    assert!(events.contains(&JarEvent {
        stage: Stage::TransformingClasses,
        progress: StageProgress::Done,
    }));
    assert_eq!(
        events.last(),
        Some(&JarEvent {
            stage: Stage::WritingJar,
            progress: StageProgress::Done,
        })
    );
}

#[test]
fn rewritten_jar_is_a_fixed_point() {
    let input = jar_bytes(&[
        ("net/minecraft/init/Items.class", blocks_class().as_slice()),
        ("com/example/Foo.class", foo_class().as_slice()),
    ]);
    let transformer = ClassTransformer::default();

    let mut once = Vec::new();
    let first = transform_archive(
        &mut ZipArchive::new(Cursor::new(input)).unwrap(),
        Cursor::new(&mut once),
        &transformer,
        |_| {},
    )
    .unwrap();
    // Items is matched by entry name, not by the class inside.
    assert_eq!(first.classes_modified, 2);

    let second = transform_archive(
        &mut ZipArchive::new(Cursor::new(once)).unwrap(),
        Cursor::new(Vec::new()),
        &transformer,
        |_| {},
    )
    .unwrap();
    assert_eq!(second.classes_seen, 2);
    assert_eq!(second.classes_modified, 0);
    assert!(second.mutations.is_empty());
}

#[test]
fn missing_input_jar_is_an_error() {
    let dir = tempdir().unwrap();
    let err = transform_jar(
        dir.path().join("absent.jar"),
        dir.path().join("out.jar"),
        &ClassTransformer::default(),
        |_| {},
    )
    .unwrap_err();
    assert!(err.to_string().contains("failed to open"), "{err}");
}
