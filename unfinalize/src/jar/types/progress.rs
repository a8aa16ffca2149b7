#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JarEvent {
    pub stage: Stage,
    pub progress: StageProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadingEntries,
    TransformingClasses,
    WritingJar,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::LoadingEntries => "Loading Entries",
            Stage::TransformingClasses => "Transforming Classes",
            Stage::WritingJar => "Writing JAR",
        }
    }
}

impl From<Stage> for JarEvent {
    fn from(value: Stage) -> Self {
        JarEvent {
            stage: value,
            progress: StageProgress::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageProgress {
    Unknown,
    Percentage(f32),
    Done,
}
