use crate::core::{emitter, encoder, merge, reader};
use crate::domain::model::{ArtifactKind, Descriptor, GeneratedArtifact, MergeStrategy, TestUnit};
use crate::domain::ports::{Reporter, Storage};
use crate::utils::error::{ModuleError, Result};
use std::path::Path;

pub const SOURCE_FILE: &str = "module-info.java";
pub const BINARY_FILE: &str = "module-info.class";

/// State that outlives a single round. Rounds run strictly one after another.
#[derive(Debug, Default)]
pub struct ProcessingContext {
    round: usize,
}

impl ProcessingContext {
    pub fn round(&self) -> usize {
        self.round
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoundReport {
    pub round: usize,
    pub generated: Vec<GeneratedArtifact>,
    pub failed: Vec<String>,
}

impl RoundReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct TestModuleProcessor<S: Storage, R: Reporter> {
    storage: S,
    reporter: R,
    output_path: String,
    context: ProcessingContext,
}

impl<S: Storage, R: Reporter> TestModuleProcessor<S, R> {
    pub fn new(storage: S, reporter: R, output_path: impl Into<String>) -> Self {
        Self {
            storage,
            reporter,
            output_path: output_path.into(),
            context: ProcessingContext::default(),
        }
    }

    pub fn context(&self) -> &ProcessingContext {
        &self.context
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Processes every unit independently. A failing unit is reported and
    /// skipped; the rest of the round still runs.
    pub fn process_round(&mut self, units: &[TestUnit]) -> RoundReport {
        let round = self.context.round;
        tracing::info!("Processing round #{} ({} units)", round, units.len());

        let mut report = RoundReport {
            round,
            ..RoundReport::default()
        };
        for unit in units {
            match self.process_unit(unit) {
                Ok(artifact) => {
                    self.reporter.note(
                        &unit.name,
                        &format!("wrote {} ({} bytes)", artifact.path, artifact.size),
                    );
                    report.generated.push(artifact);
                }
                Err(e) => {
                    self.reporter.error(&unit.name, &e.to_string());
                    report.failed.push(unit.name.clone());
                }
            }
        }

        self.context.round += 1;
        report
    }

    pub fn process_unit(&self, unit: &TestUnit) -> Result<GeneratedArtifact> {
        let strategy = unit.directives.strategy();
        self.reporter.note(
            &unit.name,
            &format!(
                "{} merge (merge main descriptor: {})",
                strategy, unit.directives.merge
            ),
        );

        let empty = match strategy {
            MergeStrategy::Textual => unit.directives.lines.is_empty(),
            MergeStrategy::Structural => unit.directives.requires.is_empty(),
        };
        if empty {
            return Err(ModuleError::EmptyTestDirectives {
                strategy: strategy.to_string(),
            });
        }

        match strategy {
            MergeStrategy::Textual => {
                let lines = self.textual_lines(unit)?;
                let text = emitter::emit_text(&lines);
                self.write(unit, SOURCE_FILE, ArtifactKind::Source, text.as_bytes())
            }
            MergeStrategy::Structural => {
                let descriptor = self.structural_descriptor(unit)?;
                for name in descriptor.duplicate_requires() {
                    self.reporter.warn(
                        &unit.name,
                        &format!("module `{}` is required more than once", name),
                    );
                }
                let bytes = encoder::encode(&descriptor)?;
                self.write(unit, BINARY_FILE, ArtifactKind::Binary, &bytes)
            }
        }
    }

    fn textual_lines(&self, unit: &TestUnit) -> Result<Vec<String>> {
        let test_lines = &unit.directives.lines;
        if !unit.directives.merge {
            // without a main descriptor the test lines are the whole output
            return Ok(test_lines.clone());
        }
        let path = main_source_path(unit);
        let main_lines = reader::read_source_lines(&self.storage, &path)?;
        self.reporter.note(
            &unit.name,
            &format!("read main descriptor ({} lines): `{}`", main_lines.len(), path),
        );
        merge::merge_textual(&main_lines, test_lines)
    }

    fn structural_descriptor(&self, unit: &TestUnit) -> Result<Descriptor> {
        let main = if !unit.directives.merge {
            reader::parse_source(&unit.name, &unit.directives.lines.join("\n"))?
        } else if let Some(binary) = &unit.main_descriptor_binary_path {
            reader::read_from_binary(&self.storage, binary)?
        } else {
            reader::read_from_text(&self.storage, &main_source_path(unit))?
        };
        merge::merge_structural(&main, &unit.directives.requires)
    }

    fn write(
        &self,
        unit: &TestUnit,
        file: &str,
        kind: ArtifactKind,
        data: &[u8],
    ) -> Result<GeneratedArtifact> {
        let dir = unit.output_path.as_deref().unwrap_or(&self.output_path);
        let path = Path::new(dir).join(file).to_string_lossy().into_owned();
        self.storage.write_file(&path, data)?;
        Ok(GeneratedArtifact {
            unit: unit.name.clone(),
            path,
            kind,
            size: data.len(),
        })
    }
}

pub fn main_source_path(unit: &TestUnit) -> String {
    Path::new(&unit.main_descriptor_path)
        .join(SOURCE_FILE)
        .to_string_lossy()
        .into_owned()
}
