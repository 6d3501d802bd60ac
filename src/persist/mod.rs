//! Persistence pipeline for captured and saved snapshots.
//!
//! The captured (unfiltered) snapshot is written unconditionally by the
//! definition itself and is fatal on failure - it seeds the next run. All
//! other outputs are registered as [`Saver`]s and run independently: a
//! failing saver is logged as a warning and does not abort the run or roll
//! back outputs already written.

pub mod format;
pub mod template;

use crate::model::Definition;
use crate::Result;
use std::path::PathBuf;
use tracing::info;

/// Serialized output formats, one file per format named after the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Yml,
    Json,
    Xml,
    Properties,
}

impl FileType {
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Yml => "yml",
            FileType::Json => "json",
            FileType::Xml => "xml",
            FileType::Properties => "properties",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "yml" | "yaml" => Some(FileType::Yml),
            "json" => Some(FileType::Json),
            "xml" => Some(FileType::Xml),
            "properties" => Some(FileType::Properties),
            _ => None,
        }
    }
}

/// One registered output of the saved (filtered) snapshot.
pub enum Saver {
    Yml,
    Json,
    Xml,
    Properties,
    /// Render a template file into a target file.
    Template { template: PathBuf, target: PathBuf },
    /// Render a template and splice it into a marker-delimited section of a
    /// shared file; the section is named after the definition.
    Section { template: PathBuf, target: PathBuf },
    /// Arbitrary saver supplied by the build script.
    Custom(Box<dyn Fn(&Definition) -> Result<()>>),
}

impl Saver {
    /// Execute this saver against the definition's current saved values.
    pub fn run(&self, def: &Definition) -> Result<()> {
        match self {
            Saver::Yml => {
                let file = def.output_yml_file();
                info!(
                    "Config '{}' is saving filtered values to file '{}'",
                    def.name(),
                    file.display()
                );
                format::write_yaml(&file, &def.values_saved())
            }
            Saver::Json => {
                let file = def.output_json_file();
                info!(
                    "Config '{}' is saving filtered values to file '{}'",
                    def.name(),
                    file.display()
                );
                format::write_json(&file, &def.values_saved())
            }
            Saver::Xml => {
                let file = def.output_xml_file();
                info!(
                    "Config '{}' is saving filtered values to file '{}'",
                    def.name(),
                    file.display()
                );
                format::write_xml(&file, &def.values_saved())
            }
            Saver::Properties => {
                let file = def.output_properties_file();
                info!(
                    "Config '{}' is saving filtered values to file '{}'",
                    def.name(),
                    file.display()
                );
                format::write_properties(&file, &def.values_saved())
            }
            Saver::Template { template, target } => {
                info!(
                    "Config '{}' is rendering template '{}' to file '{}'",
                    def.name(),
                    template.display(),
                    target.display()
                );
                let engine = template::Engine::new(&def.values_saved());
                engine.render_file(template, target)
            }
            Saver::Section { template, target } => {
                info!(
                    "Config '{}' is rendering template '{}' into a section of file '{}'",
                    def.name(),
                    template.display(),
                    target.display()
                );
                let engine = template::Engine::new(&def.values_saved());
                let rendered = engine.render_path(template)?;
                let mut entries = vec![String::new()];
                entries.extend(rendered.lines().map(|l| l.to_string()));
                entries.push(String::new());
                let section = template::Section::new(def.name(), entries);
                section.save(target)
            }
            Saver::Custom(f) => f(def),
        }
    }

    /// Path this saver writes to, when it has a fixed one.
    pub fn output_path(&self, def: &Definition) -> Option<PathBuf> {
        match self {
            Saver::Yml => Some(def.output_yml_file()),
            Saver::Json => Some(def.output_json_file()),
            Saver::Xml => Some(def.output_xml_file()),
            Saver::Properties => Some(def.output_properties_file()),
            Saver::Template { target, .. } | Saver::Section { target, .. } => {
                Some(target.clone())
            }
            Saver::Custom(_) => None,
        }
    }
}
