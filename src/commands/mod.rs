//! Command implementations for the Capstan CLI.
//!
//! Commands bridge the parsed CLI arguments to the library: they load the
//! definition file, apply the run flags, execute the capture lifecycle or
//! read back the captured snapshot, and return a JSON-able result for the
//! output layer.

use crate::capture::{CaptureOutcome, InputMode};
use crate::model::Definition;
use crate::persist::Saver;
use crate::{schema, Error, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flags of the `cap capture` command.
#[derive(Debug, Default)]
pub struct CaptureOptions {
    pub prompt: bool,
    pub form: bool,
    pub file: Option<PathBuf>,
    pub defaults: bool,
    pub fresh: bool,
    pub debug: bool,
    pub strict: bool,
}

/// Load the definition file and anchor its output directory under the
/// project directory.
fn load(project: &Path, definition_file: &Path) -> Result<Definition> {
    let path = resolve(project, definition_file);
    let mut def = schema::load_definition(&path)?;
    if def.output_dir.is_relative() {
        def.output_dir = project.join(&def.output_dir);
    }
    Ok(def)
}

fn resolve(project: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        project.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Run the capture lifecycle. Cancellation is fatal only in strict mode.
pub fn capture(
    project: &Path,
    definition_file: &Path,
    opts: CaptureOptions,
) -> Result<serde_json::Value> {
    let mut def = load(project, definition_file)?;

    if opts.defaults {
        def.input_mode = InputMode::Defaults;
    }
    if let Some(file) = &opts.file {
        def.input_mode = InputMode::File;
        def.input_file = Some(resolve(project, file));
    }
    if opts.prompt {
        def.input_mode = InputMode::Prompt;
    }
    if opts.form {
        def.input_mode = InputMode::Form;
    }
    if opts.fresh {
        def.fresh = true;
    }
    if opts.debug {
        def.debug = true;
    }
    if opts.strict {
        def.strict = Some(true);
    }

    match def.capture()? {
        CaptureOutcome::Applied => Ok(json!({
            "status": "applied",
            "config": def.name(),
            "captured_file": def.output_captured_file().display().to_string(),
        })),
        CaptureOutcome::Cancelled => {
            let message = format!("Config '{}' capture has been cancelled", def.name());
            if def.is_strict() {
                Err(Error::Cancelled(message))
            } else {
                info!("{message}");
                Ok(json!({
                    "status": "cancelled",
                    "config": def.name(),
                }))
            }
        }
    }
}

/// Show the captured values (seeded from the last snapshot).
pub fn show(project: &Path, definition_file: &Path) -> Result<serde_json::Value> {
    let mut def = load(project, definition_file)?;
    def.require_captured()?;
    def.load()?;
    Ok(serde_json::to_value(def.values())?)
}

/// Print one captured value (JSON null when unset).
pub fn value(project: &Path, definition_file: &Path, prop: &str) -> Result<serde_json::Value> {
    let mut def = load(project, definition_file)?;
    def.require_captured()?;
    def.load()?;
    let value = def.value_or_null(prop)?;
    Ok(serde_json::to_value(value)?)
}

/// List the snapshot path and every registered output path.
pub fn paths(project: &Path, definition_file: &Path) -> Result<serde_json::Value> {
    let def = load(project, definition_file)?;
    let outputs: Vec<String> = def
        .savers()
        .iter()
        .filter_map(|s: &Saver| s.output_path(&def))
        .map(|p| p.display().to_string())
        .collect();
    Ok(json!({
        "config": def.name(),
        "captured_file": def.output_captured_file().display().to_string(),
        "outputs": outputs,
    }))
}
