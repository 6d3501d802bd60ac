//! File-import surface: assign values from an external YAML or JSON file.

use crate::capture::{CaptureOutcome, CaptureSurface};
use crate::model::Definition;
use crate::Result;

/// Reads the definition's input file and assigns its top-level keys
/// directly as prop values by name. Unknown keys are ignored; a missing
/// file is fatal.
pub struct FileImport;

impl CaptureSurface for FileImport {
    fn run(&mut self, def: &mut Definition) -> Result<CaptureOutcome> {
        def.read_input_values()?;
        Ok(CaptureOutcome::Applied)
    }
}
