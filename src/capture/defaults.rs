//! Defaults-only surface: no interaction at all.

use crate::capture::{CaptureOutcome, CaptureSurface};
use crate::model::Definition;
use crate::Result;

/// Relies entirely on values already present: the prior snapshot seeded
/// before capture, and declared defaults.
pub struct DefaultsOnly;

impl CaptureSurface for DefaultsOnly {
    fn run(&mut self, _def: &mut Definition) -> Result<CaptureOutcome> {
        Ok(CaptureOutcome::Applied)
    }
}
