//! Interactive-form surface: interface and dispatch only.
//!
//! The desktop widget toolkit is an external collaborator. An embedder
//! installs a renderer through [`Definition::form_surface`]; the renderer is
//! any [`CaptureSurface`] honoring the form contract:
//!
//! - props are visually grouped by their owning group, in declaration order;
//! - only captured props are rendered (constants are excluded);
//! - after every value mutation the renderer calls [`Definition::refresh`]
//!   and re-pulls visibility/enabled/validation state before handing control
//!   back to the event loop - changing one field can show/hide/validate
//!   others synchronously;
//! - closing the form without applying returns
//!   [`CaptureOutcome::Cancelled`].

use crate::capture::{CaptureOutcome, CaptureSurface};
use crate::model::Definition;
use crate::{Error, Result};

/// Run the installed form surface, or fail with a structural error when
/// none is available (e.g. a headless environment).
pub fn run_form(def: &mut Definition) -> Result<CaptureOutcome> {
    match def.form_surface.take() {
        Some(mut surface) => {
            let outcome = surface.run(def);
            def.form_surface = Some(surface);
            outcome
        }
        None => Err(Error::FormUnavailable(def.name().to_string())),
    }
}
