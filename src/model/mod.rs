//! Data model for configuration capture.
//!
//! This module defines the reactive core:
//! - `Value` - raw values with shape checks and persistence-time coercion
//! - `Prop` - a named configurable unit with predicate-backed state
//! - `Group` - an ordered collection of props
//! - `Definition` - the root aggregate orchestrating the capture lifecycle
//!
//! Evaluation is pull-based: reading any dynamic field recomputes it from
//! current values, so there is no dirty-flag invalidation and results are
//! never stale.

pub mod definition;
pub mod group;
pub mod label;
pub mod prop;
pub mod value;

pub use definition::{Definition, SaveFilter};
pub use group::Group;
pub use prop::{Flag, OptionsStyle, Prop, PropKind};
pub use value::{Value, ValueType};
