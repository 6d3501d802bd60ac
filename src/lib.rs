//! Capstan - interactive configuration capture for build tooling.
//!
//! This library provides the core functionality for the `cap` CLI tool:
//! a declared set of groups and properties is captured through an
//! interactive surface (line wizard, file import or defaults), kept
//! consistent by pull-based re-evaluation of visibility/enabled/validation
//! predicates, and persisted as YAML/JSON/XML/properties snapshots.

pub mod capture;
pub mod cli;
pub mod commands;
pub mod model;
pub mod persist;
pub mod schema;

use std::path::PathBuf;


/// Library-level error type for Capstan operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prop '{0}' is not defined")]
    PropNotDefined(String),

    #[error("Config prop '{name}' is not a {expected}")]
    PropType { name: String, expected: &'static str },

    #[error("{0}")]
    DuplicateProps(String),

    #[error("{0}")]
    Validation(String),

    #[error("Config '{config}' prop '{prop}' is null")]
    NullValue { config: String, prop: String },

    #[error("Config prop '{prop}' value '{value}' is not a valid {expected}")]
    InvalidValue {
        prop: String,
        value: String,
        expected: &'static str,
    },

    #[error("Config input mode '{0}' is not supported")]
    UnsupportedInputMode(String),

    #[error(
        "Config '{0}' form surface is not installed: \
         capture with --prompt, --file or --defaults instead"
    )]
    FormUnavailable(String),

    #[error("Config '{config}' is not yet captured: {hint}")]
    NotCaptured { config: String, hint: String },

    #[error("Config '{0}' structure is finalized and cannot be changed")]
    StructureLocked(String),

    #[error("Config file does not exist '{0}'")]
    FileMissing(PathBuf),

    #[error("Config file cannot be read '{path}': {cause}")]
    FileRead { path: PathBuf, cause: String },

    #[error("Config file cannot be saved '{path}': {cause}")]
    FileWrite { path: PathBuf, cause: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Definition file error: {0}")]
    Schema(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Capstan operations.
pub type Result<T> = std::result::Result<T, Error>;
