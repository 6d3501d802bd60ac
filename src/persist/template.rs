//! Template rendering and marker-delimited section splicing.
//!
//! The engine substitutes `{{ path }}` placeholders from two namespaces:
//! `config.*` (the saved snapshot) and `env.*` (process environment).
//! Unresolved placeholders are left as-is. Rendered files are written to a
//! temporary file and atomically swapped into place, so a failure never
//! corrupts a partially-written shared file.
//!
//! A [`Section`] is a named block inside an arbitrary text file, delimited
//! by marker lines. Saving a section replaces its own prior output and
//! leaves surrounding content and other sections untouched, making repeated
//! runs idempotent.

use crate::model::Value;
use crate::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const MARKER_START: &str = "#config-start";
pub const MARKER_END: &str = "#config-end";
pub const MARKER_NAME: &str = "#name";

/// Substitution engine over saved values and the process environment.
pub struct Engine {
    vars: BTreeMap<String, Value>,
}

impl Engine {
    pub fn new(saved: &BTreeMap<String, Value>) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("config".to_string(), Value::Map(saved.clone()));
        let env: BTreeMap<String, Value> = std::env::vars()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        vars.insert("env".to_string(), Value::Map(env));
        Self { vars }
    }

    /// Substitute `{{ dotted.path }}` placeholders in a template string.
    pub fn render_str(&self, template: &str) -> String {
        // unwrap: the pattern is a literal and always compiles
        let pattern = Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").unwrap();
        pattern
            .replace_all(template, |caps: &regex::Captures<'_>| {
                match self.lookup(&caps[1]) {
                    Some(value) => value.flatten(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.vars.get(parts.next()?)?;
        for part in parts {
            current = current.as_map()?.get(part)?;
        }
        Some(current)
    }

    /// Render a template file's content to a string.
    pub fn render_path(&self, template: &Path) -> Result<String> {
        if !template.exists() {
            return Err(Error::Template(format!(
                "Template file does not exist '{}'",
                template.display()
            )));
        }
        let text = fs::read_to_string(template).map_err(|e| Error::FileRead {
            path: template.to_path_buf(),
            cause: e.to_string(),
        })?;
        Ok(self.render_str(&text))
    }

    /// Render a template file into a target file, atomically.
    pub fn render_file(&self, template: &Path, target: &Path) -> Result<()> {
        let rendered = self.render_path(template)?;
        atomic_write(target, &rendered)
    }
}

/// Write through a temporary file in the target directory, then rename.
pub(crate) fn atomic_write(target: &Path, content: &str) -> Result<()> {
    use std::io::Write;

    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| Error::FileWrite {
        path: target.to_path_buf(),
        cause: e.to_string(),
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| Error::FileWrite {
        path: target.to_path_buf(),
        cause: e.to_string(),
    })?;
    tmp.write_all(content.as_bytes()).map_err(|e| Error::FileWrite {
        path: target.to_path_buf(),
        cause: e.to_string(),
    })?;
    tmp.persist(target).map_err(|e| Error::FileWrite {
        path: target.to_path_buf(),
        cause: e.to_string(),
    })?;
    Ok(())
}

/// A named, marker-delimited block of lines inside a shared text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<String>,
}

impl Section {
    pub fn new(name: impl Into<String>, entries: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            entries: entries.into_iter().collect(),
        }
    }

    /// Marker-wrapped text of this section.
    pub fn render(&self) -> String {
        let mut lines = vec![
            MARKER_START.to_string(),
            format!("{}={}", MARKER_NAME, self.name),
        ];
        lines.extend(self.entries.iter().map(|e| e.trim().to_string()));
        lines.push(MARKER_END.to_string());
        lines.join("\n")
    }

    /// Parse all sections out of a text file's content.
    pub fn parse_all(text: &str) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut in_section = false;
        let mut name = String::new();
        let mut lines: Vec<String> = Vec::new();
        let name_prefix = format!("{}=", MARKER_NAME);

        for line in text.lines() {
            let l = line.trim();
            if l == MARKER_START {
                in_section = true;
            } else if l == MARKER_END {
                sections.push(Section::new(name.clone(), lines.drain(..)));
                in_section = false;
                name.clear();
            } else if in_section {
                if let Some(rest) = l.strip_prefix(&name_prefix) {
                    name = rest.to_string();
                } else {
                    lines.push(l.to_string());
                }
            }
        }

        sections
    }

    /// Replace this section's prior output in the target file, or append it.
    /// A missing target is treated as empty.
    pub fn save(&self, target: &Path) -> Result<()> {
        let text = if target.exists() {
            fs::read_to_string(target).map_err(|e| Error::FileRead {
                path: target.to_path_buf(),
                cause: e.to_string(),
            })?
        } else {
            String::new()
        };

        let old = Section::parse_all(&text)
            .into_iter()
            .find(|s| s.name == self.name);
        let updated = match old {
            Some(old) => text.replace(&old.render(), &self.render()),
            None if text.is_empty() => format!("{}\n", self.render()),
            None => format!("{}\n{}\n", text.trim_end_matches('\n'), self.render()),
        };
        atomic_write(target, &updated)
    }
}
