//! Snapshot readers and writers.
//!
//! YAML and JSON go through serde and round-trip the full value shapes.
//! The XML-properties document and the Java-properties text are flat
//! formats: nested values are flattened to strings.

use crate::model::Value;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub fn read_yaml(path: &Path) -> Result<BTreeMap<String, Value>> {
    let text = read_text(path)?;
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_yaml::from_str(&text).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })
}

pub fn read_json(path: &Path) -> Result<BTreeMap<String, Value>> {
    let text = read_text(path)?;
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&text).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })
}

fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::FileMissing(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })
}

pub fn write_yaml(path: &Path, values: &BTreeMap<String, Value>) -> Result<()> {
    let text = serde_yaml::to_string(values).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })?;
    write_text(path, &text)
}

pub fn write_json(path: &Path, values: &BTreeMap<String, Value>) -> Result<()> {
    let mut text = serde_json::to_string_pretty(values).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })?;
    text.push('\n');
    write_text(path, &text)
}

/// Flattened XML-properties document: `<entry key="name">value</entry>` per
/// prop, values flattened to strings.
pub fn write_xml(path: &Path, values: &BTreeMap<String, Value>) -> Result<()> {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    out.push_str("<!DOCTYPE properties SYSTEM \"http://java.sun.com/dtd/properties.dtd\">\n");
    out.push_str("<properties>\n");
    for (key, value) in values {
        out.push_str(&format!(
            "<entry key=\"{}\">{}</entry>\n",
            xml_escape(key),
            xml_escape(&value.flatten())
        ));
    }
    out.push_str("</properties>\n");
    write_text(path, &out)
}

/// Java-properties text with a timestamp header, values flattened to strings.
pub fn write_properties(path: &Path, values: &BTreeMap<String, Value>) -> Result<()> {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", chrono::Local::now().to_rfc2822()));
    for (key, value) in values {
        out.push_str(&format!(
            "{}={}\n",
            properties_escape(key, true),
            properties_escape(&value.flatten(), false)
        ));
    }
    write_text(path, &out)
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::FileWrite {
                path: path.to_path_buf(),
                cause: e.to_string(),
            })?;
        }
    }
    fs::write(path, text).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn properties_escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(ch);
            }
            ' ' if is_key => out.push_str("\\ "),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::s;

    fn sample_values() -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        values.insert("infra".to_string(), s("aws"));
        values.insert("port".to_string(), Value::Int(8080));
        values.insert(
            "packages".to_string(),
            Value::List(vec!["a".to_string(), "b".to_string()]),
        );
        values
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/app.yml");
        let values = sample_values();

        write_yaml(&path, &values).unwrap();
        let read = read_yaml(&path).unwrap();
        assert_eq!(read, values);
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        let values = sample_values();

        write_json(&path, &values).unwrap();
        let read = read_json(&path).unwrap();
        assert_eq!(read, values);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            read_yaml(Path::new("no/such/file.yml")),
            Err(Error::FileMissing(_))
        ));
    }

    #[test]
    fn test_read_empty_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yml");
        fs::write(&path, "").unwrap();
        assert!(read_yaml(&path).unwrap().is_empty());
    }

    #[test]
    fn test_xml_output_flattens_and_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.xml");
        let mut values = sample_values();
        values.insert("motto".to_string(), s("fast & <loose>"));

        write_xml(&path, &values).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<entry key=\"infra\">aws</entry>"));
        assert!(text.contains("<entry key=\"packages\">a,b</entry>"));
        assert!(text.contains("fast &amp; &lt;loose&gt;"));
        assert!(text.starts_with("<?xml"));
    }

    #[test]
    fn test_properties_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");

        write_properties(&path, &sample_values()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# "));
        assert!(text.contains("infra=aws\n"));
        assert!(text.contains("packages=a,b\n"));
        assert!(text.contains("port=8080\n"));
    }

    #[test]
    fn test_properties_escaping() {
        let mut values = BTreeMap::new();
        values.insert("multi line".to_string(), s("a\nb"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        write_properties(&path, &values).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("multi\\ line=a\\nb\n"));
    }
}
