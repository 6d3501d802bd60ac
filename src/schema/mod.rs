//! Declarative definition files for the `cap` binary.
//!
//! A `capstan.kdl` file declares a definition the same way a build script
//! would through the library API, minus arbitrary predicate closures:
//! equality-based `visible-when` / `enabled-when` conditions cover the
//! declarative subset and compile to predicates.
//!
//! # KDL Schema
//!
//! ```kdl
//! config "app" {
//!     label "Application Setup"
//!     output-dir ".capstan"
//!     save "yml" "json" "xml" "properties"
//!     save-filter "visible"  // "all" | "visible" | "enabled"
//!     abbrs "gat"
//!
//!     group "general" {
//!         description "Infrastructure selection"
//!         prop "infra" {
//!             value "aws"
//!             options "local" "aws" "gcp" "az"
//!         }
//!         prop "envType" {
//!             options "afe_single" "aem_single"
//!             visible-when "infra" ne="local"
//!         }
//!         list-prop "packages" {
//!             values "core" "ui"
//!             optional
//!         }
//!         map-prop "tags" {
//!             entry "team" "platform"
//!             optional
//!         }
//!         const "domain" "app.example.com"
//!     }
//! }
//! ```

use crate::capture::InputMode;
use crate::model::{Definition, Group, Prop, ValueType, Value};
use crate::persist::FileType;
use crate::{Error, Result};
use kdl::{KdlDocument, KdlNode};
use std::collections::BTreeMap;
use std::path::Path;

/// Load the first `config` block of a definition file.
pub fn load_definition(path: &Path) -> Result<Definition> {
    if !path.exists() {
        return Err(Error::FileMissing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })?;
    let doc: KdlDocument = content.parse().map_err(|e| {
        Error::Schema(format!("cannot parse '{}': {e}", path.display()))
    })?;

    let node = doc
        .nodes()
        .iter()
        .find(|n| n.name().value() == "config")
        .ok_or_else(|| {
            Error::Schema(format!("no 'config' block found in '{}'", path.display()))
        })?;
    parse_config(node)
}

fn parse_config(node: &KdlNode) -> Result<Definition> {
    let name = first_string_arg(node).unwrap_or_else(|| "default".to_string());
    let mut def = Definition::new(name);

    let Some(children) = node.children() else {
        return Ok(def);
    };
    for child in children.nodes() {
        match child.name().value() {
            "label" => def.label = Some(require_string_arg(child)?),
            "output-dir" => def.output_dir = require_string_arg(child)?.into(),
            "input-mode" => def.input_mode = require_string_arg(child)?.parse::<InputMode>()?,
            "abbrs" => {
                let abbrs = string_args(child);
                def.label_abbrs(abbrs.iter().map(String::as_str));
            }
            "save" => {
                for format in string_args(child) {
                    match FileType::parse(&format) {
                        Some(FileType::Yml) => def.value_save_yml(),
                        Some(FileType::Json) => def.value_save_json(),
                        Some(FileType::Xml) => def.value_save_xml(),
                        Some(FileType::Properties) => def.value_save_properties(),
                        None => {
                            return Err(Error::Schema(format!(
                                "unknown save format '{format}'"
                            )));
                        }
                    }
                }
            }
            "save-filter" => match require_string_arg(child)?.as_str() {
                "all" => def.value_save_all(),
                "visible" => def.value_save_visible(),
                "enabled" => def.value_save_enabled(),
                other => {
                    return Err(Error::Schema(format!("unknown save filter '{other}'")));
                }
            },
            "template-save" => {
                let template = require_string_prop(child, "template")?;
                let target = require_string_prop(child, "target")?;
                def.value_save_template(template, target);
            }
            "section-save" => {
                let template = require_string_prop(child, "template")?;
                let target = require_string_prop(child, "target")?;
                def.value_save_section(template, target);
            }
            "group" => {
                let group_name = require_string_arg(child)?;
                let ops = parse_group_ops(child)?;
                def.group(&group_name, |g| {
                    for op in ops {
                        op(g);
                    }
                })?;
            }
            other => {
                return Err(Error::Schema(format!("unknown config setting '{other}'")));
            }
        }
    }
    Ok(def)
}

type GroupOp = Box<dyn FnOnce(&mut Group)>;
type PropOp = Box<dyn FnOnce(&mut Prop)>;

fn parse_group_ops(node: &KdlNode) -> Result<Vec<GroupOp>> {
    let mut ops: Vec<GroupOp> = Vec::new();
    let Some(children) = node.children() else {
        return Ok(ops);
    };
    for child in children.nodes() {
        match child.name().value() {
            "label" => {
                let text = require_string_arg(child)?;
                ops.push(Box::new(move |g| g.label(text)));
            }
            "description" => {
                let text = require_string_arg(child)?;
                ops.push(Box::new(move |g| g.describe(text)));
            }
            "visible" => {
                let flag = require_bool_arg(child)?;
                ops.push(Box::new(move |g| g.visible(flag)));
            }
            "enabled" => {
                let flag = require_bool_arg(child)?;
                ops.push(Box::new(move |g| g.enabled(flag)));
            }
            "visible-when" => {
                let condition = parse_condition(child)?;
                ops.push(Box::new(move |g| g.visible_if(condition.into_predicate())));
            }
            "enabled-when" => {
                let condition = parse_condition(child)?;
                ops.push(Box::new(move |g| g.enabled_if(condition.into_predicate())));
            }
            "prop" => {
                let name = require_string_arg(child)?;
                let prop_ops = parse_prop_ops(child)?;
                ops.push(Box::new(move |g| {
                    g.prop(&name, |p| {
                        for op in prop_ops {
                            op(p);
                        }
                    })
                }));
            }
            "list-prop" => {
                let name = require_string_arg(child)?;
                let prop_ops = parse_prop_ops(child)?;
                ops.push(Box::new(move |g| {
                    g.list_prop(&name, |p| {
                        for op in prop_ops {
                            op(p);
                        }
                    })
                }));
            }
            "map-prop" => {
                let name = require_string_arg(child)?;
                let prop_ops = parse_prop_ops(child)?;
                ops.push(Box::new(move |g| {
                    g.map_prop(&name, |p| {
                        for op in prop_ops {
                            op(p);
                        }
                    })
                }));
            }
            "const" => {
                let mut args = string_args(child).into_iter();
                let name = args.next().ok_or_else(|| {
                    Error::Schema("const needs a name argument".to_string())
                })?;
                let value = args.next().ok_or_else(|| {
                    Error::Schema(format!("const '{name}' needs a value argument"))
                })?;
                ops.push(Box::new(move |g| g.const_string(&name, value)));
            }
            other => {
                return Err(Error::Schema(format!("unknown group setting '{other}'")));
            }
        }
    }
    Ok(ops)
}

fn parse_prop_ops(node: &KdlNode) -> Result<Vec<PropOp>> {
    let mut ops: Vec<PropOp> = Vec::new();
    let mut entries: BTreeMap<String, Value> = BTreeMap::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "label" => {
                    let text = require_string_arg(child)?;
                    ops.push(Box::new(move |p| p.label(text)));
                }
                "description" => {
                    let text = require_string_arg(child)?;
                    ops.push(Box::new(move |p| p.describe(text)));
                }
                "value" => {
                    let value = require_string_arg(child)?;
                    ops.push(Box::new(move |p| p.value(value)));
                }
                "values" => {
                    let values = string_args(child);
                    ops.push(Box::new(move |p| p.values(values)));
                }
                "entry" => {
                    let mut args = string_args(child).into_iter();
                    let key = args.next().ok_or_else(|| {
                        Error::Schema("entry needs key and value arguments".to_string())
                    })?;
                    let value = args.next().ok_or_else(|| {
                        Error::Schema(format!("entry '{key}' needs a value argument"))
                    })?;
                    entries.insert(key, Value::String(value));
                }
                "options" => {
                    let options = string_args(child);
                    ops.push(Box::new(move |p| p.options(options)));
                }
                "optional" => ops.push(Box::new(|p| p.optional())),
                "required" => ops.push(Box::new(|p| p.required())),
                "checkbox" => ops.push(Box::new(|p| p.checkbox())),
                "password" => ops.push(Box::new(|p| p.password())),
                "select" => ops.push(Box::new(|p| p.select())),
                "value-type" => {
                    let text = require_string_arg(child)?;
                    let value_type = ValueType::parse(&text).ok_or_else(|| {
                        Error::Schema(format!("unknown value type '{text}'"))
                    })?;
                    ops.push(Box::new(move |p| p.value_type(value_type)));
                }
                "visible" => {
                    let flag = require_bool_arg(child)?;
                    ops.push(Box::new(move |p| p.visible(flag)));
                }
                "enabled" => {
                    let flag = require_bool_arg(child)?;
                    ops.push(Box::new(move |p| p.enabled(flag)));
                }
                "visible-when" => {
                    let condition = parse_condition(child)?;
                    ops.push(Box::new(move |p| p.visible_if(condition.into_predicate())));
                }
                "enabled-when" => {
                    let condition = parse_condition(child)?;
                    ops.push(Box::new(move |p| p.enabled_if(condition.into_predicate())));
                }
                "validate" => {
                    let name = require_string_arg(child)?;
                    let op: PropOp = match name.as_str() {
                        "not-blank" => Box::new(|p: &mut Prop| p.not_blank()),
                        "not-empty" => Box::new(|p: &mut Prop| p.not_empty()),
                        "alphanumeric" => Box::new(|p: &mut Prop| p.alphanumeric()),
                        "alphanumeric-dash" => Box::new(|p: &mut Prop| p.alphanumeric_dash()),
                        "alphanumeric-underscore" => {
                            Box::new(|p: &mut Prop| p.alphanumeric_underscore())
                        }
                        "alphanumeric-dash-underscore" => {
                            Box::new(|p: &mut Prop| p.alphanumeric_dash_underscore())
                        }
                        "numeric" => Box::new(|p: &mut Prop| p.numeric()),
                        "alpha" => Box::new(|p: &mut Prop| p.alpha()),
                        "uuid" => Box::new(|p: &mut Prop| p.uuid()),
                        other => {
                            return Err(Error::Schema(format!("unknown validator '{other}'")));
                        }
                    };
                    ops.push(op);
                }
                "validate-regex" => {
                    let pattern = require_string_arg(child)?;
                    ops.push(Box::new(move |p| p.regex(&pattern)));
                }
                other => {
                    return Err(Error::Schema(format!("unknown prop setting '{other}'")));
                }
            }
        }
    }

    if !entries.is_empty() {
        ops.push(Box::new(move |p| p.entries(entries)));
    }
    Ok(ops)
}

/// Equality-based condition over another prop's current value.
struct Condition {
    prop: String,
    op: CondOp,
}

enum CondOp {
    Eq(String),
    Ne(String),
    In(Vec<String>),
}

impl Condition {
    fn into_predicate(self) -> impl Fn(&Definition) -> bool + 'static {
        move |def| {
            let current = def.string_value_or_null(&self.prop).ok().flatten();
            match &self.op {
                CondOp::Eq(expected) => current.as_deref() == Some(expected.as_str()),
                CondOp::Ne(expected) => current.as_deref() != Some(expected.as_str()),
                CondOp::In(expected) => {
                    current.is_some_and(|c| expected.iter().any(|e| *e == c))
                }
            }
        }
    }
}

fn parse_condition(node: &KdlNode) -> Result<Condition> {
    let prop = require_string_arg(node)?;
    let op = if let Some(expected) = string_prop(node, "eq") {
        CondOp::Eq(expected)
    } else if let Some(expected) = string_prop(node, "ne") {
        CondOp::Ne(expected)
    } else if let Some(expected) = string_prop(node, "in") {
        CondOp::In(
            expected
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    } else {
        return Err(Error::Schema(format!(
            "condition on '{prop}' needs eq=, ne= or in="
        )));
    };
    Ok(Condition { prop, op })
}

// ---- KDL node helpers ----

fn first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
}

fn require_string_arg(node: &KdlNode) -> Result<String> {
    first_string_arg(node).ok_or_else(|| {
        Error::Schema(format!(
            "'{}' needs a string argument",
            node.name().value()
        ))
    })
}

fn string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(str::to_string)
        .collect()
}

fn string_prop(node: &KdlNode, key: &str) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
}

fn require_string_prop(node: &KdlNode, key: &str) -> Result<String> {
    string_prop(node, key).ok_or_else(|| {
        Error::Schema(format!(
            "'{}' needs a '{key}' string property",
            node.name().value()
        ))
    })
}

fn require_bool_arg(node: &KdlNode) -> Result<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_bool())
        .ok_or_else(|| {
            Error::Schema(format!(
                "'{}' needs a boolean argument",
                node.name().value()
            ))
        })
}
