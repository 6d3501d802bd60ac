//! Line-oriented capture wizard.
//!
//! A command loop over show-properties / update-property / save / cancel.
//! Only visible+enabled props are offered for update; every mutation is
//! followed by a refresh so dependent visibility, enabled state and
//! validation react before the next round. Scalar values are edited in
//! place, lists as comma-separated text and maps as comma-separated
//! `key=value` pairs.

use crate::capture::{CaptureOutcome, CaptureSurface};
use crate::model::{Definition, Value};
use crate::Result;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// Terminal abstraction; the real one talks to stdio, tests script it.
pub trait Console {
    fn print(&mut self, text: &str);

    /// Read one line, `None` on end of input (treated as cancellation).
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Console over process stdio.
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
        }
    }
}

const COMMANDS: &[&str] = &["show-properties", "update-property", "save", "cancel"];

enum Flow {
    Continue,
    Cancelled,
}

enum EditKind {
    Options(Vec<String>),
    Text,
    List,
    Map,
}

/// The line-prompt capture surface.
pub struct LinePrompt<C: Console> {
    console: C,
}

impl<C: Console> LinePrompt<C> {
    pub fn new(console: C) -> Self {
        Self { console }
    }

    fn show_properties(&mut self, def: &Definition) {
        self.console.print("");
        for group in def.groups().iter().filter(|g| g.is_visible(def)) {
            self.console
                .print(&format!("{} ({})", group.display_label(def), group.name()));
            self.console.print("");
            for prop in group
                .props()
                .iter()
                .filter(|p| p.captured() && p.is_visible(def))
            {
                self.console
                    .print(&format!("  {} ({})", prop.display_label(def), prop.name()));
                let shown = match prop.get(def) {
                    Some(_) if prop.masked() => "<masked>".to_string(),
                    Some(value) => {
                        let text = value.to_string();
                        if text.is_empty() {
                            "<empty>".to_string()
                        } else {
                            text
                        }
                    }
                    None => "<empty>".to_string(),
                };
                self.console.print(&format!("    Value: {shown}"));
                if let Some(description) = prop.description() {
                    self.console.print(&format!("    Description: {description}"));
                }
                if let Some(message) = prop.validation(def) {
                    self.console.print(&format!("    Validation: {message}"));
                }
            }
            self.console.print("");
        }
    }

    fn update_property(&mut self, def: &mut Definition) -> Result<Flow> {
        let names: Vec<String> = def
            .props()
            .filter(|p| p.captured())
            .filter(|p| {
                let group_visible = def
                    .find_group(p.group_name())
                    .is_none_or(|g| g.is_visible(def));
                group_visible && p.is_visible(def) && p.is_enabled(def)
            })
            .map(|p| p.name().to_string())
            .collect();

        self.console.print("Select property:");
        self.console.print("  0) none");
        for (index, name) in names.iter().enumerate() {
            self.console.print(&format!("  {}) {}", index + 1, name));
        }
        let Some(input) = self.console.read_line("> ")? else {
            return Ok(Flow::Cancelled);
        };
        let choice = input.trim();
        if choice.is_empty() || choice == "0" || choice == "none" {
            return Ok(Flow::Continue);
        }

        let name = match choice.parse::<usize>() {
            Ok(index) if (1..=names.len()).contains(&index) => names[index - 1].clone(),
            _ if names.iter().any(|n| n.as_str() == choice) => choice.to_string(),
            _ => {
                self.console.print(&format!("Unknown property '{choice}'"));
                return Ok(Flow::Continue);
            }
        };

        let (kind, current) = {
            let prop = def.prop(&name)?;
            let kind = if prop.is_list() {
                EditKind::List
            } else if prop.is_map() {
                EditKind::Map
            } else if !prop.option_values().is_empty() {
                EditKind::Options(prop.option_values().to_vec())
            } else {
                EditKind::Text
            };
            let current = prop.get(def).map(|v| v.to_string()).unwrap_or_default();
            (kind, current)
        };

        match kind {
            EditKind::Options(options) => {
                self.console
                    .print(&format!("Select value for property '{name}':"));
                for (index, option) in options.iter().enumerate() {
                    let marker = if *option == current { " (current)" } else { "" };
                    self.console
                        .print(&format!("  {}) {}{}", index + 1, option, marker));
                }
                let Some(input) = self.console.read_line("> ")? else {
                    return Ok(Flow::Cancelled);
                };
                let choice = input.trim();
                if !choice.is_empty() {
                    let selected = match choice.parse::<usize>() {
                        Ok(index) if (1..=options.len()).contains(&index) => {
                            Some(options[index - 1].clone())
                        }
                        _ if options.iter().any(|o| o.as_str() == choice) => {
                            Some(choice.to_string())
                        }
                        _ => {
                            self.console.print(&format!("Unknown option '{choice}'"));
                            None
                        }
                    };
                    if let Some(value) = selected {
                        def.set_value(&name, Value::String(value))?;
                    }
                }
            }
            EditKind::Text => {
                let Some(input) = self
                    .console
                    .read_line(&format!("Enter value for property '{name}' [{current}]: "))?
                else {
                    return Ok(Flow::Cancelled);
                };
                if !input.trim().is_empty() {
                    def.set_value(&name, Value::String(input.trim().to_string()))?;
                }
            }
            EditKind::List => {
                let Some(input) = self.console.read_line(&format!(
                    "Enter values for property '{name}' (comma-separated) [{current}]: "
                ))?
                else {
                    return Ok(Flow::Cancelled);
                };
                if !input.trim().is_empty() {
                    let items: Vec<String> = input
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                    def.set_value(&name, Value::List(items))?;
                }
            }
            EditKind::Map => {
                let Some(input) = self.console.read_line(&format!(
                    "Enter entries for property '{name}' (key=value, comma-separated) [{current}]: "
                ))?
                else {
                    return Ok(Flow::Cancelled);
                };
                if !input.trim().is_empty() {
                    let entries: BTreeMap<String, Value> = input
                        .split(',')
                        .filter_map(|pair| {
                            pair.split_once('=').map(|(k, v)| {
                                (k.trim().to_string(), Value::String(v.trim().to_string()))
                            })
                        })
                        .collect();
                    def.set_value(&name, Value::Map(entries))?;
                }
            }
        }

        def.refresh();
        Ok(Flow::Continue)
    }
}

impl<C: Console> CaptureSurface for LinePrompt<C> {
    fn run(&mut self, def: &mut Definition) -> Result<CaptureOutcome> {
        loop {
            let invalid: Vec<String> = def
                .props()
                .filter(|p| !p.is_valid(def))
                .map(|p| p.name().to_string())
                .collect();
            if invalid.is_empty() {
                self.console
                    .print("Config is valid. No properties need an update.");
            } else {
                self.console.print(&format!(
                    "Config is not valid! Properties to be updated: {}",
                    invalid.join(", ")
                ));
            }

            self.console.print("Select command:");
            for (index, command) in COMMANDS.iter().enumerate() {
                self.console.print(&format!("  {}) {}", index + 1, command));
            }
            let Some(input) = self.console.read_line("> ")? else {
                return Ok(CaptureOutcome::Cancelled);
            };
            match input.trim() {
                "" | "1" | "show-properties" => self.show_properties(def),
                "2" | "update-property" => {
                    if let Flow::Cancelled = self.update_property(def)? {
                        return Ok(CaptureOutcome::Cancelled);
                    }
                }
                "3" | "save" => return Ok(CaptureOutcome::Applied),
                "4" | "cancel" => return Ok(CaptureOutcome::Cancelled),
                other => self.console.print(&format!("Unknown command '{other}'")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_definition;
    use crate::model::Definition;
    use std::collections::VecDeque;

    struct ScriptedConsole {
        inputs: VecDeque<String>,
        output: Vec<String>,
    }

    impl ScriptedConsole {
        fn new(inputs: &[&str]) -> Self {
            Self {
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                output: Vec::new(),
            }
        }
    }

    impl Console for ScriptedConsole {
        fn print(&mut self, text: &str) {
            self.output.push(text.to_string());
        }

        fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
            Ok(self.inputs.pop_front())
        }
    }

    #[test]
    fn test_update_option_prop_and_save() {
        let mut def = sample_definition();
        def.finalize().unwrap();

        // update-property -> infra -> "local" -> save
        let console = ScriptedConsole::new(&["2", "1", "1", "3"]);
        let outcome = LinePrompt::new(console).run(&mut def).unwrap();

        assert_eq!(outcome, CaptureOutcome::Applied);
        assert_eq!(def.string_value("infra").unwrap(), "local");
        // dependent visibility reacted to the change
        assert!(!def.prop("envType").unwrap().is_visible(&def));
    }

    #[test]
    fn test_hidden_prop_not_offered_for_update() {
        let mut def = sample_definition();
        def.finalize().unwrap();
        def.set_value("infra", Value::from("local")).unwrap();

        // update-property -> none -> cancel
        let console = ScriptedConsole::new(&["2", "0", "4"]);
        let mut prompt = LinePrompt::new(console);
        prompt.run(&mut def).unwrap();

        let menu = prompt.console.output.join("\n");
        assert!(menu.contains("1) infra"));
        assert!(!menu.contains("envType"));
    }

    #[test]
    fn test_cancel_command() {
        let mut def = sample_definition();
        def.finalize().unwrap();

        let console = ScriptedConsole::new(&["4"]);
        let outcome = LinePrompt::new(console).run(&mut def).unwrap();
        assert_eq!(outcome, CaptureOutcome::Cancelled);
    }

    #[test]
    fn test_end_of_input_cancels() {
        let mut def = sample_definition();
        def.finalize().unwrap();

        let console = ScriptedConsole::new(&[]);
        let outcome = LinePrompt::new(console).run(&mut def).unwrap();
        assert_eq!(outcome, CaptureOutcome::Cancelled);
    }

    #[test]
    fn test_list_and_map_editing() {
        let mut def = Definition::new("app");
        def.group("general", |g| {
            g.list_prop("packages", |p| p.values(["a"]));
            g.map_prop("tags", |p| p.entries([("k", Value::from("v"))]));
        })
        .unwrap();
        def.finalize().unwrap();

        // packages -> "x, y"; tags -> "team=core, tier=1"; save
        let console = ScriptedConsole::new(&["2", "1", "x, y", "2", "2", "team=core, tier=1", "3"]);
        let outcome = LinePrompt::new(console).run(&mut def).unwrap();

        assert_eq!(outcome, CaptureOutcome::Applied);
        assert_eq!(
            def.list_value("packages").unwrap(),
            vec!["x".to_string(), "y".to_string()]
        );
        let tags = def.map_value("tags").unwrap();
        assert_eq!(tags.get("team"), Some(&Value::from("core")));
        assert_eq!(tags.get("tier"), Some(&Value::from("1")));
    }

    #[test]
    fn test_invalid_summary_shown() {
        let mut def = Definition::new("app");
        def.group("general", |g| g.prop("password", |_| {})).unwrap();
        def.finalize().unwrap();

        let console = ScriptedConsole::new(&["4"]);
        let mut prompt = LinePrompt::new(console);
        prompt.run(&mut def).unwrap();

        let output = prompt.console.output.join("\n");
        assert!(output.contains("Config is not valid! Properties to be updated: password"));
    }
}
