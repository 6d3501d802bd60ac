//! The definition: root aggregate of a named configuration set.
//!
//! A definition is declared (groups and props registered), finalized once
//! (structure frozen, duplicate names rejected), captured through exactly
//! one surface per run, validated, and persisted. Every predicate receives
//! the definition itself as the single lookup root; evaluation is pull-based
//! and never cached, so a capture surface re-pulls all dynamic state after
//! each mutation.

use crate::capture::{self, CaptureOutcome, CaptureSurface, InputMode};
use crate::model::group::Group;
use crate::model::label::{capital_letter, capital_words, substitute_abbrs};
use crate::model::prop::Prop;
use crate::model::value::Value;
use crate::persist::{self, FileType, Saver};
use crate::{Error, Result};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Recursion limit for predicate evaluation. Predicate cycles are not
/// detected structurally; this guard turns unbounded recursion into a
/// logged warning and a fallback result.
const EVAL_DEPTH_LIMIT: u32 = 64;

/// Default abbreviations substituted into composed labels.
const DEFAULT_ABBRS: &[&str] = &[
    "id", "url", "http", "https", "sftp", "ftp", "ssh", "aws", "az", "gcp", "ad", "tf", "tcp",
    "udp", "html", "css", "js", "sso",
];

/// Filter deciding membership in the saved/filtered snapshot.
pub type SaveFilter = Box<dyn Fn(&Definition, &Prop) -> bool>;

/// The full declared configuration set for one named capture run.
pub struct Definition {
    name: String,
    /// Display label override; composed from the name when unset.
    pub label: Option<String>,
    /// The capture surface selected for this run.
    pub input_mode: InputMode,
    /// Source file for [`InputMode::File`].
    pub input_file: Option<PathBuf>,
    /// Skip seeding from the previous captured snapshot.
    pub fresh: bool,
    /// Print definitions and values while capturing.
    pub debug: bool,
    /// Escalate cancellation to an error; defaults to true for file import.
    pub strict: Option<bool>,
    /// Directory receiving all output files.
    pub output_dir: PathBuf,
    groups: Vec<Group>,
    label_dict: Vec<(String, String)>,
    value_save_filter: Option<SaveFilter>,
    savers: Vec<Saver>,
    pub(crate) form_surface: Option<Box<dyn CaptureSurface>>,
    finalized: bool,
    loaded: bool,
    eval_depth: Cell<u32>,
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("input_mode", &self.input_mode)
            .field("input_file", &self.input_file)
            .field("fresh", &self.fresh)
            .field("debug", &self.debug)
            .field("strict", &self.strict)
            .field("output_dir", &self.output_dir)
            .field("finalized", &self.finalized)
            .field("loaded", &self.loaded)
            .field("eval_depth", &self.eval_depth)
            .finish_non_exhaustive()
    }
}

impl Definition {
    pub fn new(name: impl Into<String>) -> Self {
        let mut def = Self {
            name: name.into(),
            label: None,
            input_mode: InputMode::default(),
            input_file: None,
            fresh: false,
            debug: false,
            strict: None,
            output_dir: PathBuf::from(".capstan"),
            groups: Vec::new(),
            label_dict: Vec::new(),
            value_save_filter: None,
            savers: Vec::new(),
            form_surface: None,
            finalized: false,
            loaded: false,
            eval_depth: Cell::new(0),
        };
        def.label_abbrs(DEFAULT_ABBRS.iter().copied());
        def
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display label: the explicit one, or composed from the name.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.compose_label(&self.name),
        }
    }

    // ---- Structure ----

    /// Register a group. Fails once the structure is finalized.
    pub fn group(&mut self, name: &str, configure: impl FnOnce(&mut Group)) -> Result<()> {
        if self.finalized {
            return Err(Error::StructureLocked(self.name.clone()));
        }
        let mut group = Group::new(name);
        configure(&mut group);
        self.groups.push(group);
        Ok(())
    }

    /// Freeze the structure and reject duplicate prop names. Idempotent.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }

        let mut duplicated: Vec<(&str, &str)> = Vec::new();
        for prop in self.props() {
            let count = self.props().filter(|p| p.name() == prop.name()).count();
            if count > 1 {
                duplicated.push((prop.name(), prop.group_name()));
            }
        }
        if !duplicated.is_empty() {
            duplicated.sort();
            let mut lines = vec![format!(
                "Config '{}' has duplicated properties ({})!",
                self.name,
                duplicated.len()
            )];
            lines.extend(
                duplicated
                    .iter()
                    .map(|(prop, group)| format!("Property '{prop}' defined in group '{group}'")),
            );
            return Err(Error::DuplicateProps(lines.join("\n")));
        }

        self.finalized = true;
        Ok(())
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn props(&self) -> impl Iterator<Item = &Prop> {
        self.groups.iter().flat_map(|g| g.props.iter())
    }

    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub fn find_prop(&self, name: &str) -> Option<&Prop> {
        self.props().find(|p| p.name() == name)
    }

    pub fn has_prop(&self, name: &str) -> bool {
        self.find_prop(name).is_some()
    }

    /// Look up a prop, failing fast on an undeclared name.
    pub fn prop(&self, name: &str) -> Result<&Prop> {
        self.find_prop(name)
            .ok_or_else(|| Error::PropNotDefined(name.to_string()))
    }

    fn find_prop_mut(&mut self, name: &str) -> Option<&mut Prop> {
        self.groups
            .iter_mut()
            .flat_map(|g| g.props.iter_mut())
            .find(|p| p.name() == name)
    }

    // ---- Labels ----

    /// Extend the abbreviation dictionary used for label composition.
    pub fn label_abbrs<'a>(&mut self, abbrs: impl IntoIterator<Item = &'a str>) {
        for abbr in abbrs {
            self.label_dict
                .push((capital_letter(abbr), abbr.to_uppercase()));
        }
    }

    /// Compose a display label from a name: split into capitalized words,
    /// then substitute known abbreviations.
    pub fn compose_label(&self, text: &str) -> String {
        substitute_abbrs(&capital_words(text), &self.label_dict)
    }

    // ---- Evaluation ----

    /// Run a predicate or derivation with the recursion-depth guard applied.
    pub(crate) fn guarded<T>(
        &self,
        prop: &str,
        what: &'static str,
        fallback: T,
        f: impl FnOnce() -> T,
    ) -> T {
        let depth = self.eval_depth.get();
        if depth >= EVAL_DEPTH_LIMIT {
            warn!(
                "Config '{}' hit the evaluation depth limit while evaluating {what} of prop \
                 '{prop}', check for a predicate cycle",
                self.name
            );
            return fallback;
        }
        self.eval_depth.set(depth + 1);
        let result = f();
        self.eval_depth.set(self.eval_depth.get() - 1);
        result
    }

    /// Reset option-constrained props whose stored value fell outside their
    /// options set back to the first option.
    pub fn refresh(&mut self) {
        let mut fixes: Vec<(String, String)> = Vec::new();
        for prop in self.props() {
            let options = prop.option_values();
            if options.is_empty() {
                continue;
            }
            let current = prop.string_value(self);
            if current
                .as_deref()
                .is_none_or(|v| !options.iter().any(|o| o.as_str() == v))
            {
                fixes.push((prop.name().to_string(), options[0].clone()));
            }
        }
        for (name, value) in fixes {
            if let Some(prop) = self.find_prop_mut(&name) {
                prop.set(Value::String(value));
            }
        }
    }

    /// `true` when every group (and so every prop) is valid.
    pub fn is_valid(&self) -> bool {
        self.groups.iter().all(|g| g.is_valid(self))
    }

    // ---- Values ----

    /// Current derived values of all props, name-sorted, unset as null.
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.props()
            .map(|p| (p.name().to_string(), p.get(self).unwrap_or(Value::Null)))
            .collect()
    }

    /// Bulk-assign raw values by prop name; unknown names are ignored.
    pub fn set_values(&mut self, values: impl IntoIterator<Item = (String, Value)>) {
        for (name, value) in values {
            if let Some(prop) = self.find_prop_mut(&name) {
                prop.set(value);
            }
        }
    }

    /// Assign one raw value; fails fast on an undeclared name. Wrong-shaped
    /// values are dropped with a warning by the prop itself.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
        match self.find_prop_mut(name) {
            Some(prop) => {
                prop.set(value);
                Ok(())
            }
            None => Err(Error::PropNotDefined(name.to_string())),
        }
    }

    /// Values passing the save filter, in persisted (type-coerced) form.
    pub fn values_saved(&self) -> BTreeMap<String, Value> {
        self.props()
            .filter(|p| match &self.value_save_filter {
                Some(filter) => filter(self, p),
                None => true,
            })
            .map(|p| (p.name().to_string(), p.value_saved(self)))
            .collect()
    }

    /// The persisted form of one prop's value.
    pub fn value_saved(&self, name: &str) -> Result<Value> {
        Ok(self.prop(name)?.value_saved(self))
    }

    // ---- Save filter ----

    pub fn value_save_filter(&mut self, filter: impl Fn(&Definition, &Prop) -> bool + 'static) {
        self.value_save_filter = Some(Box::new(filter));
    }

    pub fn value_save_all(&mut self) {
        self.value_save_filter = None;
    }

    /// Save only props whose group and self are visible.
    pub fn value_save_visible(&mut self) {
        self.value_save_filter(|def, prop| {
            let group_visible = def
                .find_group(prop.group_name())
                .is_none_or(|g| g.is_visible(def));
            group_visible && prop.is_visible(def)
        });
    }

    /// Save only props whose group and self are enabled.
    pub fn value_save_enabled(&mut self) {
        self.value_save_filter(|def, prop| {
            let group_enabled = def
                .find_group(prop.group_name())
                .is_none_or(|g| g.is_enabled(def));
            group_enabled && prop.is_enabled(def)
        });
    }

    // ---- Savers ----

    pub fn value_save(&mut self, saver: Saver) {
        self.savers.push(saver);
    }

    pub fn value_save_yml(&mut self) {
        self.value_save(Saver::Yml);
    }

    pub fn value_save_json(&mut self) {
        self.value_save(Saver::Json);
    }

    pub fn value_save_xml(&mut self) {
        self.value_save(Saver::Xml);
    }

    pub fn value_save_properties(&mut self) {
        self.value_save(Saver::Properties);
    }

    /// Render a template file into a target file using saved values.
    pub fn value_save_template(&mut self, template: impl Into<PathBuf>, target: impl Into<PathBuf>) {
        self.value_save(Saver::Template {
            template: template.into(),
            target: target.into(),
        });
    }

    /// Render a template and splice it into a marker-delimited section of a
    /// shared file, named after this definition.
    pub fn value_save_section(&mut self, template: impl Into<PathBuf>, target: impl Into<PathBuf>) {
        self.value_save(Saver::Section {
            template: template.into(),
            target: target.into(),
        });
    }

    pub fn value_save_custom(&mut self, f: impl Fn(&Definition) -> Result<()> + 'static) {
        self.value_save(Saver::Custom(Box::new(f)));
    }

    pub fn savers(&self) -> &[Saver] {
        &self.savers
    }

    // ---- Typed accessors ----

    pub fn value_or_null(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.prop(name)?.get(self))
    }

    pub fn value(&self, name: &str) -> Result<Value> {
        self.value_or_null(name)?.ok_or_else(|| Error::NullValue {
            config: self.name.clone(),
            prop: name.to_string(),
        })
    }

    pub fn string_value_or_null(&self, name: &str) -> Result<Option<String>> {
        let prop = self.prop(name)?;
        if !prop.is_string() {
            return Err(Error::PropType {
                name: name.to_string(),
                expected: "string",
            });
        }
        Ok(prop.string_value(self))
    }

    pub fn string_value(&self, name: &str) -> Result<String> {
        self.string_value_or_null(name)?
            .ok_or_else(|| Error::NullValue {
                config: self.name.clone(),
                prop: name.to_string(),
            })
    }

    pub fn bool_value_or_null(&self, name: &str) -> Result<Option<bool>> {
        Ok(self
            .string_value_or_null(name)?
            .map(|v| v.eq_ignore_ascii_case("true")))
    }

    pub fn bool_value(&self, name: &str) -> Result<bool> {
        Ok(self.string_value(name)?.eq_ignore_ascii_case("true"))
    }

    pub fn int_value_or_null(&self, name: &str) -> Result<Option<i64>> {
        self.string_value_or_null(name)?
            .map(|v| self.parse_number(name, &v))
            .transpose()
    }

    pub fn int_value(&self, name: &str) -> Result<i64> {
        let text = self.string_value(name)?;
        self.parse_number(name, &text)
    }

    fn parse_number(&self, name: &str, text: &str) -> Result<i64> {
        text.parse().map_err(|_| Error::InvalidValue {
            prop: name.to_string(),
            value: text.to_string(),
            expected: "int",
        })
    }

    pub fn double_value_or_null(&self, name: &str) -> Result<Option<f64>> {
        self.string_value_or_null(name)?
            .map(|v| {
                v.parse().map_err(|_| Error::InvalidValue {
                    prop: name.to_string(),
                    value: v.clone(),
                    expected: "double",
                })
            })
            .transpose()
    }

    pub fn double_value(&self, name: &str) -> Result<f64> {
        let text = self.string_value(name)?;
        text.parse().map_err(|_| Error::InvalidValue {
            prop: name.to_string(),
            value: text,
            expected: "double",
        })
    }

    pub fn list_value_or_null(&self, name: &str) -> Result<Option<Vec<String>>> {
        let prop = self.prop(name)?;
        if !prop.is_list() {
            return Err(Error::PropType {
                name: name.to_string(),
                expected: "list",
            });
        }
        Ok(prop
            .get(self)
            .and_then(|v| v.as_list().map(|l| l.to_vec())))
    }

    pub fn list_value(&self, name: &str) -> Result<Vec<String>> {
        self.list_value_or_null(name)?
            .ok_or_else(|| Error::NullValue {
                config: self.name.clone(),
                prop: name.to_string(),
            })
    }

    pub fn map_value_or_null(&self, name: &str) -> Result<Option<BTreeMap<String, Value>>> {
        let prop = self.prop(name)?;
        if !prop.is_map() {
            return Err(Error::PropType {
                name: name.to_string(),
                expected: "map",
            });
        }
        Ok(prop.get(self).and_then(|v| v.as_map().cloned()))
    }

    pub fn map_value(&self, name: &str) -> Result<BTreeMap<String, Value>> {
        self.map_value_or_null(name)?
            .ok_or_else(|| Error::NullValue {
                config: self.name.clone(),
                prop: name.to_string(),
            })
    }

    // ---- Output locations ----

    pub fn output_file(&self, file_type: FileType) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.name, file_type.extension()))
    }

    /// The unfiltered snapshot seeding the next run.
    pub fn output_captured_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}.captured.yml", self.name))
    }

    pub fn output_yml_file(&self) -> PathBuf {
        self.output_file(FileType::Yml)
    }

    pub fn output_json_file(&self) -> PathBuf {
        self.output_file(FileType::Json)
    }

    pub fn output_xml_file(&self) -> PathBuf {
        self.output_file(FileType::Xml)
    }

    pub fn output_properties_file(&self) -> PathBuf {
        self.output_file(FileType::Properties)
    }

    // ---- Lifecycle ----

    /// Whether a previous run has written the captured snapshot.
    pub fn captured(&self) -> bool {
        self.output_captured_file().exists()
    }

    /// Guard for downstream consumers: fail with an actionable message when
    /// no capture has happened yet.
    pub fn require_captured(&self) -> Result<()> {
        if self.captured() {
            Ok(())
        } else {
            Err(Error::NotCaptured {
                config: self.name.clone(),
                hint: "run 'cap capture' to provide configuration values".to_string(),
            })
        }
    }

    /// Finalize and seed values from the last captured snapshot, once.
    /// Downstream accessor use goes through this.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        self.finalize()?;
        self.read_captured_values()?;
        self.loaded = true;
        Ok(())
    }

    /// Read the previous captured snapshot, if any, as current raw values.
    pub fn read_captured_values(&mut self) -> Result<()> {
        let file = self.output_captured_file();
        if file.exists() {
            info!(
                "Config '{}' is reading values from file '{}'",
                self.name,
                file.display()
            );
            let values = persist::format::read_yaml(&file)?;
            self.set_values(values);
        }
        Ok(())
    }

    /// Import values from an external YAML or JSON file; top-level keys are
    /// assigned by prop name, unknown keys ignored, missing file fatal.
    pub fn read_input_values(&mut self) -> Result<()> {
        let file = self
            .input_file
            .clone()
            .ok_or_else(|| Error::Other(format!("Config '{}' has no input file set", self.name)))?;
        if !file.exists() {
            return Err(Error::FileMissing(file));
        }

        info!(
            "Config '{}' is reading values from input file '{}'",
            self.name,
            file.display()
        );
        let values = match file.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => persist::format::read_yaml(&file)?,
            Some("json") => persist::format::read_json(&file)?,
            _ => {
                return Err(Error::FileRead {
                    path: file,
                    cause: "unsupported input file type, use YAML or JSON".to_string(),
                });
            }
        };
        self.set_values(values);
        Ok(())
    }

    /// Run the full capture lifecycle: finalize, seed, capture, validate,
    /// persist. Returns the surface outcome; cancellation skips persistence.
    pub fn capture(&mut self) -> Result<CaptureOutcome> {
        self.finalize()?;
        if self.debug {
            self.print_definitions();
        }
        if !self.fresh {
            self.read_captured_values()?;
        }
        self.refresh();

        info!(
            "Config '{}' is capturing values using input mode '{}'",
            self.name, self.input_mode
        );
        let outcome = capture::run(self)?;
        if outcome == CaptureOutcome::Cancelled {
            return Ok(outcome);
        }

        if self.debug {
            self.print_values();
        }
        self.validate_values()?;
        self.save_captured_values()?;
        self.run_savers();
        self.loaded = true;
        Ok(CaptureOutcome::Applied)
    }

    /// Effective strictness: explicit setting, or true for file import.
    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(self.input_mode == InputMode::File)
    }

    /// Check every prop and aggregate all failures into one fatal error.
    pub fn validate_values(&self) -> Result<()> {
        let issues: Vec<String> = self
            .props()
            .filter_map(|p| {
                p.validation(self).map(|message| {
                    format!(
                        "Property '{}' with value '{}' | {}",
                        p.name(),
                        p.get(self).unwrap_or(Value::Null),
                        message
                    )
                })
            })
            .collect();
        if issues.is_empty() {
            return Ok(());
        }

        let mut lines = vec![format!(
            "Config '{}' does not pass validation! Issues found ({}):",
            self.name,
            issues.len()
        )];
        lines.extend(issues);
        Err(Error::Validation(lines.join("\n")))
    }

    /// Write the unfiltered snapshot. This is the integrity baseline for the
    /// next run, so a failure here is fatal.
    fn save_captured_values(&self) -> Result<()> {
        let file = self.output_captured_file();
        info!(
            "Config '{}' is saving captured values to file '{}'",
            self.name,
            file.display()
        );
        persist::format::write_yaml(&file, &self.values())
    }

    /// Run the registered savers; each output is independent, failures are
    /// logged as warnings and do not abort the run.
    fn run_savers(&self) {
        if self.savers.is_empty() {
            return;
        }
        info!(
            "Config '{}' is saving values additionally ({})",
            self.name,
            self.savers.len()
        );
        for saver in &self.savers {
            if let Err(e) = saver.run(self) {
                warn!("Config '{}' cannot save values properly: {e}", self.name);
            }
        }
    }

    fn print_definitions(&self) {
        info!(
            "Config '{}' groups and properties are defined like follows (debug mode is on)",
            self.name
        );
        println!();
        for group in &self.groups {
            println!("{}", group.summary(self));
            for prop in group.props() {
                println!("{}", prop.summary(self));
            }
        }
        println!();
    }

    fn print_values(&self) {
        info!(
            "Config '{}' values are as follows (debug mode is on)",
            self.name
        );
        match serde_yaml::to_string(&self.values()) {
            Ok(yaml) => println!("\n{yaml}"),
            Err(e) => warn!("Config '{}' values cannot be dumped: {e}", self.name),
        }
    }

    /// Install the interactive form surface used by [`InputMode::Form`].
    pub fn form_surface(&mut self, surface: Box<dyn CaptureSurface>) {
        self.form_surface = Some(surface);
    }
}
