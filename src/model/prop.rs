//! Properties: named, labeled configurable units with predicate-backed
//! visibility/enabled/required state and a validator.
//!
//! A [`Prop`] is exclusively owned by one group and carries one of three
//! payload kinds (string, list, map). Constants are regular props flagged
//! non-captured with a derived value. All dynamic fields are evaluated
//! against the owning [`Definition`] on every read; nothing is cached, so
//! results are never stale.

use crate::model::label::remove_common_words;
use crate::model::value::{Value, ValueType, coerce_saved};
use crate::model::Definition;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::warn;

/// Predicate over the live definition state.
pub type Predicate = Box<dyn Fn(&Definition) -> bool>;

/// Validator contract: an error message, or `None` when valid.
pub type Validator = Box<dyn Fn(&Definition, &Prop) -> Option<String>>;

/// Derivation applied to a string prop's raw value before it is read.
pub type StringDynamic = Box<dyn Fn(&Definition, Option<String>) -> Option<String>>;

/// Derivation for list props.
pub type ListDynamic = Box<dyn Fn(&Definition, Option<Vec<String>>) -> Option<Vec<String>>>;

/// Derivation for map props.
pub type MapDynamic =
    Box<dyn Fn(&Definition, Option<BTreeMap<String, Value>>) -> Option<BTreeMap<String, Value>>>;

/// Custom persistence-time processor for a string prop.
pub type SavedProcessor = Box<dyn Fn(&Definition, Option<&str>) -> Value>;

/// A boolean field that is either fixed or recomputed from a predicate.
pub enum Flag {
    Fixed(bool),
    Dynamic(Predicate),
}

impl Flag {
    pub(crate) fn eval(&self, def: &Definition, prop: &str, what: &'static str) -> bool {
        match self {
            Flag::Fixed(b) => *b,
            Flag::Dynamic(f) => def.guarded(prop, what, true, || f(def)),
        }
    }
}

/// How an options-constrained string prop is rendered by capture surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptionsStyle {
    #[default]
    Select,
    Checkbox,
}

/// String payload: internal text representation plus rendering/coercion tags.
pub struct StringPayload {
    pub(crate) value: Option<String>,
    pub(crate) options: Vec<String>,
    pub(crate) options_style: OptionsStyle,
    pub(crate) value_type: ValueType,
    pub(crate) dynamic: Option<StringDynamic>,
    pub(crate) saved: Option<SavedProcessor>,
}

/// List payload.
pub struct ListPayload {
    pub(crate) value: Option<Vec<String>>,
    pub(crate) dynamic: Option<ListDynamic>,
}

/// Map payload.
pub struct MapPayload {
    pub(crate) value: Option<BTreeMap<String, Value>>,
    pub(crate) dynamic: Option<MapDynamic>,
}

/// Variant-specific storage behind the shared prop contract.
pub enum PropKind {
    String(StringPayload),
    List(ListPayload),
    Map(MapPayload),
}

/// A single named configurable value with metadata.
pub struct Prop {
    name: String,
    group_name: String,
    label: Option<String>,
    description: Option<String>,
    visible: Flag,
    enabled: Flag,
    required: Flag,
    captured: bool,
    validator: Option<Validator>,
    kind: PropKind,
}

impl Prop {
    pub(crate) fn new_string(group_name: &str, name: &str) -> Self {
        let mut prop = Self {
            name: name.to_string(),
            group_name: group_name.to_string(),
            label: None,
            description: None,
            visible: Flag::Fixed(true),
            enabled: Flag::Fixed(true),
            required: Flag::Fixed(true),
            captured: true,
            validator: None,
            kind: PropKind::String(StringPayload {
                value: None,
                options: Vec::new(),
                options_style: OptionsStyle::default(),
                value_type: ValueType::default(),
                dynamic: None,
                saved: None,
            }),
        };

        // Name-based smart defaults; explicit configuration overrides them.
        let lower = name.to_lowercase();
        if ["token", "password", "key"].iter().any(|s| lower.ends_with(s)) {
            prop.password();
        } else if ["enabled", "disabled"].iter().any(|s| lower.ends_with(s)) {
            prop.checkbox();
        }

        prop.not_blank();
        prop
    }

    pub(crate) fn new_list(group_name: &str, name: &str) -> Self {
        let mut prop = Self {
            name: name.to_string(),
            group_name: group_name.to_string(),
            label: None,
            description: None,
            visible: Flag::Fixed(true),
            enabled: Flag::Fixed(true),
            required: Flag::Fixed(true),
            captured: true,
            validator: None,
            kind: PropKind::List(ListPayload {
                value: None,
                dynamic: None,
            }),
        };
        prop.not_empty();
        prop
    }

    pub(crate) fn new_map(group_name: &str, name: &str) -> Self {
        let mut prop = Self {
            name: name.to_string(),
            group_name: group_name.to_string(),
            label: None,
            description: None,
            visible: Flag::Fixed(true),
            enabled: Flag::Fixed(true),
            required: Flag::Fixed(true),
            captured: true,
            validator: None,
            kind: PropKind::Map(MapPayload {
                value: None,
                dynamic: None,
            }),
        };
        prop.not_empty();
        prop
    }

    // ---- Metadata ----

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Explicit label, or a human-readable transform of the name minus the
    /// words already present in the owning group's label.
    pub fn display_label(&self, def: &Definition) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let prop_label = def.compose_label(&self.name);
        match def.find_group(&self.group_name) {
            Some(group) => remove_common_words(&prop_label, &group.display_label(def)),
            None => prop_label,
        }
    }

    /// Whether this prop takes part in interactive capture (constants don't).
    pub fn captured(&self) -> bool {
        self.captured
    }

    pub fn kind(&self) -> &PropKind {
        &self.kind
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, PropKind::String(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, PropKind::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind, PropKind::Map(_))
    }

    /// Allowed values of an options-constrained string prop (empty otherwise).
    pub fn option_values(&self) -> &[String] {
        match &self.kind {
            PropKind::String(p) => &p.options,
            _ => &[],
        }
    }

    pub fn options_style(&self) -> OptionsStyle {
        match &self.kind {
            PropKind::String(p) => p.options_style,
            _ => OptionsStyle::Select,
        }
    }

    /// Whether interactive surfaces should mask the entered value.
    pub fn masked(&self) -> bool {
        matches!(&self.kind, PropKind::String(p) if p.value_type == ValueType::Password)
    }

    // ---- Builder API (used inside registration closures) ----

    pub fn label(&mut self, text: impl Into<String>) {
        self.label = Some(text.into());
    }

    pub fn describe(&mut self, text: impl Into<String>) {
        self.description = Some(text.into());
    }

    pub fn visible(&mut self, flag: bool) {
        self.visible = Flag::Fixed(flag);
    }

    pub fn visible_if(&mut self, predicate: impl Fn(&Definition) -> bool + 'static) {
        self.visible = Flag::Dynamic(Box::new(predicate));
    }

    pub fn enabled(&mut self, flag: bool) {
        self.enabled = Flag::Fixed(flag);
    }

    pub fn enabled_if(&mut self, predicate: impl Fn(&Definition) -> bool + 'static) {
        self.enabled = Flag::Dynamic(Box::new(predicate));
    }

    pub fn required(&mut self) {
        self.required = Flag::Fixed(true);
    }

    pub fn optional(&mut self) {
        self.required = Flag::Fixed(false);
    }

    pub fn required_if(&mut self, predicate: impl Fn(&Definition) -> bool + 'static) {
        self.required = Flag::Dynamic(Box::new(predicate));
    }

    /// Turn this prop into a derived, non-interactive constant.
    pub fn constant(&mut self) {
        self.captured = false;
        self.visible = Flag::Fixed(false);
        self.enabled = Flag::Fixed(false);
    }

    /// Install a custom validator, replacing the default one.
    pub fn validate(&mut self, validator: impl Fn(&Definition, &Prop) -> Option<String> + 'static) {
        self.validator = Some(Box::new(validator));
    }

    /// Set the default/declared value of a string prop.
    pub fn value(&mut self, value: impl Into<String>) {
        match &mut self.kind {
            PropKind::String(p) => p.value = Some(value.into()),
            _ => warn!("Config prop '{}' is not a string, ignoring value", self.name),
        }
    }

    /// Set the default/declared values of a list prop.
    pub fn values<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self.kind {
            PropKind::List(p) => p.value = Some(values.into_iter().map(Into::into).collect()),
            _ => warn!("Config prop '{}' is not a list, ignoring values", self.name),
        }
    }

    /// Set the default/declared entries of a map prop.
    pub fn entries<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        match &mut self.kind {
            PropKind::Map(p) => {
                p.value = Some(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
            }
            _ => warn!("Config prop '{}' is not a map, ignoring entries", self.name),
        }
    }

    /// Constrain a string prop to a closed set of allowed values.
    pub fn options<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self.kind {
            PropKind::String(p) => p.options = options.into_iter().map(Into::into).collect(),
            _ => warn!("Config prop '{}' is not a string, ignoring options", self.name),
        }
    }

    pub fn select(&mut self) {
        if let PropKind::String(p) = &mut self.kind {
            p.options_style = OptionsStyle::Select;
        }
    }

    /// Render as a boolean checkbox backed by a "true"/"false" string.
    pub fn checkbox(&mut self) {
        match &mut self.kind {
            PropKind::String(p) => {
                p.options_style = OptionsStyle::Checkbox;
                p.value_type = ValueType::Bool;
                p.options = vec!["true".to_string(), "false".to_string()];
                if p.value.is_none() {
                    p.value = Some("false".to_string());
                }
            }
            _ => warn!("Config prop '{}' is not a string, ignoring checkbox", self.name),
        }
    }

    /// Mask the field in interactive surfaces.
    pub fn password(&mut self) {
        self.value_type(ValueType::Password);
    }

    pub fn value_type(&mut self, value_type: ValueType) {
        match &mut self.kind {
            PropKind::String(p) => p.value_type = value_type,
            _ => warn!("Config prop '{}' is not a string, ignoring value type", self.name),
        }
    }

    /// Install a derivation applied to the raw string value on every read.
    pub fn value_dynamic(
        &mut self,
        f: impl Fn(&Definition, Option<String>) -> Option<String> + 'static,
    ) {
        match &mut self.kind {
            PropKind::String(p) => p.dynamic = Some(Box::new(f)),
            _ => warn!("Config prop '{}' is not a string, ignoring derivation", self.name),
        }
    }

    pub fn value_dynamic_list(
        &mut self,
        f: impl Fn(&Definition, Option<Vec<String>>) -> Option<Vec<String>> + 'static,
    ) {
        match &mut self.kind {
            PropKind::List(p) => p.dynamic = Some(Box::new(f)),
            _ => warn!("Config prop '{}' is not a list, ignoring derivation", self.name),
        }
    }

    pub fn value_dynamic_map(
        &mut self,
        f: impl Fn(&Definition, Option<BTreeMap<String, Value>>) -> Option<BTreeMap<String, Value>>
        + 'static,
    ) {
        match &mut self.kind {
            PropKind::Map(p) => p.dynamic = Some(Box::new(f)),
            _ => warn!("Config prop '{}' is not a map, ignoring derivation", self.name),
        }
    }

    /// Install a custom persistence-time processor for a string prop.
    pub fn value_saved_with(&mut self, f: impl Fn(&Definition, Option<&str>) -> Value + 'static) {
        match &mut self.kind {
            PropKind::String(p) => p.saved = Some(Box::new(f)),
            _ => warn!(
                "Config prop '{}' is not a string, ignoring saved processor",
                self.name
            ),
        }
    }

    // ---- Built-in validators ----

    pub fn not_blank(&mut self) {
        self.validate(|def, prop| {
            if prop.has_value(def) {
                None
            } else {
                Some("Should not be blank".to_string())
            }
        });
    }

    pub fn not_empty(&mut self) {
        self.validate(|def, prop| {
            if prop.has_value(def) {
                None
            } else {
                Some("Should not be empty".to_string())
            }
        });
    }

    fn regex_validator(&mut self, pattern: &str, message: &str) {
        let message = message.to_string();
        match Regex::new(pattern) {
            Ok(re) => self.validate(move |def, prop| {
                let text = prop.string_value(def).unwrap_or_default();
                if re.is_match(&text) {
                    None
                } else {
                    Some(message.clone())
                }
            }),
            Err(e) => {
                warn!("Config prop '{}' validator pattern is invalid: {e}", self.name);
                self.validate(move |_, _| Some(message.clone()));
            }
        }
    }

    pub fn regex(&mut self, pattern: &str) {
        let message = format!("Should match regex '{pattern}'");
        self.regex_validator(pattern, &message);
    }

    pub fn alphanumeric(&mut self) {
        self.regex_validator("^[a-zA-Z0-9]+$", "Should be alphanumeric");
    }

    pub fn alphanumeric_dash(&mut self) {
        self.regex_validator(
            "^[a-zA-Z0-9-]+$",
            "Should contain alphanumeric and dash characters",
        );
    }

    pub fn alphanumeric_underscore(&mut self) {
        self.regex_validator(
            "^[a-zA-Z0-9_]+$",
            "Should contain alphanumeric and underscore characters",
        );
    }

    pub fn alphanumeric_dash_underscore(&mut self) {
        self.regex_validator(
            "^[a-zA-Z0-9_-]+$",
            "Should contain alphanumeric, dash and underscore characters",
        );
    }

    pub fn numeric(&mut self) {
        self.regex_validator("^[0-9]+$", "Should be numeric");
    }

    pub fn alpha(&mut self) {
        self.regex_validator("^[a-zA-Z]+$", "Should contain only alphabetic characters");
    }

    pub fn uuid(&mut self) {
        self.validate(|def, prop| {
            let text = prop.string_value(def).unwrap_or_default();
            if uuid::Uuid::parse_str(&text).is_ok() {
                None
            } else {
                Some("Should match UUID format".to_string())
            }
        });
    }

    // ---- Evaluation (always recomputed against the live definition) ----

    pub fn is_visible(&self, def: &Definition) -> bool {
        self.visible.eval(def, &self.name, "visible")
    }

    pub fn is_enabled(&self, def: &Definition) -> bool {
        self.enabled.eval(def, &self.name, "enabled")
    }

    pub fn is_required(&self, def: &Definition) -> bool {
        self.required.eval(def, &self.name, "required")
    }

    /// Derived text of a string prop: the stored raw value (falling back to
    /// the first option) passed through the dynamic derivation.
    pub fn string_value(&self, def: &Definition) -> Option<String> {
        let PropKind::String(p) = &self.kind else {
            return None;
        };
        let raw = p.value.clone().or_else(|| p.options.first().cloned());
        match &p.dynamic {
            Some(f) => def.guarded(&self.name, "value", None, || f(def, raw)),
            None => raw,
        }
    }

    /// The derived value of this prop, or `None` when unset. Side-effect-free.
    pub fn get(&self, def: &Definition) -> Option<Value> {
        match &self.kind {
            PropKind::String(_) => self.string_value(def).map(Value::String),
            PropKind::List(p) => {
                let raw = p.value.clone();
                let derived = match &p.dynamic {
                    Some(f) => def.guarded(&self.name, "value", None, || f(def, raw)),
                    None => raw,
                };
                derived.map(Value::List)
            }
            PropKind::Map(p) => {
                let raw = p.value.clone();
                let derived = match &p.dynamic {
                    Some(f) => def.guarded(&self.name, "value", None, || f(def, raw)),
                    None => raw,
                };
                derived.map(Value::Map)
            }
        }
    }

    /// The persisted form of this prop's value: string props coerce per
    /// their [`ValueType`] tag (or a custom processor), other kinds persist
    /// as-is.
    pub fn value_saved(&self, def: &Definition) -> Value {
        if let PropKind::String(p) = &self.kind {
            let derived = self.string_value(def);
            if let Some(f) = &p.saved {
                return f(def, derived.as_deref());
            }
            return match derived {
                Some(text) => coerce_saved(&self.name, &text, p.value_type),
                None => Value::Null,
            };
        }
        self.get(def).unwrap_or(Value::Null)
    }

    /// Type-specific emptiness check on the derived value.
    pub fn has_value(&self, def: &Definition) -> bool {
        match &self.kind {
            PropKind::String(_) => self.string_value(def).is_some_and(|v| !v.trim().is_empty()),
            PropKind::List(_) => self
                .get(def)
                .and_then(|v| v.as_list().map(|l| !l.is_empty()))
                .unwrap_or(false),
            PropKind::Map(_) => self
                .get(def)
                .and_then(|v| v.as_map().map(|m| !m.is_empty()))
                .unwrap_or(false),
        }
    }

    /// Store a raw value. Wrong-shaped values are logged and dropped, never
    /// raised, so interactive editing stays resilient to bad input.
    pub(crate) fn set(&mut self, value: Value) {
        match &mut self.kind {
            PropKind::String(p) => {
                if value.is_null() {
                    p.value = None;
                } else {
                    match value.to_scalar_string() {
                        Some(text) => p.value = Some(text),
                        None => warn!(
                            "Config value of prop '{}' is not a scalar ({}), skipping it",
                            self.name,
                            value.shape()
                        ),
                    }
                }
            }
            PropKind::List(p) => match value {
                Value::Null => p.value = None,
                Value::List(items) => p.value = Some(items),
                other => warn!(
                    "Config value of prop '{}' is not a list ({}), skipping it",
                    self.name,
                    other.shape()
                ),
            },
            PropKind::Map(p) => match value {
                Value::Null => p.value = None,
                Value::Map(entries) => p.value = Some(entries),
                other => warn!(
                    "Config value of prop '{}' is not a map ({}), skipping it",
                    self.name,
                    other.shape()
                ),
            },
        }
    }

    /// Validation message considering group/prop visibility and the
    /// required flag; `None` means valid.
    pub fn validation(&self, def: &Definition) -> Option<String> {
        let group_visible = def
            .find_group(&self.group_name)
            .is_none_or(|g| g.is_visible(def));
        if !group_visible || !self.is_visible(def) {
            return None;
        }
        if self.is_required(def) || self.has_value(def) {
            self.validator.as_ref().and_then(|v| v(def, self))
        } else {
            None
        }
    }

    pub fn is_valid(&self, def: &Definition) -> bool {
        self.validation(def).is_none()
    }

    /// One-line diagnostic used by debug-mode definition dumps.
    pub fn summary(&self, def: &Definition) -> String {
        format!(
            "Prop(group={}, name={}, value={}, visible={}, enabled={}, valid={})",
            self.group_name,
            self.name,
            self.get(def).unwrap_or(Value::Null),
            self.is_visible(def),
            self.is_enabled(def),
            self.is_valid(def),
        )
    }
}
