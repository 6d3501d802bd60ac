//! Groups: named, ordered collections of props sharing visibility and
//! enabled state.

use crate::model::prop::{Flag, Prop};
use crate::model::{Definition, Value};
use std::collections::BTreeMap;

/// A named collection of props. Insertion order is display order.
pub struct Group {
    name: String,
    label: Option<String>,
    description: Option<String>,
    visible: Flag,
    enabled: Flag,
    pub(crate) props: Vec<Prop>,
}

impl Group {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            description: None,
            visible: Flag::Fixed(true),
            enabled: Flag::Fixed(true),
            props: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Explicit label, or a human-readable transform of the name.
    pub fn display_label(&self, def: &Definition) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => def.compose_label(&self.name),
        }
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn find_prop(&self, name: &str) -> Option<&Prop> {
        self.props.iter().find(|p| p.name() == name)
    }

    // ---- Builder API ----

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

    /// Register a string prop.
    pub fn prop(&mut self, name: &str, configure: impl FnOnce(&mut Prop)) {
        let mut prop = Prop::new_string(&self.name, name);
        configure(&mut prop);
        self.props.push(prop);
    }

    /// Register a list prop.
    pub fn list_prop(&mut self, name: &str, configure: impl FnOnce(&mut Prop)) {
        let mut prop = Prop::new_list(&self.name, name);
        configure(&mut prop);
        self.props.push(prop);
    }

    /// Register a map prop.
    pub fn map_prop(&mut self, name: &str, configure: impl FnOnce(&mut Prop)) {
        let mut prop = Prop::new_map(&self.name, name);
        configure(&mut prop);
        self.props.push(prop);
    }

    /// Register a derived, non-interactive string constant with a fixed value.
    pub fn const_string(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.prop(name, |p| {
            p.value(value);
            p.constant();
        });
    }

    /// Register a string constant recomputed from its supplier on every read.
    pub fn const_string_with(
        &mut self,
        name: &str,
        supplier: impl Fn(&Definition) -> Option<String> + 'static,
    ) {
        self.prop(name, |p| {
            p.value_dynamic(move |def, _| supplier(def));
            p.constant();
        });
    }

    /// Register a list constant recomputed from its supplier on every read.
    pub fn const_list_with(
        &mut self,
        name: &str,
        supplier: impl Fn(&Definition) -> Option<Vec<String>> + 'static,
    ) {
        self.list_prop(name, |p| {
            p.value_dynamic_list(move |def, _| supplier(def));
            p.constant();
        });
    }

    /// Register a map constant recomputed from its supplier on every read.
    pub fn const_map_with(
        &mut self,
        name: &str,
        supplier: impl Fn(&Definition) -> Option<BTreeMap<String, Value>> + 'static,
    ) {
        self.map_prop(name, |p| {
            p.value_dynamic_map(move |def, _| supplier(def));
            p.constant();
        });
    }

    // ---- Evaluation ----

    pub fn is_visible(&self, def: &Definition) -> bool {
        self.visible.eval(def, &self.name, "visible")
    }

    pub fn is_enabled(&self, def: &Definition) -> bool {
        self.enabled.eval(def, &self.name, "enabled")
    }

    /// A group is valid when all owned props are valid.
    pub fn is_valid(&self, def: &Definition) -> bool {
        self.props.iter().all(|p| p.is_valid(def))
    }

    /// One-line diagnostic used by debug-mode definition dumps.
    pub fn summary(&self, def: &Definition) -> String {
        format!(
            "Group(name='{}', visible={}, enabled={})",
            self.name,
            self.is_visible(def),
            self.is_enabled(def),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Definition, Value};

    #[test]
    fn test_registration_preserves_order() {
        let mut def = Definition::new("test");
        def.group("general", |g| {
            g.prop("b", |_| {});
            g.prop("a", |_| {});
            g.list_prop("c", |_| {});
        })
        .unwrap();
        def.finalize().unwrap();

        let names: Vec<&str> = def
            .find_group("general")
            .unwrap()
            .props()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_const_is_not_captured() {
        let mut def = Definition::new("test");
        def.group("general", |g| {
            g.const_string("domain", "example.com");
        })
        .unwrap();
        def.finalize().unwrap();

        let prop = def.prop("domain").unwrap();
        assert!(!prop.captured());
        assert!(!prop.is_visible(&def));
        assert!(!prop.is_enabled(&def));
        // excluded from required checks
        assert!(prop.is_valid(&def));
        assert_eq!(prop.get(&def), Some(Value::from("example.com")));
    }

    #[test]
    fn test_const_supplier_recomputes() {
        let mut def = Definition::new("test");
        def.group("general", |g| {
            g.prop("env", |p| p.value("dev"));
            g.const_string_with("url", |d| {
                let env = d.string_value_or_null("env").ok().flatten()?;
                Some(format!("https://{env}.example.com"))
            });
        })
        .unwrap();
        def.finalize().unwrap();

        assert_eq!(
            def.string_value("url").unwrap(),
            "https://dev.example.com".to_string()
        );
        def.set_value("env", Value::from("prod")).unwrap();
        assert_eq!(
            def.string_value("url").unwrap(),
            "https://prod.example.com".to_string()
        );
    }

    #[test]
    fn test_group_validity_follows_props() {
        let mut def = Definition::new("test");
        def.group("general", |g| {
            g.prop("name", |_| {});
        })
        .unwrap();
        def.finalize().unwrap();

        assert!(!def.find_group("general").unwrap().is_valid(&def));
        def.set_value("name", Value::from("x")).unwrap();
        assert!(def.find_group("general").unwrap().is_valid(&def));
    }

    #[test]
    fn test_invisible_group_props_valid() {
        let mut def = Definition::new("test");
        def.group("hidden", |g| {
            g.visible(false);
            g.prop("secret", |_| {});
        })
        .unwrap();
        def.finalize().unwrap();

        // required and blank, but the group is invisible
        assert!(def.prop("secret").unwrap().is_valid(&def));
        assert!(def.is_valid());
    }
}
