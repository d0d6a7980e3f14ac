use std::collections::BTreeMap;

use serde::Serialize;

/// Variables bound by one module probe.
///
/// A variable that is bound to `None` is absent, which is different from an
/// empty string: absent variables suppress the groups that reference them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleResult {
    vars: BTreeMap<String, Option<String>>,
    styles: BTreeMap<String, String>,
    #[serde(skip)]
    absent: bool,
}

impl ModuleResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// The result of a module that produced nothing at all.
    pub fn absent() -> Self {
        Self {
            absent: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, Some(value.into()));
        self
    }

    #[must_use]
    pub fn with_opt(mut self, name: &str, value: Option<impl Into<String>>) -> Self {
        self.set(name, value.map(Into::into));
        self
    }

    #[must_use]
    pub fn with_style(mut self, name: &str, style: impl Into<String>) -> Self {
        self.set_style(name, style);
        self
    }

    pub fn set(&mut self, name: &str, value: Option<String>) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn set_style(&mut self, name: &str, style: impl Into<String>) {
        self.styles.insert(name.to_string(), style.into());
    }

    /// Set a style only if the probe did not choose one itself.
    pub fn default_style(&mut self, name: &str, style: &str) {
        self.styles
            .entry(name.to_string())
            .or_insert_with(|| style.to_string());
    }

    /// `None` when `name` is not bound at all, `Some(None)` when it is bound
    /// but absent.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.vars.get(name).map(Option::as_deref)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).flatten()
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.styles.get(name).map(String::as_str)
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Whether the module should expand to nothing.
    pub fn is_all_absent(&self) -> bool {
        self.absent || (!self.vars.is_empty() && self.vars.values().all(Option::is_none))
    }
}
