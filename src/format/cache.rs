//! Compiled template cache keyed by source string.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::ast::Ast;
use super::parser::{compile, FormatError};

/// Cache of compiled templates.
///
/// Only successful compilations are stored; a bad template is recompiled
/// (and its error reported) every time it is requested.
#[derive(Debug, Default)]
pub struct FormatCache {
    entries: RwLock<HashMap<String, Arc<Ast>>>,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled form of `template`, compiling it on first use.
    pub fn get_or_compile(&self, template: &str) -> Result<Arc<Ast>, FormatError> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ast) = entries.get(template) {
                return Ok(Arc::clone(ast));
            }
        }

        let ast = Arc::new(compile(template)?);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let cached = entries
            .entry(template.to_string())
            .or_insert_with(|| Arc::clone(&ast));
        Ok(Arc::clone(cached))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
