use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::runtime::{Builtin, Value};

/// Failure of a symbol table operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// The name is not bound in this table
    #[error("'{name}' is not defined in this scope")]
    NotFound {
        /// Name that was looked up
        name: String,
    },
}

/// Variable bindings of one scope
///
/// Lookups fall back to the parent table; writes always land in this table.
/// Tables are shared between contexts, so bindings live behind a `RefCell`.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// Bindings of this scope
    symbols: RefCell<HashMap<String, Value>>,
    /// Enclosing scope (None for the global table)
    parent: Option<Rc<SymbolTable>>,
}

impl SymbolTable {
    /// Creates an empty table without a parent
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table whose lookups fall back to `parent`
    pub fn with_parent(parent: Rc<SymbolTable>) -> Self {
        SymbolTable {
            symbols: RefCell::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    /// Creates the global table with the predefined names
    ///
    /// `null`, `true`, `false` and one entry per builtin function.
    pub fn global() -> Rc<Self> {
        let table = SymbolTable::new();
        table.set("null", Value::null());
        table.set("true", Value::boolean(true));
        table.set("false", Value::boolean(false));
        for builtin in Builtin::ALL {
            table.set(builtin.name(), Value::builtin(builtin));
        }
        Rc::new(table)
    }

    /// Looks `name` up in this table, then in the parent chain
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.symbols.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Binds `name` in this table, shadowing any binding of a parent
    pub fn set(&self, name: &str, value: Value) {
        self.symbols.borrow_mut().insert(name.to_string(), value);
    }

    /// Removes a local binding
    pub fn remove(&self, name: &str) -> Result<Value, SymbolError> {
        self.symbols
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| SymbolError::NotFound {
                name: name.to_string(),
            })
    }

    /// Checks whether `name` is bound in this table (parents are ignored)
    pub fn contains_local(&self, name: &str) -> bool {
        self.symbols.borrow().contains_key(name)
    }

    /// Sorted names bound in this table
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.symbols.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Enclosing table
    pub fn parent(&self) -> Option<&Rc<SymbolTable>> {
        self.parent.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_set_and_get() {
        let table = SymbolTable::new();
        table.set("x", Value::number(42.0));

        assert_eq!(table.get("x"), Some(Value::number(42.0)));
        assert_eq!(table.get("y"), None);
    }

    #[test]
    fn test_parent_lookup_and_shadowing() {
        let global = Rc::new(SymbolTable::new());
        global.set("x", Value::number(10.0));
        global.set("y", Value::number(1.0));

        let local = SymbolTable::with_parent(Rc::clone(&global));
        local.set("x", Value::string("shadowed"));

        assert_eq!(local.get("x"), Some(Value::string("shadowed")));
        assert_eq!(local.get("y"), Some(Value::number(1.0)));
        assert_eq!(global.get("x"), Some(Value::number(10.0)));
    }

    #[test]
    fn test_set_is_always_local() {
        let global = Rc::new(SymbolTable::new());
        global.set("x", Value::number(1.0));

        let local = SymbolTable::with_parent(Rc::clone(&global));
        local.set("x", Value::number(2.0));

        assert!(local.contains_local("x"));
        assert_eq!(global.get("x"), Some(Value::number(1.0)));
    }

    #[test]
    fn test_remove() {
        let global = Rc::new(SymbolTable::new());
        global.set("x", Value::number(1.0));
        let local = SymbolTable::with_parent(Rc::clone(&global));

        assert_eq!(
            local.remove("x"),
            Err(SymbolError::NotFound {
                name: "x".to_string()
            })
        );
        assert_eq!(global.remove("x"), Ok(Value::number(1.0)));
        assert!(!global.contains_local("x"));
    }

    #[test]
    fn test_global_names() {
        let global = SymbolTable::global();
        assert_eq!(
            global.names(),
            vec![
                "clear", "false", "input", "len", "null", "print", "run", "true", "type"
            ]
        );
        assert_eq!(global.get("true"), Some(Value::boolean(true)));
        assert!(global.parent().is_none());
    }
}
