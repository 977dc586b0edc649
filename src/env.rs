// ABOUTME: Environment module for managing variable bindings and scopes
//! Chained, lexically-scoped variable bindings.

use crate::cell::Cell;
use crate::error::EvalError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One frame of bindings plus an optional link to the frame it extends.
///
/// Frames are allocated behind `Rc` and never moved or freed while
/// anything still references them, so a closure's captured frame remains a
/// stable, mutation-visible handle for the life of the interpreter — the
/// Rust realization of the spec's stable-address arena requirement.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Cell>>,
    outer: Option<Rc<Environment>>,
}

impl Environment {
    /// A fresh global frame with no outer link.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            outer: None,
        })
    }

    /// A new frame extending `outer`.
    pub fn with_outer(outer: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            outer: Some(outer),
        })
    }

    /// Binds `name` in this frame only, shadowing any outer binding.
    pub fn define(&self, name: String, value: Cell) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Walks this frame and its outer chain, returning the innermost binding.
    pub fn get(&self, name: &str) -> Option<Cell> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.outer.as_ref().and_then(|outer| outer.get(name))
    }

    pub fn lookup(&self, name: &str) -> Result<Cell, EvalError> {
        self.get(name)
            .ok_or_else(|| EvalError::UnboundVariable(name.to_string()))
    }

    /// Mutates an existing binding, walking outward to find it. Errors if
    /// `name` is bound nowhere in the chain.
    #[allow(dead_code)]
    pub fn set(&self, name: &str, value: Cell) -> Result<(), EvalError> {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        match &self.outer {
            Some(outer) => outer.set(name, value),
            None => Err(EvalError::UnboundVariable(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("x".to_string(), Cell::Number(42.0));
        match env.get("x") {
            Some(Cell::Number(n)) => assert_eq!(n, 42.0),
            _ => panic!("expected Number(42.0)"),
        }
    }

    #[test]
    fn undefined_symbol() {
        let env = Environment::new();
        assert!(env.get("undefined").is_none());
    }

    #[test]
    fn shadowing() {
        let parent = Environment::new();
        parent.define("x".to_string(), Cell::Number(42.0));

        let child = Environment::with_outer(parent);
        child.define("x".to_string(), Cell::Number(100.0));

        match child.get("x") {
            Some(Cell::Number(n)) => assert_eq!(n, 100.0),
            _ => panic!("expected Number(100.0)"),
        }
    }

    #[test]
    fn outer_lookup() {
        let parent = Environment::new();
        parent.define("x".to_string(), Cell::Number(42.0));
        let child = Environment::with_outer(parent);

        match child.get("x") {
            Some(Cell::Number(n)) => assert_eq!(n, 42.0),
            _ => panic!("expected Number(42.0)"),
        }
    }

    #[test]
    fn multiple_levels() {
        let grandparent = Environment::new();
        grandparent.define("a".to_string(), Cell::Number(1.0));

        let parent = Environment::with_outer(grandparent);
        parent.define("b".to_string(), Cell::Number(2.0));

        let child = Environment::with_outer(parent);
        child.define("c".to_string(), Cell::Number(3.0));

        assert!(matches!(child.get("a"), Some(Cell::Number(n)) if n == 1.0));
        assert!(matches!(child.get("b"), Some(Cell::Number(n)) if n == 2.0));
        assert!(matches!(child.get("c"), Some(Cell::Number(n)) if n == 3.0));
    }

    #[test]
    fn set_mutates_outer_binding() {
        let parent = Environment::new();
        parent.define("x".to_string(), Cell::Number(1.0));
        let child = Environment::with_outer(parent.clone());

        child.set("x", Cell::Number(2.0)).unwrap();
        assert!(matches!(parent.get("x"), Some(Cell::Number(n)) if n == 2.0));
    }

    #[test]
    fn set_unbound_errors() {
        let env = Environment::new();
        assert!(env.set("nope", Cell::Number(1.0)).is_err());
    }
}
