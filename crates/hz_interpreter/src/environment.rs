use std::{cell::RefCell, collections::HashMap, rc::Rc};

use hz_parser::token::Token;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::value::Value;

/// One scope of variables. Lookups and assignments fall back to the enclosing scopes.
#[derive(Debug, Default)]
pub struct Environment {
    store: HashMap<String, Value>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            store: HashMap::new(),
            outer: None,
        }
    }

    /// Create a new environment that is enclosed by a given outer environment
    pub fn new_enclosed(outer: Rc<RefCell<Environment>>) -> Self {
        Environment {
            store: HashMap::new(),
            outer: Some(outer),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self.store.get(name) {
            Some(value) => Some(value.clone()),
            // If not found in this environment, look for it in the outer environment
            None => match self.outer {
                Some(ref outer) => outer.borrow().lookup(name),
                None => None,
            },
        }
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        self.lookup(&name.lexeme).ok_or_else(|| undefined(name))
    }

    /// Bind a name in this scope, shadowing any outer binding of the same name.
    pub fn define(&mut self, name: String, value: Value) {
        self.store.insert(name, value);
    }

    /// Overwrite the binding in the nearest scope that already defines the name.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.store.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else {
            match self.outer {
                Some(ref outer) => outer.borrow_mut().assign(name, value),
                None => Err(undefined(name)),
            }
        }
    }

    pub fn depth(&self) -> usize {
        match &self.outer {
            // Recursively add the depth
            Some(parent_env) => 1 + parent_env.borrow().depth(),
            None => 1,
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name, RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()))
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use hz_parser::token::{Token, TokenKind};

    use crate::environment::Environment;
    use crate::error::RuntimeErrorKind;
    use crate::value::Value;

    fn name(lexeme: &str) -> Token {
        Token::new(TokenKind::Identifier, lexeme, None, 1)
    }

    #[test]
    pub fn test_depth() {
        let env1 = Rc::new(RefCell::new(Environment::new()));
        assert_eq!(env1.borrow().depth(), 1);

        let env2 = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(&env1))));
        assert_eq!(env1.borrow().depth(), 1);
        assert_eq!(env2.borrow().depth(), 2);

        let env3 = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(&env2))));
        assert_eq!(env2.borrow().depth(), 2);
        assert_eq!(env3.borrow().depth(), 3);
    }

    #[test]
    fn test_lookup_walks_outward() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a".to_string(), Value::Number(1.0));

        let inner = Environment::new_enclosed(Rc::clone(&outer));
        assert_eq!(inner.get(&name("a")), Ok(Value::Number(1.0)));
        assert_eq!(inner.lookup("b"), None);

        let error = inner.get(&name("b")).unwrap_err();
        assert_eq!(error.kind, RuntimeErrorKind::UndefinedVariable("b".to_string()));
    }

    #[test]
    fn test_define_shadows() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a".to_string(), Value::Number(1.0));

        let mut inner = Environment::new_enclosed(Rc::clone(&outer));
        inner.define("a".to_string(), Value::Number(2.0));

        assert_eq!(inner.lookup("a"), Some(Value::Number(2.0)));
        assert_eq!(outer.borrow().lookup("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_assign_targets_nearest_definition() {
        let global = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().define("a".to_string(), Value::Number(1.0));

        let middle = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(&global))));
        let mut inner = Environment::new_enclosed(Rc::clone(&middle));

        inner.assign(&name("a"), Value::Number(5.0)).expect("assigns");
        assert_eq!(global.borrow().lookup("a"), Some(Value::Number(5.0)));
        assert_eq!(middle.borrow().store.get("a"), None);
        assert_eq!(inner.store.get("a"), None);
    }

    #[test]
    fn test_assign_undefined() {
        let mut env = Environment::new();
        let error = env.assign(&name("missing"), Value::Nil).unwrap_err();
        assert_eq!(error.to_string(), "Undefined variable 'missing'.");
    }
}
