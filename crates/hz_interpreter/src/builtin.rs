use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    error::RuntimeError,
    interpreter::Interpreter,
    value::{Callable, Value},
};

/// Functions provided by the host, defined in the global environment.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Builtin {
    Clock,
}

impl Builtin {
    pub const ALL: [Builtin; 1] = [Builtin::Clock];
}

impl Callable for Builtin {
    fn name(&self) -> &str {
        match self {
            Builtin::Clock => "clock",
        }
    }

    fn arity(&self) -> usize {
        match self {
            Builtin::Clock => 0,
        }
    }

    fn call(&self, _: &mut Interpreter, _: Vec<Value>) -> Result<Value, RuntimeError> {
        match self {
            Builtin::Clock => {
                // A clock set before the epoch reads as zero
                let seconds = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_secs_f64())
                    .unwrap_or_default();
                Ok(Value::Number(seconds))
            }
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn>")
    }
}

#[cfg(test)]
mod tests {
    use crate::builtin::Builtin;
    use crate::interpreter::Interpreter;
    use crate::value::{Callable, Value};

    #[test]
    fn clock_returns_seconds() {
        let mut interpreter = Interpreter::new();
        match Builtin::Clock.call(&mut interpreter, vec![]) {
            Ok(Value::Number(seconds)) => assert!(seconds > 1_600_000_000.0),
            result => panic!("expected a number but got {:?}", result),
        }
        assert_eq!(Builtin::Clock.arity(), 0);
    }
}
