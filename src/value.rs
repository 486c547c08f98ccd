//! Runtime Values
//!
//! `Value` is every shape of data the evaluator's operand stack and
//! namespaces can hold: the two numeric kinds, strings, mutable buffers
//! (`malloc`'d memory), and the two flavors of
//! callable — user-defined closures and host functions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Position, Result};
use crate::token::Token;

/// One lexical scope. Shared via `Rc` so a closure capturing a frame sees
/// later mutations made through any other live handle to the same frame —
/// and, symmetrically, is unaffected by rebindings in a frame it no longer
/// shares a pointer with.
pub type Frame = Rc<RefCell<HashMap<String, Value>>>;

pub fn new_frame() -> Frame {
    Rc::new(RefCell::new(HashMap::new()))
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    /// A `malloc`'d, resizable buffer of values, shared by reference so
    /// `set`/`get` observe each other's writes.
    Buffer(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    Native(Rc<NativeFn>),
}

/// A user-defined closure: its body (already a postfix stack, by the time
/// the builder hands it to the evaluator) plus the namespace stack that was
/// live at the point of definition.
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Token>,
    pub closure: Vec<Frame>,
}

/// A host function backed by Rust code rather than calculator-language
/// tokens. `arity` is `None` for variadic host functions (`print`,
/// `println`).
pub struct NativeFn {
    pub name: &'static str,
    pub arity: Option<usize>,
    pub func: Box<dyn Fn(&[Value], Position) -> Result<Value>>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Buffer(_) => "buffer",
            Value::Function(_) => "function",
            Value::Native(_) => "function",
        }
    }

    /// The display form of `.name` on a function value (part of the dot-operator
    /// whitelist): `"<lambda>(x,y)"` for anonymous closures, `"f(x,y)"` for
    /// named ones, `"name(native)"` for host functions.
    pub fn display_name(&self) -> Option<String> {
        match self {
            Value::Function(f) => {
                let label = if f.name.is_empty() { "<lambda>" } else { &f.name };
                Some(format!("{label}({})", f.params.join(",")))
            }
            Value::Native(n) => Some(format!("{}(native)", n.name)),
            _ => None,
        }
    }

    /// The length used by `.len` and the `len` builtin: strings count
    /// characters, buffers count elements.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::Buffer(b) => Some(b.borrow().len()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Buffer(b) => !b.borrow().is_empty(),
            Value::Function(_) | Value::Native(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Buffer(b) => {
                let items = b.borrow();
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Function(func) => write!(
                f,
                "{}",
                self.display_name()
                    .unwrap_or_else(|| func.name.clone())
            ),
            Value::Native(n) => write!(f, "{}(native)", n.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Buffer(b) => write!(f, "Buffer(len={})", b.borrow().len()),
            Value::Function(func) => write!(f, "Function({})", func.name),
            Value::Native(n) => write!(f, "Native({})", n.name),
        }
    }
}
