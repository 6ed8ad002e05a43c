use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use thiserror::Error;

use crate::error::{Error, RuntimeErrorKind};
use crate::lexer::Span;
use crate::parser::{ConversionKind, FunctionDef, Node};
use crate::runtime::{Builtin, Context};

bitflags! {
    /// What a value can be used for, derived from its kind
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct Capabilities: u8 {
        /// Has a length and can be indexed
        const ITERABLE = 1 << 0;
        /// Holds other values or nodes
        const COLLECTION = 1 << 1;
        /// Can be the callee of `->` or `!`
        const CALLABLE = 1 << 2;
    }
}

/// Runtime value: a kind plus where it was produced
///
/// `span` and `context` are re-stamped whenever a value crosses a binding
/// site; equality only looks at the kind.
#[derive(Debug, Clone)]
pub struct Value {
    /// What the value is
    pub kind: ValueKind,
    /// Source that produced the value
    pub span: Option<Span>,
    /// Context in which the value was produced
    pub context: Option<Rc<Context>>,
}

/// The data carried by a [`Value`]
#[derive(Debug, Clone)]
pub enum ValueKind {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Every number is a 64-bit float
    Number(f64),
    /// String value
    String(String),
    /// `[..]`, element storage is owned by each copy
    List(Vec<Value>),
    /// `(..)`
    Tuple(Vec<Value>),
    /// `{..}`, nodes evaluated on demand
    Block(DeferredBlock),
    /// User defined function
    Function(Rc<Function>),
    /// Function implemented by the interpreter
    Builtin(Builtin),
}

/// Unevaluated block together with the context it was written in
#[derive(Debug, Clone)]
pub struct DeferredBlock {
    /// Nodes of the block, shared with the tree
    pub nodes: Rc<[Node]>,
    /// Context the nodes are evaluated in
    pub scope: Rc<Context>,
}

/// Function value: a definition closed over its defining context
#[derive(Debug)]
pub struct Function {
    /// Parsed definition
    pub def: Rc<FunctionDef>,
    /// Context the function was defined in
    pub scope: Rc<Context>,
}

/// Failure of a value operation; the interpreter attaches the location
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Operator or conversion not defined for the operand kinds
    #[error("Illegal operation")]
    IllegalOperation,
    /// Division by zero
    #[error("Division by zero")]
    ZeroDivision,
    /// Index outside of the collection
    #[error("Index {0} out of range")]
    IndexOutOfRange(i64),
    /// Repetition longer than [`MAX_REPEAT_LEN`]
    #[error("Repetition result is too large")]
    TooLarge,
}

impl ValueError {
    /// Runtime classification of this failure
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            ValueError::IllegalOperation | ValueError::TooLarge => {
                RuntimeErrorKind::IllegalOperation
            }
            ValueError::ZeroDivision => RuntimeErrorKind::ZeroDivision,
            ValueError::IndexOutOfRange(_) => RuntimeErrorKind::IndexOutOfRange,
        }
    }

    /// Turns this failure into a runtime error at `span`
    pub fn at(self, span: &Span, context: &Rc<Context>) -> Error {
        Error::runtime(self.kind(), span.clone(), self.to_string(), context)
    }
}

type OpResult = std::result::Result<Value, ValueError>;

impl Value {
    fn from_kind(kind: ValueKind) -> Self {
        Value {
            kind,
            span: None,
            context: None,
        }
    }

    /// Creates `null`
    pub fn null() -> Self {
        Self::from_kind(ValueKind::Null)
    }

    /// Creates a boolean
    pub fn boolean(b: bool) -> Self {
        Self::from_kind(ValueKind::Boolean(b))
    }

    /// Creates a number
    pub fn number(n: f64) -> Self {
        Self::from_kind(ValueKind::Number(n))
    }

    /// Creates a string
    pub fn string(s: impl Into<String>) -> Self {
        Self::from_kind(ValueKind::String(s.into()))
    }

    /// Creates a list
    pub fn list(items: Vec<Value>) -> Self {
        Self::from_kind(ValueKind::List(items))
    }

    /// Creates a tuple
    pub fn tuple(items: Vec<Value>) -> Self {
        Self::from_kind(ValueKind::Tuple(items))
    }

    /// Creates a block value
    pub fn block(block: DeferredBlock) -> Self {
        Self::from_kind(ValueKind::Block(block))
    }

    /// Creates a function value
    pub fn function(function: Function) -> Self {
        Self::from_kind(ValueKind::Function(Rc::new(function)))
    }

    /// Creates a builtin function value
    pub fn builtin(builtin: Builtin) -> Self {
        Self::from_kind(ValueKind::Builtin(builtin))
    }

    /// Copy of the value located at `span` inside `context`
    pub fn stamped(mut self, span: Span, context: &Rc<Context>) -> Self {
        self.span = Some(span);
        self.context = Some(Rc::clone(context));
        self
    }

    /// Copy of the value moved into `context`, keeping its span
    pub fn with_context(mut self, context: &Rc<Context>) -> Self {
        self.context = Some(Rc::clone(context));
        self
    }

    /// Result of an operation between `self` and `other`
    fn derive(&self, kind: ValueKind, other: &Value) -> Value {
        let span = match (&self.span, &other.span) {
            (Some(left), Some(right)) => Some(left.to(right)),
            (left, _) => left.clone(),
        };
        Value {
            kind,
            span,
            context: self.context.clone(),
        }
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Null => "null",
            ValueKind::Boolean(_) => "boolean",
            ValueKind::Number(_) => "number",
            ValueKind::String(_) => "string",
            ValueKind::List(_) => "list",
            ValueKind::Tuple(_) => "tuple",
            ValueKind::Block(_) => "curl",
            ValueKind::Function(_) => "function",
            ValueKind::Builtin(_) => "builtin-function",
        }
    }

    /// Capability set of this value's kind
    pub fn capabilities(&self) -> Capabilities {
        match self.kind {
            ValueKind::Null | ValueKind::Boolean(_) | ValueKind::Number(_) => {
                Capabilities::empty()
            }
            ValueKind::String(_) => Capabilities::ITERABLE,
            ValueKind::List(_) | ValueKind::Tuple(_) => {
                Capabilities::ITERABLE | Capabilities::COLLECTION
            }
            ValueKind::Block(_) => {
                Capabilities::ITERABLE | Capabilities::COLLECTION | Capabilities::CALLABLE
            }
            ValueKind::Function(_) | ValueKind::Builtin(_) => Capabilities::CALLABLE,
        }
    }

    /// Returns true if the value is truthy in a boolean context
    pub fn is_truthy(&self) -> bool {
        match &self.kind {
            ValueKind::Null => false,
            ValueKind::Boolean(b) => *b,
            ValueKind::Number(n) => *n != 0.0,
            ValueKind::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Number of elements of an iterable value
    pub fn element_count(&self) -> Option<usize> {
        match &self.kind {
            ValueKind::String(s) => Some(s.chars().count()),
            ValueKind::List(items) | ValueKind::Tuple(items) => Some(items.len()),
            ValueKind::Block(block) => Some(block.nodes.len()),
            _ => None,
        }
    }

    /// Number payload, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Number(n) => Some(n),
            _ => None,
        }
    }

    /// String payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    // Arithmetic

    /// `self + other`
    pub fn add(&self, other: &Value) -> OpResult {
        let kind = match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => ValueKind::Number(a + b),
            (ValueKind::String(a), ValueKind::String(b)) => ValueKind::String(format!("{a}{b}")),
            (ValueKind::List(a), ValueKind::List(b)) => {
                ValueKind::List(a.iter().chain(b).cloned().collect())
            }
            (ValueKind::List(a), _) => {
                let mut items = a.clone();
                items.push(other.clone());
                ValueKind::List(items)
            }
            (ValueKind::Tuple(a), ValueKind::Tuple(b)) => {
                ValueKind::Tuple(a.iter().chain(b).cloned().collect())
            }
            _ => return Err(ValueError::IllegalOperation),
        };
        Ok(self.derive(kind, other))
    }

    /// `self - other`
    pub fn sub(&self, other: &Value) -> OpResult {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => {
                Ok(self.derive(ValueKind::Number(a - b), other))
            }
            _ => Err(ValueError::IllegalOperation),
        }
    }

    /// `self * other`
    pub fn mul(&self, other: &Value) -> OpResult {
        let kind = match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => ValueKind::Number(a * b),
            (ValueKind::String(s), ValueKind::Number(n)) if *n >= 0.0 => {
                ValueKind::String(s.repeat(repeat_count(n.ceil(), s.len())?))
            }
            (ValueKind::List(items), ValueKind::Number(n)) => {
                ValueKind::List(repeat_items(items, *n)?)
            }
            (ValueKind::Tuple(items), ValueKind::Number(n)) => {
                ValueKind::Tuple(repeat_items(items, *n)?)
            }
            _ => return Err(ValueError::IllegalOperation),
        };
        Ok(self.derive(kind, other))
    }

    /// `self / other`
    pub fn div(&self, other: &Value) -> OpResult {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(_), ValueKind::Number(b)) if *b == 0.0 => {
                Err(ValueError::ZeroDivision)
            }
            (ValueKind::Number(a), ValueKind::Number(b)) => {
                Ok(self.derive(ValueKind::Number(a / b), other))
            }
            _ => Err(ValueError::IllegalOperation),
        }
    }

    /// `self ^ other`
    pub fn pow(&self, other: &Value) -> OpResult {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => {
                Ok(self.derive(ValueKind::Number(a.powf(*b)), other))
            }
            _ => Err(ValueError::IllegalOperation),
        }
    }

    /// `self ^^ other`, a tower of `other` copies of `self`
    pub fn tetrate(&self, other: &Value) -> OpResult {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(base), ValueKind::Number(height))
                if *height >= 0.0 && height.fract() == 0.0 =>
            {
                let result = tetration(*base, *height as u64);
                Ok(self.derive(ValueKind::Number(result), other))
            }
            _ => Err(ValueError::IllegalOperation),
        }
    }

    // Comparison

    /// `self == other`
    pub fn eq_value(&self, other: &Value) -> Value {
        self.derive(ValueKind::Boolean(self == other), other)
    }

    /// `self != other`
    pub fn ne_value(&self, other: &Value) -> Value {
        self.derive(ValueKind::Boolean(self != other), other)
    }

    /// `self < other`
    pub fn lt(&self, other: &Value) -> OpResult {
        self.compare(other, |o| o.is_lt())
    }

    /// `self > other`
    pub fn gt(&self, other: &Value) -> OpResult {
        self.compare(other, |o| o.is_gt())
    }

    /// `self <= other`
    pub fn lte(&self, other: &Value) -> OpResult {
        self.compare(other, |o| o.is_le())
    }

    /// `self >= other`
    pub fn gte(&self, other: &Value) -> OpResult {
        self.compare(other, |o| o.is_ge())
    }

    fn compare(&self, other: &Value, test: fn(std::cmp::Ordering) -> bool) -> OpResult {
        let ordering = match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => a.partial_cmp(b),
            (ValueKind::String(a), ValueKind::String(b)) => Some(a.cmp(b)),
            _ => return Err(ValueError::IllegalOperation),
        };
        // NaN compares false against everything
        let result = ordering.map(test).unwrap_or(false);
        Ok(self.derive(ValueKind::Boolean(result), other))
    }

    // Logic

    /// `self and other`
    pub fn and(&self, other: &Value) -> Value {
        self.derive(
            ValueKind::Boolean(self.is_truthy() && other.is_truthy()),
            other,
        )
    }

    /// `self or other`
    pub fn or(&self, other: &Value) -> Value {
        self.derive(
            ValueKind::Boolean(self.is_truthy() || other.is_truthy()),
            other,
        )
    }

    /// `not self`
    pub fn not(&self) -> Value {
        let mut result = self.clone();
        result.kind = ValueKind::Boolean(!self.is_truthy());
        result
    }

    // Conversion

    /// Elements seen by indexing and whole-value conversion
    fn elements(&self) -> Vec<Value> {
        match &self.kind {
            ValueKind::String(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
            ValueKind::List(items) | ValueKind::Tuple(items) => items.clone(),
            _ => vec![self.clone()],
        }
    }

    /// Bracket conversion of any value except a block
    ///
    /// Without indices the whole value becomes a list or tuple, one index
    /// selects an element and several indices select a new collection.
    /// Blocks need the interpreter and are converted there.
    pub fn convert(&self, kind: ConversionKind, indices: &[Value]) -> OpResult {
        if matches!(self.kind, ValueKind::Block(_)) {
            return Err(ValueError::IllegalOperation);
        }

        match indices {
            [] => match kind {
                ConversionKind::List => Ok(Value::list(self.elements())),
                ConversionKind::Paren => Ok(Value::tuple(self.elements())),
                ConversionKind::Curl => Err(ValueError::IllegalOperation),
            },
            [index] => {
                if !self.capabilities().contains(Capabilities::ITERABLE) {
                    return Err(ValueError::IllegalOperation);
                }
                let mut items = self.elements();
                let position = resolve_index(index, items.len())?;
                Ok(items.swap_remove(position))
            }
            _ => {
                if !self.capabilities().contains(Capabilities::ITERABLE) {
                    return Err(ValueError::IllegalOperation);
                }
                let items = self.elements();
                let selected = indices
                    .iter()
                    .map(|index| resolve_index(index, items.len()).map(|i| items[i].clone()))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                match kind {
                    ConversionKind::List => Ok(Value::list(selected)),
                    ConversionKind::Paren => Ok(Value::tuple(selected)),
                    ConversionKind::Curl => Err(ValueError::IllegalOperation),
                }
            }
        }
    }

    /// Text used when the value is shown as a result or inside a collection
    ///
    /// Same as `Display` except that strings are quoted.
    pub fn repr(&self) -> String {
        match &self.kind {
            ValueKind::String(s) => format!("{:?}", s),
            _ => self.to_string(),
        }
    }
}

impl DeferredBlock {
    /// Node positions selected by `indices`
    pub fn positions(&self, indices: &[Value]) -> std::result::Result<Vec<usize>, ValueError> {
        indices
            .iter()
            .map(|index| resolve_index(index, self.nodes.len()))
            .collect()
    }

    /// Block holding only the selected nodes, still unevaluated
    pub fn subset(&self, indices: &[Value]) -> std::result::Result<DeferredBlock, ValueError> {
        let nodes: Vec<Node> = self
            .positions(indices)?
            .into_iter()
            .map(|i| self.nodes[i].clone())
            .collect();
        Ok(DeferredBlock {
            nodes: Rc::from(nodes),
            scope: Rc::clone(&self.scope),
        })
    }
}

impl Function {
    /// Name used in messages and tracebacks
    pub fn name(&self) -> &str {
        self.def.display_name()
    }
}

/// Resolves a possibly negative index against a collection of `len` elements
pub fn resolve_index(index: &Value, len: usize) -> std::result::Result<usize, ValueError> {
    let n = match index.kind {
        ValueKind::Number(n) if n.is_finite() && n.fract() == 0.0 => n as i64,
        _ => return Err(ValueError::IllegalOperation),
    };

    let resolved = if n < 0 { len as i64 + n } else { n };
    if resolved < 0 || resolved >= len as i64 {
        return Err(ValueError::IndexOutOfRange(n));
    }
    Ok(resolved as usize)
}

/// Longest result of `*` repetition: bytes for strings, elements for lists
/// and tuples
pub const MAX_REPEAT_LEN: usize = 1 << 28;

/// Whole repeat count for `unit`-long input, keeping the result within
/// [`MAX_REPEAT_LEN`]
fn repeat_count(n: f64, unit: usize) -> std::result::Result<usize, ValueError> {
    if n < 0.0 || !n.is_finite() {
        return Err(ValueError::IllegalOperation);
    }
    if unit == 0 {
        return Ok(0);
    }
    if n > MAX_REPEAT_LEN as f64 {
        return Err(ValueError::TooLarge);
    }

    let count = n as usize;
    match unit.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(count),
        _ => Err(ValueError::TooLarge),
    }
}

fn repeat_items(items: &[Value], n: f64) -> std::result::Result<Vec<Value>, ValueError> {
    if n.fract() != 0.0 {
        return Err(ValueError::IllegalOperation);
    }
    let count = repeat_count(n, items.len())?;
    let mut result = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        result.extend(items.iter().cloned());
    }
    Ok(result)
}

/// `base ^^ height`
///
/// Stops early once the tower reaches a fixed point, overflows, or settles
/// into a two-value cycle.
fn tetration(base: f64, height: u64) -> f64 {
    let mut previous = f64::NAN;
    let mut current = 1.0;

    for step in 0..height {
        let next = base.powf(current);
        if next == current || next.is_nan() || next == f64::INFINITY {
            return next;
        }
        if next == previous {
            let remaining = height - step - 1;
            return if remaining % 2 == 0 { next } else { current };
        }
        previous = current;
        current = next;
    }

    current
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl PartialEq for ValueKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::Boolean(a), ValueKind::Boolean(b)) => a == b,
            (ValueKind::Number(a), ValueKind::Number(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::List(a), ValueKind::List(b)) => a == b,
            (ValueKind::Tuple(a), ValueKind::Tuple(b)) => a == b,
            // Blocks and functions compare by identity
            (ValueKind::Block(a), ValueKind::Block(b)) => {
                Rc::ptr_eq(&a.nodes, &b.nodes) && Rc::ptr_eq(&a.scope, &b.scope)
            }
            (ValueKind::Function(a), ValueKind::Function(b)) => Rc::ptr_eq(a, b),
            (ValueKind::Builtin(a), ValueKind::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn join(f: &mut fmt::Formatter, items: &[Value]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item.repr())?;
            }
            Ok(())
        }

        match &self.kind {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Boolean(b) => write!(f, "{}", b),
            ValueKind::Number(n) => write!(f, "{}", n),
            ValueKind::String(s) => write!(f, "{}", s),
            ValueKind::List(items) => {
                write!(f, "[")?;
                join(f, items)?;
                write!(f, "]")
            }
            ValueKind::Tuple(items) => {
                write!(f, "(")?;
                join(f, items)?;
                write!(f, ")")
            }
            ValueKind::Block(block) => write!(f, "{{{} nodes}}", block.nodes.len()),
            ValueKind::Function(func) => write!(f, "<function {}>", func.name()),
            ValueKind::Builtin(builtin) => write!(f, "<built-in function {}>", builtin.name()),
        }
    }
}
