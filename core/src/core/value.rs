// pipewright/src/core/value.rs

//! The dynamic value threaded through a pipeline run, and the runtime type tags the
//! validator checks it against.

use std::collections::BTreeMap;
use std::fmt;

/// Kind of an opaque handle carried inside a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
  /// Something callable (a registered function).
  Function,
  /// A handle to a running process or worker.
  Process,
  /// A handle to an external resource (socket, port, driver).
  Port,
  /// An opaque unique reference.
  Reference,
}

impl HandleKind {
  fn as_str(self) -> &'static str {
    match self {
      HandleKind::Function => "function",
      HandleKind::Process => "process",
      HandleKind::Port => "port",
      HandleKind::Reference => "reference",
    }
  }
}

/// An opaque handle. Pipelines only pass these along; only the kind is inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
  pub kind: HandleKind,
  pub id: u64,
}

/// A named record with fields, the structured counterpart of a plain map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
  pub name: String,
  pub fields: BTreeMap<String, Value>,
}

impl Record {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      fields: BTreeMap::new(),
    }
  }

  #[must_use]
  pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.fields.insert(field.into(), value.into());
    self
  }
}

/// Dynamically typed value passed from step to step.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  Integer(i64),
  Float(f64),
  String(String),
  Atom(String),
  List(Vec<Value>),
  Tuple(Vec<Value>),
  Map(BTreeMap<String, Value>),
  Record(Record),
  Handle(Handle),
}

impl Value {
  /// Builds a `Value::Map` from `(key, value)` pairs.
  pub fn map<K, V, I>(entries: I) -> Self
  where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
  {
    Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }

  pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
    Value::List(items.into_iter().map(Into::into).collect())
  }

  pub fn atom(name: impl Into<String>) -> Self {
    Value::Atom(name.into())
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  /// Looks up a field of a map or record. Any other value has no fields.
  pub fn get(&self, field: &str) -> Option<&Value> {
    match self {
      Value::Map(entries) => entries.get(field),
      Value::Record(record) => record.fields.get(field),
      _ => None,
    }
  }

  /// Mutable counterpart of [`Value::get`].
  pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
    match self {
      Value::Map(entries) => entries.get_mut(field),
      Value::Record(record) => record.fields.get_mut(field),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Integer(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Integer(i) => Some(*i as f64),
      Value::Float(f) => Some(*f),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  /// Consumes the value, returning its items if it is a list.
  pub fn into_list(self) -> Option<Vec<Value>> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  /// Returns `true` if this value carries the runtime tag `tag`.
  pub fn has_tag(&self, tag: &TypeTag) -> bool {
    match (tag, self) {
      (TypeTag::Any, _) => true,
      (TypeTag::String, Value::String(_)) => true,
      (TypeTag::Integer, Value::Integer(_)) => true,
      (TypeTag::Float, Value::Float(_)) => true,
      (TypeTag::Number, Value::Integer(_) | Value::Float(_)) => true,
      (TypeTag::Atom, Value::Atom(_)) => true,
      (TypeTag::List, Value::List(_)) => true,
      (TypeTag::Boolean, Value::Bool(_)) => true,
      (TypeTag::Tuple, Value::Tuple(_)) => true,
      (TypeTag::Map, Value::Map(_)) => true,
      (TypeTag::Struct, Value::Record(_)) => true,
      (TypeTag::Record(name), Value::Record(record)) => &record.name == name,
      (TypeTag::Function, Value::Handle(h)) => h.kind == HandleKind::Function,
      (TypeTag::Process, Value::Handle(h)) => h.kind == HandleKind::Process,
      (TypeTag::Port, Value::Handle(h)) => h.kind == HandleKind::Port,
      (TypeTag::Reference, Value::Handle(h)) => h.kind == HandleKind::Reference,
      _ => false,
    }
  }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
  for (idx, item) in items.iter().enumerate() {
    if idx > 0 {
      f.write_str(", ")?;
    }
    write!(f, "{item}")?;
  }
  Ok(())
}

/// Inspect-style rendering, used in validation messages: strings are quoted so that
/// `"25"` and `25` read differently.
impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => f.write_str("null"),
      Value::Bool(b) => write!(f, "{b}"),
      Value::Integer(i) => write!(f, "{i}"),
      Value::Float(x) => write!(f, "{x:?}"),
      Value::String(s) => write!(f, "{s:?}"),
      Value::Atom(a) => write!(f, ":{a}"),
      Value::List(items) => {
        f.write_str("[")?;
        write_seq(f, items)?;
        f.write_str("]")
      }
      Value::Tuple(items) => {
        f.write_str("(")?;
        write_seq(f, items)?;
        f.write_str(")")
      }
      Value::Map(entries) => {
        f.write_str("{")?;
        for (idx, (k, v)) in entries.iter().enumerate() {
          if idx > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{k:?}: {v}")?;
        }
        f.write_str("}")
      }
      Value::Record(record) => {
        write!(f, "{} {{", record.name)?;
        for (idx, (k, v)) in record.fields.iter().enumerate() {
          if idx > 0 {
            f.write_str(",")?;
          }
          write!(f, " {k}: {v}")?;
        }
        f.write_str(" }")
      }
      Value::Handle(h) => write!(f, "<{} {}>", h.kind.as_str(), h.id),
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self {
    Value::Integer(i)
  }
}

impl From<i32> for Value {
  fn from(i: i32) -> Self {
    Value::Integer(i64::from(i))
  }
}

impl From<u32> for Value {
  fn from(i: u32) -> Self {
    Value::Integer(i64::from(i))
  }
}

impl From<f64> for Value {
  fn from(x: f64) -> Self {
    Value::Float(x)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl From<Record> for Value {
  fn from(r: Record) -> Self {
    Value::Record(r)
  }
}

impl From<Handle> for Value {
  fn from(h: Handle) -> Self {
    Value::Handle(h)
  }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
  fn from(items: Vec<V>) -> Self {
    Value::list(items)
  }
}

impl<V: Into<Value>> From<Option<V>> for Value {
  fn from(opt: Option<V>) -> Self {
    opt.map_or(Value::Null, Into::into)
  }
}

/// Runtime type tags recognised by the `of_type` validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
  /// Wildcard: every value matches.
  Any,
  String,
  Integer,
  Float,
  /// Integers and floats.
  Number,
  Atom,
  List,
  Boolean,
  Tuple,
  Map,
  Function,
  Process,
  Port,
  Reference,
  /// Any record, whatever its name.
  Struct,
  /// A record with exactly this name.
  Record(String),
}

impl fmt::Display for TypeTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TypeTag::Any => "Any",
      TypeTag::String => "String",
      TypeTag::Integer => "Integer",
      TypeTag::Float => "Float",
      TypeTag::Number => "Number",
      TypeTag::Atom => "Atom",
      TypeTag::List => "List",
      TypeTag::Boolean => "Boolean",
      TypeTag::Tuple => "Tuple",
      TypeTag::Map => "Map",
      TypeTag::Function => "Function",
      TypeTag::Process => "Process",
      TypeTag::Port => "Port",
      TypeTag::Reference => "Reference",
      TypeTag::Struct => "Struct",
      TypeTag::Record(name) => name.as_str(),
    };
    f.write_str(name)
  }
}
