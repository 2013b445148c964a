pub mod error;

use crate::parser::statement::Statement;
use compact_str::{CompactString, CompactStringExt};
use error::ExecErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A function value. It owns its body and nothing else: names used inside
/// the body are looked up in whichever context runs the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub body: Arc<[Statement]>,
    /// Which program the body was parsed from. Spans in the body are only
    /// meaningful against that program's source.
    pub origin: u64,
}

impl Function {
    pub fn new(body: impl Into<Arc<[Statement]>>, origin: u64) -> Self {
        Self {
            body: body.into(),
            origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Number(#[serde(with = "number_repr")] f64),
    Boolean(bool),
    String(CompactString),
    Function(Function),
}

/// JSON has no infinities or NaN, so those are written as strings.
mod number_repr {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Special(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(value) => Ok(value),
            Repr::Special(text) => match text.as_str() {
                "nan" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid number {other:?}"))),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Boolean,
    String,
    Function,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Number => write!(f, "number"),
            ValueKind::Boolean => write!(f, "boolean"),
            ValueKind::String => write!(f, "string"),
            ValueKind::Function => write!(f, "function"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Function(_) => write!(f, "<fun>"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

// Coercions
impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::String(_) => ValueKind::String,
            Value::Function(_) => ValueKind::Function,
        }
    }

    fn mismatch(&self, expected: ValueKind) -> ExecErrorKind {
        ExecErrorKind::TypeMismatch {
            expected,
            actual: self.kind(),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, ExecErrorKind> {
        match self {
            Value::Boolean(v) => Ok(*v),
            v => Err(v.mismatch(ValueKind::Boolean)),
        }
    }

    pub fn as_function(&self) -> Result<&Function, ExecErrorKind> {
        match self {
            Value::Function(fun) => Ok(fun),
            v => Err(v.mismatch(ValueKind::Function)),
        }
    }

    pub fn as_number(&self) -> Result<f64, ExecErrorKind> {
        match self {
            Value::Number(v) => Ok(*v),
            v => Err(v.mismatch(ValueKind::Number)),
        }
    }

    pub fn as_string(&self) -> Result<&str, ExecErrorKind> {
        match self {
            Value::String(v) => Ok(v),
            v => Err(v.mismatch(ValueKind::String)),
        }
    }
}

impl Value {
    // Arithmetic + string concatenation
    pub fn add(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        match (self, other) {
            (Value::Number(lhs), rhs) => Ok(Value::Number(lhs + rhs.as_number()?)),
            (Value::String(lhs), rhs) => {
                Ok(Value::String([lhs.as_str(), rhs.as_string()?].concat_compact()))
            }
            (lhs, _) => Err(lhs.mismatch(ValueKind::Number)),
        }
    }

    pub fn subtract(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        Ok(Value::Number(self.as_number()? - other.as_number()?))
    }

    pub fn multiply(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        Ok(Value::Number(self.as_number()? * other.as_number()?))
    }

    pub fn divide(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        Ok(Value::Number(self.as_number()? / other.as_number()?))
    }

    pub fn remainder(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        Ok(Value::Number(self.as_number()? % other.as_number()?))
    }

    pub fn negate(&self) -> Result<Value, ExecErrorKind> {
        Ok(Value::Number(-self.as_number()?))
    }

    // Comparison
    pub fn less_than(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        Ok(Value::Boolean(self.as_number()? < other.as_number()?))
    }

    pub fn less_than_or_equal(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        Ok(Value::Boolean(self.as_number()? <= other.as_number()?))
    }

    pub fn greater_than(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        Ok(Value::Boolean(self.as_number()? > other.as_number()?))
    }

    pub fn greater_than_or_equal(&self, other: &Value) -> Result<Value, ExecErrorKind> {
        Ok(Value::Boolean(self.as_number()? >= other.as_number()?))
    }

    // Equality
    pub fn is_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(lhs), Value::Number(rhs)) => lhs == rhs,
            (Value::Boolean(lhs), Value::Boolean(rhs)) => lhs == rhs,
            (Value::String(lhs), Value::String(rhs)) => lhs == rhs,
            (Value::Function(lhs), Value::Function(rhs)) => lhs.body == rhs.body,
            _ => false,
        }
    }
}
