//! Typed parameter values bound for a single run.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use super::{lookup, parameters, ParamType, ParameterSpec};
use crate::error::ArgumentError;

/// Location of a file or directory argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathRef {
    /// Path on the local filesystem of the task.
    Local(PathBuf),
    /// URI in a remote store (`s3://`, `latch://`, ...).
    Remote(String),
}

impl PathRef {
    /// Parses a user-supplied location. Anything with a URI scheme is remote.
    pub fn parse(raw: &str) -> Self {
        if raw.contains("://") {
            PathRef::Remote(raw.to_string())
        } else {
            PathRef::Local(PathBuf::from(raw))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, PathRef::Remote(_))
    }
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRef::Local(path) => write!(f, "{}", path.display()),
            PathRef::Remote(uri) => write!(f, "{}", uri),
        }
    }
}

/// A concrete value bound to one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    File(PathRef),
    Dir(PathRef),
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl ParamValue {
    /// The parameter type this value satisfies.
    pub fn kind(&self) -> ParamType {
        match self {
            ParamValue::File(_) => ParamType::File,
            ParamValue::Dir(_) => ParamType::Dir,
            ParamValue::Str(_) => ParamType::Str,
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Float(_) => ParamType::Float,
        }
    }

    /// Converts a raw document value into a typed value for `spec`.
    ///
    /// Returns `Ok(None)` for `null`, which leaves the parameter unset.
    fn from_json(spec: &ParameterSpec, raw: &Value) -> Result<Option<Self>, ArgumentError> {
        let value = match (spec.kind, raw) {
            (_, Value::Null) => return Ok(None),
            (ParamType::File, Value::String(s)) => ParamValue::File(PathRef::parse(s)),
            (ParamType::Dir, Value::String(s)) => ParamValue::Dir(PathRef::parse(s)),
            (ParamType::Str, Value::String(s)) => ParamValue::Str(s.clone()),
            (ParamType::Bool, Value::Bool(b)) => ParamValue::Bool(*b),
            (ParamType::Int, Value::Number(n)) => match n.as_i64() {
                Some(i) => ParamValue::Int(i),
                None => return Err(mismatch(spec, raw)),
            },
            (ParamType::Float, Value::Number(n)) => match n.as_f64() {
                Some(f) => ParamValue::Float(f),
                None => return Err(mismatch(spec, raw)),
            },
            _ => return Err(mismatch(spec, raw)),
        };
        Ok(Some(value))
    }
}

fn mismatch(spec: &ParameterSpec, raw: &Value) -> ArgumentError {
    ArgumentError::TypeMismatch {
        name: spec.name.to_string(),
        expected: spec.kind.display_name(),
        actual: describe_json(raw),
    }
}

fn describe_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

/// Values bound to pipeline parameters for one execution.
///
/// A parameter missing from the map is unset and produces no engine flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunArguments {
    values: HashMap<&'static str, ParamValue>,
}

impl RunArguments {
    /// Creates an empty set of arguments (every parameter unset).
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to the parameter `name`.
    ///
    /// Integers are widened when bound to float parameters; any other type
    /// mismatch is rejected.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ArgumentError> {
        let spec = lookup(name).ok_or_else(|| ArgumentError::UnknownParameter(name.to_string()))?;
        let value = match (spec.kind, value) {
            (ParamType::Float, ParamValue::Int(i)) => ParamValue::Float(i as f64),
            (kind, value) if value.kind() == kind => value,
            (kind, value) => {
                return Err(ArgumentError::TypeMismatch {
                    name: spec.name.to_string(),
                    expected: kind.display_name(),
                    actual: value.kind().display_name().to_string(),
                })
            }
        };
        self.values.insert(spec.name, value);
        Ok(())
    }

    /// Builder form of [`RunArguments::set`].
    pub fn with(mut self, name: &str, value: ParamValue) -> Result<Self, ArgumentError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Clears the parameter `name`, returning its previous value.
    pub fn unset(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over bound values in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static ParameterSpec, &ParamValue)> + '_ {
        parameters()
            .iter()
            .filter_map(move |spec| self.values.get(spec.name).map(|value| (spec, value)))
    }

    /// Builds arguments from a parsed `{name: value}` document.
    pub fn from_json_value(doc: &Value) -> Result<Self, ArgumentError> {
        let map = doc.as_object().ok_or(ArgumentError::NotAMapping)?;
        let mut args = Self::new();
        for (name, raw) in map {
            let spec = lookup(name).ok_or_else(|| ArgumentError::UnknownParameter(name.clone()))?;
            if let Some(value) = ParamValue::from_json(spec, raw)? {
                args.values.insert(spec.name, value);
            }
        }
        Ok(args)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ArgumentError> {
        let doc: Value = serde_json::from_str(content)?;
        Self::from_json_value(&doc)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ArgumentError> {
        let doc: Value = serde_yaml::from_str(content)?;
        Self::from_json_value(&doc)
    }

    /// Loads arguments from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self, ArgumentError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(ArgumentError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}
