//! Runtime payload checks built from a resolved schema

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::error::{FieldError, FieldErrorKind, ValidationFailure};
use super::node::{Constraints, PrimitiveType, SchemaKind, SchemaNode};

/// Tolerance for `multipleOf` checks on floats
const MULTIPLE_TOLERANCE: f64 = 1e-9;

/// What to do with object members the schema does not declare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraFields {
    /// Silently leave them out of the normalized value
    #[default]
    Drop,
    /// Report each one as `unexpected_field`
    Reject,
    /// Pass them through untouched
    Keep,
}

#[derive(Debug, Clone)]
enum Check {
    Primitive(PrimitiveType),
    Object(IndexMap<String, Rule>),
    Array(Option<Box<Rule>>),
    /// Guard placeholder: any object is accepted as-is
    Open,
}

#[derive(Debug, Clone)]
struct Rule {
    check: Check,
    required: bool,
    constraints: Constraints,
}

impl Rule {
    fn from_node(node: &SchemaNode) -> Self {
        let check = match &node.kind {
            _ if node.truncated => Check::Open,
            SchemaKind::Primitive { primitive } => Check::Primitive(*primitive),
            SchemaKind::Object { properties } => Check::Object(
                properties
                    .iter()
                    .map(|(name, child)| (name.clone(), Rule::from_node(child)))
                    .collect(),
            ),
            SchemaKind::Array { items } => {
                Check::Array(items.as_deref().map(|item| Box::new(Rule::from_node(item))))
            }
        };
        Self {
            check,
            required: node.required,
            constraints: node.constraints.clone(),
        }
    }
}

/// Checker for one endpoint's payloads, built once and reused per request
#[derive(Debug, Clone)]
pub struct ValidationModel {
    name: Option<String>,
    root: Rule,
    extra_fields: ExtraFields,
}

impl ValidationModel {
    pub fn from_node(node: &SchemaNode) -> Self {
        let mut root = Rule::from_node(node);
        // The payload itself is always expected
        root.required = true;
        Self {
            name: node.name.clone(),
            root,
            extra_fields: ExtraFields::default(),
        }
    }

    pub fn with_extra_fields(mut self, extra_fields: ExtraFields) -> Self {
        self.extra_fields = extra_fields;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check `value`, returning the normalized copy or every violation found
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationFailure> {
        let mut errors = Vec::new();
        let normalized = self.check(&self.root, value, "", &mut errors);
        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(ValidationFailure { errors })
        }
    }

    fn check(&self, rule: &Rule, value: &Value, path: &str, errors: &mut Vec<FieldError>) -> Value {
        if value.is_null() {
            if !rule.required || rule.constraints.nullable {
                return Value::Null;
            }
            errors.push(error(path, FieldErrorKind::TypeMismatch, expected_type(rule), value));
            return Value::Null;
        }

        if let Some(allowed) = &rule.constraints.enum_values {
            if !allowed.contains(value) {
                let expected = format!("one of {}", Value::Array(allowed.clone()));
                errors.push(error(path, FieldErrorKind::Enum, expected, value));
            }
            return value.clone();
        }

        match &rule.check {
            Check::Primitive(primitive) => {
                self.check_primitive(*primitive, rule, value, path, errors)
            }
            Check::Object(properties) => self.check_object(properties, value, path, errors),
            Check::Array(items) => self.check_array(items.as_deref(), value, path, errors),
            Check::Open => {
                if !value.is_object() {
                    errors.push(error(path, FieldErrorKind::TypeMismatch, "object", value));
                }
                value.clone()
            }
        }
    }

    fn check_primitive(
        &self,
        primitive: PrimitiveType,
        rule: &Rule,
        value: &Value,
        path: &str,
        errors: &mut Vec<FieldError>,
    ) -> Value {
        let constraints = &rule.constraints;
        match primitive {
            PrimitiveType::String => {
                let Some(text) = value.as_str() else {
                    errors.push(error(path, FieldErrorKind::TypeMismatch, "string", value));
                    return value.clone();
                };
                let len = text.chars().count() as u64;
                if let Some(min) = constraints.min_length.filter(|min| len < *min) {
                    let expected = format!("at least {} characters", min);
                    errors.push(error(path, FieldErrorKind::Length, expected, value));
                }
                if let Some(max) = constraints.max_length.filter(|max| len > *max) {
                    let expected = format!("at most {} characters", max);
                    errors.push(error(path, FieldErrorKind::Length, expected, value));
                }
                value.clone()
            }
            PrimitiveType::Boolean => {
                if !value.is_boolean() {
                    errors.push(error(path, FieldErrorKind::TypeMismatch, "boolean", value));
                }
                value.clone()
            }
            PrimitiveType::Integer => {
                let normalized = match value {
                    Value::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
                    // Integral floats such as 18.0 are coerced
                    Value::Number(n) => match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Value::Number(Number::from(f as i64))
                        }
                        _ => {
                            let kind = FieldErrorKind::TypeMismatch;
                            errors.push(error(path, kind, "integer", value));
                            return value.clone();
                        }
                    },
                    _ => {
                        errors.push(error(path, FieldErrorKind::TypeMismatch, "integer", value));
                        return value.clone();
                    }
                };
                if let Some(n) = normalized.as_f64() {
                    check_number(n, constraints, path, value, errors);
                }
                normalized
            }
            PrimitiveType::Number => {
                match value.as_f64() {
                    Some(n) => check_number(n, constraints, path, value, errors),
                    None => errors.push(error(path, FieldErrorKind::TypeMismatch, "number", value)),
                }
                value.clone()
            }
        }
    }

    fn check_object(
        &self,
        properties: &IndexMap<String, Rule>,
        value: &Value,
        path: &str,
        errors: &mut Vec<FieldError>,
    ) -> Value {
        let Some(members) = value.as_object() else {
            errors.push(error(path, FieldErrorKind::TypeMismatch, "object", value));
            return value.clone();
        };

        let mut normalized = Map::new();
        for (name, rule) in properties {
            let child_path = join(path, name);
            match members.get(name) {
                Some(member) => {
                    let checked = self.check(rule, member, &child_path, errors);
                    normalized.insert(name.clone(), checked);
                }
                None if rule.required => {
                    let kind = FieldErrorKind::Missing;
                    errors.push(error(&child_path, kind, "required field", &Value::Null));
                }
                None => {}
            }
        }

        for (name, member) in members {
            if properties.contains_key(name) {
                continue;
            }
            match self.extra_fields {
                ExtraFields::Drop => {}
                ExtraFields::Keep => {
                    normalized.insert(name.clone(), member.clone());
                }
                ExtraFields::Reject => errors.push(error(
                    &join(path, name),
                    FieldErrorKind::UnexpectedField,
                    "no undeclared fields",
                    member,
                )),
            }
        }

        Value::Object(normalized)
    }

    fn check_array(
        &self,
        items: Option<&Rule>,
        value: &Value,
        path: &str,
        errors: &mut Vec<FieldError>,
    ) -> Value {
        let Some(elements) = value.as_array() else {
            errors.push(error(path, FieldErrorKind::TypeMismatch, "array", value));
            return value.clone();
        };

        let Some(item_rule) = items else {
            return value.clone();
        };

        let checked = elements
            .iter()
            .enumerate()
            .map(|(i, element)| {
                let element_path = format!("{}[{}]", path, i);
                // Array elements are always expected to be present
                let rule = Rule {
                    required: true,
                    ..item_rule.clone()
                };
                self.check(&rule, element, &element_path, errors)
            })
            .collect();
        Value::Array(checked)
    }
}

/// Free-function form of [`ValidationModel::validate`]
pub fn validate(value: &Value, model: &ValidationModel) -> Result<Value, ValidationFailure> {
    model.validate(value)
}

fn check_number(
    n: f64,
    constraints: &Constraints,
    path: &str,
    actual: &Value,
    errors: &mut Vec<FieldError>,
) {
    if let Some(min) = constraints.minimum {
        let (ok, op) = if constraints.exclusive_minimum {
            (n > min, ">")
        } else {
            (n >= min, ">=")
        };
        if !ok {
            let expected = format!("{} {}", op, min);
            errors.push(error(path, FieldErrorKind::OutOfBounds, expected, actual));
        }
    }
    if let Some(max) = constraints.maximum {
        let (ok, op) = if constraints.exclusive_maximum {
            (n < max, "<")
        } else {
            (n <= max, "<=")
        };
        if !ok {
            let expected = format!("{} {}", op, max);
            errors.push(error(path, FieldErrorKind::OutOfBounds, expected, actual));
        }
    }
    if let Some(step) = constraints.multiple_of {
        if !is_multiple(n, step) {
            let expected = format!("multiple of {}", step);
            errors.push(error(path, FieldErrorKind::MultipleOf, expected, actual));
        }
    }
}

/// Whether `n` is a whole multiple of `step`, within float tolerance
pub(crate) fn is_multiple(n: f64, step: f64) -> bool {
    let ratio = n / step;
    (ratio - ratio.round()).abs() <= MULTIPLE_TOLERANCE * ratio.abs().max(1.0)
}

fn expected_type(rule: &Rule) -> &'static str {
    match &rule.check {
        Check::Primitive(primitive) => primitive.as_str(),
        Check::Object(_) | Check::Open => "object",
        Check::Array(_) => "array",
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn error(
    path: &str,
    kind: FieldErrorKind,
    expected: impl Into<String>,
    actual: &Value,
) -> FieldError {
    FieldError {
        path: path.to_string(),
        kind,
        expected: expected.into(),
        actual: actual.clone(),
    }
}
