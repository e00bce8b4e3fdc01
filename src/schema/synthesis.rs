//! Constraint-respecting example values
//!
//! Every value produced for a node passes [`ValidationModel`](super::ValidationModel)
//! checks built from the same node, as long as the declared constraints are
//! satisfiable.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use super::error::EngineError;
use super::formats;
use super::node::{Constraints, PrimitiveType, SchemaKind, SchemaNode};
use super::pattern;
use super::policy::{Fallback, FallbackPolicy};
use super::validation::is_multiple;

const DEFAULT_MIN_NUMBER: f64 = 1.0;
const DEFAULT_MAX_NUMBER: f64 = 100.0;
const DEFAULT_MIN_LENGTH: usize = 1;
const DEFAULT_MAX_LENGTH: usize = 10;
const DEFAULT_MIN_ITEMS: usize = 1;
const DEFAULT_MAX_ITEMS: usize = 10;

/// Shift applied to an exclusive float bound
const FLOAT_EPSILON: f64 = 0.01;

/// Largest factor tried when lifting a fractional step to an integer one
const MAX_STEP_FACTOR: u32 = 1000;

pub struct Synthesizer {
    rng: StdRng,
    policy: FallbackPolicy,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            policy: FallbackPolicy::default(),
        }
    }

    /// Reproducible output: the same seed and node give the same value
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            policy: FallbackPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn synthesize(&mut self, node: &SchemaNode) -> Result<Value, EngineError> {
        if let Some(choices) = &node.constraints.enum_values {
            if let Some(choice) = choices.choose(&mut self.rng) {
                return Ok(choice.clone());
            }
        }

        match &node.kind {
            SchemaKind::Primitive { primitive } => match primitive {
                PrimitiveType::String => self.string(&node.constraints).map(Value::String),
                PrimitiveType::Integer => Ok(Value::from(self.integer(&node.constraints))),
                PrimitiveType::Number => Ok(Value::from(self.number(&node.constraints))),
                PrimitiveType::Boolean => Ok(Value::Bool(self.rng.gen_bool(0.5))),
            },
            SchemaKind::Object { properties } => {
                let mut object = Map::new();
                for (name, child) in properties {
                    object.insert(name.clone(), self.synthesize(child)?);
                }
                Ok(Value::Object(object))
            }
            SchemaKind::Array { items } => self.array(items.as_deref(), &node.constraints),
        }
    }

    fn array(
        &mut self,
        items: Option<&SchemaNode>,
        constraints: &Constraints,
    ) -> Result<Value, EngineError> {
        let min = constraints
            .min_items
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MIN_ITEMS);
        let max = constraints
            .max_items
            .map(|n| n as usize)
            .unwrap_or_else(|| DEFAULT_MAX_ITEMS.max(min));
        let count = if min >= max {
            min
        } else {
            self.rng.gen_range(min..=max)
        };

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let value = match items {
                Some(item) => self.synthesize(item)?,
                None => Value::String(self.plain_string(&Constraints::default())),
            };
            values.push(value);
        }

        // Deduplicate without topping back up; the result may fall below minItems
        if constraints.unique_items {
            let mut unique: Vec<Value> = Vec::with_capacity(values.len());
            for value in values {
                if !unique.contains(&value) {
                    unique.push(value);
                }
            }
            values = unique;
        }

        Ok(Value::Array(values))
    }

    fn string(&mut self, constraints: &Constraints) -> Result<String, EngineError> {
        if let Some(regex) = &constraints.pattern {
            match pattern::generate(regex, &mut self.rng) {
                Ok(value) => return Ok(self.fit_length(value, constraints)),
                Err(e) => match self.policy.on_invalid_pattern {
                    Fallback::Degrade => {
                        tracing::warn!(
                            pattern = %regex,
                            error = %e,
                            "Cannot generate from pattern, using an unconstrained string"
                        );
                        return Ok(self.plain_string(constraints));
                    }
                    Fallback::Fail => {
                        return Err(EngineError::PatternGenerationFailure {
                            pattern: regex.clone(),
                            reason: e.to_string(),
                        })
                    }
                },
            }
        }

        if let Some(format) = &constraints.format {
            match formats::generate(format, &mut self.rng) {
                Some(value) => return Ok(self.fit_length(value, constraints)),
                None => tracing::debug!(format = %format, "Unknown format, using a plain string"),
            }
        }

        Ok(self.plain_string(constraints))
    }

    fn plain_string(&mut self, constraints: &Constraints) -> String {
        let min = constraints
            .min_length
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MIN_LENGTH);
        let max = constraints
            .max_length
            .map(|n| n as usize)
            .unwrap_or_else(|| DEFAULT_MAX_LENGTH.max(min));
        let len = if min >= max {
            min
        } else {
            self.rng.gen_range(min..=max)
        };
        pattern::alphanumeric(len, &mut self.rng)
    }

    /// Pad with alphanumerics up to minLength, truncate down to maxLength
    fn fit_length(&mut self, mut value: String, constraints: &Constraints) -> String {
        let len = value.chars().count();
        if let Some(min) = constraints.min_length.map(|n| n as usize) {
            if len < min {
                value.push_str(&pattern::alphanumeric(min - len, &mut self.rng));
            }
        }
        if let Some(max) = constraints.max_length.map(|n| n as usize) {
            if value.chars().count() > max {
                value = value.chars().take(max).collect();
            }
        }
        value
    }

    fn integer(&mut self, constraints: &Constraints) -> i64 {
        let lower = constraints.minimum.map(|m| {
            if constraints.exclusive_minimum {
                m.floor() as i64 + 1
            } else {
                m.ceil() as i64
            }
        });
        let upper = constraints.maximum.map(|m| {
            if constraints.exclusive_maximum {
                m.ceil() as i64 - 1
            } else {
                m.floor() as i64
            }
        });

        let (lo, hi) = match (lower, upper) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, (DEFAULT_MAX_NUMBER as i64).max(lo.saturating_add(99))),
            (None, Some(hi)) => ((DEFAULT_MIN_NUMBER as i64).min(hi.saturating_sub(99)), hi),
            (None, None) => (DEFAULT_MIN_NUMBER as i64, DEFAULT_MAX_NUMBER as i64),
        };
        if lo >= hi {
            return lo;
        }

        let value = self.rng.gen_range(lo..=hi);

        match constraints.multiple_of.and_then(integer_step) {
            Some(step) => {
                let quantized = value.div_euclid(step) * step;
                if quantized < lo {
                    quantized + step
                } else {
                    quantized
                }
            }
            None => value,
        }
    }

    fn number(&mut self, constraints: &Constraints) -> f64 {
        let lower = constraints.minimum.map(|m| {
            if constraints.exclusive_minimum {
                m + FLOAT_EPSILON
            } else {
                m
            }
        });
        let upper = constraints.maximum.map(|m| {
            if constraints.exclusive_maximum {
                m - FLOAT_EPSILON
            } else {
                m
            }
        });

        let (lo, hi) = match (lower, upper) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, DEFAULT_MAX_NUMBER.max(lo + 99.0)),
            (None, Some(hi)) => (DEFAULT_MIN_NUMBER.min(hi - 99.0), hi),
            (None, None) => (DEFAULT_MIN_NUMBER, DEFAULT_MAX_NUMBER),
        };
        if lo >= hi {
            return lo;
        }

        let mut value = self.rng.gen_range(lo..=hi);

        if let Some(step) = constraints.multiple_of.filter(|step| *step > 0.0) {
            value = (value / step).floor() * step;
            if value < lo {
                value += step;
            }
        }

        let rounded = (value * 100.0).round() / 100.0;
        let on_step = constraints
            .multiple_of
            .map_or(true, |step| is_multiple(rounded, step));
        if on_step && (lo..=hi).contains(&rounded) {
            rounded
        } else {
            value
        }
    }
}

/// Smallest positive integer that is a multiple of `step` (5 for 2.5, 1 for 0.5)
fn integer_step(step: f64) -> Option<i64> {
    if step <= 0.0 || !step.is_finite() {
        return None;
    }
    (1..=MAX_STEP_FACTOR)
        .map(|k| step * k as f64)
        .find(|m| (m - m.round()).abs() < 1e-9 * m.max(1.0))
        .map(|m| m.round() as i64)
        .filter(|m| *m >= 1)
}

/// Synthesize with a fresh entropy-seeded synthesizer and the default policy
pub fn synthesize(node: &SchemaNode) -> Result<Value, EngineError> {
    Synthesizer::new().synthesize(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog::Catalog;
    use crate::schema::walker::SchemaWalker;
    use serde_json::json;

    fn node(fragment: Value) -> SchemaNode {
        SchemaWalker::new(&Catalog::new())
            .resolve(&fragment, "Root")
            .unwrap()
    }

    #[test]
    fn test_degenerate_integer_range() {
        let age = node(json!({ "type": "integer", "minimum": 18, "maximum": 18 }));
        let mut synth = Synthesizer::seeded(1);
        for _ in 0..20 {
            assert_eq!(synth.synthesize(&age).unwrap(), json!(18));
        }
    }

    #[test]
    fn test_integer_exclusive_bounds() {
        let n = node(json!({
            "type": "integer", "minimum": 1, "maximum": 3,
            "exclusiveMinimum": true, "exclusiveMaximum": true
        }));
        let mut synth = Synthesizer::seeded(2);
        for _ in 0..20 {
            assert_eq!(synth.synthesize(&n).unwrap(), json!(2));
        }
    }

    #[test]
    fn test_integer_multiple_of() {
        let n = node(json!({ "type": "integer", "minimum": 7, "maximum": 40, "multipleOf": 5 }));
        let mut synth = Synthesizer::seeded(3);
        for _ in 0..50 {
            let v = synth.synthesize(&n).unwrap().as_i64().unwrap();
            assert_eq!(v % 5, 0);
            assert!((10..=40).contains(&v), "{}", v);
        }
    }

    #[test]
    fn test_integer_fractional_multiple_of() {
        let n = node(json!({ "type": "integer", "minimum": 0, "maximum": 100, "multipleOf": 2.5 }));
        let mut synth = Synthesizer::seeded(15);
        for _ in 0..50 {
            let v = synth.synthesize(&n).unwrap().as_i64().unwrap();
            assert_eq!(v % 5, 0, "{}", v);
            assert!((0..=100).contains(&v), "{}", v);
        }
        assert_eq!(integer_step(0.5), Some(1));
        assert_eq!(integer_step(0.0), None);
    }

    #[test]
    fn test_number_fine_step_skips_rounding() {
        let n = node(json!({ "type": "number", "minimum": 0, "maximum": 10, "multipleOf": 0.125 }));
        let mut synth = Synthesizer::seeded(16);
        for _ in 0..50 {
            let v = synth.synthesize(&n).unwrap().as_f64().unwrap();
            assert!(is_multiple(v, 0.125), "{}", v);
            assert!((0.0..=10.0).contains(&v));
        }
    }

    #[test]
    fn test_number_two_decimals_and_bounds() {
        let n = node(json!({ "type": "number", "minimum": 0.5, "maximum": 0.75 }));
        let mut synth = Synthesizer::seeded(4);
        for _ in 0..50 {
            let v = synth.synthesize(&n).unwrap().as_f64().unwrap();
            assert!((0.5..=0.75).contains(&v));
            assert!(((v * 100.0).round() - v * 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_number_exclusive_shift() {
        let n = node(json!({ "type": "number", "exclusiveMinimum": 0, "exclusiveMaximum": 1 }));
        let mut synth = Synthesizer::seeded(5);
        for _ in 0..50 {
            let v = synth.synthesize(&n).unwrap().as_f64().unwrap();
            assert!(v > 0.0 && v < 1.0);
        }
    }

    #[test]
    fn test_only_minimum_extends_upper_bound() {
        let n = node(json!({ "type": "integer", "minimum": 500 }));
        let v = Synthesizer::seeded(6).synthesize(&n).unwrap().as_i64().unwrap();
        assert!((500..=599).contains(&v));
    }

    #[test]
    fn test_string_lengths_in_chars() {
        let s = node(json!({ "type": "string", "minLength": 3, "maxLength": 5 }));
        let mut synth = Synthesizer::seeded(7);
        for _ in 0..20 {
            let v = synth.synthesize(&s).unwrap();
            let len = v.as_str().unwrap().chars().count();
            assert!((3..=5).contains(&len));
        }
    }

    #[test]
    fn test_pattern_fitted_to_length() {
        let s = node(json!({ "type": "string", "pattern": "^[A-Z]{2}", "minLength": 6 }));
        let v = Synthesizer::seeded(8).synthesize(&s).unwrap();
        let v = v.as_str().unwrap();
        assert_eq!(v.chars().count(), 6);
        assert!(v[..2].chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_bad_pattern_degrades_or_fails() {
        let s = node(json!({ "type": "string", "pattern": "([a-z" }));
        assert!(Synthesizer::seeded(9).synthesize(&s).unwrap().is_string());

        let err = Synthesizer::seeded(9)
            .with_policy(FallbackPolicy::strict())
            .synthesize(&s)
            .unwrap_err();
        assert!(matches!(err, EngineError::PatternGenerationFailure { .. }));
    }

    #[test]
    fn test_format_truncated_to_max_length() {
        let s = node(json!({ "type": "string", "format": "uuid", "maxLength": 8 }));
        let v = Synthesizer::seeded(10).synthesize(&s).unwrap();
        assert_eq!(v.as_str().unwrap().len(), 8);
    }

    #[test]
    fn test_enum_overrides_type() {
        let e = node(json!({ "type": "integer", "enum": ["a", "b"], "minimum": 5 }));
        let mut synth = Synthesizer::seeded(11);
        for _ in 0..10 {
            let v = synth.synthesize(&e).unwrap();
            assert!(v == json!("a") || v == json!("b"));
        }
    }

    #[test]
    fn test_array_sizes_and_untyped_items() {
        let a = node(json!({ "type": "array", "minItems": 2, "maxItems": 3 }));
        let mut synth = Synthesizer::seeded(12);
        for _ in 0..10 {
            let v = synth.synthesize(&a).unwrap();
            let items = v.as_array().unwrap();
            assert!((2..=3).contains(&items.len()));
            assert!(items.iter().all(Value::is_string));
        }
    }

    #[test]
    fn test_unique_items_deduplicates() {
        let a = node(json!({
            "type": "array", "minItems": 5, "maxItems": 5, "uniqueItems": true,
            "items": { "type": "boolean" }
        }));
        let v = Synthesizer::seeded(13).synthesize(&a).unwrap();
        let items = v.as_array().unwrap();
        assert!(items.len() <= 2);
    }

    #[test]
    fn test_object_includes_optional_properties() {
        let o = node(json!({
            "type": "object",
            "required": ["a"],
            "properties": { "a": { "type": "string" }, "b": { "type": "boolean" } }
        }));
        let v = Synthesizer::seeded(14).synthesize(&o).unwrap();
        assert!(v.get("a").is_some());
        assert!(v.get("b").is_some());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let o = node(json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "n": { "type": "number" },
                "tags": { "type": "array", "items": { "type": "string" } }
            }
        }));
        let a = Synthesizer::seeded(42).synthesize(&o).unwrap();
        let b = Synthesizer::seeded(42).synthesize(&o).unwrap();
        assert_eq!(a, b);
    }
}
