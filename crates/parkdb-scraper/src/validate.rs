//! Declarative record validation and canonical invariant checks.
//!
//! [`validate_record`] checks every field of a schema and reports all
//! violations at once, so a rejected row tells the operator everything that
//! is wrong with it rather than just the first problem.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parkdb_core::{LotData, LotInfo};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::mapping::RawRecord;

/// Expected shape of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer { min: Option<i64>, max: Option<i64> },
    Decimal { min: Option<i64>, max: Option<i64> },
    Text { max_length: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    #[must_use]
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// A static list of field specs for one source's rows.
pub type Schema = [FieldSpec];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
}

/// Typed field values that passed their schema. Absent optional fields are
/// simply missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedRecord {
    values: HashMap<&'static str, FieldValue>,
}

impl ValidatedRecord {
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer field as a non-negative count.
    #[must_use]
    pub fn count(&self, name: &str) -> Option<u32> {
        self.integer(name).and_then(|v| u32::try_from(v).ok())
    }

    #[must_use]
    pub fn decimal(&self, name: &str) -> Option<Decimal> {
        match self.values.get(name)? {
            FieldValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            FieldValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field-level failure of one record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_violations(.violations))]
pub struct RecordValidationError {
    pub violations: Vec<FieldViolation>,
}

impl RecordValidationError {
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                field: field.into(),
                message: message.into(),
            }],
        }
    }

    /// Whether `field` is among the violations.
    #[must_use]
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn render_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validates `record` against `schema`.
///
/// Empty strings count as absent. Fields not named in the schema are
/// ignored.
///
/// # Errors
///
/// Returns [`RecordValidationError`] listing every field that is missing,
/// unparseable, or out of range.
pub fn validate_record(
    record: &RawRecord,
    schema: &Schema,
) -> Result<ValidatedRecord, RecordValidationError> {
    let mut values = HashMap::with_capacity(schema.len());
    let mut violations = Vec::new();

    for spec in schema {
        let raw = record
            .get(spec.name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty());

        let Some(raw) = raw else {
            if spec.required {
                violations.push(violation(spec.name, "field is required"));
            }
            continue;
        };

        match check_value(raw, spec.kind) {
            Ok(value) => {
                values.insert(spec.name, value);
            }
            Err(message) => violations.push(violation(spec.name, message)),
        }
    }

    if violations.is_empty() {
        Ok(ValidatedRecord { values })
    } else {
        Err(RecordValidationError { violations })
    }
}

fn check_value(raw: &str, kind: FieldKind) -> Result<FieldValue, String> {
    match kind {
        FieldKind::Integer { min, max } => {
            let value = raw
                .parse::<i64>()
                .map_err(|_| format!("'{raw}' is not an integer"))?;
            check_range(Decimal::from(value), min, max)?;
            Ok(FieldValue::Integer(value))
        }
        FieldKind::Decimal { min, max } => {
            let value =
                Decimal::from_str(raw).map_err(|_| format!("'{raw}' is not a decimal number"))?;
            check_range(value, min, max)?;
            Ok(FieldValue::Decimal(value))
        }
        FieldKind::Text { max_length } => {
            let length = raw.chars().count();
            if length > max_length {
                return Err(format!("text is {length} characters, maximum is {max_length}"));
            }
            Ok(FieldValue::Text(raw.to_string()))
        }
    }
}

fn check_range(value: Decimal, min: Option<i64>, max: Option<i64>) -> Result<(), String> {
    if let Some(min) = min {
        if value < Decimal::from(min) {
            return Err(format!("{value} is below minimum {min}"));
        }
    }
    if let Some(max) = max {
        if value > Decimal::from(max) {
            return Err(format!("{value} is above maximum {max}"));
        }
    }
    Ok(())
}

fn violation(field: &str, message: impl Into<String>) -> FieldViolation {
    FieldViolation {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Inclusive coordinate window a provider's lots must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoBounds {
    pub min_latitude: i64,
    pub max_latitude: i64,
    pub min_longitude: i64,
    pub max_longitude: i64,
}

impl GeoBounds {
    pub const WORLD: GeoBounds = GeoBounds {
        min_latitude: -90,
        max_latitude: 90,
        min_longitude: -180,
        max_longitude: 180,
    };
}

/// Checks [`LotInfo`] invariants: non-empty id and name, sub-capacities not
/// above the total, and coordinates inside the world and `bounds`.
///
/// # Errors
///
/// Returns every violated invariant.
pub fn check_lot_info(
    lot: &LotInfo,
    bounds: Option<GeoBounds>,
) -> Result<(), RecordValidationError> {
    let mut violations = Vec::new();

    if lot.id.trim().is_empty() {
        violations.push(violation("id", "must not be empty"));
    }
    if lot.name.trim().is_empty() {
        violations.push(violation("name", "must not be empty"));
    }

    if let Some(capacity) = lot.capacity {
        for (field, sub) in lot.sub_capacities() {
            if let Some(sub) = sub.filter(|sub| *sub > capacity) {
                violations.push(violation(
                    field,
                    format!("{sub} exceeds capacity {capacity}"),
                ));
            }
        }
    }

    // Provider bounds apply only to coordinates inside the world bounds.
    for bounds in std::iter::once(GeoBounds::WORLD).chain(bounds) {
        let before = violations.len();
        if let Some(latitude) = lot.latitude {
            if let Err(message) = check_range(
                latitude,
                Some(bounds.min_latitude),
                Some(bounds.max_latitude),
            ) {
                violations.push(violation("latitude", message));
            }
        }
        if let Some(longitude) = lot.longitude {
            if let Err(message) = check_range(
                longitude,
                Some(bounds.min_longitude),
                Some(bounds.max_longitude),
            ) {
                violations.push(violation("longitude", message));
            }
        }
        if violations.len() > before {
            break;
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(RecordValidationError { violations })
    }
}

/// Checks [`LotData`] invariants: `num_free` never exceeds `capacity`.
///
/// # Errors
///
/// Returns a violation on `num_free` when it does.
pub fn check_lot_data(data: &LotData) -> Result<(), RecordValidationError> {
    match (data.num_free, data.capacity) {
        (Some(num_free), Some(capacity)) if num_free > capacity => Err(
            RecordValidationError::single("num_free", format!("{num_free} exceeds capacity {capacity}")),
        ),
        _ => Ok(()),
    }
}
