//! Validation and coercion of status documents
//!
//! A document is accepted only as a whole: every field the schema lists for
//! the group must be found and converted, otherwise the first problem is
//! returned and nothing of the document is used.

use serde_json::{Map, Value as Json};

use crate::error::ValidationError;
use crate::schema::{FieldKind, FieldSpec, MetricGroup, RecordSelector};
use crate::store::Value;

type Record = Map<String, Json>;

/// Member identifying an entry of the instance list
const INSTANCE_MEMBER: &str = "instance";

/// Member identifying a named record
const NAME_MEMBER: &str = "name";

/// Parse the document of `group` fetched for the appliance `identity`
///
/// Returns one value per schema field, in schema order.
pub fn parse_group(
    group: MetricGroup,
    identity: &str,
    document: &Json,
) -> Result<Vec<(&'static FieldSpec, Value)>, ValidationError> {
    let records = records(document)?;
    if group.uses_named_records() && records.is_empty() {
        return Err(ValidationError::EmptyRecordList);
    }

    group
        .fields()
        .iter()
        .map(|field| -> Result<_, ValidationError> {
            let record = match field.selector {
                RecordSelector::Instance => select(&records, INSTANCE_MEMBER, identity)?,
                RecordSelector::Named(label) => select(&records, NAME_MEMBER, label)?,
            };
            let raw = record
                .get(field.key)
                .ok_or(ValidationError::MissingField { field: field.name })?;
            Ok((field, coerce(field, raw)?))
        })
        .collect()
}

fn records(document: &Json) -> Result<Vec<&Record>, ValidationError> {
    let shape_error = ValidationError::UnexpectedShape {
        expected: "an array of objects",
    };

    document
        .as_array()
        .ok_or_else(|| shape_error.clone())?
        .iter()
        .map(|item| item.as_object().ok_or_else(|| shape_error.clone()))
        .collect()
}

/// Find the single record whose `member` equals `expected`
fn select<'a>(
    records: &[&'a Record],
    member: &str,
    expected: &str,
) -> Result<&'a Record, ValidationError> {
    let mut matching = records
        .iter()
        .copied()
        .filter(|record| record.get(member).and_then(Json::as_str) == Some(expected));

    let selector = || format!("{member}={expected}");
    let record = matching
        .next()
        .ok_or_else(|| ValidationError::RecordNotFound {
            selector: selector(),
        })?;
    if matching.next().is_some() {
        return Err(ValidationError::DuplicateRecord {
            selector: selector(),
        });
    }

    Ok(record)
}

/// Convert a raw JSON member to the semantic type of `field`
pub fn coerce(field: &FieldSpec, raw: &Json) -> Result<Value, ValidationError> {
    let coerced = match field.kind {
        FieldKind::String => match raw {
            Json::String(value) => Some(Value::String(value.clone())),
            Json::Number(value) => Some(Value::String(value.to_string())),
            Json::Bool(value) => Some(Value::String(value.to_string())),
            _ => None,
        },
        FieldKind::Integer => match raw {
            Json::Number(value) => value.as_i64(),
            Json::String(value) => value.trim().parse::<i64>().ok(),
            _ => None,
        }
        .map(Value::Integer),
        FieldKind::Float => match raw {
            Json::Number(value) => value.as_f64(),
            Json::String(value) => parse_float(value),
            _ => None,
        }
        .filter(|value| value.is_finite())
        .map(Value::Float),
    };

    coerced.ok_or_else(|| ValidationError::TypeCoercion {
        field: field.name,
        value: raw.to_string(),
    })
}

/// Parse a decimal number that may contain thousands separators, e.g. `1,234.50`
pub fn parse_float(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse().ok()
}
