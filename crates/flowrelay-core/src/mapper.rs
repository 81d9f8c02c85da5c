//! Record mapper: raw sheet rows → typed records, split into valid / invalid.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::MapError;
use crate::record::{FieldValue, Record};
use crate::schema::{FieldKind, MappingRegistry, MappingSpec};

/// Output of one mapping pass. Both sets keep input row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappedRows {
    pub valid: Vec<Record>,
    pub invalid: Vec<Record>,
}

impl MappedRows {
    /// Number of input rows.
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    /// Share of input rows routed to the invalid set, as a rounded percentage.
    pub fn filter_rate(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        ((self.invalid.len() as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Maps rows using specs looked up in a [`MappingRegistry`].
#[derive(Debug, Clone)]
pub struct Mapper {
    registry: Arc<MappingRegistry>,
}

impl Mapper {
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    /// Resolve `mapping_type` and map `rows` with it.
    pub fn map(
        &self,
        mapping_type: &str,
        headers: &[String],
        rows: &[Vec<Value>],
    ) -> Result<MappedRows, MapError> {
        let spec = self.registry.get(mapping_type)?;
        Ok(map_rows(headers, rows, spec))
    }
}

/// Map every row under `spec`. Pure: no I/O, no state.
pub fn map_rows(headers: &[String], rows: &[Vec<Value>], spec: &MappingSpec) -> MappedRows {
    // Resolve header positions once; unmapped columns are dropped here.
    let columns: Vec<(usize, &str, FieldKind)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            spec.field_for(header)
                .map(|f| (idx, f.target.as_str(), f.kind))
        })
        .collect();

    let mut out = MappedRows::default();
    for row in rows {
        let mut record = Record::new();
        for &(idx, target, kind) in &columns {
            record.insert(target, coerce(row.get(idx), kind));
        }
        if is_valid(&record, spec) {
            out.valid.push(record);
        } else {
            out.invalid.push(record);
        }
    }

    if !out.invalid.is_empty() {
        info!(
            mapping = %spec.name,
            valid = out.valid.len(),
            invalid = out.invalid.len(),
            "rows filtered"
        );
    } else {
        debug!(mapping = %spec.name, rows = out.valid.len(), "rows mapped");
    }
    out
}

/// `true` when every required field is present and every nonzero field is nonzero.
pub fn is_valid(record: &Record, spec: &MappingSpec) -> bool {
    spec.fields.iter().all(|f| {
        let value = record.value(&f.target);
        !(f.required && value.is_blank()) && !(f.nonzero && value.is_zero_or_blank())
    })
}

/// Human-readable reason a record fails validation, or `None` if it passes.
pub fn invalid_reason(record: &Record, spec: &MappingSpec) -> Option<String> {
    let missing: Vec<&str> = spec
        .fields
        .iter()
        .filter(|f| f.required && record.value(&f.target).is_blank())
        .map(|f| f.target.as_str())
        .collect();
    let zero: Vec<&str> = spec
        .fields
        .iter()
        .filter(|f| f.nonzero && record.value(&f.target).is_zero_or_blank())
        .map(|f| f.target.as_str())
        .collect();

    let mut issues = Vec::new();
    if !missing.is_empty() {
        issues.push(format!("missing required fields: {}", missing.join(", ")));
    }
    if !zero.is_empty() {
        issues.push(format!("fields must be nonzero: {}", zero.join(", ")));
    }
    if issues.is_empty() {
        None
    } else {
        Some(issues.join("; "))
    }
}

/// Coerce one cell. A missing cell (short row) is treated as null.
pub fn coerce(cell: Option<&Value>, kind: FieldKind) -> FieldValue {
    let cell = match cell {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    };

    match kind {
        FieldKind::String => match cell {
            None => FieldValue::Null,
            Some(v) => FieldValue::String(display(v)),
        },
        FieldKind::Int => {
            let n = match cell {
                Some(Value::Number(n)) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
                Some(Value::String(s)) => parse_int_prefix(s),
                _ => None,
            };
            FieldValue::Int(n.unwrap_or(0))
        }
        FieldKind::Float => {
            let x = match cell {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => parse_float_prefix(s),
                _ => None,
            };
            FieldValue::Float(x.unwrap_or(0.0))
        }
    }
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        // Integral floats print without a fractional part ("1001", not "1001.0").
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Longest leading integer, after optional whitespace and sign.
/// A `0x` prefix reads hex digits; out-of-range values saturate.
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match rest.get(..2) {
        Some("0x" | "0X") => (16, &rest[2..]),
        _ => (10, rest),
    };
    let len = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if len == 0 {
        return None;
    }

    let mut n: i64 = 0;
    for c in digits[..len].chars() {
        let d = i64::from(c.to_digit(radix)?);
        n = n.saturating_mul(i64::from(radix));
        n = if negative {
            n.saturating_sub(d)
        } else {
            n.saturating_add(d)
        };
    }
    Some(n)
}

/// Longest leading decimal (with optional exponent).
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
            digits += 1;
        }
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].trim_end_matches('.').parse().ok()
}
