use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::{CartItem, CartItemCandidate, ValidationError, ValidationResult};

/// Outcome of filtering an incoming item list
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredItems {
    /// Items that passed, in their original relative order
    pub accepted: Vec<CartItem>,
    /// Number of candidates dropped for a missing or falsy field
    pub rejected: usize,
}

/// Loose truthiness used for cart item fields.
///
/// `null`, `false`, `0`, `NaN` and `""` are falsy. Arrays and objects are always truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn field_is_truthy(field: &Option<Value>) -> bool {
    field.as_ref().map(is_truthy).unwrap_or(false)
}

impl CartItemCandidate {
    /// Whether all five fields are present and truthy
    pub fn is_complete(&self) -> bool {
        field_is_truthy(&self.product)
            && field_is_truthy(&self.name)
            && field_is_truthy(&self.price)
            && field_is_truthy(&self.image)
            && field_is_truthy(&self.qty)
    }

    /// Coerce a complete candidate into a typed cart item
    pub fn into_cart_item(self) -> ValidationResult<CartItem> {
        Ok(CartItem {
            product: coerce_product(required("product", self.product)?)?,
            name: coerce_text("name", required("name", self.name)?)?,
            price: coerce_price(required("price", self.price)?)?,
            image: coerce_text("image", required("image", self.image)?)?,
            qty: coerce_quantity(required("qty", self.qty)?)?,
        })
    }
}

/// Drop candidates with a missing or falsy field and coerce the rest.
///
/// A candidate that passes the truthiness check but cannot be coerced fails the whole list.
pub fn retain_complete_items(
    candidates: Vec<CartItemCandidate>,
) -> ValidationResult<FilteredItems> {
    let mut accepted = Vec::with_capacity(candidates.len());
    let mut rejected = 0;

    for candidate in candidates {
        if candidate.is_complete() {
            accepted.push(candidate.into_cart_item()?);
        } else {
            rejected += 1;
        }
    }

    Ok(FilteredItems { accepted, rejected })
}

/// Validate user ID format
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    if user_id.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: "user_id".to_string(),
        });
    }

    if user_id.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat {
            field: "user_id".to_string(),
            expected: "no control characters".to_string(),
        });
    }

    Ok(())
}

fn required(field: &str, value: Option<Value>) -> ValidationResult<Value> {
    value.ok_or_else(|| ValidationError::RequiredField {
        field: field.to_string(),
    })
}

fn invalid(field: &str, value: &Value, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn coerce_product(value: Value) -> ValidationResult<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        other => Err(invalid("product", &other, "expected a product id string")),
    }
}

fn coerce_text(field: &str, value: Value) -> ValidationResult<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(invalid(field, &other, "expected a string")),
    }
}

fn coerce_price(value: Value) -> ValidationResult<Decimal> {
    let parsed = match &value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => n.as_f64().and_then(Decimal::from_f64),
        },
        Value::String(s) => Decimal::from_str(s.trim())
            .ok()
            .or_else(|| Decimal::from_scientific(s.trim()).ok()),
        _ => None,
    };

    parsed.ok_or_else(|| invalid("price", &value, "expected a number"))
}

/// Cast a quantity sent as an integer, an integral float or a numeric string
pub fn coerce_quantity(value: Value) -> ValidationResult<i64> {
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    };

    parsed.ok_or_else(|| invalid("qty", &value, "expected an integer"))
}

fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
