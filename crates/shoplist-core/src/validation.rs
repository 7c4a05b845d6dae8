//! # Validation Module
//!
//! Input checks run before anything is written.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: View model (shoplist-app)                                    │
//! │  ├── THIS MODULE: trim, required fields, numeric quantity              │
//! │  └── Duplicate lookup against the target table                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (name, category)                                           │
//! │  └── FOREIGN KEY category → categories.category_id                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shoplist_core::validation::{parse_quantity, validate_item_input};
//!
//! assert_eq!(parse_quantity("2,5").unwrap(), 2.5);
//! let input = validate_item_input("  Milk ", "Dairy", "2 l").unwrap();
//! assert_eq!(input.name, "Milk");
//! ```

use crate::error::ValidationError;
use crate::MAX_NAME_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required label (item name or category) and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `MAX_NAME_LENGTH` characters
pub fn validate_label(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(value.to_string())
}

pub fn validate_item_name(name: &str) -> ValidationResult<String> {
    validate_label("name", name)
}

pub fn validate_category_name(category: &str) -> ValidationResult<String> {
    validate_label("category", category)
}

// =============================================================================
// Quantity
// =============================================================================

/// Parses the numeric part of a quantity.
///
/// Both `.` and `,` are accepted as decimal separator. A trailing unit token
/// (`"2 kg"`) is ignored.
///
/// ```rust
/// use shoplist_core::validation::parse_quantity;
///
/// assert_eq!(parse_quantity("2.5").unwrap(), 2.5);
/// assert_eq!(parse_quantity("2,5").unwrap(), 2.5);
/// assert_eq!(parse_quantity("12 eggs").unwrap(), 12.0);
/// assert!(parse_quantity("abc").is_err());
/// ```
pub fn parse_quantity(quantity: &str) -> ValidationResult<f64> {
    let (number, _) = Quantity::split(quantity);

    let invalid = || ValidationError::InvalidNumber {
        field: "quantity".to_string(),
        value: quantity.trim().to_string(),
    };

    if number.is_empty() {
        return Err(ValidationError::required("quantity"));
    }

    let parsed = number
        .parse::<f64>()
        .or_else(|_| number.replace(',', ".").parse::<f64>())
        .map_err(|_| invalid())?;

    // "inf" and "NaN" parse as f64 but are not quantities
    if !parsed.is_finite() {
        return Err(invalid());
    }

    Ok(parsed)
}

/// Quantity text helpers: a number, optionally followed by a unit.
pub struct Quantity;

impl Quantity {
    /// Joins a number and an optional unit the way they are stored.
    ///
    /// A unit with no number composes to `""`, so validation reports the
    /// quantity as missing.
    ///
    /// ```rust
    /// use shoplist_core::validation::Quantity;
    ///
    /// assert_eq!(Quantity::compose("2", "kg"), "2 kg");
    /// assert_eq!(Quantity::compose(" 3 ", ""), "3");
    /// assert_eq!(Quantity::compose(" ", "kg"), "");
    /// ```
    pub fn compose(number: &str, unit: &str) -> String {
        let number = number.trim();
        let unit = unit.trim();
        if number.is_empty() || unit.is_empty() {
            number.to_string()
        } else {
            format!("{} {}", number, unit)
        }
    }

    /// Splits stored quantity text into `(number, unit)` on the first space.
    pub fn split(quantity: &str) -> (&str, &str) {
        let quantity = quantity.trim();
        match quantity.split_once(' ') {
            Some((number, unit)) => (number, unit.trim()),
            None => (quantity, ""),
        }
    }
}

/// Validates quantity text and returns it trimmed.
pub fn validate_quantity(quantity: &str) -> ValidationResult<String> {
    parse_quantity(quantity)?;
    Ok(quantity.trim().to_string())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Trimmed, validated form fields for either item table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInput {
    pub name: String,
    pub category: String,
    pub quantity: String,
}

/// Validates a full item form: name, category, then quantity.
///
/// The first failing field is reported, in that order.
pub fn validate_item_input(
    name: &str,
    category: &str,
    quantity: &str,
) -> ValidationResult<ItemInput> {
    Ok(ItemInput {
        name: validate_item_name(name)?,
        category: validate_category_name(category)?,
        quantity: validate_quantity(quantity)?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_label_trims() {
        assert_eq!(validate_item_name("  Milk  ").unwrap(), "Milk");
        assert_eq!(
            validate_category_name("   "),
            Err(ValidationError::required("category"))
        );
        assert!(matches!(
            validate_item_name(&"x".repeat(MAX_NAME_LENGTH + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_unit_without_number_is_required() {
        assert_eq!(
            validate_item_input("Flour", "Baking", &Quantity::compose("", "kg")),
            Err(ValidationError::required("quantity"))
        );
        assert!(matches!(
            validate_item_input("Flour", "Baking", &Quantity::compose("lots", "kg")),
            Err(ValidationError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_quantity_accepts_both_separators() {
        assert_eq!(parse_quantity("2,5").unwrap(), 2.5);
        assert_eq!(parse_quantity("2.5").unwrap(), 2.5);
        assert_eq!(parse_quantity("1").unwrap(), 1.0);
    }

    #[test]
    fn test_quantity_rejects_text() {
        assert!(matches!(
            parse_quantity("abc"),
            Err(ValidationError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_quantity("NaN"),
            Err(ValidationError::InvalidNumber { .. })
        ));
        assert_eq!(parse_quantity(""), Err(ValidationError::required("quantity")));
    }

    #[test]
    fn test_quantity_with_unit() {
        assert_eq!(parse_quantity("500 g").unwrap(), 500.0);
        assert_eq!(Quantity::split("500 g"), ("500", "g"));
        assert_eq!(Quantity::split("2"), ("2", ""));
        assert_eq!(Quantity::compose("1,5", "l"), "1,5 l");
    }

    #[test]
    fn test_validate_item_input_order() {
        let err = validate_item_input("", "", "abc").unwrap_err();
        assert_eq!(err, ValidationError::required("name"));

        let err = validate_item_input("Milk", "Dairy", "abc").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidNumber { .. }));

        let input = validate_item_input(" Milk", "Dairy ", " 2 ").unwrap();
        assert_eq!(
            input,
            ItemInput {
                name: "Milk".to_string(),
                category: "Dairy".to_string(),
                quantity: "2".to_string(),
            }
        );
    }
}
