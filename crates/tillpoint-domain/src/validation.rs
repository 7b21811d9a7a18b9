//! Validation for catalog entities

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;
use crate::money::to_cents;
use crate::product::Product;

/// Severity of a validation finding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

/// A validation error or warning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub severity: ValidationSeverity,
}

impl ValidationError {
    fn error(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            severity: ValidationSeverity::Error,
        }
    }

    fn warning(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            severity: ValidationSeverity::Warning,
        }
    }
}

/// Whether a finding list contains any hard errors.
pub fn has_errors(findings: &[ValidationError]) -> bool {
    findings
        .iter()
        .any(|f| f.severity == ValidationSeverity::Error)
}

/// Validate a product and return errors/warnings
pub fn validate_product(product: &Product) -> Vec<ValidationError> {
    let mut findings = Vec::new();

    if product.name.trim().is_empty() {
        findings.push(ValidationError::error("name", "Name is required"));
    }

    match to_cents(&product.price) {
        None => findings.push(ValidationError::error("price", "Price must be numeric")),
        Some(cents) if cents < 0 => {
            findings.push(ValidationError::error("price", "Price must not be negative"));
        }
        Some(_) => {}
    }

    if product.stock < 0 {
        findings.push(ValidationError::warning("stock", "Stock is negative"));
    }

    findings
}

/// Validate a bundle and return errors/warnings
pub fn validate_bundle(bundle: &Bundle) -> Vec<ValidationError> {
    let mut findings = Vec::new();

    if bundle.name.trim().is_empty() {
        findings.push(ValidationError::error("name", "Name is required"));
    }

    if bundle.products.is_empty() {
        findings.push(ValidationError::error(
            "products",
            "Bundle needs at least one product",
        ));
    }

    if !bundle.auto_price {
        match to_cents(&bundle.price) {
            None => findings.push(ValidationError::error("price", "Price must be numeric")),
            Some(cents) if cents < 0 => {
                findings.push(ValidationError::error("price", "Price must not be negative"));
            }
            Some(_) => {}
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleMember;

    #[test]
    fn valid_product_has_no_findings() {
        let p = Product::new("Coffee", "3.5");
        assert!(validate_product(&p).is_empty());
    }

    #[test]
    fn empty_name_is_an_error() {
        let p = Product::new("  ", "3.5");
        let findings = validate_product(&p);
        assert!(has_errors(&findings));
        assert_eq!(findings[0].field, "name");
    }

    #[test]
    fn negative_price_is_an_error() {
        let p = Product::new("Coffee", "-1");
        assert!(has_errors(&validate_product(&p)));
    }

    #[test]
    fn negative_stock_is_only_a_warning() {
        let mut p = Product::new("Coffee", "3.5");
        p.stock = -2;
        let findings = validate_product(&p);
        assert!(!findings.is_empty());
        assert!(!has_errors(&findings));
    }

    #[test]
    fn bundle_without_members_is_an_error() {
        let b = Bundle::new("Deal", vec![]);
        let findings = validate_bundle(&b);
        assert!(findings.iter().any(|f| f.field == "products"));
    }

    #[test]
    fn auto_price_bundle_skips_price_check() {
        let mut b = Bundle::new("Deal", vec![BundleMember::product("p")]);
        b.auto_price = true;
        b.price = "not-a-number".into();
        assert!(validate_bundle(&b).is_empty());
    }
}
