// Validation utilities module
// Custom validation functions for domain-specific rules

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use validator::ValidationError;

fn promo_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9_-]{3,32}$").expect("promo code pattern is valid"))
}

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid"))
}

/// Normalizes a promo code for storage and lookup
pub fn normalize_promo_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validates promo code format after normalization (3-32 chars of A-Z, 0-9, `_`, `-`)
pub fn validate_promo_code(code: &str) -> Result<(), ValidationError> {
    if promo_code_regex().is_match(&normalize_promo_code(code)) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_promo_code"))
    }
}

/// Largest amount a `NUMERIC(12,2)` money column holds: 9,999,999,999.99
pub const MAX_MONEY_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Validates that a money amount is zero or positive and storable
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        Err(ValidationError::new("amount_must_not_be_negative"))
    } else if *amount > MAX_MONEY_AMOUNT {
        Err(ValidationError::new("amount_too_large"))
    } else {
        Ok(())
    }
}

/// Validates that a money amount is strictly positive and storable
pub fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        Err(ValidationError::new("amount_must_be_positive"))
    } else if *amount > MAX_MONEY_AMOUNT {
        Err(ValidationError::new("amount_too_large"))
    } else {
        Ok(())
    }
}

/// Validates that a string is not blank after trimming
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Validates a lowercase URL slug such as `spring-bouquets`
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.len() <= 64 && slug_regex().is_match(slug) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_slug"))
    }
}

/// Validates that every image reference is an absolute http(s) CDN URL
pub fn validate_image_urls(urls: &[String]) -> Result<(), ValidationError> {
    let valid = urls.iter().all(|url| {
        (url.starts_with("https://") || url.starts_with("http://"))
            && !url.contains(char::is_whitespace)
    });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_image_url"))
    }
}
