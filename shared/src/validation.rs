//! Validation utilities for the ERP
//!
//! Includes Korea-specific checks for business registration numbers and
//! phone numbers.

use crate::money::Won;

/// Longest accepted natural-key name
pub const MAX_NAME_LENGTH: usize = 200;

// ============================================================================
// Master Data Validations
// ============================================================================

/// Validate a natural-key name (customer, supplier or item)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name must not be empty");
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate an item code (letters, digits, '-' and '_')
pub fn validate_item_code(code: &str) -> Result<(), &'static str> {
    if code.is_empty() {
        return Err("Item code must not be empty");
    }
    if code.len() > 50 {
        return Err("Item code must be at most 50 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Item code may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

// ============================================================================
// Transaction Validations
// ============================================================================

/// Validate a sale or purchase quantity
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a unit price, unit cost or VAT amount
pub fn validate_amount(amount: Won) -> Result<(), &'static str> {
    if amount < 0 {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Validate reorder thresholds
pub fn validate_stock_limits(min_stock: i64, max_stock: i64) -> Result<(), &'static str> {
    if min_stock < 0 || max_stock < 0 {
        return Err("Stock limits cannot be negative");
    }
    if min_stock > max_stock {
        return Err("Minimum stock cannot exceed maximum stock");
    }
    Ok(())
}

// ============================================================================
// Korea-Specific Validations
// ============================================================================

/// Validate a Korean business registration number (사업자등록번호)
/// 10 digits (XXX-XX-XXXXX) with the National Tax Service check digit
pub fn validate_business_number(number: &str) -> Result<(), &'static str> {
    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 10 || number.chars().any(|c| !c.is_ascii_digit() && c != '-') {
        return Err("Business number must be 10 digits");
    }

    const WEIGHTS: [u32; 9] = [1, 3, 7, 1, 3, 7, 1, 3, 5];
    let mut sum: u32 = digits
        .iter()
        .zip(WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();
    sum += digits[8] * 5 / 10;

    if (10 - sum % 10) % 10 != digits[9] {
        return Err("Invalid business number checksum");
    }
    Ok(())
}

/// Validate Korean phone number format
/// Accepts: 010-1234-5678, 02-123-4567, 031-1234-5678, +82-10-1234-5678
pub fn validate_korean_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // Domestic: 9-11 digits starting with 0
    if (9..=11).contains(&digits.len()) && digits.starts_with('0') {
        return Ok(());
    }
    // International: country code 82 followed by the number without its leading 0
    if phone.trim_start().starts_with('+')
        && digits.starts_with("82")
        && (10..=12).contains(&digits.len())
    {
        return Ok(());
    }

    Err("Invalid Korean phone number format")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("ACME").is_ok());
        assert!(validate_name("  제이에스일렉트로닉 ").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"가".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("sales@example.co.kr").is_ok());
        assert!(validate_email("invalid").is_err());
    }

    #[test]
    fn test_validate_item_code() {
        assert!(validate_item_code("ITEM-001").is_ok());
        assert!(validate_item_code("RES_10K").is_ok());
        assert!(validate_item_code("").is_err());
        assert!(validate_item_code("ITEM 001").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_stock_limits() {
        assert!(validate_stock_limits(0, 1000).is_ok());
        assert!(validate_stock_limits(10, 10).is_ok());
        assert!(validate_stock_limits(20, 10).is_err());
        assert!(validate_stock_limits(-1, 10).is_err());
    }

    // ========================================================================
    // Korea-Specific Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_business_number_valid() {
        assert!(validate_business_number("1234567891").is_ok());
        assert!(validate_business_number("123-45-67891").is_ok());
    }

    #[test]
    fn test_validate_business_number_invalid() {
        // Wrong length
        assert!(validate_business_number("12345").is_err());
        // Bad check digit
        assert!(validate_business_number("1234567890").is_err());
        // Stray characters
        assert!(validate_business_number("123/45/67891").is_err());
    }

    #[test]
    fn test_validate_korean_phone_valid() {
        assert!(validate_korean_phone("010-1234-5678").is_ok());
        assert!(validate_korean_phone("02-123-4567").is_ok());
        assert!(validate_korean_phone("031-1234-5678").is_ok());
        assert!(validate_korean_phone("+82-10-1234-5678").is_ok());
    }

    #[test]
    fn test_validate_korean_phone_invalid() {
        assert!(validate_korean_phone("12345").is_err());
        assert!(validate_korean_phone("1012345678").is_err());
        assert!(validate_korean_phone("abcdefghij").is_err());
    }
}
