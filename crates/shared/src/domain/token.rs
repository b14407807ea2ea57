use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

use crate::error::ValidationError;

/// Scale a decimal string by `decimals`, rejecting malformed, negative and zero amounts.
pub fn parse_token_amount(amount: &str, decimals: u8) -> Result<U256, ValidationError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidDeposit("amount is empty".into()));
    }
    let parsed = parse_units(trimmed, decimals)
        .map_err(|e| ValidationError::InvalidDeposit(format!("{trimmed}: {e}")))?;
    if parsed.is_negative() {
        return Err(ValidationError::InvalidDeposit(format!("{trimmed} is negative")));
    }
    let value = parsed.get_absolute();
    if value.is_zero() {
        return Err(ValidationError::InvalidDeposit(format!("{trimmed} must be greater than zero")));
    }
    Ok(value)
}

/// Render a smallest-unit amount without trailing zeros, e.g. `5000000` at 6 decimals is `"5"`.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
    match format_units(amount, decimals) {
        Ok(s) if s.contains('.') => s.trim_end_matches('0').trim_end_matches('.').to_string(),
        Ok(s) => s,
        Err(_) => amount.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_token_amount("5", 6).unwrap(), U256::from(5_000_000u64));
        assert_eq!(parse_token_amount(" 12.5 ", 6).unwrap(), U256::from(12_500_000u64));
        assert_eq!(parse_token_amount("0.000001", 6).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "0", "0.0", "-1", "abc"] {
            assert!(
                matches!(parse_token_amount(bad, 6), Err(ValidationError::InvalidDeposit(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_format_trims_zeros() {
        assert_eq!(format_token_amount(U256::from(5_000_000u64), 6), "5");
        assert_eq!(format_token_amount(U256::from(12_500_000u64), 6), "12.5");
        assert_eq!(format_token_amount(U256::ZERO, 6), "0");
    }
}
