//! Phone number utilities
//!
//! Identifiers reach this workspace already validated by the request layer,
//! so the only thing done with them here is keeping them out of the logs.

/// Number of trailing characters left visible by [`mask_phone_number`]
const VISIBLE_SUFFIX: usize = 4;

/// Mask a phone number for logging (e.g., ***5678)
///
/// Works on characters rather than bytes so arbitrary identifiers never
/// split a UTF-8 sequence.
pub fn mask_phone_number(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= VISIBLE_SUFFIX {
        return "****".to_string();
    }

    let suffix: String = chars[chars.len() - VISIBLE_SUFFIX..].iter().collect();
    format!("***{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone_number() {
        assert_eq!(mask_phone_number("09012345678"), "***5678");
        assert_eq!(mask_phone_number("+8613812345678"), "***5678");
        assert_eq!(mask_phone_number("1234"), "****");
        assert_eq!(mask_phone_number(""), "****");
    }

    #[test]
    fn test_mask_phone_number_multibyte() {
        assert_eq!(mask_phone_number("電話番号０１２３"), "***０１２３");
    }
}
