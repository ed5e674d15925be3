use std::fmt;

use thiserror::Error;

/// A normalized E.164 phone number, always `+` followed by 8-15 digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct E164(String);

impl E164 {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for E164 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number is empty")]
    Empty,
    #[error("phone number `{0}` contains invalid characters")]
    InvalidCharacters(String),
    #[error("phone number `{0}` has an unsupported length")]
    UnsupportedLength(String),
}

/// Normalizes a raw phone number to E.164.
///
/// Accepts an optional leading `+` or `00` international prefix and ignores
/// spaces, dashes, and parentheses. Bare 8-digit numbers are treated as local
/// and get `default_country_code` prepended; longer bare numbers are assumed
/// to already carry their country code.
pub fn normalize(raw: &str, default_country_code: &str) -> Result<E164, PhoneError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }

    let (explicit_international, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if matches!(ch, ' ' | '-' | '(' | ')') {
            continue;
        } else {
            return Err(PhoneError::InvalidCharacters(raw.to_string()));
        }
    }

    let digits = if !explicit_international && digits.starts_with("00") {
        digits[2..].to_string()
    } else {
        digits
    };

    let normalized = if !explicit_international && digits.len() == 8 {
        format!("+{default_country_code}{digits}")
    } else {
        format!("+{digits}")
    };

    let digit_count = normalized.len() - 1;
    if !(8..=15).contains(&digit_count) {
        return Err(PhoneError::UnsupportedLength(raw.to_string()));
    }

    Ok(E164(normalized))
}

#[cfg(test)]
mod tests {
    use super::{normalize, PhoneError};

    #[test]
    fn local_eight_digit_numbers_get_the_default_country_code() {
        let number = normalize("36001234", "973").expect("valid local number");
        assert_eq!(number.as_str(), "+97336001234");
    }

    #[test]
    fn explicit_international_prefixes_are_preserved() {
        assert_eq!(
            normalize("+973 3600-1234", "973").expect("plus prefix").as_str(),
            "+97336001234"
        );
        assert_eq!(
            normalize("0097336001234", "973").expect("00 prefix").as_str(),
            "+97336001234"
        );
    }

    #[test]
    fn longer_bare_numbers_are_taken_as_already_international() {
        let number = normalize("97336001234", "973").expect("11 digits");
        assert_eq!(number.as_str(), "+97336001234");
    }

    #[test]
    fn separators_are_tolerated_but_letters_are_not() {
        assert_eq!(
            normalize("3600 12 34", "973").expect("spaced local").as_str(),
            "+97336001234"
        );
        assert!(matches!(
            normalize("3600x1234", "973"),
            Err(PhoneError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn empty_and_truncated_numbers_are_rejected() {
        assert_eq!(normalize("   ", "973"), Err(PhoneError::Empty));
        assert!(matches!(normalize("12345", "973"), Err(PhoneError::UnsupportedLength(_))));
    }
}
