//! Contact (phone number) type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Contact`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// The input string is empty.
    #[error("contact number cannot be empty")]
    Empty,
    /// The input contains something other than digits (and a leading `+`).
    #[error("contact number may only contain digits and a leading +")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("contact number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum number of digits.
        min: usize,
        /// Maximum number of digits.
        max: usize,
    },
}

/// A contact phone number, used as the login identifier for OTP auth.
///
/// Spaces and dashes are stripped before validation, so
/// `"98765 43210"` and `"9876543210"` parse to the same value.
///
/// ## Constraints
///
/// - Digits only, optionally prefixed by a single `+`
/// - 7-15 digits (E.164 upper bound)
///
/// ## Examples
///
/// ```
/// use velorm_core::Contact;
///
/// assert!(Contact::parse("9876543210").is_ok());
/// assert!(Contact::parse("+91 98765-43210").is_ok());
///
/// assert!(Contact::parse("").is_err());
/// assert!(Contact::parse("98765abc").is_err());
/// assert!(Contact::parse("123").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Contact(String);

impl Contact {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `Contact` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains characters other
    /// than digits and a leading `+`, or has the wrong number of digits.
    pub fn parse(s: &str) -> Result<Self, ContactError> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();

        if cleaned.is_empty() {
            return Err(ContactError::Empty);
        }

        let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ContactError::InvalidCharacter);
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(ContactError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(cleaned))
    }

    /// Returns the contact number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Contact` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Contact {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Contact {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(
            Contact::parse("9876543210").unwrap().as_str(),
            "9876543210"
        );
        assert_eq!(
            Contact::parse("+91 98765-43210").unwrap().as_str(),
            "+919876543210"
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Contact::parse(""), Err(ContactError::Empty));
        assert_eq!(Contact::parse(" - "), Err(ContactError::Empty));
    }

    #[test]
    fn test_parse_invalid_character() {
        assert_eq!(
            Contact::parse("98765abc10"),
            Err(ContactError::InvalidCharacter)
        );
        assert_eq!(
            Contact::parse("++919876543210"),
            Err(ContactError::InvalidCharacter)
        );
    }

    #[test]
    fn test_parse_length() {
        assert!(matches!(
            Contact::parse("123456"),
            Err(ContactError::InvalidLength { .. })
        ));
        assert!(matches!(
            Contact::parse("1234567890123456"),
            Err(ContactError::InvalidLength { .. })
        ));
        assert!(Contact::parse("1234567").is_ok());
    }

    #[test]
    fn test_serde_transparent() {
        let contact = Contact::parse("9876543210").unwrap();
        assert_eq!(serde_json::to_string(&contact).unwrap(), "\"9876543210\"");
    }
}
