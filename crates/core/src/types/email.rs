//! Email address type.

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The address is longer than the SMTP limit.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The address contains whitespace.
    #[error("email cannot contain spaces")]
    Whitespace,
    /// There is not exactly one `@`.
    #[error("email must contain a single @")]
    AtSymbol,
    /// Nothing before the `@`.
    #[error("email is missing the name before @")]
    EmptyLocalPart,
    /// The part after the `@` is not a dotted host name.
    #[error("email domain must look like velorm.com")]
    InvalidDomain,
}

/// A shopper's email address, as entered on the profile form.
///
/// The profile email is optional, so [`Email::parse_optional`] treats a
/// blank field as "no email". Anything non-blank must pass [`Email::parse`].
///
/// ```
/// use velorm_core::Email;
///
/// assert!(Email::parse("asha@velorm.com").is_ok());
/// assert!(Email::parse("asha@velorm").is_err());
/// assert_eq!(Email::parse_optional("  ").unwrap(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    /// Maximum length of an address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse a non-blank email address. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is too long, contains whitespace,
    /// does not have exactly one `@`, or has an empty name or a domain
    /// without an inner dot.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let mut parts = s.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::AtSymbol);
        };
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.split('.').count() < 2 || domain.split('.').any(str::is_empty) {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Parse an optional address: blank input yields `None`.
    ///
    /// # Errors
    ///
    /// Returns the [`Email::parse`] error for non-blank input.
    pub fn parse_optional(s: &str) -> Result<Option<Self>, EmailError> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        Self::parse(s).map(Some)
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(
            Email::parse(" asha@velorm.com ").unwrap().as_str(),
            "asha@velorm.com"
        );
        assert!(Email::parse("asha.rao+orders@mail.velorm.co.in").is_ok());
    }

    #[test]
    fn test_parse_at_symbol() {
        assert_eq!(Email::parse("asha.velorm.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("asha@@velorm.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@velorm.com"), Err(EmailError::EmptyLocalPart));
    }

    #[test]
    fn test_parse_domain() {
        for email in ["asha@", "asha@velorm", "asha@.com", "asha@velorm."] {
            assert_eq!(Email::parse(email), Err(EmailError::InvalidDomain), "{email}");
        }
    }

    #[test]
    fn test_parse_whitespace_and_length() {
        assert_eq!(Email::parse("asha rao@velorm.com"), Err(EmailError::Whitespace));

        let long = format!("{}@velorm.com", "a".repeat(Email::MAX_LENGTH));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(Email::parse_optional("").unwrap(), None);
        assert_eq!(Email::parse_optional("   ").unwrap(), None);
        assert_eq!(
            Email::parse_optional("asha@velorm.com").unwrap().unwrap().as_str(),
            "asha@velorm.com"
        );
        assert!(Email::parse_optional("asha").is_err());
    }
}
