//! Client identity validation
//!
//! Identities end up in file names and in quoted RouterOS strings, so they
//! are validated rather than escaped. An identity must be:
//! - 1-32 characters after trimming
//! - Lowercase (input is normalized)
//! - [a-z0-9_-] characters only
//! - Started by a letter or digit

/// Identity validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    Empty,
    TooLong { max: usize, got: usize },
    InvalidCharacter { position: usize, char: char },
    LeadingSymbol { char: char },
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Identity cannot be empty"),
            Self::TooLong { max, got } => {
                write!(f, "Identity must be at most {} characters (got {})", max, got)
            }
            Self::InvalidCharacter { position, char } => {
                write!(
                    f,
                    "Invalid character '{}' at position {}. Only letters, numbers, '-' and '_' are allowed.",
                    char, position
                )
            }
            Self::LeadingSymbol { char } => {
                write!(f, "Identity must start with a letter or number, not '{}'", char)
            }
        }
    }
}

impl std::error::Error for IdentityError {}

/// Maximum identity length
pub const MAX_IDENTITY_LEN: usize = 32;

/// Validate a client identity
///
/// Returns Ok(normalized_identity) or Err(IdentityError)
pub fn validate_identity(identity: &str) -> Result<String, IdentityError> {
    let identity = identity.trim().to_lowercase();
    let len = identity.chars().count();

    if len == 0 {
        return Err(IdentityError::Empty);
    }
    if len > MAX_IDENTITY_LEN {
        return Err(IdentityError::TooLong { max: MAX_IDENTITY_LEN, got: len });
    }

    for (i, c) in identity.chars().enumerate() {
        if !matches!(c, 'a'..='z' | '0'..='9' | '-' | '_') {
            return Err(IdentityError::InvalidCharacter { position: i, char: c });
        }
    }

    if let Some(first @ ('-' | '_')) = identity.chars().next() {
        return Err(IdentityError::LeadingSymbol { char: first });
    }

    Ok(identity)
}
