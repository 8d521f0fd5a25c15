/// Input validators for credential and token payloads
///
/// Rejects empty, oversized and control-character input before it reaches
/// the credential store or the token codec. Values are never rewritten.

use crate::error::ValidationError;

const MAX_USERNAME_LENGTH: usize = 254; // long enough for an email login
const MAX_TOKEN_LENGTH: usize = 8 * 1024;

/// Validates a username or email used to log in
///
/// Not trimmed: the store matches the exact string it is given.
pub fn is_valid_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyField("username"));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username", MAX_USERNAME_LENGTH));
    }

    if has_control_characters(username) {
        return Err(ValidationError::SuspiciousContent("username"));
    }

    Ok(())
}

/// Validates a plaintext password
///
/// Length and strength are the credential store's business.
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }

    if password.contains('\0') {
        return Err(ValidationError::SuspiciousContent("password"));
    }

    Ok(())
}

/// Validates the presence and size of a compact token string
pub fn is_valid_token(field: &'static str, token: &str) -> Result<String, ValidationError> {
    let trimmed = token.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }

    if trimmed.len() > MAX_TOKEN_LENGTH {
        return Err(ValidationError::TooLong(field, MAX_TOKEN_LENGTH));
    }

    Ok(trimmed.to_string())
}

fn has_control_characters(input: &str) -> bool {
    input.chars().any(|c| c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_username() {
        assert!(is_valid_username("admin").is_ok());
        assert!(is_valid_username("admin@example.com").is_ok());
        assert!(is_valid_username(" admin ").is_ok());
    }

    #[test]
    fn test_empty_username() {
        assert_eq!(
            is_valid_username("   "),
            Err(ValidationError::EmptyField("username"))
        );
    }

    #[test]
    fn test_username_too_long() {
        let long = "a".repeat(MAX_USERNAME_LENGTH + 1);
        assert!(matches!(
            is_valid_username(&long),
            Err(ValidationError::TooLong("username", _))
        ));
    }

    #[test]
    fn test_username_control_characters() {
        assert!(is_valid_username("admin\0").is_err());
        assert!(is_valid_username("ad\nmin").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(is_valid_password("admin123").is_ok());
        assert!(is_valid_password(" spaced ").is_ok());
        assert_eq!(
            is_valid_password(""),
            Err(ValidationError::EmptyField("password"))
        );
        assert!(is_valid_password(&"p".repeat(100)).is_ok());
        assert!(is_valid_password("pass\0word").is_err());
    }

    #[test]
    fn test_token_presence() {
        assert!(is_valid_token("accessToken", "a.b.c").is_ok());
        assert_eq!(
            is_valid_token("accessToken", ""),
            Err(ValidationError::EmptyField("accessToken"))
        );
    }
}
