//! Input validation for auth API requests.
//!
//! Validators run before any database work and return a user-facing
//! message for the field that failed.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Permissive email shape check: local part, @, domain with a dot.
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("All fields are required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

/// Validate a name field (first or last name)
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("All fields are required".to_string());
    }
    if name.len() > 100 {
        return Err("Name is too long (max 100 characters)".to_string());
    }
    Ok(())
}

/// Validate a password and its confirmation
pub fn validate_password_pair(password: &str, confirm: &str) -> Result<(), String> {
    if password.is_empty() || confirm.is_empty() {
        return Err("All fields are required".to_string());
    }
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password != confirm {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}
