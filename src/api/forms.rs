// Request body validation for the auth and court endpoints

use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Sign-in and sign-up request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    InvalidEmail,
    PasswordTooShort,
    InvalidDate,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::InvalidEmail => write!(f, "Invalid email address"),
            FormError::PasswordTooShort => write!(
                f,
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ),
            FormError::InvalidDate => write!(f, "Date must be formatted as YYYY-MM-DD"),
        }
    }
}

pub fn validate_credentials(form: &CredentialsForm) -> Result<(), FormError> {
    validate_email(&form.email)?;
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(FormError::PasswordTooShort);
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), FormError> {
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return Err(FormError::InvalidEmail),
    };
    if local.is_empty() || domain.is_empty() {
        return Err(FormError::InvalidEmail);
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(FormError::InvalidEmail);
    }
    if email.contains(char::is_whitespace) {
        return Err(FormError::InvalidEmail);
    }
    Ok(())
}

/// Dates must be canonical `YYYY-MM-DD`, matching what the reservation
/// backend keys its records on.
pub fn validate_date(date: &str) -> Result<(), FormError> {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) if parsed.format("%Y-%m-%d").to_string() == date => Ok(()),
        _ => Err(FormError::InvalidDate),
    }
}
