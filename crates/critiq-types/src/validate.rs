//! Pure domain validation rules, shared by payload validators and tests.

/// Usernames which would collide with API paths.
pub const RESERVED_USERNAME: &str = "me";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("username '{0}' is reserved")]
    ReservedUsername(String),
    #[error("year {year} is in the future (current year is {current_year})")]
    FutureYear { year: i64, current_year: i64 },
}

/// The literal username "me" is taken by the self endpoint. The check is
/// case sensitive, "Me" remains a valid username.
pub fn check_username(username: &str) -> Result<(), RuleViolation> {
    if username == RESERVED_USERNAME {
        Err(RuleViolation::ReservedUsername(username.to_string()))
    } else {
        Ok(())
    }
}

/// Release year must not exceed the current calendar year. The current
/// year is a parameter so validation stays deterministic under test.
pub fn check_year(year: i64, current_year: i64) -> Result<(), RuleViolation> {
    if year > current_year {
        Err(RuleViolation::FutureYear { year, current_year })
    } else {
        Ok(())
    }
}
