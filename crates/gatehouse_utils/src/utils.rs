use chrono::{NaiveDateTime, Timelike};
use gatehouse_error::error::UtilError;

pub fn get_utc_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current utc time without sub-microsecond precision so values survive a database
/// round trip unchanged
pub fn get_utc_datetime() -> NaiveDateTime {
    let now = chrono::Utc::now().naive_utc();
    now.with_nanosecond((now.nanosecond() / 1_000) * 1_000)
        .unwrap_or(now)
}

/// Build the display name for an account
///
/// # Arguments
///
/// * `first_name` - first name of the user
/// * `last_name` - last name of the user
/// * `email` - fallback used when both name parts are blank
///
/// # Returns
///
/// * `String` - "{first} {last}" trimmed, or the email
pub fn display_name(first_name: &str, last_name: &str, email: &str) -> String {
    let name = format!("{} {}", first_name, last_name);
    if name.trim().is_empty() {
        return email.trim().to_string();
    }
    name.trim().to_string()
}

/// Parse a boolean submitted through a form field
pub fn parse_form_bool(value: &str) -> Result<bool, UtilError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(UtilError::BoolError(value.to_string())),
    }
}
