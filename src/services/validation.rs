use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};

use crate::models::{BookingForm, CallType};

pub const BUSINESS_HOURS_START: u32 = 9;
pub const BUSINESS_HOURS_END: u32 = 17;
pub const MAX_DAYS_AHEAD: i64 = 90;

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 50;
const PHONE_MAX_DIGITS: usize = 16;

/// Form fields after validation, with free text sanitized.
#[derive(Debug, Clone)]
pub struct ValidatedForm {
    pub name: String,
    pub date: String,
    pub time: String,
    pub call_type: CallType,
    pub phone_number: Option<String>,
}

/// Strips angle brackets so markup can never survive into the record.
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().count() < NAME_MIN_LEN {
        return Err(format!("Name must be at least {NAME_MIN_LEN} characters"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(format!("Name must be less than {NAME_MAX_LEN} characters"));
    }
    let allowed = name
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == ' ' || c == '\'' || c == '-');
    if !allowed {
        return Err(
            "Name can only contain letters, spaces, hyphens and apostrophes".to_string(),
        );
    }
    Ok(())
}

pub fn validate_date(date: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    if date.is_empty() {
        return Err("Date is required".to_string());
    }
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| "Please enter a valid date".to_string())?;
    if parsed < today {
        return Err("Cannot select a date in the past".to_string());
    }
    if matches!(parsed.weekday(), Weekday::Sat | Weekday::Sun) {
        return Err("Please select a weekday (Monday-Friday)".to_string());
    }
    if parsed > today + Duration::days(MAX_DAYS_AHEAD) {
        return Err(format!("Cannot book more than {MAX_DAYS_AHEAD} days ahead"));
    }
    Ok(parsed)
}

pub fn validate_time(time: &str) -> Result<NaiveTime, String> {
    if time.is_empty() {
        return Err("Time is required".to_string());
    }
    let parsed = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| "Please enter a valid time".to_string())?;
    let hour = parsed.hour();
    if hour < BUSINESS_HOURS_START || hour >= BUSINESS_HOURS_END {
        return Err(format!(
            "Please select a time between {BUSINESS_HOURS_START}:00 and {BUSINESS_HOURS_END}:00"
        ));
    }
    Ok(parsed)
}

/// Strips common separators and checks the remainder: optional leading `+`,
/// first digit 1-9, at most 16 digits. Returns the cleaned number.
pub fn validate_phone(phone: &str) -> Result<String, String> {
    let cleaned: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')' | '-' | '.'))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    let valid = !digits.is_empty()
        && digits.len() <= PHONE_MAX_DIGITS
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !digits.starts_with('0');
    if !valid {
        return Err("Please enter a valid phone number".to_string());
    }
    Ok(cleaned)
}

/// Validates the whole form, collecting every field error so the caller can
/// surface them together. A mobile call type requires a phone number; a
/// video call ignores any phone number supplied.
pub fn validate_form(form: &BookingForm, today: NaiveDate) -> Result<ValidatedForm, String> {
    let mut errors: Vec<String> = Vec::new();

    let name = sanitize_input(&form.name);
    if let Err(e) = validate_name(&name) {
        errors.push(e);
    }
    if let Err(e) = validate_date(form.date.trim(), today) {
        errors.push(e);
    }
    if let Err(e) = validate_time(form.time.trim()) {
        errors.push(e);
    }

    let phone_number = match form.call_type {
        CallType::Mobile => {
            let raw = form
                .phone_number
                .as_deref()
                .map(sanitize_input)
                .unwrap_or_default();
            if raw.is_empty() {
                errors.push("Phone number is required for mobile calls".to_string());
                None
            } else {
                match validate_phone(&raw) {
                    Ok(cleaned) => Some(cleaned),
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                }
            }
        }
        CallType::Video => None,
    };

    if !errors.is_empty() {
        return Err(errors.join("; "));
    }

    Ok(ValidatedForm {
        name,
        date: form.date.trim().to_string(),
        time: form.time.trim().to_string(),
        call_type: form.call_type,
        phone_number,
    })
}
