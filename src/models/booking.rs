use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConfirmationStatus;

/// Raw form input as posted by the booking page. Field values are validated
/// and sanitized before a [`BookingRecord`] is built from them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub name: String,
    pub date: String,
    pub time: String,
    pub call_type: CallType,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

/// The record submitted to the webhook. Immutable once submitted except for
/// the confirmation-derived fields, which are attached only after a matching
/// confirmation arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub booking_id: String,
    pub name: String,
    pub date: String,
    pub time: String,
    pub call_type: CallType,
    pub phone_number: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub timezone: String,
    pub user_agent: String,
    pub referrer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConfirmationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Video,
    Mobile,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Video => "video",
            CallType::Mobile => "mobile",
        }
    }
}
