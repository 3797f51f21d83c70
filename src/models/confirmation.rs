use serde::{Deserialize, Serialize};

/// Confirmation payload from an external system. Arrives over the inbound
/// webhook, the callable hook, or inline in a confirmation-request response.
/// The source is untrusted: both `bookingId` and `booking_id` spellings are
/// accepted, and an unknown or missing status maps to `Unspecified`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationEvent {
    #[serde(rename = "bookingId", alias = "booking_id")]
    pub booking_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: ConfirmationStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Confirmed,
    Error,
    Failed,
    #[default]
    Unspecified,
}

impl<'de> Deserialize<'de> for ConfirmationStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_str(&raw))
    }
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Confirmed => "confirmed",
            ConfirmationStatus::Error => "error",
            ConfirmationStatus::Failed => "failed",
            ConfirmationStatus::Unspecified => "unspecified",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "confirmed" => ConfirmationStatus::Confirmed,
            "error" => ConfirmationStatus::Error,
            "failed" => ConfirmationStatus::Failed,
            _ => ConfirmationStatus::Unspecified,
        }
    }

    /// A collaborator that omits the status field is taken to be confirming;
    /// only an explicit error/failed status rejects the booking.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ConfirmationStatus::Confirmed | ConfirmationStatus::Unspecified
        )
    }
}

/// Reply returned to whichever channel delivered a confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookResponse {
    pub fn applied(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            error: None,
        }
    }

    pub fn ignored(error: &str) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
        }
    }
}
