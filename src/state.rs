use crate::config::AppConfig;
use crate::services::lifecycle::BookingSession;
use crate::services::submission::SubmissionClient;

pub struct AppState {
    pub config: AppConfig,
    pub submitter: Box<dyn SubmissionClient>,
    pub session: BookingSession,
}
