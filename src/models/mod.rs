pub mod booking;
pub mod confirmation;

pub use booking::{BookingForm, BookingRecord, CallType};
pub use confirmation::{ConfirmationEvent, ConfirmationStatus, HookResponse};
