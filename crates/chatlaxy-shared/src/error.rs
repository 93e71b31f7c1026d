use thiserror::Error;

use crate::constants::MIN_DISPLAY_NAME_LEN;

/// Client-side validation failures.
///
/// These are surfaced to the caller immediately and never reach a backend:
/// a rejected intent issues no write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The message body is empty after trimming whitespace.
    #[error("Message body is empty")]
    EmptyMessage,

    /// The display name is shorter than the signup minimum.
    #[error("Display name must be at least {} characters", MIN_DISPLAY_NAME_LEN)]
    DisplayNameTooShort,

    /// A profile update named none of the editable fields.
    #[error("Profile update contains no fields")]
    EmptyProfileUpdate,
}
