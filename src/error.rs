use thiserror::Error;

/// Outcome taxonomy for command handlers. User-facing variants are reported
/// to the invoking channel and abort only that invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid arguments")]
    InvalidArguments,
    #[error("bad page number")]
    BadPageNumber,
    #[error("no event with id {0}")]
    EventNotFound(i64),
    #[error("permission denied")]
    PermissionDenied,
    #[error("start time is not in the future")]
    PastDatetime,
    #[error("malformed datetime")]
    BadDatetime,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CommandError {
    /// Message shown in the invoking channel when a handler fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            CommandError::InvalidArguments => {
                "Invalid arguments! Use the info command to see usage."
            }
            CommandError::BadPageNumber => "That isn't a valid number!",
            CommandError::EventNotFound(_) => "No event exists with that id!",
            CommandError::PermissionDenied => "You don't have permission to do that!",
            CommandError::PastDatetime => {
                "An event should take place in the future! (Remember to use UTC)"
            }
            CommandError::BadDatetime => "Invalid datetime format! Expected mm/dd/yy hh:mm (UTC).",
            CommandError::Other(_) => "Something went wrong. Try again later.",
        }
    }

    /// True for failures the invoking user can act on, as opposed to
    /// internal store or delivery faults.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, CommandError::Other(_))
    }
}

/// A specific notification target could not be delivered to. Caught per
/// target inside the dispatcher, never aborts a sweep.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("recipient unreachable: {0}")]
    Unreachable(String),
}

impl From<NotifyError> for CommandError {
    fn from(err: NotifyError) -> Self {
        CommandError::Other(err.into())
    }
}
