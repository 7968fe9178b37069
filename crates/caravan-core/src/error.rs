use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::platform::ChannelId;
use crate::route::{Mode, Operation};

/// Fatal problems with the waypoint catalog. Only raised at startup.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Could not read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Waypoint \"{name}\" has malformed location \"{location}\" (expected \"<lat>,<lon>\")")]
    MalformedLocation { name: String, location: String },

    #[error("Waypoint \"{name}\" is defined more than once (names are case-insensitive)")]
    DuplicateName { name: String },

    #[error("Waypoint name \"{name}\" is empty or too long")]
    InvalidName { name: String },
}

/// A rejected caravan command. The `Display` text is sent back to the member
/// who issued the command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaravanError {
    #[error("Only {required} may {action}.")]
    PermissionDenied {
        required: &'static str,
        action: &'static str,
    },

    #[error("{}", describe_unresolved(.names, .suggestions))]
    Unresolved {
        names: Vec<String>,
        suggestions: Vec<String>,
    },

    #[error("\"{query}\" could be {}. Please be more specific.", join_quoted(.candidates, "or"))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    #[error("The route would visit {} more than once.", join_quoted(.names, "and"))]
    DuplicateStop { names: Vec<String> },

    #[error("Can't {operation} while the caravan is {mode}; it must be {required}.")]
    InvalidTransition {
        operation: Operation,
        mode: Mode,
        required: &'static str,
    },

    #[error("The route is empty. A leader may set one with `!route`.")]
    EmptyRoute,

    #[error("The caravan is already at its first stop.")]
    AtStart,

    #[error("The caravan has no more stops. Try `!append` to add one.")]
    AtEnd,

    #[error("\"{0}\" is not a stop on the current route.")]
    NoSuchStop(String),

    #[error("Typo? {guests} is a lot of guests (at most {max}).")]
    TooManyGuests { guests: u32, max: u32 },

    #[error("Did you mean `!{suggestion}`?")]
    UnknownCommand {
        command: String,
        suggestion: &'static str,
    },

    #[error("{message}\nUsage: `{usage}`")]
    InvalidArguments { message: String, usage: &'static str },
}

fn join_quoted(items: &[String], conjunction: &str) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("\"{}\"", i)).collect();
    crate::notify::join_list(&quoted, conjunction)
}

fn describe_unresolved(names: &[String], suggestions: &[String]) -> String {
    let mut message = format!(
        "Unknown waypoint{}: {}.",
        if names.len() == 1 { "" } else { "s" },
        join_quoted(names, "and")
    );
    if !suggestions.is_empty() {
        message.push_str(&format!(" Did you mean {}?", join_quoted(suggestions, "or")));
    }
    message
}

/// Failures reported by the chat platform for outbound view/notice calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Rate limited - please wait before retrying")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transient platform failure: {0}")]
    Transient(String),

    #[error("Platform rejected the request: {0}")]
    Permanent(String),
}

impl PlatformError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PlatformError::Permanent(_))
    }
}

/// Failures routing a message to its channel actor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Channel {0} is no longer accepting messages")]
    ChannelClosed(ChannelId),

    #[error("Channel {0} dropped the request before answering")]
    NoReply(ChannelId),
}
