use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use serde_variant::to_variant_name;
use tokio::sync::mpsc;

use crate::{Result, StyluaxError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Helper function to send an event and handle potential errors.
pub fn send_event(sender: &Option<mpsc::Sender<Event>>, event: Event) -> Result<()> {
    if let Some(sender) = sender {
        sender
            .try_send(event)
            .map_err(|e| StyluaxError::EventSend(e.to_string()))?;
    }
    Ok(())
}

// The events are listed below roughly in the order a host sees them

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// The stylua binary could not be resolved. `installable` is false when
    /// a custom path is configured, since user binaries are not managed.
    NotInstalled { installable: bool },
    /// A newer release than the installed one is available
    UpdateAvailable { current: String, latest: String },

    /// Binary installation has started, with the release version
    InstallStart(String),
    /// Binary installation has finished, with the binary path
    InstallEnd(String),

    /// A format request has started, with the document path
    FormatStart(String),
    /// A format request has produced an edit, with the document path
    FormatEnd(String),
    /// A format request was skipped by ignore rules, with the document path
    Ignored(String),

    /// A log message with a specified log level
    Log(LogLevel, String),
    /// A user-visible warning that does not stop the request
    Warning(String),
    /// A user-visible error; the request produced no edit
    Fatal(String),
}

impl Event {
    /// Returns the snake_case name of the event variant
    pub fn name(&self) -> String {
        to_variant_name(self).unwrap().to_snake_case()
    }

    /// If this event should have a progress spinner, return an indicator string
    pub fn progress_event(&self) -> Option<String> {
        match self {
            Event::FormatStart(path) => Some(format!("formatting {}", path)),
            Event::InstallStart(version) => Some(format!("installing stylua {}", version)),
            _ => None,
        }
    }

    /// True if this event ends the current progress spinner
    pub fn ends_progress(&self) -> bool {
        matches!(
            self,
            Event::FormatEnd(_) | Event::InstallEnd(_) | Event::Ignored(_) | Event::Fatal(_)
        )
    }

    /// Text a host should surface as a notification, if any
    pub fn user_message(&self) -> Option<String> {
        match self {
            Event::NotInstalled { installable } => Some(if *installable {
                "stylua not found. Run `styluax install` to install it.".to_string()
            } else {
                "stylua not found at the configured path.".to_string()
            }),
            Event::UpdateAvailable { current, latest } => Some(format!(
                "stylua is not latest. current: {}, latest: {}",
                current, latest
            )),
            Event::Warning(message) | Event::Fatal(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Returns the enclosed string if any, otherwise an empty string
    pub fn display(&self) -> String {
        match self {
            Event::InstallStart(s)
            | Event::InstallEnd(s)
            | Event::FormatStart(s)
            | Event::FormatEnd(s)
            | Event::Ignored(s)
            | Event::Warning(s)
            | Event::Fatal(s) => s.clone(),
            Event::Log(_, s) => s.clone(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name() {
        assert_eq!(Event::FormatStart("a.lua".into()).name(), "format_start");
        assert_eq!(
            Event::NotInstalled { installable: true }.name(),
            "not_installed"
        );
    }

    #[test]
    fn test_user_message() {
        assert!(Event::NotInstalled { installable: true }
            .user_message()
            .unwrap()
            .contains("styluax install"));
        let msg = Event::UpdateAvailable {
            current: "v0.19.0".into(),
            latest: "v0.20.0".into(),
        }
        .user_message()
        .unwrap();
        assert!(msg.contains("v0.19.0") && msg.contains("v0.20.0"));
        assert!(Event::FormatEnd("a.lua".into()).user_message().is_none());
    }
}
