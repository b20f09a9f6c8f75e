//! Error types for praatfan-bridge.
//!
//! Three kinds of failure come out of the engine and are kept apart here,
//! because hosts treat them differently:
//!
//! - **Recoverable errors** (`Error::Praat`): bad file paths, bad arguments,
//!   commands not applicable to the selection. The message is the engine's
//!   diagnostic text, verbatim, including its `“…”` quotes.
//! - **Warnings promoted to errors** (`Error::Warning`): raised only when the
//!   session's warning policy is [`WarningPolicy::Error`](crate::WarningPolicy).
//! - **Crashes** (`Error::Crash`): a panic inside the engine was caught. The
//!   session can keep going, but the message tells the caller to restart.
//!
//! The remaining variants cover host-side conversion, I/O, configuration and
//! the build tooling.

use thiserror::Error;

/// Result type alias using praatfan-bridge's Error type.
///
/// # Example
///
/// ```no_run
/// use praatfan_bridge::{Praat, Result};
///
/// fn count_samples(path: &str) -> Result<f64> {
///     let mut praat = Praat::new();
///     let sound = praat.read(path)?;
///     praat.call(&[sound], "Get number of samples", &[])?.as_number()
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Text appended to every crash message.
pub const RESTART_ADVICE: &str = "The engine's internal state may have become inconsistent; \
please restart the process before doing any further analysis.";

/// Errors that can occur while calling into the engine or building it.
#[derive(Error, Debug)]
pub enum Error {
    /// A recoverable engine error.
    ///
    /// The string is the full diagnostic, possibly several lines long when
    /// context was added on the way up (e.g. by the script runner).
    #[error("{0}")]
    Praat(String),

    /// A warning that was promoted to an error by the warning policy.
    #[error("{0}")]
    Warning(String),

    /// The engine panicked while executing a command.
    #[error("{message}\n{RESTART_ADVICE}")]
    Crash {
        /// Panic payload, or a placeholder if it was not a string.
        message: String,
    },

    /// A host value could not be converted to an engine argument.
    #[error("Cannot convert argument \"{0}\" to a known Praat argument type")]
    ArgumentConversion(String),

    /// I/O error outside of the engine's own file handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the `hound` WAV library.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Invalid configuration file or environment override.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The external build tool could not be executed.
    #[error("CMake must be installed to build the following extensions: {0}")]
    BuildToolMissing(String),

    /// The external build tool is older than required.
    #[error("CMake >= {required} is required on {platform}")]
    BuildToolTooOld {
        /// Minimal version, e.g. `3.1.0`.
        required: String,
        /// Platform family name.
        platform: String,
    },

    /// The external build exited unsuccessfully.
    #[error("Command {command} failed with {status}")]
    BuildFailed {
        /// The command line that failed.
        command: String,
        /// Exit status description.
        status: String,
    },

    /// The version marker is absent from the version header.
    #[error("Unable to find version string.")]
    VersionNotFound,
}

impl Error {
    /// Create a recoverable engine error.
    pub fn praat(message: impl Into<String>) -> Self {
        Error::Praat(message.into())
    }

    /// Append a line of context, the way the engine stacks messages.
    ///
    /// Only engine errors and promoted warnings collect context; other
    /// variants are returned unchanged.
    pub fn context(self, line: impl AsRef<str>) -> Self {
        match self {
            Error::Praat(message) => Error::Praat(format!("{}\n{}", message, line.as_ref())),
            Error::Warning(message) => Error::Warning(format!("{}\n{}", message, line.as_ref())),
            other => other,
        }
    }

    /// Whether this error is a caught crash.
    pub fn is_crash(&self) -> bool {
        matches!(self, Error::Crash { .. })
    }
}

/// Shorthand for returning a recoverable engine error.
macro_rules! praat_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::Praat(format!($($arg)*)))
    };
}
pub(crate) use praat_bail;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_stacks_lines() {
        let err = Error::praat("Cannot open file “x.wav”.").context("Script not completed.");
        assert_eq!(err.to_string(), "Cannot open file “x.wav”.\nScript not completed.");
    }

    #[test]
    fn crash_message_advises_restart() {
        let err = Error::Crash {
            message: "index out of bounds".into(),
        };
        assert!(err.is_crash());
        assert!(err.to_string().starts_with("index out of bounds\n"));
        assert!(err.to_string().contains("restart"));
    }

    #[test]
    fn context_leaves_other_kinds_alone() {
        let err = Error::VersionNotFound.context("ignored");
        assert_eq!(err.to_string(), "Unable to find version string.");
    }
}
