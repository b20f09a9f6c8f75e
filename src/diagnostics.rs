//! Diagnostics bridge: info output, casual output, warnings and crashes.
//!
//! The engine talks to the outside world through a handful of channels,
//! modelled after Praat's Melder:
//!
//! - the **info window** (`write_info`, `append_info`), which normally goes to
//!   a console writer but can be *diverted* into a string buffer;
//! - the **casual stream** for non-fatal notices (stderr by default);
//! - **warnings**, handled according to a [`WarningPolicy`];
//! - **crashes**, i.e. panics inside engine code, which [`guard`] turns into
//!   [`Error::Crash`].
//!
//! Diversions nest. Clearing the info window only ever affects the console
//! window itself, never a diversion buffer, so that a captured
//! `writeInfo: "X"` followed by `appendInfo: "Y"` yields exactly `"XY"`.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do with engine warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    /// Record every warning; identical messages are not deduplicated.
    #[default]
    Collect,
    /// Fail the current operation with [`Error::Warning`].
    Error,
    /// Drop warnings silently.
    Ignore,
}

impl std::str::FromStr for WarningPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collect" | "default" => Ok(WarningPolicy::Collect),
            "error" => Ok(WarningPolicy::Error),
            "ignore" => Ok(WarningPolicy::Ignore),
            other => Err(Error::Config(format!(
                "unknown warning policy \"{}\" (expected collect, error or ignore)",
                other
            ))),
        }
    }
}

/// A recorded engine warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    message: String,
}

impl Warning {
    /// The warning text, verbatim.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A cloneable in-memory writer, handy for capturing the console streams.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Return the contents and empty the buffer.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.bytes.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Output streams and warning state of one session.
pub struct Melder {
    console: Box<dyn Write + Send>,
    casual: Box<dyn Write + Send>,
    diversions: Vec<String>,
    warnings: Vec<Warning>,
    policy: WarningPolicy,
}

impl std::fmt::Debug for Melder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Melder")
            .field("diversions", &self.diversions.len())
            .field("warnings", &self.warnings)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Default for Melder {
    fn default() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }
}

impl Melder {
    /// Create diagnostics writing to the given console and casual streams.
    pub fn new(console: Box<dyn Write + Send>, casual: Box<dyn Write + Send>) -> Self {
        Self {
            console,
            casual,
            diversions: Vec::new(),
            warnings: Vec::new(),
            policy: WarningPolicy::default(),
        }
    }

    /// Current warning policy.
    pub fn policy(&self) -> WarningPolicy {
        self.policy
    }

    /// Change the warning policy.
    pub fn set_policy(&mut self, policy: WarningPolicy) {
        self.policy = policy;
    }

    // ========== Info window ==========

    /// Whether info output currently goes to a diversion buffer.
    pub fn is_diverted(&self) -> bool {
        !self.diversions.is_empty()
    }

    /// Start diverting info output into a fresh buffer.
    pub fn divert(&mut self) {
        self.diversions.push(String::new());
    }

    /// Stop the innermost diversion and return what it captured.
    ///
    /// Returns an empty string if nothing was diverted.
    pub fn undivert(&mut self) -> String {
        self.diversions.pop().unwrap_or_default()
    }

    /// Clear the info window. Diversion buffers are never cleared.
    pub fn clear_info(&mut self) {
        // A console cannot be un-written; there is nothing to do.
    }

    /// Clear the info window, then write `text`.
    pub fn write_info(&mut self, text: &str) {
        self.clear_info();
        self.append_info(text);
    }

    /// Append `text` to the info window (or the innermost diversion).
    pub fn append_info(&mut self, text: &str) {
        match self.diversions.last_mut() {
            Some(buffer) => buffer.push_str(text),
            None => {
                if let Err(e) = self.console.write_all(text.as_bytes()).and_then(|_| self.console.flush()) {
                    log::warn!("failed to write info output: {}", e);
                }
            }
        }
    }

    /// Append `text` followed by a newline.
    pub fn append_info_line(&mut self, text: &str) {
        self.append_info(text);
        self.append_info("\n");
    }

    /// Write a line to the casual stream.
    pub fn casual(&mut self, text: &str) {
        let result = self
            .casual
            .write_all(text.as_bytes())
            .and_then(|_| self.casual.write_all(b"\n"))
            .and_then(|_| self.casual.flush());
        if let Err(e) = result {
            log::warn!("failed to write casual output: {}", e);
        }
    }

    // ========== Warnings ==========

    /// Issue a warning according to the current policy.
    pub fn warn(&mut self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        match self.policy {
            WarningPolicy::Collect => {
                log::warn!("{}", message);
                self.warnings.push(Warning { message });
                Ok(())
            }
            WarningPolicy::Error => Err(Error::Warning(message)),
            WarningPolicy::Ignore => Ok(()),
        }
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Take all recorded warnings, leaving none behind.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

/// Run engine code, converting a panic into [`Error::Crash`].
///
/// The closure's own errors pass through untouched.
pub fn guard<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "The engine crashed for an unknown reason.".to_string()
            };
            log::error!("caught engine crash: {}", message);
            Err(Error::Crash { message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melder() -> (Melder, SharedBuffer, SharedBuffer) {
        let console = SharedBuffer::new();
        let casual = SharedBuffer::new();
        let melder = Melder::new(Box::new(console.clone()), Box::new(casual.clone()));
        (melder, console, casual)
    }

    #[test]
    fn diverted_write_then_append_concatenates() {
        let (mut melder, console, _) = melder();
        melder.divert();
        melder.write_info("X");
        melder.append_info("Y");
        assert_eq!(melder.undivert(), "XY");
        assert_eq!(console.contents(), "");
    }

    #[test]
    fn nested_diversions_are_independent() {
        let (mut melder, console, _) = melder();
        melder.append_info_line("BEFORE");
        melder.divert();
        melder.append_info("outer ");
        melder.divert();
        melder.append_info("inner");
        assert_eq!(melder.undivert(), "inner");
        melder.append_info("again");
        assert_eq!(melder.undivert(), "outer again");
        melder.append_info_line("AFTER");
        assert_eq!(console.contents(), "BEFORE\nAFTER\n");
    }

    #[test]
    fn casual_goes_to_its_own_stream() {
        let (mut melder, console, casual) = melder();
        melder.casual("not aligned");
        assert_eq!(console.contents(), "");
        assert_eq!(casual.contents(), "not aligned\n");
    }

    #[test]
    fn identical_warnings_are_all_recorded() {
        let (mut melder, _, _) = melder();
        for _ in 0..3 {
            melder.warn("No non-empty intervals were found.").unwrap();
        }
        let warnings = melder.take_warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.message() == "No non-empty intervals were found."));
        assert!(melder.warnings().is_empty());
    }

    #[test]
    fn error_policy_promotes_warnings() {
        let (mut melder, _, _) = melder();
        melder.set_policy(WarningPolicy::Error);
        let err = melder.warn("clipped").unwrap_err();
        assert!(matches!(err, Error::Warning(ref m) if m == "clipped"));
        assert!(melder.warnings().is_empty());
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("Error".parse::<WarningPolicy>().unwrap(), WarningPolicy::Error);
        assert_eq!("ignore".parse::<WarningPolicy>().unwrap(), WarningPolicy::Ignore);
        assert!("loud".parse::<WarningPolicy>().is_err());
    }

    #[test]
    fn guard_converts_panics() {
        let err = guard::<()>(|| panic!("boom")).unwrap_err();
        assert!(matches!(err, Error::Crash { ref message } if message == "boom"));
        assert_eq!(guard(|| Ok(42)).unwrap(), 42);
    }
}
