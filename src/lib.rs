//! # praatfan-bridge
//!
//! Praat's command-and-script interface on top of the praatfan analysis
//! engine.
//!
//! Praat is driven by *commands*: named operations applied to the objects
//! currently selected, with typed positional arguments. This crate
//! reproduces that contract for host code:
//!
//! - **Commands** are looked up by name against the classes of the selected
//!   objects, their arguments are checked against typed parameter
//!   declarations, and their results are decoded by the callback-prefix
//!   taxonomy (`REAL_`, `NUMVEC_`, `NEW_`, ...).
//! - **Scripts** in the Praat language run against the same object list,
//!   with forms, control flow and command output captured into variables.
//! - **Diagnostics** keep Praat's channels apart: the info window (which can
//!   be diverted into a buffer), casual output, warnings under a policy, and
//!   crashes that are caught but advise a restart.
//!
//! # Supported Object Types
//!
//! - **Sound**: WAV loading and saving, queries, extraction, conversions
//! - **Intensity**: RMS energy contour in dB
//! - **Pitch**: F0 detection using AC and CC methods
//! - **PointProcess**: glottal pulses, jitter and shimmer
//! - **TextGrid**: interval and point tiers
//! - **Spectrogram**: time-frequency representation (STFT)
//! - **Matrix**: generic sampled grid with formulas
//! - **Formant**: LPC formant tracks (Burg method)
//! - **Harmonicity**: harmonics-to-noise ratio (AC and CC methods)
//! - **Spectrum**: single-frame Fourier transform and spectral moments
//!
//! # Quick Start
//!
//! ```no_run
//! use praatfan_bridge::{args, Praat, RunOptions};
//!
//! let mut praat = Praat::new();
//! let sound = praat.read("audio.wav").unwrap();
//!
//! // Commands take the selection, a name and positional arguments
//! let pitch = praat
//!     .call(&[sound], "To Pitch", &args![0.0, 75.0, 600.0])
//!     .unwrap()
//!     .as_object()
//!     .unwrap();
//! let mean = praat
//!     .call(&[pitch], "Get mean", &args![0.0, 0.0, "Hertz"])
//!     .unwrap()
//!     .as_number()
//!     .unwrap();
//!
//! // Scripts see the same objects
//! let options = RunOptions { capture_output: true, ..RunOptions::default() };
//! let result = praat
//!     .run_with(&[pitch], "n = Get number of voiced frames\nwriteInfo: n", &[], &options)
//!     .unwrap();
//! println!("{} Hz over {} frames", mean, result.output.unwrap());
//! ```
//!
//! # Module Organization
//!
//! The analysis engine lives in one module per object type (`sound`,
//! `pitch`, ...). On top of it:
//!
//! - `objects`: the host arena and the per-call object list
//! - `value`: argument and result kinds
//! - `commands`: the registry and dispatcher
//! - `interpreter`: expressions and scripts
//! - `diagnostics`: info window, warnings and crash guard
//! - `persist`: Praat text files and collections
//! - `praat`: the session tying it together
//! - `tooling`: build and documentation helpers for packaging

// Module declarations
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod interpreter;
pub mod objects;
pub mod persist;
pub mod praat;
pub mod resources;
pub mod tooling;
pub mod value;

// Analysis engine
pub mod formant;
pub mod harmonicity;
pub mod intensity;
pub mod matrix;
pub mod pitch;
pub mod point_process;
pub mod sampled;
pub mod sound;
pub mod spectrogram;
pub mod spectrum;
pub mod textgrid;

// WASM bindings (enabled with "wasm" feature)
#[cfg(feature = "wasm")]
pub mod wasm;

// Python bindings (enabled with "python" feature)
#[cfg(feature = "python")]
pub mod python;

// Re-export main types at crate root for convenient access
//
// Users can import the most common types directly:
//   use praatfan_bridge::{Praat, Value, Outcome};
//
// Or import from specific modules for less common types:
//   use praatfan_bridge::interpreter::Script;

/// Error types for praatfan-bridge operations.
pub use error::{Error, Result};

/// The session and its call/run options.
pub use praat::{CallOptions, Praat, RunOptions, RunResult};

/// Argument and result kinds.
pub use value::{Outcome, ReturnKind, Value};

/// Objects as the host holds them.
pub use objects::{Class, Handle, Object, Thing};

/// Diagnostics: warning policy and recorded warnings.
pub use diagnostics::{Melder, SharedBuffer, Warning, WarningPolicy};

/// Configuration and fixture lookup.
pub use config::Config;
pub use resources::Resources;

/// Engine object types.
pub use formant::Formant;
pub use harmonicity::Harmonicity;
pub use intensity::Intensity;
pub use matrix::Matrix;
pub use pitch::Pitch;
pub use point_process::PointProcess;
pub use sound::Sound;
pub use spectrogram::Spectrogram;
pub use spectrum::Spectrum;
pub use textgrid::TextGrid;
