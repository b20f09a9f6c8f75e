//! WASM bindings for praatfan_bridge.
//!
//! A [`Session`] wraps one [`Praat`] session for JavaScript. Objects are
//! referred to by small integer ids handed out by the session.
//!
//! # Usage from JavaScript
//!
//! ```javascript
//! import init, { Session } from './pkg/praatfan_bridge.js';
//!
//! await init();
//!
//! const session = new Session();
//! const bytes = new Uint8Array(await (await fetch('a.wav')).arrayBuffer());
//! const sound = session.read_wav(bytes);
//! const n = session.call_number([sound], "Get number of samples", []);
//! const output = session.run([sound], "writeInfo: Get sampling frequency");
//! ```
//!
//! # Building for WASM
//!
//! ```bash
//! wasm-pack build --target web --features wasm
//! ```

use std::io::Cursor;

use wasm_bindgen::prelude::*;

use crate::objects::{Handle, Thing};
use crate::praat::{Praat, RunOptions};
use crate::sound::Sound;
use crate::value::Value;

/// Initialize the WASM module.
///
/// This sets up panic hooks for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

fn js_error(e: crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// An engine session usable from JavaScript.
#[wasm_bindgen]
pub struct Session {
    praat: Praat,
    handles: Vec<Handle>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    fn id(&mut self, handle: Handle) -> u32 {
        self.handles.push(handle);
        (self.handles.len() - 1) as u32
    }

    fn handles(&self, ids: &[u32]) -> Result<Vec<Handle>, JsValue> {
        ids.iter()
            .map(|&id| {
                self.handles
                    .get(id as usize)
                    .copied()
                    .ok_or_else(|| JsValue::from_str(&format!("Unknown object id {}.", id)))
            })
            .collect()
    }
}

#[wasm_bindgen]
impl Session {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Session {
        Session {
            praat: Praat::new(),
            handles: Vec::new(),
        }
    }

    /// Load a WAV file from its bytes; returns the object id.
    pub fn read_wav(&mut self, bytes: &[u8], name: Option<String>) -> Result<u32, JsValue> {
        let sound = Sound::from_reader(Cursor::new(bytes.to_vec())).map_err(js_error)?;
        let handle = self.praat.insert(Thing::new(sound, name.as_deref()));
        Ok(self.id(handle))
    }

    /// Create a Sound from raw samples; returns the object id.
    pub fn sound_from_samples(&mut self, samples: &[f64], sample_rate: f64) -> u32 {
        let handle = self.praat.insert(Thing::new(Sound::from_slice(samples, sample_rate), None));
        self.id(handle)
    }

    /// Run a command with numeric arguments and read its result as a number.
    pub fn call_number(&mut self, objects: &[u32], command: &str, args: &[f64]) -> Result<f64, JsValue> {
        let handles = self.handles(objects)?;
        let args: Vec<Value> = args.iter().map(|&x| Value::Number(x)).collect();
        let outcome = self.praat.call(&handles, command, &args).map_err(js_error)?;
        outcome.as_number().map_err(js_error)
    }

    /// Run a command and return what it wrote to the info window.
    pub fn call_text(&mut self, objects: &[u32], command: &str) -> Result<String, JsValue> {
        let handles = self.handles(objects)?;
        let options = crate::praat::CallOptions { return_string: true };
        let outcome = self
            .praat
            .call_with(&handles, command, &[], &options)
            .map_err(js_error)?;
        Ok(outcome.as_text().map_err(js_error)?.to_string())
    }

    /// Run a script and return its captured info output.
    pub fn run(&mut self, objects: &[u32], script: &str) -> Result<String, JsValue> {
        let handles = self.handles(objects)?;
        let options = RunOptions {
            capture_output: true,
            ..RunOptions::default()
        };
        let result = self
            .praat
            .run_with(&handles, script, &[], &options)
            .map_err(js_error)?;
        for handle in result.objects {
            if !self.handles.contains(&handle) {
                self.id(handle);
            }
        }
        Ok(result.output.unwrap_or_default())
    }

    /// Warnings recorded since the last call, one per line.
    pub fn take_warnings(&mut self) -> String {
        self.praat
            .take_warnings()
            .iter()
            .map(|w| w.message().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
