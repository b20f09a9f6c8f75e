//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::f64::consts::PI;

use praatfan_bridge::{Config, Handle, Melder, Praat, SharedBuffer, Sound, Thing};

/// A session whose console and casual streams are captured in memory.
pub struct Session {
    pub praat: Praat,
    pub console: SharedBuffer,
    pub casual: SharedBuffer,
}

pub fn session() -> Session {
    let console = SharedBuffer::new();
    let casual = SharedBuffer::new();
    let melder = Melder::new(Box::new(console.clone()), Box::new(casual.clone()));
    let config = Config {
        seed: Some(42),
        ..Config::default()
    };
    Session {
        praat: Praat::with_melder(config, melder),
        console,
        casual,
    }
}

/// Half a second of a 200 Hz sine at 16 kHz.
pub fn tone_sound() -> Sound {
    let rate = 16000.0;
    let samples: Vec<f64> = (0..8000)
        .map(|i| 0.5 * (2.0 * PI * 200.0 * i as f64 / rate).sin())
        .collect();
    Sound::from_slice(&samples, rate)
}

pub fn tone(praat: &mut Praat) -> Handle {
    praat.insert(Thing::new(tone_sound(), Some("tone")))
}
