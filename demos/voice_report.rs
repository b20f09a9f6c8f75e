//! Print pitch, jitter and shimmer for a WAV file
//!
//! Usage: cargo run --example voice_report -- voice.wav
//!
//! Without an argument, a synthetic 150 Hz pulse train is analyzed.

use praatfan_bridge::{args, Praat, Sound, Thing};
use std::time::Instant;

fn synthetic_voice() -> Sound {
    let rate = 44100.0;
    let samples: Vec<f64> = (0..44100)
        .map(|i| {
            let t = i as f64 / rate;
            let phase = (t * 150.0).fract();
            0.4 * (-phase * 12.0).exp() * (2.0 * std::f64::consts::PI * 600.0 * t).sin()
        })
        .collect();
    Sound::from_slice(&samples, rate)
}

fn main() {
    env_logger::init();

    let mut praat = Praat::new();
    let sound = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading: {}", path);
            praat.read(&path).unwrap()
        }
        None => {
            println!("Analyzing a synthetic voice");
            praat.insert(Thing::new(synthetic_voice(), Some("synthetic")))
        }
    };

    let duration = praat.call(&[sound], "Get total duration", &[]).unwrap().as_number().unwrap();
    println!("Duration: {:.3} s", duration);

    let start = Instant::now();
    let pitch = praat
        .call(&[sound], "To Pitch", &args![0.0, 75.0, 600.0])
        .unwrap()
        .as_object()
        .unwrap();
    let pulses = praat
        .call(&[sound, pitch], "To PointProcess (cc)", &[])
        .unwrap()
        .as_object()
        .unwrap();
    println!("Analysis done in {:.2?}", start.elapsed());

    let mean = praat.call(&[pitch], "Get mean", &args![0.0, 0.0, "Hertz"]).unwrap().as_number().unwrap();
    let periods = praat.call(&[pulses], "Get number of periods", &[]).unwrap().as_number().unwrap();
    let jitter = praat.call(&[pulses], "Get jitter (local)", &[]).unwrap().as_number().unwrap();
    let shimmer = praat.call(&[pulses, sound], "Get shimmer (local)", &[]).unwrap().as_number().unwrap();

    println!("Mean F0:  {:.1} Hz", mean);
    println!("Periods:  {}", periods);
    println!("Jitter:   {:.3} %", jitter * 100.0);
    println!("Shimmer:  {:.3} %", shimmer * 100.0);

    for warning in praat.take_warnings() {
        println!("Warning: {}", warning);
    }
}
