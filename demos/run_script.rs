//! Run a Praat script file on a set of sound files
//!
//! Usage: cargo run --example run_script -- script.praat [a.wav b.wav ...]
//!
//! Set RUST_LOG=debug to see each dispatched command.

use praatfan_bridge::{Praat, RunOptions};

fn main() {
    env_logger::init();

    let mut arguments = std::env::args().skip(1);
    let Some(script) = arguments.next() else {
        eprintln!("usage: run_script <script.praat> [sound files...]");
        std::process::exit(2);
    };

    let mut praat = match Praat::from_env() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut objects = Vec::new();
    for path in arguments {
        match praat.read(&path) {
            Ok(handle) => {
                println!("Read {}", praat.full_name(handle).unwrap());
                objects.push(handle);
            }
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }

    let options = RunOptions {
        use_defaults: true,
        capture_output: true,
        ..RunOptions::default()
    };
    match praat.run_file(&objects, &script, &[], &options) {
        Ok(result) => {
            print!("{}", result.output.unwrap_or_default());
            println!("\n{} object(s) selected at the end:", result.objects.len());
            for handle in result.objects {
                println!("  {}", praat.full_name(handle).unwrap());
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    for warning in praat.take_warnings() {
        eprintln!("Warning: {}", warning);
    }
}
