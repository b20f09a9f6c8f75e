//! Session-level behavior: calls, object lifetimes, warnings and files.

mod common;

use ndarray::array;
use praatfan_bridge::{args, CallOptions, Error, Outcome, Praat, Resources, Value, WarningPolicy};

use common::{session, tone};

#[test]
fn pitch_of_a_tone_through_calls() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    let pitch = s
        .praat
        .call(&[sound], "To Pitch", &args![0.0, 75.0, 600.0])
        .unwrap()
        .as_object()
        .unwrap();
    assert_eq!(s.praat.full_name(pitch).unwrap(), "Pitch \"tone\"");

    let mean = s.praat.call(&[pitch], "Get mean", &args![0.0, 0.0, "Hertz"]).unwrap().as_number().unwrap();
    assert!((mean - 200.0).abs() < 2.0, "mean pitch {}", mean);

    let voiced = s.praat.call(&[pitch], "Get number of voiced frames", &[]).unwrap();
    assert!(matches!(voiced, Outcome::Integer(n) if n > 0));
}

#[test]
fn spectrum_harmonicity_and_formants_of_a_tone() {
    let mut s = session();
    let sound = tone(&mut s.praat);

    let spectrum = s.praat.call(&[sound], "To Spectrum", &args![false]).unwrap().as_object().unwrap();
    assert_eq!(s.praat.full_name(spectrum).unwrap(), "Spectrum \"tone\"");
    let cog = s
        .praat
        .call(&[spectrum], "Get centre of gravity", &args![2.0])
        .unwrap()
        .as_number()
        .unwrap();
    assert!((cog - 200.0).abs() < 1.0, "centre of gravity {}", cog);

    let harmonicity = s
        .praat
        .call(&[sound], "To Harmonicity (cc)", &args![0.01, 75.0, 0.1, 1.0])
        .unwrap()
        .as_object()
        .unwrap();
    let hnr = s.praat.call(&[harmonicity], "Get mean", &args![0.0, 0.0]).unwrap().as_number().unwrap();
    assert!(hnr > 20.0, "HNR {}", hnr);

    let formant = s
        .praat
        .call(&[sound], "To Formant (burg)", &args![0.0, 5.0, 5500.0, 0.025, 50.0])
        .unwrap()
        .as_object()
        .unwrap();
    let frames = s.praat.call(&[formant], "Get number of frames", &[]).unwrap();
    assert!(matches!(frames, Outcome::Integer(n) if n > 10), "{:?}", frames);
    let err = s.praat.call(&[formant], "Get number of formants", &args![1000]).unwrap_err();
    assert!(err.to_string().starts_with("Frame number 1000 is not in the range 1 to "));
}

#[test]
fn unavailable_command_names_the_command() {
    let mut s = session();
    let err = s.praat.call(&[], "Get number of samples", &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Command \"Get number of samples\" not available for given objects."
    );
}

#[test]
fn objects_survive_a_failed_call() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    assert!(s.praat.call(&[sound], "Extract part", &args![0.0, 0.1, "no such window"]).is_err());
    assert_eq!(s.praat.objects().len(), 1);
    let n = s.praat.call(&[sound], "Get number of samples", &[]).unwrap();
    assert_eq!(n, Outcome::Integer(8000));
}

#[test]
fn info_commands_return_their_text() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    let options = CallOptions { return_string: true };
    let text = s.praat.call_with(&[sound], "Get number of samples", &[], &options).unwrap();
    assert_eq!(text, Outcome::Text("8000 samples\n".into()));
    // Intercepted output never reaches the console
    assert_eq!(s.console.contents(), "");
}

#[test]
fn misaligned_pitch_comparison_goes_to_casual_output() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    let a = s.praat.call(&[sound], "To Pitch", &args![0.01, 75.0, 600.0]).unwrap().as_object().unwrap();
    let b = s.praat.call(&[sound], "To Pitch", &args![0.02, 75.0, 600.0]).unwrap().as_object().unwrap();
    let outcome = s.praat.call(&[a, b], "Count differences", &[]).unwrap();
    assert!(outcome.is_none());
    assert_eq!(s.casual.contents(), "Pitch_difference: these Pitches are not aligned.\n");
}

const EMPTY_EXTRACTION: &str = "\
tg = Create TextGrid: 0, 1, \"words\", \"\"
snd = Create Sound from formula: \"silence\", 1, 0, 1, 1000, \"0\"
selectObject: tg, snd
Extract non-empty intervals: 1, \"no\"
";

#[test]
fn warnings_are_collected_one_per_occurrence() {
    let mut s = session();
    let script = format!("{0}{0}{0}", EMPTY_EXTRACTION);
    s.praat.run(&[], &script, &[]).unwrap();
    let warnings = s.praat.take_warnings();
    assert_eq!(warnings.len(), 3);
    assert!(warnings.iter().all(|w| w.message() == "No non-empty intervals were found."));
    assert!(s.praat.warnings().is_empty());
}

#[test]
fn error_policy_promotes_warnings() {
    let mut s = session();
    s.praat.set_warning_policy(WarningPolicy::Error);
    let err = s.praat.run(&[], EMPTY_EXTRACTION, &[]).unwrap_err();
    assert!(matches!(err, Error::Warning(_)));
    assert!(err.to_string().starts_with("No non-empty intervals were found.\n"));
    assert!(s.praat.warnings().is_empty());
}

#[test]
fn ignore_policy_drops_warnings() {
    let mut s = session();
    s.praat.set_warning_policy(WarningPolicy::Ignore);
    s.praat.run(&[], EMPTY_EXTRACTION, &[]).unwrap();
    assert!(s.praat.warnings().is_empty());
}

#[test]
fn clipping_warning_when_saving_loud_sound() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    s.praat.call(&[sound], "Multiply", &args![4.0]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loud.wav");
    s.praat
        .call(&[sound], "Save as WAV file", &[Value::String(path.display().to_string())])
        .unwrap();
    let warnings = s.praat.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0]
        .message()
        .starts_with("Writing samples to audio file:"));
    assert!(warnings[0].message().ends_with("Advice: you could scale the amplitude down."));
}

#[test]
fn reading_missing_and_unknown_files() {
    let mut s = session();
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.wav");
    let err = s.praat.read(&missing).unwrap_err();
    assert_eq!(err.to_string(), format!("Cannot open file “{}”.", missing.display()));

    let junk = dir.path().join("junk.xyz");
    std::fs::write(&junk, b"definitely not audio").unwrap();
    let err = s.praat.read(&junk).unwrap_err();
    assert_eq!(err.to_string(), format!("File “{}” not recognized.", junk.display()));
}

#[test]
fn wav_and_text_files_round_trip() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    let dir = tempfile::tempdir().unwrap();

    let wav = dir.path().join("tone.wav");
    s.praat.call(&[sound], "Save as WAV file", &[Value::String(wav.display().to_string())]).unwrap();
    let again = s.praat.read(&wav).unwrap();
    assert_eq!(s.praat.full_name(again).unwrap(), "Sound \"tone\"");
    let n = s.praat.call(&[again], "Get number of samples", &[]).unwrap();
    assert_eq!(n, Outcome::Integer(8000));

    let pitch = s.praat.call(&[sound], "To Pitch", &args![0.0, 75.0, 600.0]).unwrap().as_object().unwrap();
    let both = dir.path().join("both.Collection");
    s.praat.save(&[sound, pitch], &both).unwrap();
    let read = s.praat.read_all(&both).unwrap();
    let names: Vec<String> = read.iter().map(|&h| s.praat.full_name(h).unwrap()).collect();
    assert_eq!(names, vec!["Sound \"tone\"", "Pitch \"tone\""]);
}

#[test]
fn removed_objects_are_gone() {
    let mut praat = Praat::with_config(Default::default());
    let sound = tone(&mut praat);
    praat.remove(sound).unwrap();
    assert!(praat.get(sound).is_err());
    assert!(praat.call(&[sound], "Get number of samples", &[]).is_err());
}

fn fixtures() -> Resources {
    Resources::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests"))
}

#[test]
fn praat_written_intensity_file() {
    let mut s = session();
    let intensity = s.praat.read(fixtures().path("tone.Intensity")).unwrap();
    assert_eq!(s.praat.full_name(intensity).unwrap(), "Intensity \"tone\"");

    let values = s.praat.call(&[intensity], "Get values", &[]).unwrap();
    assert_eq!(values, Outcome::Vector(array![58.25, 64.5, 61.75]));
    let times = s.praat.call(&[intensity], "List frame times", &[]).unwrap();
    match times {
        Outcome::Vector(t) => {
            assert_eq!(t.len(), 3);
            assert!((t[0] - 0.03).abs() < 1e-12 && (t[2] - 0.07).abs() < 1e-12);
        }
        other => panic!("unexpected {:?}", other),
    }
    let max = s.praat.call(&[intensity], "Get maximum", &args![0.0, 0.0, "none"]).unwrap();
    assert_eq!(max, Outcome::Number(64.5));
}

#[test]
fn praat_written_pitch_file() {
    let mut s = session();
    let pitch = s.praat.read(fixtures().path("tone.Pitch")).unwrap();
    let voiced = s.praat.call(&[pitch], "Get number of voiced frames", &[]).unwrap();
    assert_eq!(voiced, Outcome::Integer(2));
    let mean = s.praat.call(&[pitch], "Get mean", &args![0.0, 0.0, "Hertz"]).unwrap();
    assert_eq!(mean, Outcome::Number(205.0));
}
