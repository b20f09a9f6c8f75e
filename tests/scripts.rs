//! Scripts run through a session.

mod common;

use praatfan_bridge::{args, Outcome, RunOptions, Value};

use common::{session, tone};

fn captured() -> RunOptions {
    RunOptions {
        capture_output: true,
        ..RunOptions::default()
    }
}

const FORM: &str = "\
form Greeting
    positive Frequency 440
    sentence Greeting hello
endform
writeInfo: greeting$, \" at \", frequency
";

#[test]
fn form_fields_take_arguments_in_order() {
    let mut s = session();
    let options = RunOptions {
        return_variables: true,
        ..captured()
    };
    let result = s.praat.run_with(&[], FORM, &args![220.0, "hi"], &options).unwrap();
    assert_eq!(result.output.as_deref(), Some("hi at 220"));
    let variables = result.variables.unwrap();
    assert_eq!(variables.get("frequency"), Some(&Value::Number(220.0)));
    assert_eq!(variables.get("greeting$"), Some(&Value::String("hi".into())));
}

#[test]
fn form_defaults_on_request() {
    let mut s = session();
    let options = RunOptions {
        use_defaults: true,
        ..captured()
    };
    let result = s.praat.run_with(&[], FORM, &[], &options).unwrap();
    assert_eq!(result.output.as_deref(), Some("hello at 440"));

    let err = s.praat.run_with(&[], FORM, &[], &captured()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Found 0 arguments but expected more.\nScript not completed."
    );
}

#[test]
fn arguments_without_a_form_are_rejected() {
    let mut s = session();
    let err = s.praat.run(&[], "a = 1", &args![1.0, 2.0, 3.0]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Found 3 arguments but expected only 0.\nScript not completed."
    );
}

#[test]
fn positive_field_rejects_zero() {
    let mut s = session();
    assert!(s.praat.run(&[], FORM, &args![0.0, "hi"]).is_err());
}

#[test]
fn intercepted_command_text_stays_out_of_captured_output() {
    let mut s = session();
    let script = "\
appendInfoLine: \"BEFORE\"
ignore$ = Report system properties
appendInfoLine: \"AFTER\"
";
    let result = s.praat.run_with(&[], script, &[], &captured()).unwrap();
    assert_eq!(result.output.as_deref(), Some("BEFORE\nAFTER\n"));
    assert_eq!(s.console.contents(), "");
}

#[test]
fn uncaptured_output_goes_to_the_console() {
    let mut s = session();
    let result = s.praat.run(&[], "writeInfoLine: \"to the console\"", &[]).unwrap();
    assert_eq!(result.output, None);
    assert_eq!(s.console.contents(), "to the console\n");
}

#[test]
fn selection_at_the_end_is_returned() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    let script = "\
n = Get number of samples
Extract part: 0, 0.25, \"rectangular\", 1, \"no\"
Rename: \"half\"
";
    let result = s.praat.run(&[sound], script, &[]).unwrap();
    assert_eq!(result.objects.len(), 1);
    assert_eq!(s.praat.full_name(result.objects[0]).unwrap(), "Sound \"half\"");
    let n = s.praat.call(&result.objects, "Get number of samples", &[]).unwrap();
    assert_eq!(n, Outcome::Integer(4000));
    assert_eq!(s.praat.objects().len(), 2);
}

#[test]
fn extra_objects_can_be_selected_by_name() {
    let mut s = session();
    let a = tone(&mut s.praat);
    let b = s
        .praat
        .call(&[a], "Extract part", &args![0.0, 0.1, "rectangular", 1.0, false])
        .unwrap()
        .as_object()
        .unwrap();
    let options = RunOptions {
        extra_objects: vec![b],
        ..captured()
    };
    let result = s
        .praat
        .run_with(&[a], "selectObject: \"Sound tone_part\"\nn$ = Get number of samples\nwriteInfo: n$", &[], &options)
        .unwrap();
    assert_eq!(result.objects, vec![b]);
    assert_eq!(result.output.as_deref(), Some("1600 samples"));
}

#[test]
fn failing_line_is_quoted_in_the_error() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    let err = s
        .praat
        .run(&[sound], "x = 1\nGet mean: 0, 0, \"Hertz\"\n", &[])
        .unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Command \"Get mean\" not available for given objects.\n"));
    assert!(message.contains("Script line 2 not performed or completed:\n« Get mean: 0, 0, \"Hertz\" »"));
    assert!(message.ends_with("Script not completed."));
    // The sound is still usable
    assert!(s.praat.call(&[sound], "Get number of samples", &[]).is_ok());
}

#[test]
fn numeric_results_become_script_values() {
    let mut s = session();
    let sound = tone(&mut s.praat);
    let options = RunOptions {
        return_variables: true,
        ..RunOptions::default()
    };
    let script = "\
rate = Get sampling frequency
values## = List values
";
    let result = s.praat.run_with(&[sound], script, &[], &options).unwrap();
    let variables = result.variables.unwrap();
    assert_eq!(variables.get("rate"), Some(&Value::Number(16000.0)));
    match variables.get("values##") {
        Some(Value::Matrix(m)) => assert_eq!(m.dim(), (1, 8000)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn script_files_run_in_their_own_folder() {
    let mut s = session();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("helper.praat"), "name$ = \"beep\"\n").unwrap();
    std::fs::write(
        dir.path().join("main.praat"),
        "include helper.praat\n\
         Create Sound from formula: name$, 1, 0, 0.1, 8000, \"0.1\"\n\
         Save as WAV file: \"beep.wav\"\n\
         removeObject: 1\n",
    )
    .unwrap();

    let result = s
        .praat
        .run_file(&[], dir.path().join("main.praat"), &[], &RunOptions::default())
        .unwrap();
    assert!(result.objects.is_empty());
    assert!(dir.path().join("beep.wav").exists());
    assert!(s.praat.objects().is_empty());
}

#[test]
fn missing_script_file() {
    let mut s = session();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nowhere.praat");
    let err = s.praat.run_file(&[], &path, &[], &RunOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Cannot open file “{}”.\nScript not completed.", path.display())
    );
}
