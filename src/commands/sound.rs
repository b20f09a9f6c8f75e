//! Sound commands: queries, modifications and conversions.

use super::decl::*;
use super::{Args, Command, Cx, Payload};
use crate::error::Result;
use crate::objects::{Class, Thing};
use crate::pitch::{sound_to_pitch, PitchMethod, PitchSettings};
use crate::sound::{PeakInterpolation, Sound, WindowShape};
use crate::spectrogram::{sound_to_spectrogram_with_shape, WindowShape as SpectralWindow};

const INTERPOLATIONS: &[&str] = &["none", "parabolic", "cubic", "sinc70", "sinc700"];
const WINDOWS: &[&str] = &["rectangular", "triangular", "parabolic", "Hanning", "Hamming"];
const SPECTRAL_WINDOWS: &[&str] = &["Gaussian", "Hanning"];

fn time_range() -> [super::Param; 2] {
    [real("Start time (s)", "0.0"), real("End time (s)", "0.0 (= all)")]
}

fn harmonicity_params(periods_default: &'static str) -> Vec<super::Param> {
    vec![
        positive("Time step (s)", "0.01"),
        positive("Minimum pitch (Hz)", "75.0"),
        real("Silence threshold", "0.1"),
        positive("Periods per window", periods_default),
    ]
}

fn pitch_params(ceiling_default: &'static str) -> Vec<super::Param> {
    vec![
        real("Time step (s)", "0.0 (= auto)"),
        positive("Pitch floor (Hz)", "75.0"),
        natural("Max. number of candidates", "15"),
        boolean("Very accurate", false),
        real("Silence threshold", "0.03"),
        real("Voicing threshold", "0.45"),
        real("Octave cost", "0.01"),
        real("Octave-jump cost", "0.35"),
        real("Voiced / unvoiced cost", "0.14"),
        positive("Pitch ceiling (Hz)", ceiling_default),
    ]
}

pub(super) fn register(commands: &mut Vec<Command>) {
    let sound = || one(Class::Sound);

    // Queries
    commands.push(command(
        "Get number of samples",
        sound(),
        "INTEGER_Sound_getNumberOfSamples",
        vec![],
        get_number_of_samples,
    ));
    commands.push(command(
        "Get sampling frequency",
        sound(),
        "REAL_Sound_getSamplingFrequency",
        vec![],
        get_sampling_frequency,
    ));
    commands.push(command(
        "Get number of channels",
        sound(),
        "INTEGER_Sound_getNumberOfChannels",
        vec![],
        get_number_of_channels,
    ));
    commands.push(command(
        "Get root-mean-square",
        sound(),
        "REAL_Sound_getRootMeanSquare",
        time_range().to_vec(),
        get_root_mean_square,
    ));
    commands.push(command(
        "Get energy",
        sound(),
        "REAL_Sound_getEnergy",
        time_range().to_vec(),
        get_energy,
    ));
    let [start, end] = time_range();
    commands.push(command(
        "Get maximum",
        sound(),
        "REAL_Sound_getMaximum",
        vec![start, end, choice("Interpolation", INTERPOLATIONS, "sinc70")],
        get_maximum,
    ));
    commands.push(command(
        "Get minimum",
        sound(),
        "REAL_Sound_getMinimum",
        vec![start, end, choice("Interpolation", INTERPOLATIONS, "sinc70")],
        get_minimum,
    ));
    commands.push(command(
        "Get value at sample number",
        sound(),
        "REAL_Sound_getValueAtSample",
        vec![integer("Channel", "1"), natural("Sample number", "100")],
        get_value_at_sample,
    ));
    commands.push(command(
        "Get Fourier coefficient",
        sound(),
        "COMPLEX_Sound_getFourierCoefficient",
        vec![real("Frequency (Hz)", "100.0")],
        get_fourier_coefficient,
    ));
    commands.push(command("List values", sound(), "NUMMAT_Sound_listValues", vec![], list_values));

    // Modifications
    commands.push(command(
        "Scale peak",
        sound(),
        "MODIFY_Sound_scalePeak",
        vec![positive("New absolute peak", "0.99")],
        scale_peak,
    ));
    commands.push(command(
        "Multiply",
        sound(),
        "MODIFY_Sound_multiply",
        vec![real("Multiplication factor", "1.5")],
        multiply,
    ));
    commands.push(command(
        "Save as WAV file",
        sound(),
        "SAVE_Sound_saveAsWavFile",
        vec![required(text("File name", ""))],
        save_as_wav_file,
    ));

    // Conversions
    commands.push(command(
        "Extract part",
        sound(),
        "NEW_Sound_extractPart",
        vec![
            real("Start time (s)", "0.0"),
            real("End time (s)", "0.1"),
            choice("Window shape", WINDOWS, "rectangular"),
            positive("Relative width", "1.0"),
            boolean("Preserve times", false),
        ],
        extract_part,
    ));
    commands.push(command(
        "Extract one channel",
        sound(),
        "NEW_Sound_extractChannel",
        vec![natural("Channel", "1")],
        extract_one_channel,
    ));
    commands.push(command("Convert to mono", sound(), "NEW_Sound_convertToMono", vec![], convert_to_mono));
    commands.push(command(
        "To Intensity",
        sound(),
        "NEW_Sound_to_Intensity",
        vec![
            positive("Minimum pitch (Hz)", "100.0"),
            real("Time step (s)", "0.0 (= auto)"),
            boolean("Subtract mean", true),
        ],
        to_intensity,
    ));
    commands.push(command(
        "To Pitch",
        sound(),
        "NEW_Sound_to_Pitch",
        vec![
            real("Time step (s)", "0.0 (= auto)"),
            positive("Pitch floor (Hz)", "75.0"),
            positive("Pitch ceiling (Hz)", "600.0"),
        ],
        to_pitch,
    ));
    commands.push(command(
        "To Pitch (ac)",
        sound(),
        "NEW_Sound_to_Pitch_ac",
        pitch_params("600.0"),
        to_pitch_ac,
    ));
    commands.push(command(
        "To Pitch (cc)",
        sound(),
        "NEW_Sound_to_Pitch_cc",
        pitch_params("600.0"),
        to_pitch_cc,
    ));
    commands.push(command(
        "To Spectrogram",
        sound(),
        "NEW_Sound_to_Spectrogram",
        vec![
            positive("Window length (s)", "0.005"),
            positive("Maximum frequency (Hz)", "5000.0"),
            positive("Time step (s)", "0.002"),
            positive("Frequency step (Hz)", "20.0"),
            choice("Window shape", SPECTRAL_WINDOWS, "Gaussian"),
        ],
        to_spectrogram,
    ));
    commands.push(command(
        "To Formant (burg)",
        sound(),
        "NEW_Sound_to_Formant_burg",
        vec![
            real("Time step (s)", "0.0 (= auto)"),
            positive("Max. number of formants", "5.0"),
            positive("Formant ceiling (Hz)", "5500.0"),
            positive("Window length (s)", "0.025"),
            positive("Pre-emphasis from (Hz)", "50.0"),
        ],
        to_formant_burg,
    ));
    commands.push(command(
        "To Harmonicity (cc)",
        sound(),
        "NEW_Sound_to_Harmonicity_cc",
        harmonicity_params("1.0"),
        to_harmonicity_cc,
    ));
    commands.push(command(
        "To Harmonicity (ac)",
        sound(),
        "NEW_Sound_to_Harmonicity_ac",
        harmonicity_params("4.5"),
        to_harmonicity_ac,
    ));
    commands.push(command(
        "To Spectrum",
        sound(),
        "NEW_Sound_to_Spectrum",
        vec![boolean("Fast", true)],
        to_spectrum,
    ));
    commands.push(command(
        "To TextGrid",
        sound(),
        "NEW_Sound_to_TextGrid",
        vec![
            sentence("All tier names", "Mary John bell"),
            sentence("Which of these are point tiers?", "bell"),
        ],
        to_textgrid,
    ));
    commands.push(command(
        "To PointProcess (periodic, cc)",
        sound(),
        "NEW_Sound_to_PointProcess_periodic_cc",
        vec![positive("Pitch floor (Hz)", "75.0"), positive("Pitch ceiling (Hz)", "600.0")],
        to_point_process_periodic_cc,
    ));
    commands.push(command(
        "To PointProcess (periodic, peaks)",
        sound(),
        "NEW_Sound_to_PointProcess_periodic_peaks",
        vec![
            positive("Pitch floor (Hz)", "75.0"),
            positive("Pitch ceiling (Hz)", "600.0"),
            boolean("Include maxima", true),
            boolean("Include minima", false),
        ],
        to_point_process_periodic_peaks,
    ));
    commands.push(command(
        "To PointProcess (extrema)",
        sound(),
        "NEW_Sound_to_PointProcess_extrema",
        vec![
            natural("Channel", "1"),
            boolean("Include maxima", true),
            boolean("Include minima", false),
            choice("Interpolation", INTERPOLATIONS, "sinc70"),
        ],
        to_point_process_extrema,
    ));
}

/// The new object gets the Sound's name, or `untitled`.
fn derived(cx: &Cx<'_>, object: impl Into<crate::objects::Object>, suffix: &str) -> Result<Payload> {
    let name = cx.name_of::<Sound>()?.unwrap_or_else(|| "untitled".to_string());
    Ok(Payload::Objects(vec![Thing::new(object, Some(&format!("{}{}", name, suffix)))]))
}

// ========== Queries ==========

fn get_number_of_samples(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<Sound>()?.n_samples();
    cx.integer(n as i64, "samples")
}

fn get_sampling_frequency(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let rate = cx.one::<Sound>()?.sample_rate();
    cx.real(rate, "Hz")
}

fn get_number_of_channels(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<Sound>()?.n_channels();
    cx.integer(n as i64, if n == 1 { "channel" } else { "channels" })
}

fn get_root_mean_square(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let rms = cx.one::<Sound>()?.rms(args.real(0)?, args.real(1)?);
    cx.real(rms, "Pascal")
}

fn get_energy(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let energy = cx.one::<Sound>()?.energy(args.real(0)?, args.real(1)?);
    cx.real(energy, "Pa2 sec")
}

fn get_maximum(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let interpolation: PeakInterpolation = args.text(2)?.parse()?;
    let max = cx.one::<Sound>()?.maximum(args.real(0)?, args.real(1)?, interpolation);
    cx.real(max, "Pascal")
}

fn get_minimum(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let interpolation: PeakInterpolation = args.text(2)?.parse()?;
    let min = cx.one::<Sound>()?.minimum(args.real(0)?, args.real(1)?, interpolation);
    cx.real(min, "Pascal")
}

fn get_value_at_sample(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let value = cx.one::<Sound>()?.value_at_sample(args.index(1)?, args.index(0)?);
    cx.real(value, "Pascal")
}

fn get_fourier_coefficient(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let z = cx.one::<Sound>()?.fourier_coefficient(args.real(0)?);
    cx.complex(z)
}

fn list_values(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::Matrix(cx.one::<Sound>()?.values().clone()))
}

// ========== Modifications ==========

fn scale_peak(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<Sound>()?.scale_peak(args.real(0)?);
    Ok(Payload::None)
}

fn multiply(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<Sound>()?.multiply(args.real(0)?);
    Ok(Payload::None)
}

fn save_as_wav_file(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let sound = cx.one::<Sound>()?;
    let total = sound.n_samples() * sound.n_channels();
    let clipped = sound.save_wav(args.text(0)?)?;
    if clipped > 0 {
        cx.melder.warn(format!(
            "Writing samples to audio file: {} out of {} samples have been clipped.\nAdvice: you could scale the amplitude down.",
            clipped, total
        ))?;
    }
    Ok(Payload::None)
}

// ========== Conversions ==========

fn extract_part(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let window: WindowShape = args.text(2)?.parse()?;
    let part = cx.one::<Sound>()?.extract_part(
        args.real(0)?,
        args.real(1)?,
        window,
        args.real(3)?,
        args.boolean(4)?,
    )?;
    derived(cx, part, "_part")
}

fn extract_one_channel(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let channel = args.index(0)?;
    let extracted = cx.one::<Sound>()?.extract_channel(channel)?;
    derived(cx, extracted, &format!("_ch{}", channel))
}

fn convert_to_mono(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let mono = cx.one::<Sound>()?.convert_to_mono();
    derived(cx, mono, "_mono")
}

fn to_intensity(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let intensity = cx
        .one::<Sound>()?
        .to_intensity(args.real(0)?, args.real(1)?, args.boolean(2)?);
    derived(cx, intensity, "")
}

fn to_pitch(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let pitch = cx.one::<Sound>()?.to_pitch_ac(args.real(0)?, args.real(1)?, args.real(2)?);
    derived(cx, pitch, "")
}

fn pitch_settings(args: &Args) -> Result<PitchSettings> {
    Ok(PitchSettings {
        time_step: args.real(0)?,
        pitch_floor: args.real(1)?,
        max_candidates: args.index(2)?,
        very_accurate: args.boolean(3)?,
        silence_threshold: args.real(4)?,
        voicing_threshold: args.real(5)?,
        octave_cost: args.real(6)?,
        octave_jump_cost: args.real(7)?,
        voiced_unvoiced_cost: args.real(8)?,
        pitch_ceiling: args.real(9)?,
    })
}

fn to_pitch_ac(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let settings = pitch_settings(args)?;
    let pitch = sound_to_pitch(cx.one::<Sound>()?, PitchMethod::Ac, &settings);
    derived(cx, pitch, "")
}

fn to_pitch_cc(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let settings = pitch_settings(args)?;
    let pitch = sound_to_pitch(cx.one::<Sound>()?, PitchMethod::Cc, &settings);
    derived(cx, pitch, "")
}

fn to_spectrogram(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let window: SpectralWindow = args.text(4)?.parse()?;
    let spectrogram = sound_to_spectrogram_with_shape(
        cx.one::<Sound>()?,
        args.real(0)?,
        args.real(1)?,
        args.real(2)?,
        args.real(3)?,
        window,
    );
    derived(cx, spectrogram, "")
}

fn to_formant_burg(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let formant = cx.one::<Sound>()?.to_formant_burg(
        args.real(0)?,
        args.real(1)?,
        args.real(2)?,
        args.real(3)?,
        args.real(4)?,
    );
    derived(cx, formant, "")
}

fn to_harmonicity_cc(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let harmonicity = cx
        .one::<Sound>()?
        .to_harmonicity_cc(args.real(0)?, args.real(1)?, args.real(2)?, args.real(3)?);
    derived(cx, harmonicity, "")
}

fn to_harmonicity_ac(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let harmonicity = cx
        .one::<Sound>()?
        .to_harmonicity_ac(args.real(0)?, args.real(1)?, args.real(2)?, args.real(3)?);
    derived(cx, harmonicity, "")
}

fn to_spectrum(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let spectrum = cx.one::<Sound>()?.to_spectrum(args.boolean(0)?);
    derived(cx, spectrum, "")
}

fn to_textgrid(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let tg = cx.one::<Sound>()?.to_textgrid(args.text(0)?, args.text(1)?)?;
    derived(cx, tg, "")
}

fn to_point_process_periodic_cc(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let pp = cx
        .one::<Sound>()?
        .to_point_process_periodic_cc(args.real(0)?, args.real(1)?);
    derived(cx, pp, "")
}

fn to_point_process_periodic_peaks(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let pp = cx.one::<Sound>()?.to_point_process_periodic_peaks(
        args.real(0)?,
        args.real(1)?,
        args.boolean(2)?,
        args.boolean(3)?,
    );
    derived(cx, pp, "")
}

fn to_point_process_extrema(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let interpolation: PeakInterpolation = args.text(3)?.parse()?;
    let pp = cx.one::<Sound>()?.to_point_process_extrema(
        args.index(0)?,
        args.boolean(1)?,
        args.boolean(2)?,
        interpolation,
    )?;
    derived(cx, pp, "")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::commands::dispatch;
    use crate::diagnostics::{Melder, SharedBuffer, WarningPolicy};
    use crate::objects::Environment;
    use crate::value::{ReturnKind, Value};

    fn setup() -> (Environment, Melder, rand::rngs::StdRng) {
        let mut env = Environment::new();
        let samples: Vec<f64> = (0..1000).map(|i| (i as f64 / 10.0).sin()).collect();
        env.add_new(Thing::new(Sound::from_slice(&samples, 1000.0), Some("sine")));
        let melder = Melder::new(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()));
        (env, melder, rand::rngs::StdRng::seed_from_u64(0))
    }

    #[test]
    fn queries_report_units() {
        let (mut env, mut melder, mut rng) = setup();
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get number of samples", &[], true).unwrap();
        assert_eq!(reply.kind, ReturnKind::Integer);
        assert_eq!(reply.info, "1000 samples\n");
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get sampling frequency", &[], true).unwrap();
        assert_eq!(reply.info, "1000 Hz\n");
    }

    #[test]
    fn conversions_name_their_results() {
        let (mut env, mut melder, mut rng) = setup();
        let args = vec![Value::Number(0.1), Value::Number(0.3)];
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Extract part", &args, true).unwrap();
        assert_eq!(reply.created, vec![2]);
        assert_eq!(env.get(2).unwrap().name(), Some("sine_part"));
        assert_eq!(env.selected_ids(), vec![2]);
    }

    #[test]
    fn clipping_warns_once_per_save() {
        let (mut env, mut melder, mut rng) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loud.wav");
        let path = Value::String(path.to_string_lossy().into_owned());
        dispatch(&mut env, &mut melder, &mut rng, None, "Multiply", &[Value::Number(2.0)], true).unwrap();
        dispatch(&mut env, &mut melder, &mut rng, None, "Save as WAV file", &[path], true).unwrap();
        let warnings = melder.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0]
            .message()
            .starts_with("Writing samples to audio file: "));

        melder.set_policy(WarningPolicy::Error);
        let path = Value::String(dir.path().join("again.wav").to_string_lossy().into_owned());
        let err = dispatch(&mut env, &mut melder, &mut rng, None, "Save as WAV file", &[path], true).unwrap_err();
        assert!(err.to_string().contains("have been clipped"));
    }
}
