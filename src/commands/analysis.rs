//! Queries on analysis objects (Intensity, Pitch, Spectrogram, Formant,
//! Harmonicity, Spectrum), plus the Sound & Pitch conversions.

use super::decl::*;
use super::{Args, Command, Cx, Payload};
use crate::error::{praat_bail, Result};
use crate::formant::Formant;
use crate::harmonicity::Harmonicity;
use crate::intensity::{Averaging, Intensity, Interpolation};
use crate::objects::{Class, Thing};
use crate::pitch::Pitch;
use crate::point_process::{sound_pitch_to_point_process_cc, sound_pitch_to_point_process_peaks};
use crate::sound::Sound;
use crate::spectrogram::Spectrogram;
use crate::spectrum::Spectrum;

const AVERAGING: &[&str] = &["energy", "sones", "dB"];
const FRAME_INTERPOLATIONS: &[&str] = &["none", "parabolic", "cubic", "sinc70", "sinc700"];
const TIME_INTERPOLATIONS: &[&str] = &["nearest", "linear", "cubic"];
const PITCH_INTERPOLATIONS: &[&str] = &["nearest", "linear"];
const FORMANT_INTERPOLATIONS: &[&str] = &["linear", "nearest"];

pub(super) fn register(commands: &mut Vec<Command>) {
    let intensity = || one(Class::Intensity);
    let pitch = || one(Class::Pitch);

    // Intensity
    commands.push(command(
        "Get mean",
        intensity(),
        "REAL_Intensity_getMean",
        vec![
            real("Start time (s)", "0.0"),
            real("End time (s)", "0.0 (= all)"),
            choice("Averaging method", AVERAGING, "energy"),
        ],
        intensity_mean,
    ));
    commands.push(command(
        "Get maximum",
        intensity(),
        "REAL_Intensity_getMaximum",
        vec![
            real("Start time (s)", "0.0"),
            real("End time (s)", "0.0 (= all)"),
            choice("Interpolation", FRAME_INTERPOLATIONS, "parabolic"),
        ],
        intensity_maximum,
    ));
    commands.push(command(
        "Get minimum",
        intensity(),
        "REAL_Intensity_getMinimum",
        vec![
            real("Start time (s)", "0.0"),
            real("End time (s)", "0.0 (= all)"),
            choice("Interpolation", FRAME_INTERPOLATIONS, "parabolic"),
        ],
        intensity_minimum,
    ));
    commands.push(command(
        "Get value at time",
        intensity(),
        "REAL_Intensity_getValueAtTime",
        vec![real("Time (s)", "0.5"), choice("Interpolation", TIME_INTERPOLATIONS, "cubic")],
        intensity_value_at_time,
    ));
    commands.push(command("Get values", intensity(), "NUMVEC_Intensity_getValues", vec![], intensity_values));

    // Pitch
    commands.push(command(
        "Get mean",
        pitch(),
        "REAL_Pitch_getMean",
        vec![
            real("Start time (s)", "0.0"),
            real("End time (s)", "0.0 (= all)"),
            choice("Unit", &["Hertz"], "Hertz"),
        ],
        pitch_mean,
    ));
    commands.push(command(
        "Get value at time",
        pitch(),
        "REAL_Pitch_getValueAtTime",
        vec![
            real("Time (s)", "0.5"),
            choice("Unit", &["Hertz"], "Hertz"),
            choice("Interpolation", PITCH_INTERPOLATIONS, "linear"),
        ],
        pitch_value_at_time,
    ));
    commands.push(command(
        "Get number of voiced frames",
        pitch(),
        "INTEGER_Pitch_getNumberOfVoicedFrames",
        vec![],
        count_voiced_frames,
    ));
    commands.push(command(
        "Count differences",
        two(Class::Pitch),
        "INFO_Pitch_difference",
        vec![],
        count_differences,
    ));
    commands.push(command("List values", pitch(), "NUMVEC_Pitch_listValues", vec![], pitch_values));
    commands.push(command("To PointProcess", pitch(), "NEW_Pitch_to_PointProcess", vec![], pitch_to_point_process));

    // Sound & Pitch
    commands.push(command(
        "To PointProcess (cc)",
        pair(Class::Sound, Class::Pitch),
        "NEW1_Sound_Pitch_to_PointProcess_cc",
        vec![],
        sound_pitch_cc,
    ));
    commands.push(command(
        "To PointProcess (peaks)",
        pair(Class::Sound, Class::Pitch),
        "NEW1_Sound_Pitch_to_PointProcess_peaks",
        vec![boolean("Include maxima", true), boolean("Include minima", false)],
        sound_pitch_peaks,
    ));

    // Spectrogram
    commands.push(command(
        "Get power at",
        one(Class::Spectrogram),
        "REAL_Spectrogram_getPowerAt",
        vec![real("Time (s)", "0.5"), real("Frequency (Hz)", "1000")],
        get_power_at,
    ));
    commands.push(command(
        "Get number of frequencies",
        one(Class::Spectrogram),
        "INTEGER_Spectrogram_getNumberOfFrequencies",
        vec![],
        get_number_of_frequencies,
    ));
    commands.push(command(
        "List values",
        one(Class::Spectrogram),
        "NUMMAT_Spectrogram_listValues",
        vec![],
        spectrogram_values,
    ));

    // Formant
    let formant = || one(Class::Formant);
    commands.push(command(
        "Get value at time",
        formant(),
        "REAL_Formant_getValueAtTime",
        vec![
            natural("Formant number", "1"),
            real("Time (s)", "0.5"),
            choice("Unit", &["Hertz"], "Hertz"),
            choice("Interpolation", FORMANT_INTERPOLATIONS, "linear"),
        ],
        formant_value_at_time,
    ));
    commands.push(command(
        "Get bandwidth at time",
        formant(),
        "REAL_Formant_getBandwidthAtTime",
        vec![
            natural("Formant number", "1"),
            real("Time (s)", "0.5"),
            choice("Unit", &["Hertz"], "Hertz"),
            choice("Interpolation", FORMANT_INTERPOLATIONS, "linear"),
        ],
        formant_bandwidth_at_time,
    ));
    commands.push(command(
        "Get mean",
        formant(),
        "REAL_Formant_getMean",
        vec![
            natural("Formant number", "1"),
            real("Start time (s)", "0.0"),
            real("End time (s)", "0.0 (= all)"),
            choice("Unit", &["Hertz"], "Hertz"),
        ],
        formant_mean,
    ));
    commands.push(command(
        "Get number of formants",
        formant(),
        "INTEGER_Formant_getNumberOfFormants",
        vec![natural("Frame number", "1")],
        formant_count,
    ));
    commands.push(command(
        "List formant values",
        formant(),
        "NUMVEC_Formant_listFormantSlice",
        vec![natural("Formant number", "1")],
        formant_values,
    ));

    // Harmonicity
    let harmonicity = || one(Class::Harmonicity);
    commands.push(command(
        "Get mean",
        harmonicity(),
        "REAL_Harmonicity_getMean",
        vec![real("Start time (s)", "0.0"), real("End time (s)", "0.0 (= all)")],
        harmonicity_mean,
    ));
    commands.push(command(
        "Get standard deviation",
        harmonicity(),
        "REAL_Harmonicity_getStandardDeviation",
        vec![real("Start time (s)", "0.0"), real("End time (s)", "0.0 (= all)")],
        harmonicity_standard_deviation,
    ));
    commands.push(command(
        "Get value at time",
        harmonicity(),
        "REAL_Harmonicity_getValueAtTime",
        vec![real("Time (s)", "0.5"), choice("Interpolation", TIME_INTERPOLATIONS, "cubic")],
        harmonicity_value_at_time,
    ));
    commands.push(command("Get values", harmonicity(), "NUMVEC_Harmonicity_getValues", vec![], harmonicity_values));

    // Spectrum
    let spectrum = || one(Class::Spectrum);
    let power = || vec![positive("Power", "2.0")];
    commands.push(command(
        "Get centre of gravity",
        spectrum(),
        "REAL_Spectrum_getCentreOfGravity",
        power(),
        centre_of_gravity,
    ));
    commands.push(command(
        "Get standard deviation",
        spectrum(),
        "REAL_Spectrum_getStandardDeviation",
        power(),
        spectrum_standard_deviation,
    ));
    commands.push(command("Get skewness", spectrum(), "REAL_Spectrum_getSkewness", power(), skewness));
    commands.push(command("Get kurtosis", spectrum(), "REAL_Spectrum_getKurtosis", power(), kurtosis));
    commands.push(command(
        "Get band energy",
        spectrum(),
        "REAL_Spectrum_getBandEnergy",
        vec![real("Band floor (Hz)", "200.0"), real("Band ceiling (Hz)", "1000.0")],
        band_energy,
    ));
    commands.push(command(
        "Get number of bins",
        spectrum(),
        "INTEGER_Spectrum_getNumberOfBins",
        vec![],
        number_of_bins,
    ));
}

// ========== Intensity ==========

fn intensity_mean(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let averaging: Averaging = args.text(2)?.parse()?;
    let mean = cx.one::<Intensity>()?.mean(args.real(0)?, args.real(1)?, averaging);
    cx.real(mean, "dB")
}

// Extremes are taken over the frame values; the interpolation only needs to
// name a known method.
fn intensity_maximum(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let _: Interpolation = args.text(2)?.parse()?;
    let max = cx.one::<Intensity>()?.maximum(args.real(0)?, args.real(1)?);
    cx.real(max, "dB")
}

fn intensity_minimum(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let _: Interpolation = args.text(2)?.parse()?;
    let min = cx.one::<Intensity>()?.minimum(args.real(0)?, args.real(1)?);
    cx.real(min, "dB")
}

fn intensity_value_at_time(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let interpolation: Interpolation = args.text(1)?.parse()?;
    let value = cx
        .one::<Intensity>()?
        .get_value_at_time(args.real(0)?, interpolation)
        .unwrap_or(f64::NAN);
    cx.real(value, "dB")
}

fn intensity_values(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::Vector(cx.one::<Intensity>()?.values().clone()))
}

// ========== Pitch ==========

fn pitch_mean(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let mean = cx.one::<Pitch>()?.mean(args.real(0)?, args.real(1)?);
    cx.real(mean, "Hz")
}

fn pitch_value_at_time(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let value = cx
        .one::<Pitch>()?
        .get_value_at_time(args.real(0)?, args.text(2)?)?
        .unwrap_or(f64::NAN);
    cx.real(value, "Hz")
}

fn count_voiced_frames(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<Pitch>()?.count_voiced_frames();
    cx.integer(n as i64, "voiced frames")
}

fn count_differences(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let difference = cx.nth::<Pitch>(1)?.count_differences(cx.nth::<Pitch>(2)?);
    match difference {
        Some(difference) => cx.melder.append_info(&difference.to_string()),
        None => cx.melder.casual("Pitch_difference: these Pitches are not aligned."),
    }
    Ok(Payload::None)
}

fn pitch_values(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::Vector(cx.one::<Pitch>()?.values()))
}

fn pitch_to_point_process(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let pp = cx.one::<Pitch>()?.to_point_process();
    let name = cx.name_of::<Pitch>()?;
    Ok(Payload::Objects(vec![Thing::new(pp, name.as_deref())]))
}

// ========== Sound & Pitch ==========

fn sound_pitch_name(cx: &Cx<'_>) -> Result<String> {
    let sound = cx.name_of::<Sound>()?.unwrap_or_else(|| "untitled".to_string());
    let pitch = cx.name_of::<Pitch>()?.unwrap_or_else(|| "untitled".to_string());
    Ok(format!("{}_{}", sound, pitch))
}

fn sound_pitch_cc(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let pp = sound_pitch_to_point_process_cc(cx.one::<Sound>()?, cx.one::<Pitch>()?);
    let name = sound_pitch_name(cx)?;
    Ok(Payload::Objects(vec![Thing::new(pp, Some(&name))]))
}

fn sound_pitch_peaks(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let pp = sound_pitch_to_point_process_peaks(
        cx.one::<Sound>()?,
        cx.one::<Pitch>()?,
        args.boolean(0)?,
        args.boolean(1)?,
    );
    let name = sound_pitch_name(cx)?;
    Ok(Payload::Objects(vec![Thing::new(pp, Some(&name))]))
}

// ========== Spectrogram ==========

fn get_power_at(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let power = cx.one::<Spectrogram>()?.power_at(args.real(0)?, args.real(1)?);
    cx.real(power, "Pa2/Hz")
}

fn get_number_of_frequencies(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<Spectrogram>()?.n_freqs();
    cx.integer(n as i64, "frequency bins")
}

fn spectrogram_values(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::Matrix(cx.one::<Spectrogram>()?.values().clone()))
}

// ========== Formant ==========

fn formant_value_at_time(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let value = cx
        .one::<Formant>()?
        .get_value_at_time(args.index(0)?, args.real(1)?, args.text(3)?)?
        .unwrap_or(f64::NAN);
    cx.real(value, "Hz")
}

fn formant_bandwidth_at_time(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let value = cx
        .one::<Formant>()?
        .get_bandwidth_at_time(args.index(0)?, args.real(1)?, args.text(3)?)?
        .unwrap_or(f64::NAN);
    cx.real(value, "Hz")
}

fn formant_mean(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let mean = cx.one::<Formant>()?.mean(args.index(0)?, args.real(1)?, args.real(2)?);
    cx.real(mean, "Hz")
}

fn formant_count(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let frame = args.index(0)?;
    let formant = cx.one::<Formant>()?;
    let n = match frame.checked_sub(1).and_then(|i| formant.frames().get(i)) {
        Some(f) => f.n_formants(),
        None => praat_bail!("Frame number {} is not in the range 1 to {}.", frame, formant.n_frames()),
    };
    cx.integer(n as i64, "formants")
}

fn formant_values(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    Ok(Payload::Vector(cx.one::<Formant>()?.formant_values(args.index(0)?)))
}

// ========== Harmonicity ==========

fn harmonicity_mean(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let mean = cx.one::<Harmonicity>()?.mean(args.real(0)?, args.real(1)?);
    cx.real(mean, "dB")
}

fn harmonicity_standard_deviation(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let sd = cx.one::<Harmonicity>()?.standard_deviation(args.real(0)?, args.real(1)?);
    cx.real(sd, "dB")
}

fn harmonicity_value_at_time(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let interpolation: Interpolation = args.text(1)?.parse()?;
    let value = cx
        .one::<Harmonicity>()?
        .get_value_at_time(args.real(0)?, interpolation)
        .unwrap_or(f64::NAN);
    cx.real(value, "dB")
}

fn harmonicity_values(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::Vector(cx.one::<Harmonicity>()?.values().clone()))
}

// ========== Spectrum ==========

fn centre_of_gravity(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let cog = cx.one::<Spectrum>()?.get_center_of_gravity(args.real(0)?);
    cx.real(cog, "Hz")
}

fn spectrum_standard_deviation(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let sd = cx.one::<Spectrum>()?.get_standard_deviation(args.real(0)?);
    cx.real(sd, "Hz")
}

fn skewness(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let skewness = cx.one::<Spectrum>()?.get_skewness(args.real(0)?);
    cx.real(skewness, "")
}

fn kurtosis(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let kurtosis = cx.one::<Spectrum>()?.get_kurtosis(args.real(0)?);
    cx.real(kurtosis, "")
}

fn band_energy(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let energy = cx.one::<Spectrum>()?.get_band_energy(args.real(0)?, args.real(1)?);
    cx.real(energy, "Pa2 sec")
}

fn number_of_bins(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<Spectrum>()?.n_bins();
    cx.integer(n as i64, "bins")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::commands::dispatch;
    use crate::diagnostics::{Melder, SharedBuffer};
    use crate::objects::Environment;
    use crate::value::Value;

    fn tone() -> Sound {
        let rate = 16000.0;
        let samples: Vec<f64> = (0..8000)
            .map(|i| 0.5 * (2.0 * std::f64::consts::PI * 200.0 * i as f64 / rate).sin())
            .collect();
        Sound::from_slice(&samples, rate)
    }

    #[test]
    fn misaligned_pitches_notice_goes_to_casual() {
        let mut env = Environment::new();
        let sound = tone();
        env.add_new(Thing::new(sound.to_pitch_ac(0.01, 75.0, 600.0), Some("a")));
        env.add_new(Thing::new(sound.to_pitch_ac(0.02, 75.0, 600.0), Some("b")));
        env.select_by_id(&[1, 2]).unwrap();

        let casual = SharedBuffer::new();
        let mut melder = Melder::new(Box::new(SharedBuffer::new()), Box::new(casual.clone()));
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Count differences", &[], true).unwrap();
        assert_eq!(reply.info, "");
        assert_eq!(casual.contents(), "Pitch_difference: these Pitches are not aligned.\n");
    }

    #[test]
    fn spectrum_queries_report_units() {
        let mut env = Environment::new();
        env.add_new(Thing::new(tone().to_spectrum(false), Some("tone")));
        let mut melder = Melder::new(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()));
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get number of bins", &[], true).unwrap();
        assert_eq!(reply.info, "4001 bins\n");
        let band = [Value::Number(100.0), Value::Number(300.0)];
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get band energy", &band, true).unwrap();
        assert!(reply.info.ends_with(" Pa2 sec\n"), "{}", reply.info);
        let energy = crate::value::parse_number(&reply.info);
        assert!((energy - tone().energy(0.0, 0.0)).abs() < 1e-6, "{}", energy);
    }

    #[test]
    fn pitch_of_a_tone() {
        let mut env = Environment::new();
        env.add_new(Thing::new(tone().to_pitch_ac(0.0, 75.0, 600.0), Some("tone")));
        let mut melder = Melder::new(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()));
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get mean", &[], true).unwrap();
        let mean = crate::value::parse_number(&reply.info);
        assert!((mean - 200.0).abs() < 2.0, "mean {}", mean);
        let args = [Value::Number(0.25), Value::from("Hertz"), Value::from("nearest")];
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get value at time", &args, true).unwrap();
        assert!(reply.info.ends_with(" Hz\n"));
    }
}
