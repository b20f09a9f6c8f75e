//! Harmonicity - Harmonics-to-noise ratio (HNR) contour.
//!
//! Harmonicity is not a separate algorithm: it runs the pitch analysis with
//! a longer window and no octave cost, and converts the correlation strength
//! `r` of the chosen candidate to decibels:
//!
//! ```text
//! HNR (dB) = 10 × log₁₀(r / (1 - r))
//! ```
//!
//! If 99% of the energy is in the periodic part, the HNR is 20 dB.
//! Unvoiced frames carry the marker value -200 dB and are left out of
//! statistics.

use ndarray::Array1;

use crate::intensity::Interpolation;
use crate::pitch::{sound_to_pitch_windowed, PitchMethod, PitchSettings};
use crate::sampled::Sampled;
use crate::sound::Sound;

/// Value of frames without a periodic part.
pub const UNVOICED_HNR: f64 = -200.0;

/// Harmonicity (HNR) contour in dB.
#[derive(Debug, Clone, PartialEq)]
pub struct Harmonicity {
    xmin: f64,
    xmax: f64,
    times: Array1<f64>,
    values: Array1<f64>,
    time_step: f64,
    /// Minimum pitch used for analysis; sets the window length.
    min_pitch: f64,
}

impl Harmonicity {
    /// Create a new Harmonicity object.
    pub fn new(
        xmin: f64,
        xmax: f64,
        times: Array1<f64>,
        values: Array1<f64>,
        time_step: f64,
        min_pitch: f64,
    ) -> Self {
        Self {
            xmin,
            xmax,
            times,
            values,
            time_step,
            min_pitch,
        }
    }

    /// Frame centre times in seconds.
    #[inline]
    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    /// HNR values in dB.
    #[inline]
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    #[inline]
    pub fn n_frames(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    #[inline]
    pub fn min_pitch(&self) -> f64 {
        self.min_pitch
    }

    /// Voiced frame values with times in `[tmin, tmax]`; `tmax <= tmin`
    /// selects everything.
    fn voiced_values(&self, tmin: f64, tmax: f64) -> Vec<f64> {
        self.times
            .iter()
            .zip(self.values.iter())
            .filter(|(&t, _)| tmax <= tmin || (t >= tmin && t <= tmax))
            .map(|(_, &v)| v)
            .filter(|&v| v != UNVOICED_HNR)
            .collect()
    }

    /// Mean HNR over the voiced frames in `[tmin, tmax]`.
    pub fn mean(&self, tmin: f64, tmax: f64) -> f64 {
        let values = self.voiced_values(tmin, tmax);
        if values.is_empty() {
            return f64::NAN;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Sample standard deviation over the voiced frames in `[tmin, tmax]`.
    pub fn standard_deviation(&self, tmin: f64, tmax: f64) -> f64 {
        let values = self.voiced_values(tmin, tmax);
        if values.len() < 2 {
            return f64::NAN;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (n - 1.0)).sqrt()
    }

    /// HNR at `time`, or `None` more than half a frame outside the frames.
    ///
    /// Unvoiced frames take part in interpolation with their -200 dB.
    pub fn get_value_at_time(&self, time: f64, interpolation: Interpolation) -> Option<f64> {
        let n = self.n_frames();
        if n == 0 {
            return None;
        }
        let idx_float = (time - self.times[0]) / self.time_step;
        if idx_float < -0.5 || idx_float > n as f64 - 0.5 {
            return None;
        }
        let at = |i: isize| self.values[i.clamp(0, n as isize - 1) as usize];
        let idx = idx_float.floor() as isize;
        let t = idx_float - idx as f64;
        let value = match interpolation {
            Interpolation::Nearest => at(idx_float.round() as isize),
            Interpolation::Linear => at(idx) * (1.0 - t) + at(idx + 1) * t,
            Interpolation::Cubic => {
                let (y0, y1, y2, y3) = (at(idx - 1), at(idx), at(idx + 1), at(idx + 2));
                0.5 * ((2.0 * y1)
                    + (-y0 + y2) * t
                    + (2.0 * y0 - 5.0 * y1 + 4.0 * y2 - y3) * t * t
                    + (-y0 + 3.0 * y1 - 3.0 * y2 + y3) * t * t * t)
            }
        };
        Some(value)
    }
}

impl Sampled for Harmonicity {
    fn xmin(&self) -> f64 {
        self.xmin
    }
    fn xmax(&self) -> f64 {
        self.xmax
    }
    fn nx(&self) -> usize {
        self.n_frames()
    }
    fn dx(&self) -> f64 {
        self.time_step
    }
    fn x1(&self) -> f64 {
        self.times.first().copied().unwrap_or(self.xmin)
    }
}

/// Convert a correlation strength to HNR in dB.
///
/// `r` is clamped to `[1e-10, 1 - 1e-10]`: interpolated peaks can overshoot
/// 1 slightly.
#[inline]
pub fn strength_to_hnr(r: f64) -> f64 {
    let r = r.clamp(1e-10, 1.0 - 1e-10);
    10.0 * (r / (1.0 - r)).log10()
}

/// Praat's `To Harmonicity (ac)`; the usual window is 4.5 periods.
pub fn sound_to_harmonicity_ac(
    sound: &Sound,
    time_step: f64,
    min_pitch: f64,
    silence_threshold: f64,
    periods_per_window: f64,
) -> Harmonicity {
    sound_to_harmonicity(sound, PitchMethod::Ac, time_step, min_pitch, silence_threshold, periods_per_window)
}

/// Praat's `To Harmonicity (cc)`; the usual window is 1 period.
pub fn sound_to_harmonicity_cc(
    sound: &Sound,
    time_step: f64,
    min_pitch: f64,
    silence_threshold: f64,
    periods_per_window: f64,
) -> Harmonicity {
    sound_to_harmonicity(sound, PitchMethod::Cc, time_step, min_pitch, silence_threshold, periods_per_window)
}

fn sound_to_harmonicity(
    sound: &Sound,
    method: PitchMethod,
    time_step: f64,
    min_pitch: f64,
    silence_threshold: f64,
    periods_per_window: f64,
) -> Harmonicity {
    // No octave cost: the HNR formula needs the raw correlation.
    let settings = PitchSettings {
        time_step,
        pitch_floor: min_pitch,
        silence_threshold,
        octave_cost: 0.0,
        ..PitchSettings::default()
    };
    let pitch = sound_to_pitch_windowed(sound, method, &settings, periods_per_window);
    log::debug!(
        "harmonicity ({:?}): {} frames, {} voiced",
        method,
        pitch.n_frames(),
        pitch.count_voiced_frames()
    );

    let values = Array1::from_iter(pitch.frames().iter().map(|frame| {
        if frame.voiced() {
            strength_to_hnr(frame.strength())
        } else {
            UNVOICED_HNR
        }
    }));
    Harmonicity::new(
        pitch.xmin(),
        pitch.xmax(),
        pitch.times(),
        values,
        pitch.time_step(),
        min_pitch,
    )
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    fn tone(amplitude: f64, noise: f64) -> Sound {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let sr = 16000.0;
        let samples: Vec<f64> = (0..8000)
            .map(|i| {
                amplitude * (2.0 * std::f64::consts::PI * 200.0 * i as f64 / sr).sin()
                    + noise * rng.gen_range(-1.0..1.0)
            })
            .collect();
        Sound::from_slice(&samples, sr)
    }

    #[test]
    fn hnr_formula() {
        assert!(strength_to_hnr(0.5).abs() < 1e-12);
        assert!((strength_to_hnr(0.99) - 19.956).abs() < 1e-3);
        assert!(strength_to_hnr(1.5).is_finite());
    }

    #[test]
    fn clean_tone_is_more_harmonic_than_noisy_tone() {
        let clean = sound_to_harmonicity_cc(&tone(0.5, 0.0), 0.01, 75.0, 0.1, 1.0);
        let noisy = sound_to_harmonicity_cc(&tone(0.5, 0.3), 0.01, 75.0, 0.1, 1.0);
        let (clean_mean, noisy_mean) = (clean.mean(0.0, 0.0), noisy.mean(0.0, 0.0));
        assert!(clean_mean > 20.0, "clean {}", clean_mean);
        assert!(noisy_mean < clean_mean, "noisy {} clean {}", noisy_mean, clean_mean);
    }

    #[test]
    fn ac_frames_lie_in_the_sound() {
        let h = sound_to_harmonicity_ac(&tone(0.5, 0.0), 0.01, 75.0, 0.1, 4.5);
        assert!(h.n_frames() > 10);
        assert!(h.x1() > 0.0 && h.xs()[h.nx() - 1] < 0.5);
        assert!(h.mean(0.0, 0.0) > 10.0);
    }

    #[test]
    fn silence_is_left_out_of_statistics() {
        let silence = Sound::new(Array1::zeros(8000), 16000.0);
        let h = sound_to_harmonicity_cc(&silence, 0.01, 75.0, 0.1, 1.0);
        assert!(h.values().iter().all(|&v| v == UNVOICED_HNR));
        assert!(h.mean(0.0, 0.0).is_nan());
    }

    #[test]
    fn value_at_time_interpolates() {
        let times = Array1::from(vec![0.05, 0.15, 0.25]);
        let h = Harmonicity::new(0.0, 0.3, times, Array1::from(vec![10.0, 20.0, 30.0]), 0.1, 75.0);
        let halfway = h.get_value_at_time(0.1, Interpolation::Linear).unwrap();
        assert!((halfway - 15.0).abs() < 1e-9);
        assert_eq!(h.get_value_at_time(0.16, Interpolation::Nearest), Some(20.0));
        assert_eq!(h.get_value_at_time(0.5, Interpolation::Linear), None);
        assert!((h.standard_deviation(0.0, 0.0) - 10.0).abs() < 1e-12);
    }
}
