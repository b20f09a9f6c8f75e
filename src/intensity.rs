//! Intensity - RMS energy contour in dB.
//!
//! This module computes the loudness (intensity) of a Sound over time,
//! expressed in decibels (dB) relative to the auditory threshold pressure.
//!
//! # Key Facts
//!
//! - Window: Gaussian (α = 13.2), physical length 7.2 / min_pitch
//! - Default time step: 0.8 / min_pitch
//! - DC removal (optional): unweighted mean subtraction before windowing
//!
//! # Algorithm Overview
//!
//! For each analysis frame:
//! 1. Extract samples centered at frame time
//! 2. Subtract DC (mean) from the samples if requested
//! 3. Apply Gaussian window
//! 4. Compute weighted mean square (RMS squared)
//! 5. Convert to dB relative to reference pressure

use ndarray::Array1;

use crate::error::{Error, Result};
use crate::sampled::Sampled;
use crate::sound::Sound;

/// Interpolation method for getting values at specific times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Value of the nearest frame.
    Nearest,

    /// Linear interpolation between two adjacent frames.
    Linear,

    /// Cubic (Catmull-Rom) interpolation through four surrounding frames.
    Cubic,
}

impl std::str::FromStr for Interpolation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "none" => Ok(Interpolation::Nearest),
            "linear" => Ok(Interpolation::Linear),
            "cubic" | "parabolic" | "sinc70" | "sinc700" => Ok(Interpolation::Cubic),
            _ => Err(Error::praat(format!("Unknown interpolation \"{}\".", s))),
        }
    }
}

/// How `Get mean` averages dB values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Averaging {
    /// Average the underlying energies, then convert back to dB.
    Energy,
    /// Average perceived loudness in sones.
    Sones,
    /// Plain mean of the dB values.
    Decibels,
}

impl std::str::FromStr for Averaging {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "energy" => Ok(Averaging::Energy),
            "sones" => Ok(Averaging::Sones),
            "db" => Ok(Averaging::Decibels),
            _ => Err(Error::praat(format!("Unknown averaging method \"{}\".", s))),
        }
    }
}

/// Intensity contour (loudness over time).
///
/// Values are in dB relative to a reference pressure of 2×10⁻⁵ Pa.
#[derive(Debug, Clone, PartialEq)]
pub struct Intensity {
    /// Start of the time domain (the analysed Sound's domain).
    xmin: f64,

    /// End of the time domain.
    xmax: f64,

    /// Frame centre times in seconds.
    times: Array1<f64>,

    /// Intensity values in dB.
    ///
    /// Negative infinity indicates complete silence (zero energy).
    values: Array1<f64>,

    /// Time step between frames.
    time_step: f64,

    /// Minimum pitch used for analysis; sets the window length.
    min_pitch: f64,
}

impl Intensity {
    /// Create a new Intensity object.
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

    /// Get the time points in seconds.
    #[inline]
    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    /// Get the intensity values in dB.
    #[inline]
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Get the number of frames.
    #[inline]
    pub fn n_frames(&self) -> usize {
        self.times.len()
    }

    /// Get the time step between frames.
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Get the minimum pitch used for analysis.
    #[inline]
    pub fn min_pitch(&self) -> f64 {
        self.min_pitch
    }

    /// Frame indices (0-based, half-open) whose times fall in `[tmin, tmax]`;
    /// `tmax <= tmin` selects all frames.
    fn frame_range(&self, tmin: f64, tmax: f64) -> (usize, usize) {
        if tmax <= tmin {
            return (0, self.n_frames());
        }
        let first = self.times.iter().position(|&t| t >= tmin).unwrap_or(self.n_frames());
        let last = self.times.iter().rposition(|&t| t <= tmax).map_or(0, |i| i + 1);
        (first, last.max(first))
    }

    /// Mean intensity over `[tmin, tmax]`.
    pub fn mean(&self, tmin: f64, tmax: f64, averaging: Averaging) -> f64 {
        let (first, last) = self.frame_range(tmin, tmax);
        let frames = self.values.slice(ndarray::s![first..last]);
        let finite: Vec<f64> = frames.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return f64::NAN;
        }
        let n = finite.len() as f64;
        match averaging {
            Averaging::Decibels => finite.iter().sum::<f64>() / n,
            Averaging::Energy => {
                let mean_energy = finite.iter().map(|db| 10f64.powf(db / 10.0)).sum::<f64>() / n;
                10.0 * mean_energy.log10()
            }
            Averaging::Sones => {
                // 1 sone at 40 dB, doubling every 10 dB.
                let mean_sones = finite.iter().map(|db| 2f64.powf((db - 40.0) / 10.0)).sum::<f64>() / n;
                40.0 + 10.0 * mean_sones.log2()
            }
        }
    }

    /// Largest frame value over `[tmin, tmax]`.
    pub fn maximum(&self, tmin: f64, tmax: f64) -> f64 {
        let (first, last) = self.frame_range(tmin, tmax);
        self.values
            .slice(ndarray::s![first..last])
            .iter()
            .copied()
            .fold(f64::NAN, f64::max)
    }

    /// Smallest frame value over `[tmin, tmax]`.
    pub fn minimum(&self, tmin: f64, tmax: f64) -> f64 {
        let (first, last) = self.frame_range(tmin, tmax);
        self.values
            .slice(ndarray::s![first..last])
            .iter()
            .copied()
            .fold(f64::NAN, f64::min)
    }

    /// Get intensity value at a specific time.
    ///
    /// Returns None if time is more than half a time step before the first
    /// frame or after the last frame. Within this boundary, edge values
    /// are extrapolated using the specified interpolation method.
    pub fn get_value_at_time(&self, time: f64, interpolation: Interpolation) -> Option<f64> {
        if self.n_frames() == 0 {
            return None;
        }

        // Compute floating-point index into the frame array
        let t0 = self.times[0];
        let idx_float = (time - t0) / self.time_step;

        // Check bounds: allow ±0.5 frame tolerance at edges
        if idx_float < -0.5 || idx_float > self.n_frames() as f64 - 0.5 {
            return None;
        }

        match interpolation {
            Interpolation::Nearest => {
                let idx = idx_float.round().max(0.0) as usize;
                let idx = idx.min(self.n_frames() - 1);
                Some(self.values[idx])
            }
            Interpolation::Linear => {
                let idx = idx_float.floor() as isize;

                if idx < 0 {
                    return Some(self.values[0]);
                }
                let idx = idx as usize;
                if idx >= self.n_frames() - 1 {
                    return Some(self.values[self.n_frames() - 1]);
                }

                let frac = idx_float - idx as f64;
                Some(self.values[idx] * (1.0 - frac) + self.values[idx + 1] * frac)
            }
            Interpolation::Cubic => {
                let idx = idx_float.floor() as isize;
                let frac = idx_float - idx as f64;

                // Get 4 surrounding point indices with boundary clamping
                let n = self.n_frames() as isize;
                let i0 = (idx - 1).clamp(0, n - 1) as usize;
                let i1 = idx.clamp(0, n - 1) as usize;
                let i2 = (idx + 1).clamp(0, n - 1) as usize;
                let i3 = (idx + 2).clamp(0, n - 1) as usize;

                let (y0, y1, y2, y3) = (self.values[i0], self.values[i1], self.values[i2], self.values[i3]);

                // Catmull-Rom spline
                let t = frac;
                let t2 = t * t;
                let t3 = t2 * t;

                Some(
                    0.5 * ((2.0 * y1)
                        + (-y0 + y2) * t
                        + (2.0 * y0 - 5.0 * y1 + 4.0 * y2 - y3) * t2
                        + (-y0 + 3.0 * y1 - 3.0 * y2 + y3) * t3),
                )
            }
        }
    }
}

impl Sampled for Intensity {
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

/// Gaussian window with edges pulled down to exactly zero.
///
/// ```text
/// w(x) = (exp(-α × x²) - exp(-α)) / (1 - exp(-α)),  x ∈ [-1, 1]
/// ```
fn gauss_window(n: usize, alpha: f64) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0];
    }

    let mid = (n - 1) as f64 / 2.0;
    let exp_edge = (-alpha).exp();
    let norm = 1.0 - exp_edge;

    (0..n)
        .map(|i| {
            let x = (i as f64 - mid) / mid;
            ((-alpha * x * x).exp() - exp_edge) / norm
        })
        .collect()
}

/// Compute intensity from sound.
///
/// Multi-channel sounds are analysed on their channel average.
///
/// # Arguments
///
/// * `sound` - Sound object to analyze
/// * `min_pitch` - Minimum pitch in Hz. Physical window = 7.2 / min_pitch.
/// * `time_step` - Time step in seconds. Use 0 for automatic (0.8 / min_pitch).
/// * `subtract_mean` - Subtract each frame's mean before windowing.
pub fn sound_to_intensity(sound: &Sound, min_pitch: f64, time_step: f64, subtract_mean: bool) -> Intensity {
    let samples = sound.mono();
    let sample_rate = sound.sample_rate();
    let duration = sound.duration();
    let offset = sound.xmin();

    let time_step = if time_step <= 0.0 { 0.8 / min_pitch } else { time_step };

    // Effective duration 3.2 / min_pitch, physical 2.25× that.
    let physical_window_duration = 7.2 / min_pitch;
    let half_window_duration = physical_window_duration / 2.0;

    let mut window_samples = (physical_window_duration * sample_rate).round() as usize;
    if window_samples % 2 == 0 {
        window_samples += 1;
    }
    let half_window_samples = window_samples / 2;

    let window = gauss_window(window_samples, 13.2);
    let window_sum: f64 = window.iter().sum();

    // Left-aligned frames, starting half a window into the signal.
    let t1 = half_window_duration;
    let t_max = duration - half_window_duration;
    let n_frames = if t_max < t1 {
        1
    } else {
        ((t_max - t1) / time_step + 1e-9).floor() as usize + 1
    };

    let mut times = Vec::with_capacity(n_frames);
    let mut values = Vec::with_capacity(n_frames);

    // (2×10⁻⁵ Pa)²
    let p_ref = 4e-10;
    let n_samples = samples.len();
    // Sample index of local time t, relative to the first sample's position.
    let first_sample_time = sound.x1() - offset;

    for i in 0..n_frames {
        let t = t1 + i as f64 * time_step;
        times.push(offset + t);

        let center_sample = ((t - first_sample_time) * sample_rate).round() as isize;
        let start_sample = center_sample - half_window_samples as isize;

        // Samples outside the signal are zero
        let mut frame_samples = vec![0.0; window_samples];
        for (j, slot) in frame_samples.iter_mut().enumerate() {
            let src_idx = start_sample + j as isize;
            if src_idx >= 0 && (src_idx as usize) < n_samples {
                *slot = samples[src_idx as usize];
            }
        }

        if subtract_mean {
            let mean: f64 = frame_samples.iter().sum::<f64>() / frame_samples.len() as f64;
            for s in frame_samples.iter_mut() {
                *s -= mean;
            }
        }

        // mean_square = Σ(s² × w) / Σw
        let mean_square: f64 = frame_samples
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| s * s * w)
            .sum::<f64>()
            / window_sum;

        let intensity_db = if mean_square <= 0.0 {
            f64::NEG_INFINITY
        } else {
            10.0 * (mean_square / p_ref).log10()
        };

        values.push(intensity_db);
    }

    Intensity::new(
        sound.xmin(),
        sound.xmax(),
        Array1::from_vec(times),
        Array1::from_vec(values),
        time_step,
        min_pitch,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: f64) -> Sound {
        let sr = 8000.0;
        let samples = Array1::from_iter((0..8000).map(|i| amplitude * (2.0 * std::f64::consts::PI * 200.0 * i as f64 / sr).sin()));
        Sound::new(samples, sr)
    }

    #[test]
    fn steady_tone_has_flat_contour() {
        let intensity = tone(0.1).to_intensity(100.0, 0.0, true);
        assert!(intensity.n_frames() > 50);
        let (lo, hi) = (intensity.minimum(0.0, 0.0), intensity.maximum(0.0, 0.0));
        assert!(hi - lo < 0.5, "range {}..{}", lo, hi);
        // 0.1 amplitude sine: mean square 0.005, i.e. about 71 dB.
        let mean = intensity.mean(0.0, 0.0, Averaging::Energy);
        assert!((mean - 70.97).abs() < 0.5, "mean {}", mean);
    }

    #[test]
    fn doubling_amplitude_adds_six_db() {
        let soft = tone(0.1).to_intensity(100.0, 0.0, true).mean(0.0, 0.0, Averaging::Decibels);
        let loud = tone(0.2).to_intensity(100.0, 0.0, true).mean(0.0, 0.0, Averaging::Decibels);
        assert!((loud - soft - 6.02).abs() < 0.05);
    }

    #[test]
    fn sampled_domain_matches_sound() {
        let intensity = tone(0.1).to_intensity(100.0, 0.01, true);
        assert_eq!(intensity.xmin(), 0.0);
        assert_eq!(intensity.xmax(), 1.0);
        assert_eq!(intensity.dx(), 0.01);
        assert!((intensity.x1() - 0.036).abs() < 1e-12);
    }

    #[test]
    fn silence_is_negative_infinity() {
        let silent = Sound::new(Array1::zeros(4000), 8000.0).to_intensity(100.0, 0.0, true);
        assert!(silent.values().iter().all(|v| *v == f64::NEG_INFINITY));
        assert!(silent.mean(0.0, 0.0, Averaging::Energy).is_nan());
    }
}
