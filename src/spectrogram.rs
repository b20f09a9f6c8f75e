//! Spectrogram - Time-frequency representation.
//!
//! Short-Time Fourier Transform of a Sound: a sequence of FFTs on
//! overlapping windowed segments, stored as power |X(f)|² on a
//! time × frequency grid.
//!
//! # Key Facts
//!
//! - A Gaussian window analyses twice as many samples as its nominal
//!   (effective) length; a Hanning window uses exactly its length.
//! - Frames are centred in the Sound's time domain.
//! - Power is stored at FFT-bin resolution, which may be finer than the
//!   requested frequency step.

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{Error, Result};
use crate::sampled::Sampled;
use crate::sound::Sound;

/// Window shape for spectrogram analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowShape {
    /// Gaussian window; the physical window is twice the effective length.
    Gaussian,

    /// Hanning window; the physical window equals the effective length.
    Hanning,
}

impl std::str::FromStr for WindowShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" => Ok(WindowShape::Gaussian),
            "hanning" => Ok(WindowShape::Hanning),
            _ => Err(Error::praat(format!("Window shape \"{}\" is not supported.", s))),
        }
    }
}

/// Power spectral density over time.
///
/// Rows are frequency bins from 0 up to the maximum frequency; columns are
/// time frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// Linear power values, `values[[freq_bin, time_frame]] = |X(f,t)|²`.
    values: Array2<f64>,

    /// Start time in seconds.
    time_min: f64,

    /// End time in seconds.
    time_max: f64,

    /// Minimum frequency in Hz.
    freq_min: f64,

    /// Maximum frequency in Hz.
    freq_max: f64,

    /// Time step between frames in seconds.
    time_step: f64,

    /// Frequency step between bins in Hz.
    freq_step: f64,

    /// Time of first frame center in seconds.
    t1: f64,
}

impl Spectrogram {
    /// Create a new Spectrogram object.
    ///
    /// # Arguments
    ///
    /// * `values` - 2D array of power values (n_freqs × n_times)
    /// * `time_min` - Start time in seconds (typically 0)
    /// * `time_max` - End time in seconds (signal duration)
    /// * `freq_min` - Minimum frequency in Hz (typically 0)
    /// * `freq_max` - Maximum frequency in Hz
    /// * `time_step` - Time step between frames
    /// * `freq_step` - Frequency step between bins
    /// * `t1` - Time of first frame center
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        values: Array2<f64>,
        time_min: f64,
        time_max: f64,
        freq_min: f64,
        freq_max: f64,
        time_step: f64,
        freq_step: f64,
        t1: f64,
    ) -> Self {
        Self {
            values,
            time_min,
            time_max,
            freq_min,
            freq_max,
            time_step,
            freq_step,
            t1,
        }
    }

    /// Get the power values (n_freqs × n_times).
    ///
    /// Access individual values with values[[freq_bin, time_frame]].
    #[inline]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of time frames.
    #[inline]
    pub fn n_times(&self) -> usize {
        self.values.ncols()
    }

    /// Number of frequency bins.
    #[inline]
    pub fn n_freqs(&self) -> usize {
        self.values.nrows()
    }

    /// Start time in seconds.
    #[inline]
    pub fn time_min(&self) -> f64 {
        self.time_min
    }

    /// End time in seconds.
    #[inline]
    pub fn time_max(&self) -> f64 {
        self.time_max
    }

    /// Minimum frequency in Hz.
    #[inline]
    pub fn freq_min(&self) -> f64 {
        self.freq_min
    }

    /// Maximum frequency in Hz.
    #[inline]
    pub fn freq_max(&self) -> f64 {
        self.freq_max
    }

    /// Time step between frames.
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Frequency step between bins.
    #[inline]
    pub fn freq_step(&self) -> f64 {
        self.freq_step
    }

    /// Get time for a frame index (0-based).
    ///
    /// Time = t1 + frame × time_step
    #[inline]
    pub fn get_time_from_frame(&self, frame: usize) -> f64 {
        self.t1 + frame as f64 * self.time_step
    }

    /// Get frequency for a bin index (0-based).
    ///
    /// Frequency = freq_min + bin × freq_step
    #[inline]
    pub fn get_freq_from_bin(&self, bin_index: usize) -> f64 {
        self.freq_min + bin_index as f64 * self.freq_step
    }

    /// Get array of all time points.
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_times())
            .map(|i| self.get_time_from_frame(i))
            .collect()
    }

    /// Get array of all frequency points.
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.n_freqs())
            .map(|i| self.get_freq_from_bin(i))
            .collect()
    }

    /// Power at the grid cell nearest to `(time, frequency)`.
    ///
    /// Returns NaN outside the time or frequency range.
    pub fn power_at(&self, time: f64, frequency: f64) -> f64 {
        if self.n_times() == 0 || self.n_freqs() == 0 {
            return f64::NAN;
        }
        let frame = ((time - self.t1) / self.time_step).round();
        let bin = ((frequency - self.freq_min) / self.freq_step).round();
        if frame < 0.0 || frame >= self.n_times() as f64 || bin < 0.0 || bin >= self.n_freqs() as f64 {
            return f64::NAN;
        }
        self.values[[bin as usize, frame as usize]]
    }
}

impl Sampled for Spectrogram {
    fn xmin(&self) -> f64 {
        self.time_min
    }
    fn xmax(&self) -> f64 {
        self.time_max
    }
    fn nx(&self) -> usize {
        self.n_times()
    }
    fn dx(&self) -> f64 {
        self.time_step
    }
    fn x1(&self) -> f64 {
        self.t1
    }
}

/// Energy-normalized Gaussian window, `w(n) = exp(-α × ((n - c) / c)²)`
/// with `c = (N-1)/2`, scaled so that Σw² = 1.
fn gaussian_window(n: usize, alpha: f64) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0];
    }

    // Window center
    let mid = (n - 1) as f64 / 2.0;

    // Generate unnormalized Gaussian
    let window: Vec<f64> = (0..n)
        .map(|i| {
            // Map to [-1, 1] range centered at mid
            let x = (i as f64 - mid) / mid;
            // Gaussian: exp(-α × x²)
            (-alpha * x * x).exp()
        })
        .collect();

    // Energy normalization: divide by sqrt(sum of squares)
    // This ensures consistent power measurements regardless of window size
    let energy: f64 = window.iter().map(|&w| w * w).sum();
    let norm = energy.sqrt();

    window.iter().map(|&w| w / norm).collect()
}

/// Hanning window, `w(n) = 0.5 - 0.5 × cos(2πn / (N-1))`.
fn hanning_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0];
    }

    (0..n)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos()
        })
        .collect()
}

/// Compute a spectrogram with a Gaussian window.
///
/// # Arguments
///
/// * `window_length` - Effective window length in seconds (typical: 0.005)
/// * `max_frequency` - Maximum frequency in Hz (typical: 5000)
/// * `time_step` - Time step between frames in seconds (typical: 0.002)
/// * `frequency_step` - Frequency resolution in Hz (typical: 20)
pub fn sound_to_spectrogram(
    sound: &Sound,
    window_length: f64,
    max_frequency: f64,
    time_step: f64,
    frequency_step: f64,
) -> Spectrogram {
    sound_to_spectrogram_with_shape(
        sound,
        window_length,
        max_frequency,
        time_step,
        frequency_step,
        WindowShape::Gaussian,
    )
}

/// Compute a spectrogram with an explicit window shape.
///
/// Multi-channel sounds are analysed on their channel average.
pub fn sound_to_spectrogram_with_shape(
    sound: &Sound,
    window_length: f64,
    max_frequency: f64,
    time_step: f64,
    frequency_step: f64,
    window_shape: WindowShape,
) -> Spectrogram {
    let samples = sound.mono();
    let sample_rate = sound.sample_rate();
    let duration = sound.duration();
    let offset = sound.xmin();
    let first_sample_time = sound.x1() - offset;

    // Physical window duration
    // For Gaussian: physical = 2× effective (documented in Praat manual)
    // For Hanning: physical = effective
    let physical_window_duration = match window_shape {
        WindowShape::Gaussian => 2.0 * window_length,
        WindowShape::Hanning => window_length,
    };

    // Number of samples in physical window
    let mut window_samples = (physical_window_duration * sample_rate).round() as usize;
    if window_samples % 2 == 0 {
        window_samples += 1;  // Ensure odd for symmetric window
    }
    let half_window = window_samples / 2;

    // Generate window function
    let window = match window_shape {
        // α = 12.0 gives good frequency resolution with reasonable sidelobes
        WindowShape::Gaussian => gaussian_window(window_samples, 12.0),
        WindowShape::Hanning => hanning_window(window_samples),
    };

    // Frame timing: centered in signal
    // First frame must be at least half_window from start
    // Last frame must be at least half_window from end
    let n_frames = if duration > physical_window_duration {
        ((duration - physical_window_duration) / time_step).floor() as usize + 1
    } else {
        1
    };

    // Center frames symmetrically in signal
    let t1 = (duration - (n_frames - 1) as f64 * time_step) / 2.0;

    // FFT size determination
    // Must be large enough for:
    // - The window samples (obviously)
    // - Desired frequency resolution: sample_rate / fft_size ≤ frequency_step
    let min_fft_size = (sample_rate / frequency_step).ceil() as usize;
    let mut fft_size = 1;
    while fft_size < window_samples.max(min_fft_size) {
        fft_size *= 2;  // Use power of 2 for efficient FFT
    }

    // Actual frequency resolution from FFT (may be finer than user-requested)
    // Store at FFT bin resolution, matching Praat's behavior
    let df_fft = sample_rate / fft_size as f64;

    // Number of frequency bins from 0 to max_frequency at FFT resolution
    let n_freq_bins = (max_frequency / df_fft).round() as usize;

    // Set up FFT
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    // Initialize output array: (n_freq_bins rows, n_frames columns)
    let mut values = Array2::<f64>::zeros((n_freq_bins, n_frames));

    let n_samples = samples.len() as isize;

    // Process each frame
    for i in 0..n_frames {
        let t = t1 + i as f64 * time_step;

        // Extract frame centered at time t, zero-padded at the edges
        let center = ((t - first_sample_time) * sample_rate).round() as isize;
        let start = center - half_window as isize;

        let mut frame = vec![0.0; window_samples];
        for (j, slot) in frame.iter_mut().enumerate() {
            let src = start + j as isize;
            if src >= 0 && src < n_samples {
                *slot = samples[src as usize];
            }
        }

        // Apply window function
        // This reduces spectral leakage from edge discontinuities
        let windowed: Vec<f64> = frame
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| s * w)
            .collect();

        // Zero-pad to FFT size
        // Zero-padding provides frequency domain interpolation
        let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); fft_size];
        for (j, &s) in windowed.iter().enumerate() {
            buffer[j] = Complex::new(s, 0.0);
        }

        // Compute FFT: X[k] = Σ x[n] × e^(-2πikn/N)
        fft.process(&mut buffer);

        // Compute power spectrum: |X(f)|² = Re² + Im²
        // Only need positive frequencies (0 to Nyquist)
        let power: Vec<f64> = buffer[..fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm_sqr())  // |c|² = Re² + Im²
            .collect();

        // Store power directly at FFT bin resolution
        for j in 0..n_freq_bins.min(power.len()) {
            values[[j, i]] = power[j];
        }
    }

    Spectrogram::new(
        values,
        sound.xmin(),
        sound.xmax(),
        0.0,           // freq_min
        max_frequency, // freq_max
        time_step,
        df_fft,        // actual FFT frequency resolution
        offset + t1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn tone(freq: f64) -> Sound {
        let sr = 16000.0;
        let samples = Array1::from_iter((0..8000).map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sr).sin()));
        Sound::new(samples, sr)
    }

    #[test]
    fn energy_concentrates_at_the_tone() {
        let spectrogram = tone(1000.0).to_spectrogram(0.005, 5000.0, 0.002, 20.0);
        let mid = spectrogram.xs()[spectrogram.nx() / 2];
        let at_tone = spectrogram.power_at(mid, 1000.0);
        let away = spectrogram.power_at(mid, 3000.0);
        assert!(at_tone > 1000.0 * away, "{} vs {}", at_tone, away);
    }

    #[test]
    fn power_outside_grid_is_undefined() {
        let spectrogram = tone(500.0).to_spectrogram(0.005, 5000.0, 0.002, 20.0);
        assert!(spectrogram.power_at(-1.0, 500.0).is_nan());
        assert!(spectrogram.power_at(0.25, 9000.0).is_nan());
        assert_eq!(spectrogram.xmin(), 0.0);
        assert_eq!(spectrogram.xmax(), 0.5);
    }
}
