//! Sound - Audio samples on a regular time grid.
//!
//! This is the foundation type for all acoustic analysis in the engine.
//!
//! # Channels
//!
//! Samples are stored as a `channels × samples` matrix. Analyses that need a
//! single signal (intensity, pitch, spectrogram) work on the average of all
//! channels, like Praat does for multi-channel sounds.
//!
//! # Time Domain
//!
//! A Sound covers `[xmin, xmax]`. Sample `i` (0-based) sits at
//! `x1 + i × dx`; for a sound read from disk `xmin = 0` and `x1 = dx / 2`,
//! so samples are centred in their sampling periods. Extracted parts may
//! keep their original times, in which case `xmin` is not zero.
//!
//! # Sample Format
//!
//! Audio samples are stored as 64-bit floating point values, normalized to
//! the range [-1.0, 1.0] for integer formats.

use std::io::Read;
use std::path::Path;

use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use num_complex::Complex64;

use crate::error::{praat_bail, Error, Result};
use crate::formant::Formant;
use crate::harmonicity::Harmonicity;
use crate::intensity::Intensity;
use crate::pitch::Pitch;
use crate::point_process::PointProcess;
use crate::sampled::Sampled;
use crate::spectrogram::Spectrogram;
use crate::spectrum::Spectrum;
use crate::textgrid::TextGrid;

/// Windows available for `Extract part`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowShape {
    /// No tapering.
    Rectangular,
    /// Linear taper to zero at both ends.
    Triangular,
    /// 1 - x² over the window.
    Parabolic,
    /// Raised cosine.
    Hanning,
    /// Raised cosine on a pedestal of 0.08.
    Hamming,
}

impl std::str::FromStr for WindowShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rectangular" => Ok(WindowShape::Rectangular),
            "triangular" => Ok(WindowShape::Triangular),
            "parabolic" => Ok(WindowShape::Parabolic),
            "hanning" => Ok(WindowShape::Hanning),
            "hamming" => Ok(WindowShape::Hamming),
            _ => Err(Error::praat(format!("Unknown window shape \"{}\".", s))),
        }
    }
}

impl WindowShape {
    /// Window value at relative position `phase` in `[0, 1]`.
    fn value(self, phase: f64) -> f64 {
        use std::f64::consts::PI;
        if !(0.0..=1.0).contains(&phase) {
            return 0.0;
        }
        match self {
            WindowShape::Rectangular => 1.0,
            WindowShape::Triangular => 1.0 - (2.0 * phase - 1.0).abs(),
            WindowShape::Parabolic => {
                let x = 2.0 * phase - 1.0;
                1.0 - x * x
            }
            WindowShape::Hanning => 0.5 - 0.5 * (2.0 * PI * phase).cos(),
            WindowShape::Hamming => 0.54 - 0.46 * (2.0 * PI * phase).cos(),
        }
    }
}

/// Peak interpolation used by `Get maximum` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakInterpolation {
    /// Use the raw sample values.
    None,
    /// Refine extrema with a parabola through three samples.
    Parabolic,
}

impl std::str::FromStr for PeakInterpolation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(PeakInterpolation::None),
            // Higher-order interpolations fall back on the parabola.
            "parabolic" | "cubic" | "sinc70" | "sinc700" => Ok(PeakInterpolation::Parabolic),
            _ => Err(Error::praat(format!("Unknown interpolation \"{}\".", s))),
        }
    }
}

/// Represents audio samples with sample rate.
///
/// # Example
///
/// ```no_run
/// use praatfan_bridge::Sound;
///
/// let sound = Sound::from_file("audio.wav").unwrap();
/// println!("Duration: {:.3}s", sound.duration());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    /// Samples as a `channels × samples` matrix.
    values: Array2<f64>,
    /// Start of the time domain.
    xmin: f64,
    /// End of the time domain.
    xmax: f64,
    /// Sampling period in seconds.
    dx: f64,
    /// Time of the first sample.
    x1: f64,
}

impl Sound {
    /// Create a mono Sound from samples and sample rate.
    pub fn new(samples: Array1<f64>, sample_rate: f64) -> Self {
        let n = samples.len();
        let values = samples.insert_axis(Axis(0));
        Self::with_domain(values, 0.0, n as f64 / sample_rate, 1.0 / sample_rate, 0.5 / sample_rate)
    }

    /// Create a mono Sound from a slice of samples.
    pub fn from_slice(samples: &[f64], sample_rate: f64) -> Self {
        Self::new(Array1::from_vec(samples.to_vec()), sample_rate)
    }

    /// Create a Sound from a `channels × samples` matrix starting at time 0.
    pub fn from_channels(values: Array2<f64>, sample_rate: f64) -> Self {
        let n = values.ncols();
        Self::with_domain(values, 0.0, n as f64 / sample_rate, 1.0 / sample_rate, 0.5 / sample_rate)
    }

    /// Create a Sound with an explicit time domain.
    pub fn with_domain(values: Array2<f64>, xmin: f64, xmax: f64, dx: f64, x1: f64) -> Self {
        Self {
            values,
            xmin,
            xmax,
            dx,
            x1,
        }
    }

    /// A silent Sound spanning `[start, end]`, the way `Create Sound from
    /// formula` lays out its samples before evaluating the formula.
    pub fn zeros(channels: usize, start: f64, end: f64, sample_rate: f64) -> Result<Self> {
        if end <= start {
            praat_bail!("End time should be greater than start time.");
        }
        if sample_rate <= 0.0 {
            praat_bail!("Sampling frequency should be positive.");
        }
        if channels == 0 {
            praat_bail!("Number of channels should be at least 1.");
        }
        let n = ((end - start) * sample_rate).round() as usize;
        if n == 0 {
            praat_bail!("Sound would have no samples.");
        }
        let dx = 1.0 / sample_rate;
        let x1 = 0.5 * (start + end - (n as f64 - 1.0) * dx);
        Ok(Self::with_domain(Array2::zeros((channels, n)), start, end, dx, x1))
    }

    /// Load audio from a WAV file. All channels are kept.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        Self::from_wav_reader(reader)
    }

    /// Load audio from WAV bytes in any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = hound::WavReader::new(reader)?;
        Self::from_wav_reader(reader)
    }

    fn from_wav_reader<R: Read>(reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let n_channels = spec.channels as usize;
        let sample_rate = spec.sample_rate as f64;

        // Convert samples to f64, normalizing integer formats
        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| v as f64))
                .collect::<std::result::Result<Vec<f64>, _>>()?,
            hound::SampleFormat::Int => {
                // max_val = 2^(bits-1), e.g., 32768 for 16-bit audio
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / max_val))
                    .collect::<std::result::Result<Vec<f64>, _>>()?
            }
        };

        // WAV stores interleaved frames: [L0, R0, L1, R1, ...]
        let n_samples = interleaved.len() / n_channels.max(1);
        let values = Array2::from_shape_fn((n_channels, n_samples), |(c, i)| interleaved[i * n_channels + c]);
        Ok(Self::from_channels(values, sample_rate))
    }

    /// Write the Sound as a 16-bit PCM WAV file.
    ///
    /// Returns the number of samples that had to be clipped to `[-1, 1]`.
    pub fn save_wav<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let spec = hound::WavSpec {
            channels: self.n_channels() as u16,
            sample_rate: self.sample_rate().round() as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        let mut clipped = 0;
        for i in 0..self.n_samples() {
            for c in 0..self.n_channels() {
                let mut v = self.values[[c, i]];
                if v > 1.0 {
                    v = 1.0;
                    clipped += 1;
                } else if v < -1.0 {
                    v = -1.0;
                    clipped += 1;
                }
                let q = (v * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(q)?;
            }
        }
        writer.finalize()?;
        Ok(clipped)
    }

    // ========== Accessors ==========

    /// All samples, `channels × samples`.
    #[inline]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Mutable access to the samples.
    #[inline]
    pub fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.values
    }

    /// One channel (0-based).
    #[inline]
    pub fn channel(&self, channel: usize) -> ArrayView1<'_, f64> {
        self.values.row(channel)
    }

    /// The average of all channels.
    pub fn mono(&self) -> Array1<f64> {
        if self.n_channels() == 1 {
            return self.values.row(0).to_owned();
        }
        self.values
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.n_samples()))
    }

    /// Number of channels.
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.values.nrows()
    }

    /// Number of samples per channel.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// Sampling frequency in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        1.0 / self.dx
    }

    /// Length of the time domain in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Time of 0-based sample `i`.
    #[inline]
    pub fn sample_time(&self, i: usize) -> f64 {
        self.x1 + i as f64 * self.dx
    }

    /// The 0-based sample range `[first, last)` inside `[tmin, tmax]`.
    ///
    /// A range with `tmax <= tmin` selects the whole sound.
    pub fn sample_range(&self, tmin: f64, tmax: f64) -> (usize, usize) {
        let (tmin, tmax) = if tmax <= tmin { (self.xmin, self.xmax) } else { (tmin, tmax) };
        let first = ((tmin - self.x1) / self.dx).ceil().max(0.0) as usize;
        let last = (((tmax - self.x1) / self.dx).floor() + 1.0).max(0.0) as usize;
        (first.min(self.n_samples()), last.min(self.n_samples()))
    }

    // ========== Queries ==========

    /// Root-mean-square amplitude over `[tmin, tmax]`, averaged over channels.
    pub fn rms(&self, tmin: f64, tmax: f64) -> f64 {
        let (first, last) = self.sample_range(tmin, tmax);
        if last <= first {
            return f64::NAN;
        }
        let part = self.values.slice(s![.., first..last]);
        let mean_square = part.iter().map(|v| v * v).sum::<f64>() / part.len() as f64;
        mean_square.sqrt()
    }

    /// Energy (∫x² dt) over `[tmin, tmax]`, averaged over channels.
    pub fn energy(&self, tmin: f64, tmax: f64) -> f64 {
        let (first, last) = self.sample_range(tmin, tmax);
        if last <= first {
            return f64::NAN;
        }
        let part = self.values.slice(s![.., first..last]);
        part.iter().map(|v| v * v).sum::<f64>() * self.dx / self.n_channels() as f64
    }

    /// Largest sample value over `[tmin, tmax]`.
    pub fn maximum(&self, tmin: f64, tmax: f64, interpolation: PeakInterpolation) -> f64 {
        self.extremum(tmin, tmax, interpolation, 1.0)
    }

    /// Smallest sample value over `[tmin, tmax]`.
    pub fn minimum(&self, tmin: f64, tmax: f64, interpolation: PeakInterpolation) -> f64 {
        self.extremum(tmin, tmax, interpolation, -1.0)
    }

    fn extremum(&self, tmin: f64, tmax: f64, interpolation: PeakInterpolation, sign: f64) -> f64 {
        let (first, last) = self.sample_range(tmin, tmax);
        if last <= first {
            return f64::NAN;
        }
        let mut best = f64::NEG_INFINITY;
        for c in 0..self.n_channels() {
            let channel = self.channel(c);
            for i in first..last {
                let mut v = sign * channel[i];
                if interpolation == PeakInterpolation::Parabolic && i > first && i + 1 < last {
                    let (a, b, cc) = (sign * channel[i - 1], v, sign * channel[i + 1]);
                    if b >= a && b >= cc {
                        v = parabolic_peak(a, b, cc).1;
                    }
                }
                best = best.max(v);
            }
        }
        sign * best
    }

    /// Sample value at 1-based `sample_number`; channel 0 averages all channels.
    pub fn value_at_sample(&self, sample_number: usize, channel: usize) -> f64 {
        if sample_number < 1 || sample_number > self.n_samples() || channel > self.n_channels() {
            return f64::NAN;
        }
        let i = sample_number - 1;
        if channel == 0 {
            self.values.column(i).mean().unwrap_or(f64::NAN)
        } else {
            self.values[[channel - 1, i]]
        }
    }

    /// Continuous-time Fourier transform of the first channel at `frequency`.
    pub fn fourier_coefficient(&self, frequency: f64) -> Complex64 {
        let omega = -2.0 * std::f64::consts::PI * frequency;
        self.channel(0)
            .iter()
            .enumerate()
            .map(|(i, &v)| Complex64::from_polar(v * self.dx, omega * self.sample_time(i)))
            .sum()
    }

    // ========== Modifications ==========

    /// Multiply all samples by `factor`.
    pub fn multiply(&mut self, factor: f64) {
        self.values.mapv_inplace(|v| v * factor);
    }

    /// Scale so that the absolute peak equals `new_peak`.
    pub fn scale_peak(&mut self, new_peak: f64) {
        let peak = self.values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if peak > 0.0 {
            self.multiply(new_peak / peak);
        }
    }

    // ========== Conversions ==========

    /// Extract the part between `from` and `to`, multiplied by a window.
    ///
    /// `relative_width` stretches the window around the part's centre. With
    /// `preserve_times` the part keeps its original time domain; otherwise
    /// it starts at zero.
    pub fn extract_part(
        &self,
        from: f64,
        to: f64,
        window: WindowShape,
        relative_width: f64,
        preserve_times: bool,
    ) -> Result<Sound> {
        let (from, to) = if to <= from { (self.xmin, self.xmax) } else { (from, to) };
        let (first, last) = self.sample_range(from, to);
        if last <= first {
            praat_bail!("Extracted Sound would contain no samples.");
        }
        let mut values = self.values.slice(s![.., first..last]).to_owned();
        let width = (to - from) * relative_width;
        let window_start = 0.5 * (from + to) - 0.5 * width;
        for (k, mut column) in values.axis_iter_mut(Axis(1)).enumerate() {
            let t = self.sample_time(first + k);
            let w = window.value((t - window_start) / width);
            column.mapv_inplace(|v| v * w);
        }
        let x1 = self.sample_time(first);
        let sound = if preserve_times {
            Sound::with_domain(values, from, to, self.dx, x1)
        } else {
            Sound::with_domain(values, 0.0, to - from, self.dx, x1 - from)
        };
        Ok(sound)
    }

    /// Copy one channel (1-based) into a new mono Sound.
    pub fn extract_channel(&self, channel: usize) -> Result<Sound> {
        if channel < 1 || channel > self.n_channels() {
            praat_bail!(
                "Your channel number ({}) should not exceed the number of channels ({}).",
                channel,
                self.n_channels()
            );
        }
        let values = self.values.slice(s![channel - 1..channel, ..]).to_owned();
        Ok(Sound::with_domain(values, self.xmin, self.xmax, self.dx, self.x1))
    }

    /// Average all channels into a new mono Sound.
    pub fn convert_to_mono(&self) -> Sound {
        let values = self.mono().insert_axis(Axis(0));
        Sound::with_domain(values, self.xmin, self.xmax, self.dx, self.x1)
    }

    // ========== Analysis Methods ==========

    /// Compute intensity contour.
    ///
    /// # Arguments
    ///
    /// * `min_pitch` - Minimum pitch in Hz; sets the window length.
    /// * `time_step` - Time step in seconds. Use 0 for auto (0.8/min_pitch).
    /// * `subtract_mean` - Remove the DC offset of each frame first.
    pub fn to_intensity(&self, min_pitch: f64, time_step: f64, subtract_mean: bool) -> Intensity {
        crate::intensity::sound_to_intensity(self, min_pitch, time_step, subtract_mean)
    }

    /// Compute pitch (F0) contour using the autocorrelation method.
    pub fn to_pitch_ac(&self, time_step: f64, pitch_floor: f64, pitch_ceiling: f64) -> Pitch {
        crate::pitch::sound_to_pitch_ac(self, time_step, pitch_floor, pitch_ceiling)
    }

    /// Compute pitch (F0) contour using the cross-correlation method.
    pub fn to_pitch_cc(&self, time_step: f64, pitch_floor: f64, pitch_ceiling: f64) -> Pitch {
        crate::pitch::sound_to_pitch_cc(self, time_step, pitch_floor, pitch_ceiling)
    }

    /// Compute spectrogram (time-frequency representation).
    pub fn to_spectrogram(
        &self,
        window_length: f64,
        max_frequency: f64,
        time_step: f64,
        frequency_step: f64,
    ) -> Spectrogram {
        crate::spectrogram::sound_to_spectrogram(self, window_length, max_frequency, time_step, frequency_step)
    }

    /// Compute formant tracks using Burg's LPC method.
    ///
    /// # Arguments
    ///
    /// * `time_step` - Time step in seconds (0 = auto)
    /// * `max_num_formants` - Formants per frame (Praat's default is 5)
    /// * `max_formant_hz` - Formant ceiling (5500 Hz for female voices)
    /// * `window_length` - Half the physical window, in seconds
    /// * `pre_emphasis_from` - Pre-emphasis from this frequency in Hz
    pub fn to_formant_burg(
        &self,
        time_step: f64,
        max_num_formants: f64,
        max_formant_hz: f64,
        window_length: f64,
        pre_emphasis_from: f64,
    ) -> Formant {
        crate::formant::sound_to_formant_burg(
            self,
            time_step,
            max_num_formants,
            max_formant_hz,
            window_length,
            pre_emphasis_from,
        )
    }

    /// Harmonics-to-noise ratio by autocorrelation.
    pub fn to_harmonicity_ac(
        &self,
        time_step: f64,
        min_pitch: f64,
        silence_threshold: f64,
        periods_per_window: f64,
    ) -> Harmonicity {
        crate::harmonicity::sound_to_harmonicity_ac(self, time_step, min_pitch, silence_threshold, periods_per_window)
    }

    /// Harmonics-to-noise ratio by cross-correlation.
    pub fn to_harmonicity_cc(
        &self,
        time_step: f64,
        min_pitch: f64,
        silence_threshold: f64,
        periods_per_window: f64,
    ) -> Harmonicity {
        crate::harmonicity::sound_to_harmonicity_cc(self, time_step, min_pitch, silence_threshold, periods_per_window)
    }

    /// Fourier transform of the whole sound.
    pub fn to_spectrum(&self, fast: bool) -> Spectrum {
        crate::spectrum::sound_to_spectrum(self, fast)
    }

    /// Glottal pulses from a cross-correlation pitch analysis.
    pub fn to_point_process_periodic_cc(&self, pitch_floor: f64, pitch_ceiling: f64) -> PointProcess {
        let pitch = self.to_pitch_cc(0.0, pitch_floor, pitch_ceiling);
        crate::point_process::sound_pitch_to_point_process_cc(self, &pitch)
    }

    /// Glottal pulses at waveform peaks of each pitch period.
    pub fn to_point_process_periodic_peaks(
        &self,
        pitch_floor: f64,
        pitch_ceiling: f64,
        include_maxima: bool,
        include_minima: bool,
    ) -> PointProcess {
        let pitch = self.to_pitch_cc(0.0, pitch_floor, pitch_ceiling);
        crate::point_process::sound_pitch_to_point_process_peaks(self, &pitch, include_maxima, include_minima)
    }

    /// Times of local maxima and/or minima of one channel (1-based).
    pub fn to_point_process_extrema(
        &self,
        channel: usize,
        include_maxima: bool,
        include_minima: bool,
        interpolation: PeakInterpolation,
    ) -> Result<PointProcess> {
        crate::point_process::sound_to_point_process_extrema(self, channel, include_maxima, include_minima, interpolation)
    }

    /// An empty TextGrid spanning this Sound.
    pub fn to_textgrid(&self, tier_names: &str, point_tiers: &str) -> Result<TextGrid> {
        TextGrid::from_names(self.xmin, self.xmax, tier_names, point_tiers)
    }
}

/// Vertex of the parabola through `(-1, a)`, `(0, b)`, `(1, c)`:
/// returns `(offset, value)`.
pub(crate) fn parabolic_peak(a: f64, b: f64, c: f64) -> (f64, f64) {
    let denom = a - 2.0 * b + c;
    if denom.abs() < 1e-300 {
        return (0.0, b);
    }
    let offset = 0.5 * (a - c) / denom;
    if offset.abs() >= 1.0 {
        return (0.0, b);
    }
    (offset, b - 0.25 * (a - c) * offset)
}

impl Sampled for Sound {
    fn xmin(&self) -> f64 {
        self.xmin
    }
    fn xmax(&self) -> f64 {
        self.xmax
    }
    fn nx(&self) -> usize {
        self.n_samples()
    }
    fn dx(&self) -> f64 {
        self.dx
    }
    fn x1(&self) -> f64 {
        self.x1
    }
}

impl std::fmt::Display for Sound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sound({} channel(s), {} samples, {} Hz, {:.3}s)",
            self.n_channels(),
            self.n_samples(),
            self.sample_rate(),
            self.duration()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sr: f64, seconds: f64) -> Sound {
        let n = (sr * seconds) as usize;
        let samples = Array1::from_iter((0..n).map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sr).sin()));
        Sound::new(samples, sr)
    }

    #[test]
    fn mono_and_stereo_layouts() {
        let sound = sine(100.0, 100.0, 1.0);
        assert_eq!(sound.n_channels(), 1);
        assert_eq!(sound.n_samples(), 100);
        assert_eq!(sound.duration(), 1.0);

        let stereo = Sound::from_channels(Array2::from_shape_fn((2, 4), |(c, i)| (c * 10 + i) as f64), 4.0);
        assert_eq!(stereo.n_channels(), 2);
        assert_eq!(stereo.mono().to_vec(), vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(stereo.value_at_sample(2, 2), 11.0);
        assert_eq!(stereo.value_at_sample(2, 0), 6.0);
        assert!(stereo.value_at_sample(5, 1).is_nan());
    }

    #[test]
    fn rms_of_a_sine_is_one_over_root_two() {
        let sound = sine(10.0, 1000.0, 1.0);
        assert!((sound.rms(0.0, 0.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((sound.energy(0.0, 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn scale_peak_and_multiply() {
        let mut sound = Sound::from_slice(&[0.1, -0.4, 0.2], 3.0);
        sound.scale_peak(0.8);
        assert!((sound.minimum(0.0, 0.0, PeakInterpolation::None) + 0.8).abs() < 1e-12);
        sound.multiply(2.0);
        assert!((sound.maximum(0.0, 0.0, PeakInterpolation::None) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn extract_part_keeps_or_resets_times() {
        let sound = sine(5.0, 100.0, 1.0);
        let kept = sound.extract_part(0.2, 0.4, WindowShape::Rectangular, 1.0, true).unwrap();
        assert_eq!(kept.xmin(), 0.2);
        assert_eq!(kept.xmax(), 0.4);
        assert_eq!(kept.n_samples(), 20);
        let reset = sound.extract_part(0.2, 0.4, WindowShape::Rectangular, 1.0, false).unwrap();
        assert_eq!(reset.xmin(), 0.0);
        assert!((reset.x1() - 0.005).abs() < 1e-12);
        assert_eq!(reset.values(), kept.values());
    }

    #[test]
    fn extract_channel_checks_range() {
        let sound = sine(5.0, 100.0, 0.1);
        assert!(sound.extract_channel(1).is_ok());
        let err = sound.extract_channel(2).unwrap_err();
        assert!(err.to_string().contains("number of channels (1)"));
    }

    #[test]
    fn fourier_coefficient_of_a_sine() {
        let sound = sine(10.0, 1000.0, 1.0);
        // sin(ωt) has coefficient -i/2 at +f, up to the half-sample phase shift.
        let z = sound.fourier_coefficient(10.0);
        assert!((z.norm() - 0.5).abs() < 1e-3);
        assert!(z.im < -0.49);
        assert!(sound.fourier_coefficient(37.0).norm() < 1e-3);
    }

    #[test]
    fn zeros_centres_samples_in_domain() {
        let sound = Sound::zeros(1, 0.0, 1.0, 10.0).unwrap();
        assert_eq!(sound.n_samples(), 10);
        assert!((sound.x1() - 0.05).abs() < 1e-12);
        assert!(Sound::zeros(1, 1.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn wav_round_trip_reports_clipping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let sound = Sound::from_slice(&[0.5, 1.5, -2.0, 0.0], 8000.0);
        assert_eq!(sound.save_wav(&path).unwrap(), 2);
        let back = Sound::from_file(&path).unwrap();
        assert_eq!(back.n_samples(), 4);
        assert!((back.values()[[0, 0]] - 0.5).abs() < 1e-4);
        assert!((back.values()[[0, 1]] - 32767.0 / 32768.0).abs() < 1e-9);
    }
}
