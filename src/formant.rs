//! Formant - LPC-based formant frequency tracks.
//!
//! Key facts of `Sound: To Formant (burg)...`:
//! - The window length parameter is half the physical (Gaussian) window
//! - The sound is resampled to 2 × maximum formant before analysis
//! - Pre-emphasis: x'[i] = x[i] - α × x[i-1], α = exp(-2π × F × Δt)
//! - LPC order: 2 × number of formants (Burg's algorithm)
//! - Formants below 50 Hz or above (maximum formant - 50 Hz) are dropped
//!
//! A root z = r·e^(iθ) of the prediction polynomial gives the frequency
//! θ·fs/2π and the bandwidth -ln(r)·fs/π.

use ndarray::Array1;
use num_complex::Complex64;
use rubato::{FftFixedIn, Resampler};

use crate::error::{Error, Result};
use crate::sampled::Sampled;
use crate::sound::Sound;

/// A single formant at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantPoint {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Bandwidth in Hz.
    pub bandwidth: f64,
}

impl FormantPoint {
    pub fn new(frequency: f64, bandwidth: f64) -> Self {
        Self { frequency, bandwidth }
    }
}

/// Formants of one analysis frame, lowest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FormantFrame {
    /// Time in seconds.
    pub time: f64,
    /// Mean power of the windowed frame.
    pub intensity: f64,
    pub formants: Vec<FormantPoint>,
}

impl FormantFrame {
    pub fn new(time: f64, intensity: f64, formants: Vec<FormantPoint>) -> Self {
        Self {
            time,
            intensity,
            formants,
        }
    }

    #[inline]
    pub fn n_formants(&self) -> usize {
        self.formants.len()
    }

    /// Formant `n` (1-based).
    pub fn get_formant(&self, n: usize) -> Option<&FormantPoint> {
        n.checked_sub(1).and_then(|i| self.formants.get(i))
    }
}

/// Formant tracks over time.
#[derive(Debug, Clone, PartialEq)]
pub struct Formant {
    xmin: f64,
    xmax: f64,
    frames: Vec<FormantFrame>,
    time_step: f64,
    /// Most formants any frame may hold.
    max_num_formants: usize,
}

impl Formant {
    pub fn new(xmin: f64, xmax: f64, frames: Vec<FormantFrame>, time_step: f64, max_num_formants: usize) -> Self {
        Self {
            xmin,
            xmax,
            frames,
            time_step,
            max_num_formants,
        }
    }

    #[inline]
    pub fn frames(&self) -> &[FormantFrame] {
        &self.frames
    }

    #[inline]
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    #[inline]
    pub fn max_num_formants(&self) -> usize {
        self.max_num_formants
    }

    /// Frame times.
    pub fn times(&self) -> Array1<f64> {
        Array1::from_iter(self.frames.iter().map(|f| f.time))
    }

    /// Frequencies of formant `n` per frame (NaN where absent).
    pub fn formant_values(&self, n: usize) -> Array1<f64> {
        self.track(n, |p| p.frequency)
    }

    /// Bandwidths of formant `n` per frame (NaN where absent).
    pub fn bandwidth_values(&self, n: usize) -> Array1<f64> {
        self.track(n, |p| p.bandwidth)
    }

    fn track(&self, n: usize, field: impl Fn(&FormantPoint) -> f64) -> Array1<f64> {
        Array1::from_iter(self.frames.iter().map(|f| f.get_formant(n).map_or(f64::NAN, &field)))
    }

    /// Mean frequency of formant `n` over the frames in `[tmin, tmax]` that
    /// have it; `tmax <= tmin` selects everything.
    pub fn mean(&self, n: usize, tmin: f64, tmax: f64) -> f64 {
        let values: Vec<f64> = self
            .frames
            .iter()
            .filter(|f| tmax <= tmin || (f.time >= tmin && f.time <= tmax))
            .filter_map(|f| f.get_formant(n).map(|p| p.frequency))
            .collect();
        if values.is_empty() {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }

    /// Frequency of formant `n` at `time`.
    ///
    /// `interpolation` is "linear" or "nearest"; `None` outside the frames
    /// or where neither neighbour has the formant.
    pub fn get_value_at_time(&self, n: usize, time: f64, interpolation: &str) -> Result<Option<f64>> {
        self.at_time(n, time, interpolation, |p| p.frequency)
    }

    /// Bandwidth of formant `n` at `time`.
    pub fn get_bandwidth_at_time(&self, n: usize, time: f64, interpolation: &str) -> Result<Option<f64>> {
        self.at_time(n, time, interpolation, |p| p.bandwidth)
    }

    fn at_time(
        &self,
        n: usize,
        time: f64,
        interpolation: &str,
        field: impl Fn(&FormantPoint) -> f64,
    ) -> Result<Option<f64>> {
        if self.n_frames() == 0 {
            return Ok(None);
        }
        let idx_float = (time - self.frames[0].time) / self.time_step;
        if idx_float < -0.5 || idx_float > self.n_frames() as f64 - 0.5 {
            return Ok(None);
        }
        let last = self.n_frames() as isize - 1;
        let value_at = |i: isize| self.frames[i.clamp(0, last) as usize].get_formant(n).map(&field);

        let value = match interpolation.to_ascii_lowercase().as_str() {
            "nearest" => value_at(idx_float.round() as isize),
            "linear" => {
                let idx = idx_float.floor() as isize;
                let frac = idx_float - idx as f64;
                match (value_at(idx), value_at(idx + 1)) {
                    (Some(a), Some(b)) => Some(a * (1.0 - frac) + b * frac),
                    (one, other) => one.or(other),
                }
            }
            other => return Err(Error::praat(format!("Unknown interpolation \"{}\".", other))),
        };
        Ok(value)
    }
}

impl Sampled for Formant {
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
        self.frames.first().map_or(self.xmin, |f| f.time)
    }
}

/// Gaussian window for formant analysis.
fn gaussian_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0];
    }
    let alpha = 12.0;
    let mid = (n - 1) as f64 / 2.0;
    (0..n)
        .map(|i| {
            let x = (i as f64 - mid) / mid;
            (-alpha * x * x).exp()
        })
        .collect()
}

/// LPC coefficients by Burg's algorithm (Childers 1978), `a[0] = 1`.
fn burg_lpc(samples: &[f64], order: usize) -> Vec<f64> {
    let n = samples.len();
    let mut a = vec![0.0; order + 1];
    a[0] = 1.0;
    if n <= order {
        return a;
    }

    // Forward and backward prediction errors
    let mut ef = samples.to_vec();
    let mut eb = samples.to_vec();

    for k in 1..=order {
        let mut num = 0.0;
        let mut den = 0.0;
        for i in k..n {
            num += ef[i] * eb[i - 1];
            den += ef[i] * ef[i] + eb[i - 1] * eb[i - 1];
        }
        if den < 1e-30 {
            break;
        }
        let reflection = -2.0 * num / den;

        let mut ef_new = vec![0.0; n];
        let mut eb_new = vec![0.0; n];
        for i in k..n {
            ef_new[i] = ef[i] + reflection * eb[i - 1];
            eb_new[i] = eb[i - 1] + reflection * ef[i];
        }
        ef = ef_new;
        eb = eb_new;

        // Levinson update
        let previous = a.clone();
        for i in 1..k {
            a[i] = previous[i] + reflection * previous[k - i];
        }
        a[k] = reflection;
    }

    a
}

/// `(P(z), P'(z))` for `P(z) = z^p + a[1] z^(p-1) + ... + a[p]`, by Horner.
fn eval_polynomial(a: &[f64], z: Complex64) -> (Complex64, Complex64) {
    let mut p = Complex64::new(1.0, 0.0);
    let mut dp = Complex64::new(0.0, 0.0);
    for &coeff in a.iter().skip(1) {
        dp = p + z * dp;
        p = p * z + coeff;
    }
    (p, dp)
}

/// Newton-Raphson refinement of one root.
fn polish_root(a: &[f64], mut z: Complex64, max_iter: usize, tol: f64) -> Complex64 {
    for _ in 0..max_iter {
        let (p, dp) = eval_polynomial(a, z);
        if dp.norm() < 1e-30 {
            break;
        }
        let delta = p / dp;
        z -= delta;
        if delta.norm() < tol * z.norm() {
            break;
        }
    }
    z
}

/// Roots of the prediction polynomial.
///
/// All roots are found together by Durand-Kerner iteration, then polished.
/// Roots outside the unit circle are reflected to `1 / conj(z)`.
fn lpc_roots(a: &[f64]) -> Vec<Complex64> {
    let order = a.len().saturating_sub(1);
    if order == 0 {
        return Vec::new();
    }

    let seed = Complex64::new(0.4, 0.9);
    let mut roots: Vec<Complex64> = (0..order).map(|k| seed.powu(k as u32 + 1)).collect();
    for _ in 0..500 {
        let mut largest_step = 0.0f64;
        for i in 0..order {
            let (p, _) = eval_polynomial(a, roots[i]);
            let denominator = roots
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(Complex64::new(1.0, 0.0), |acc, (_, &zj)| acc * (roots[i] - zj));
            if denominator.norm() < 1e-300 {
                continue;
            }
            let step = p / denominator;
            roots[i] -= step;
            largest_step = largest_step.max(step.norm());
        }
        if largest_step < 1e-12 {
            break;
        }
    }

    roots
        .into_iter()
        .map(|z| polish_root(a, z, 10, 1e-10))
        .map(|z| {
            let r = z.norm();
            if r > 1.0 {
                z.conj() / (r * r)
            } else {
                z
            }
        })
        .collect()
}

/// Formants from the roots in the upper half plane, lowest first.
fn roots_to_formants(roots: &[Complex64], sample_rate: f64, min_freq: f64, max_freq: f64) -> Vec<FormantPoint> {
    let mut formants: Vec<FormantPoint> = roots
        .iter()
        .filter(|root| root.im > 0.0)
        .filter_map(|root| {
            let r = root.norm();
            let frequency = root.arg() * sample_rate / (2.0 * std::f64::consts::PI);
            let bandwidth = if r > 0.0 {
                -r.ln() * sample_rate / std::f64::consts::PI
            } else {
                f64::INFINITY
            };
            (frequency >= min_freq && frequency <= max_freq && bandwidth > 0.0)
                .then(|| FormantPoint::new(frequency, bandwidth))
        })
        .collect();
    formants.sort_by(|a, b| a.frequency.partial_cmp(&b.frequency).unwrap_or(std::cmp::Ordering::Equal));
    formants
}

/// Resample with rubato's FFT resampler, compensating its delay.
fn resample(samples: &[f64], old_rate: f64, new_rate: f64) -> Vec<f64> {
    let new_length = (samples.len() as f64 * new_rate / old_rate).round() as usize;
    if samples.is_empty() || new_length == 0 {
        return Vec::new();
    }

    let chunk_size = 1024.min(samples.len());
    let mut resampler = match FftFixedIn::<f64>::new(old_rate as usize, new_rate as usize, chunk_size, 2, 1) {
        Ok(resampler) => resampler,
        Err(e) => {
            log::warn!("FFT resampler unavailable ({}); resampling linearly", e);
            return linear_resample(samples, new_length);
        }
    };

    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(new_length + delay);
    let mut pos = 0;
    while output.len() < new_length + delay {
        let mut chunk = vec![0.0; chunk_size];
        if pos < samples.len() {
            let end = (pos + chunk_size).min(samples.len());
            chunk[..end - pos].copy_from_slice(&samples[pos..end]);
        }
        pos += chunk_size;
        let input = vec![chunk];
        match resampler.process(&input, None) {
            Ok(mut result) if !result.is_empty() && !result[0].is_empty() => output.append(&mut result[0]),
            Ok(_) => break,
            Err(e) => {
                log::warn!("FFT resampling failed ({}); resampling linearly", e);
                return linear_resample(samples, new_length);
            }
        }
    }

    output.drain(..delay.min(output.len()));
    output.resize(new_length, 0.0);
    output
}

/// Linear interpolation onto `new_length` samples.
fn linear_resample(samples: &[f64], new_length: usize) -> Vec<f64> {
    if samples.is_empty() || new_length == 0 {
        return Vec::new();
    }
    let ratio = (samples.len() - 1) as f64 / (new_length - 1).max(1) as f64;
    (0..new_length)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = pos - idx as f64;
            if idx >= samples.len() - 1 {
                samples[samples.len() - 1]
            } else {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            }
        })
        .collect()
}

/// Formants by Burg's LPC method.
///
/// # Arguments
///
/// * `time_step` - Time step in seconds (0 = auto: a quarter of the window length)
/// * `max_num_formants` - Formants to look for; may be a half integer (5.5 gives LPC order 11)
/// * `max_formant_hz` - Ceiling of the formant search
/// * `window_length` - Window length in seconds (the physical window is twice this)
/// * `pre_emphasis_from` - Pre-emphasis from frequency in Hz
pub fn sound_to_formant_burg(
    sound: &Sound,
    time_step: f64,
    max_num_formants: f64,
    max_formant_hz: f64,
    window_length: f64,
    pre_emphasis_from: f64,
) -> Formant {
    let original = sound.mono().to_vec();
    let original_rate = sound.sample_rate();
    let duration = sound.duration();
    let offset = sound.xmin();

    let target_rate = 2.0 * max_formant_hz;
    let (samples, sample_rate) = if target_rate < original_rate {
        (resample(&original, original_rate, target_rate), target_rate)
    } else {
        (original, original_rate)
    };

    // Pre-emphasis
    let alpha = (-2.0 * std::f64::consts::PI * pre_emphasis_from / sample_rate).exp();
    let emphasized: Vec<f64> = samples
        .iter()
        .enumerate()
        .map(|(i, &x)| if i == 0 { x } else { x - alpha * samples[i - 1] })
        .collect();

    let physical_window = 2.0 * window_length;
    let mut window_samples = (physical_window * sample_rate).round() as usize;
    if window_samples % 2 == 0 {
        window_samples += 1;
    }
    let half_window = (window_samples / 2) as isize;
    let window = gaussian_window(window_samples);

    let time_step = if time_step <= 0.0 { window_length / 4.0 } else { time_step };
    let lpc_order = (2.0 * max_num_formants).round().max(1.0) as usize;
    let max_formants = max_num_formants.ceil().max(1.0) as usize;

    // Frames centred in the signal
    let n_frames = if duration > physical_window {
        ((duration - physical_window) / time_step + 1e-9).floor() as usize + 1
    } else {
        1
    };
    let t1 = (duration - (n_frames - 1) as f64 * time_step) / 2.0;
    log::debug!(
        "formant (burg): {} frames at {} Hz, LPC order {}",
        n_frames,
        sample_rate,
        lpc_order
    );

    let n_samples = emphasized.len() as isize;
    let frames = (0..n_frames)
        .map(|i| {
            let t = t1 + i as f64 * time_step;
            let start = (t * sample_rate).round() as isize - half_window;
            let windowed: Vec<f64> = window
                .iter()
                .enumerate()
                .map(|(j, &w)| {
                    let src = start + j as isize;
                    if src >= 0 && src < n_samples {
                        emphasized[src as usize] * w
                    } else {
                        0.0
                    }
                })
                .collect();
            let intensity = windowed.iter().map(|x| x * x).sum::<f64>() / windowed.len() as f64;

            let coefficients = burg_lpc(&windowed, lpc_order);
            let roots = lpc_roots(&coefficients);
            let mut formants = roots_to_formants(&roots, sample_rate, 50.0, max_formant_hz - 50.0);
            formants.truncate(max_formants);
            FormantFrame::new(offset + t, intensity, formants)
        })
        .collect();

    Formant::new(sound.xmin(), sound.xmax(), frames, time_step, max_formants)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    /// White noise through two resonators.
    fn vowel(sample_rate: f64) -> Sound {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let mut samples: Vec<f64> = (0..(0.5 * sample_rate) as usize).map(|_| rng.gen_range(-1.0..1.0)).collect();
        for (freq, bandwidth) in [(500.0, 60.0), (1500.0, 90.0)] {
            let r = (-std::f64::consts::PI * bandwidth / sample_rate).exp();
            let c = 2.0 * r * (2.0 * std::f64::consts::PI * freq / sample_rate).cos();
            let (mut y1, mut y2) = (0.0, 0.0);
            for x in samples.iter_mut() {
                let y = *x + c * y1 - r * r * y2;
                y2 = y1;
                y1 = y;
                *x = y;
            }
        }
        let peak = samples.iter().fold(0.0f64, |m, x| m.max(x.abs()));
        Sound::from_slice(&samples.iter().map(|x| 0.5 * x / peak).collect::<Vec<_>>(), sample_rate)
    }

    fn has_formant_near(frame: &FormantFrame, target: f64, tolerance: f64) -> bool {
        frame.formants.iter().any(|p| (p.frequency - target).abs() < tolerance)
    }

    #[test]
    fn burg_finds_the_resonances() {
        let formant = sound_to_formant_burg(&vowel(11000.0), 0.0, 5.0, 5500.0, 0.025, 50.0);
        assert!(formant.n_frames() > 10);
        let middle = &formant.frames()[formant.n_frames() / 2];
        assert!(has_formant_near(middle, 500.0, 60.0), "{:?}", middle.formants);
        assert!(has_formant_near(middle, 1500.0, 100.0), "{:?}", middle.formants);
        assert!(middle.n_formants() <= 5);
    }

    #[test]
    fn higher_rates_are_resampled_first() {
        let formant = sound_to_formant_burg(&vowel(16000.0), 0.01, 5.0, 5500.0, 0.025, 50.0);
        assert_eq!(formant.time_step(), 0.01);
        assert!(formant.x1() > 0.02 && formant.x1() < 0.06, "x1 {}", formant.x1());
        let middle = &formant.frames()[formant.n_frames() / 2];
        assert!(has_formant_near(middle, 500.0, 80.0), "{:?}", middle.formants);
        assert!(middle.formants.iter().all(|p| p.frequency <= 5450.0));
    }

    #[test]
    fn roots_of_a_known_polynomial() {
        // (z - 0.5)(z + 0.25) = z² - 0.25 z - 0.125
        let mut roots: Vec<f64> = lpc_roots(&[1.0, -0.25, -0.125]).iter().map(|z| z.re).collect();
        roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((roots[0] + 0.25).abs() < 1e-9 && (roots[1] - 0.5).abs() < 1e-9, "{:?}", roots);
    }

    #[test]
    fn queries_interpolate_between_frames() {
        let frame = |t: f64, f1: f64| FormantFrame::new(t, 1.0, vec![FormantPoint::new(f1, 80.0)]);
        let formant = Formant::new(0.0, 0.3, vec![frame(0.05, 500.0), frame(0.15, 600.0), frame(0.25, 700.0)], 0.1, 5);
        let value = formant.get_value_at_time(1, 0.2, "linear").unwrap().unwrap();
        assert!((value - 650.0).abs() < 1e-9);
        assert_eq!(formant.get_value_at_time(2, 0.2, "linear").unwrap(), None);
        assert_eq!(formant.get_bandwidth_at_time(1, 0.16, "nearest").unwrap(), Some(80.0));
        assert!(formant.get_value_at_time(1, 0.2, "cubic").is_err());
        assert!((formant.mean(1, 0.0, 0.0) - 600.0).abs() < 1e-9);
        assert!(formant.formant_values(3).iter().all(|v| v.is_nan()));
    }
}
