//! Spectrum - single-frame Fourier transform of a whole Sound.
//!
//! The transform is scaled by the sample period so that it approximates the
//! continuous Fourier transform, and only the bins from 0 Hz to the Nyquist
//! frequency are kept.
//!
//! # Spectral moments
//!
//! With weights `w_k = |S_k|^p`:
//!
//! - centre of gravity `f_c = Σ f_k w_k / Σ w_k`
//! - central moments `μ_n = Σ (f_k - f_c)^n w_k / Σ w_k`
//! - standard deviation `√μ₂`, skewness `μ₃ / μ₂^1.5`, kurtosis `μ₄ / μ₂² - 3`

use ndarray::{Array1, Array2};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{praat_bail, Result};
use crate::sampled::Sampled;
use crate::sound::Sound;

/// Positive-frequency half of a Fourier transform.
///
/// Bin `k` lies at `k × df` Hz; the last bin is the Nyquist frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    real: Array1<f64>,
    imag: Array1<f64>,
    /// Bin width in Hz.
    df: f64,
    /// Nyquist frequency in Hz.
    f_max: f64,
}

impl Spectrum {
    /// Build a spectrum from its real and imaginary parts.
    pub fn new(real: Array1<f64>, imag: Array1<f64>, df: f64, f_max: f64) -> Result<Self> {
        if real.len() != imag.len() {
            praat_bail!(
                "A Spectrum needs as many imaginary parts as real parts ({} versus {}).",
                imag.len(),
                real.len()
            );
        }
        Ok(Self { real, imag, df, f_max })
    }

    #[inline]
    pub fn real(&self) -> &Array1<f64> {
        &self.real
    }

    #[inline]
    pub fn imag(&self) -> &Array1<f64> {
        &self.imag
    }

    /// Bin width in Hz.
    #[inline]
    pub fn df(&self) -> f64 {
        self.df
    }

    /// Nyquist frequency in Hz.
    #[inline]
    pub fn f_max(&self) -> f64 {
        self.f_max
    }

    #[inline]
    pub fn n_bins(&self) -> usize {
        self.real.len()
    }

    #[inline]
    pub fn get_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.df
    }

    /// Real and imaginary parts as the two rows of a matrix.
    pub fn values(&self) -> Array2<f64> {
        let mut values = Array2::zeros((2, self.n_bins()));
        values.row_mut(0).assign(&self.real);
        values.row_mut(1).assign(&self.imag);
        values
    }

    fn weights(&self, power: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.real.iter().zip(self.imag.iter()).enumerate().map(move |(k, (re, im))| {
            let magnitude = (re * re + im * im).sqrt();
            (self.get_frequency(k), magnitude.powf(power))
        })
    }

    /// First spectral moment in Hz; 0 for silence.
    pub fn get_center_of_gravity(&self, power: f64) -> f64 {
        let (num, den) = self
            .weights(power)
            .fold((0.0, 0.0), |(num, den), (f, w)| (num + f * w, den + w));
        if den == 0.0 {
            0.0
        } else {
            num / den
        }
    }

    fn get_central_moment(&self, n: i32, power: f64) -> f64 {
        let total: f64 = self.weights(power).map(|(_, w)| w).sum();
        if total == 0.0 {
            return 0.0;
        }
        let cog = self.get_center_of_gravity(power);
        self.weights(power).map(|(f, w)| (f - cog).powi(n) * w).sum::<f64>() / total
    }

    /// Spread around the centre of gravity, in Hz.
    pub fn get_standard_deviation(&self, power: f64) -> f64 {
        self.get_central_moment(2, power).sqrt()
    }

    pub fn get_skewness(&self, power: f64) -> f64 {
        let mu2 = self.get_central_moment(2, power);
        if mu2 == 0.0 {
            return 0.0;
        }
        self.get_central_moment(3, power) / mu2.powf(1.5)
    }

    /// Excess kurtosis: 0 for a Gaussian distribution.
    pub fn get_kurtosis(&self, power: f64) -> f64 {
        let mu2 = self.get_central_moment(2, power);
        if mu2 == 0.0 {
            return 0.0;
        }
        self.get_central_moment(4, power) / (mu2 * mu2) - 3.0
    }

    /// Energy between `f_min` and `f_max` in Pa² s; `f_max <= 0` means
    /// up to Nyquist.
    ///
    /// Bins other than 0 Hz and Nyquist count twice, for their negative
    /// frequency twins.
    pub fn get_band_energy(&self, f_min: f64, f_max: f64) -> f64 {
        let n = self.n_bins();
        if n == 0 {
            return 0.0;
        }
        let f_max = if f_max <= 0.0 { self.f_max } else { f_max };
        let first = ((f_min.max(0.0) / self.df).floor() as usize).min(n - 1);
        let last = ((f_max / self.df).ceil() as usize).min(n - 1);
        (first..=last)
            .map(|k| {
                let energy = (self.real[k].powi(2) + self.imag[k].powi(2)) * self.df;
                if k == 0 || k == n - 1 {
                    energy
                } else {
                    2.0 * energy
                }
            })
            .sum()
    }
}

impl Sampled for Spectrum {
    fn xmin(&self) -> f64 {
        0.0
    }
    fn xmax(&self) -> f64 {
        self.f_max
    }
    fn nx(&self) -> usize {
        self.n_bins()
    }
    fn dx(&self) -> f64 {
        self.df
    }
    fn x1(&self) -> f64 {
        0.0
    }
}

/// Fourier transform of the (mono mix of the) Sound.
///
/// With `fast`, the samples are zero-padded to the next power of two.
pub fn sound_to_spectrum(sound: &Sound, fast: bool) -> Spectrum {
    let samples = sound.mono();
    let sample_rate = sound.sample_rate();
    let dt = 1.0 / sample_rate;

    let fft_size = if fast {
        samples.len().max(1).next_power_of_two()
    } else {
        samples.len().max(1)
    };

    let mut buffer = vec![Complex::new(0.0, 0.0); fft_size];
    for (slot, &x) in buffer.iter_mut().zip(samples.iter()) {
        *slot = Complex::new(x, 0.0);
    }
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(fft_size).process(&mut buffer);

    let n_positive = fft_size / 2 + 1;
    let real = Array1::from_iter(buffer[..n_positive].iter().map(|c| c.re * dt));
    let imag = Array1::from_iter(buffer[..n_positive].iter().map(|c| c.im * dt));
    log::debug!("spectrum: {} samples, FFT size {}", samples.len(), fft_size);

    Spectrum {
        real,
        imag,
        df: sample_rate / fft_size as f64,
        f_max: sample_rate / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, n: usize) -> Sound {
        let sr = 16000.0;
        let samples: Vec<f64> = (0..n)
            .map(|i| 0.5 * (2.0 * std::f64::consts::PI * freq * i as f64 / sr).sin())
            .collect();
        Sound::from_slice(&samples, sr)
    }

    #[test]
    fn bins_run_from_zero_to_nyquist() {
        let spectrum = sound_to_spectrum(&tone(1000.0, 1000), true);
        assert_eq!(spectrum.n_bins(), 513);
        assert_eq!(spectrum.df(), 16000.0 / 1024.0);
        assert_eq!(spectrum.get_frequency(spectrum.n_bins() - 1), 8000.0);
        assert_eq!(spectrum.values().dim(), (2, 513));

        let exact = sound_to_spectrum(&tone(1000.0, 1000), false);
        assert_eq!(exact.n_bins(), 501);
    }

    #[test]
    fn tone_energy_sits_at_its_frequency() {
        let sound = tone(1000.0, 16000);
        let spectrum = sound_to_spectrum(&sound, false);
        let cog = spectrum.get_center_of_gravity(2.0);
        assert!((cog - 1000.0).abs() < 1.0, "cog {}", cog);
        assert!(spectrum.get_standard_deviation(2.0) < 5.0);

        // Parseval: total energy equals the Sound's energy
        let total = spectrum.get_band_energy(0.0, 0.0);
        let energy = sound.energy(0.0, 0.0);
        assert!((total - energy).abs() / energy < 1e-6, "{} vs {}", total, energy);
        assert!(spectrum.get_band_energy(2000.0, 4000.0) < 1e-6 * total);
    }

    #[test]
    fn silence_has_no_moments() {
        let spectrum = sound_to_spectrum(&Sound::new(Array1::zeros(256), 16000.0), true);
        assert_eq!(spectrum.get_center_of_gravity(2.0), 0.0);
        assert_eq!(spectrum.get_skewness(2.0), 0.0);
        assert_eq!(spectrum.get_kurtosis(2.0), 0.0);
    }

    #[test]
    fn mismatched_parts_are_rejected() {
        let err = Spectrum::new(Array1::zeros(3), Array1::zeros(2), 1.0, 2.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A Spectrum needs as many imaginary parts as real parts (2 versus 3)."
        );
    }
}
