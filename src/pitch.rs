//! Pitch - Fundamental frequency (F0) contour.
//!
//! Documentation sources:
//! - Boersma (1993): "Accurate short-term analysis of the fundamental frequency
//!   and the harmonics-to-noise ratio of a sampled sound"
//! - Praat manual: Sound: To Pitch...
//!
//! Key documented facts (from Boersma 1993):
//! - Autocorrelation normalization: r_x(τ) ≈ r_a(τ) / r_w(τ) (Eq. 9)
//! - Candidate strength formulas (Eq. 23, 24)
//! - Viterbi transition costs (Eq. 27)

use std::fmt;

use ndarray::Array1;

use crate::error::{Error, Result};
use crate::sampled::Sampled;
use crate::sound::Sound;

/// A pitch candidate for a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchCandidate {
    /// Frequency in Hz (0 = unvoiced).
    pub frequency: f64,
    /// Correlation strength.
    pub strength: f64,
}

impl PitchCandidate {
    /// Create a new pitch candidate.
    pub fn new(frequency: f64, strength: f64) -> Self {
        Self { frequency, strength }
    }
}

/// Pitch analysis results for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchFrame {
    /// Time in seconds.
    pub time: f64,
    /// Candidates (first is selected).
    pub candidates: Vec<PitchCandidate>,
    /// Local intensity (0-1).
    pub intensity: f64,
}

impl PitchFrame {
    /// Create a new pitch frame.
    pub fn new(time: f64, candidates: Vec<PitchCandidate>, intensity: f64) -> Self {
        Self {
            time,
            candidates,
            intensity,
        }
    }

    /// Selected pitch frequency (0 if unvoiced).
    #[inline]
    pub fn frequency(&self) -> f64 {
        self.candidates.first().map_or(0.0, |c| c.frequency)
    }

    /// Selected pitch strength.
    #[inline]
    pub fn strength(&self) -> f64 {
        self.candidates.first().map_or(0.0, |c| c.strength)
    }

    /// Whether this frame is voiced.
    #[inline]
    pub fn voiced(&self) -> bool {
        self.frequency() > 0.0
    }
}

/// Pitch method (AC or CC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchMethod {
    /// Autocorrelation method.
    Ac,
    /// Cross-correlation method.
    Cc,
}

/// Full parameter set of `To Pitch (ac)` / `To Pitch (cc)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchSettings {
    /// Time step in seconds; 0 means 0.75 / floor.
    pub time_step: f64,
    /// Lowest pitch searched for, in Hz.
    pub pitch_floor: f64,
    /// Highest pitch searched for, in Hz.
    pub pitch_ceiling: f64,
    /// Candidates kept per frame, including the unvoiced one.
    pub max_candidates: usize,
    /// Use a window of twice the length (Gaussian in Praat; Hanning here).
    pub very_accurate: bool,
    /// Frames quieter than this fraction of the global peak tend to be unvoiced.
    pub silence_threshold: f64,
    /// Strength needed for a frame to count as voiced.
    pub voicing_threshold: f64,
    /// Preference for higher frequencies.
    pub octave_cost: f64,
    /// Penalty for octave jumps between frames.
    pub octave_jump_cost: f64,
    /// Penalty for voicing transitions between frames.
    pub voiced_unvoiced_cost: f64,
}

impl Default for PitchSettings {
    /// Praat's defaults, shared by both methods.
    fn default() -> Self {
        Self {
            time_step: 0.0,
            pitch_floor: 75.0,
            pitch_ceiling: 600.0,
            max_candidates: 15,
            very_accurate: false,
            silence_threshold: 0.03,
            voicing_threshold: 0.45,
            octave_cost: 0.01,
            octave_jump_cost: 0.35,
            voiced_unvoiced_cost: 0.14,
        }
    }
}

impl PitchSettings {
    fn periods_per_window(&self, method: PitchMethod) -> f64 {
        let base = match method {
            PitchMethod::Ac => 3.0,
            PitchMethod::Cc => 2.0,
        };
        if self.very_accurate {
            2.0 * base
        } else {
            base
        }
    }
}

/// Frame-by-frame comparison of two aligned Pitch contours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PitchDifference {
    /// Frames unvoiced in the first contour but voiced in the second.
    pub unvoiced_to_voiced: usize,
    /// Frames voiced in the first contour but unvoiced in the second.
    pub voiced_to_unvoiced: usize,
    /// Frames where the second contour is more than half an octave higher.
    pub upward_octave_jumps: usize,
    /// Frames where the second contour is more than half an octave lower.
    pub downward_octave_jumps: usize,
}

impl fmt::Display for PitchDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Difference between two Pitches:")?;
        writeln!(f, "Unvoiced to voiced: {} frames.", self.unvoiced_to_voiced)?;
        writeln!(f, "Voiced to unvoiced: {} frames.", self.voiced_to_unvoiced)?;
        writeln!(f, "Upward octave jump: {} frames.", self.upward_octave_jumps)?;
        writeln!(f, "Downward octave jump: {} frames.", self.downward_octave_jumps)
    }
}

/// Pitch (F0) contour.
#[derive(Debug, Clone, PartialEq)]
pub struct Pitch {
    /// Start of the time domain.
    xmin: f64,
    /// End of the time domain.
    xmax: f64,
    /// List of pitch frames.
    frames: Vec<PitchFrame>,
    /// Time step between frames.
    time_step: f64,
    /// Minimum pitch in Hz.
    pitch_floor: f64,
    /// Maximum pitch in Hz.
    pitch_ceiling: f64,
}

impl Pitch {
    /// Create a new Pitch object.
    pub fn new(
        xmin: f64,
        xmax: f64,
        frames: Vec<PitchFrame>,
        time_step: f64,
        pitch_floor: f64,
        pitch_ceiling: f64,
    ) -> Self {
        Self {
            xmin,
            xmax,
            frames,
            time_step,
            pitch_floor,
            pitch_ceiling,
        }
    }

    /// Get the pitch frames.
    #[inline]
    pub fn frames(&self) -> &[PitchFrame] {
        &self.frames
    }

    /// Get the number of frames.
    #[inline]
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Get the time step between frames.
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Get the minimum pitch in Hz.
    #[inline]
    pub fn pitch_floor(&self) -> f64 {
        self.pitch_floor
    }

    /// Get the maximum pitch in Hz.
    #[inline]
    pub fn pitch_ceiling(&self) -> f64 {
        self.pitch_ceiling
    }

    /// Get array of frame times.
    pub fn times(&self) -> Array1<f64> {
        Array1::from_iter(self.frames.iter().map(|f| f.time))
    }

    /// Get array of pitch values (NaN for unvoiced frames).
    pub fn values(&self) -> Array1<f64> {
        Array1::from_iter(
            self.frames
                .iter()
                .map(|f| if self.is_voiced(f) { f.frequency() } else { f64::NAN }),
        )
    }

    /// Get array of pitch strengths.
    pub fn strengths(&self) -> Array1<f64> {
        Array1::from_iter(self.frames.iter().map(|f| f.strength()))
    }

    fn is_voiced(&self, frame: &PitchFrame) -> bool {
        frame.voiced() && frame.frequency() <= self.pitch_ceiling
    }

    /// Number of voiced frames.
    pub fn count_voiced_frames(&self) -> usize {
        self.frames.iter().filter(|f| self.is_voiced(f)).count()
    }

    /// Mean F0 in Hz over the voiced frames in `[tmin, tmax]`
    /// (`tmax <= tmin` selects everything).
    pub fn mean(&self, tmin: f64, tmax: f64) -> f64 {
        let selected: Vec<f64> = self
            .frames
            .iter()
            .filter(|f| tmax <= tmin || (f.time >= tmin && f.time <= tmax))
            .filter(|f| self.is_voiced(f))
            .map(|f| f.frequency())
            .collect();
        if selected.is_empty() {
            f64::NAN
        } else {
            selected.iter().sum::<f64>() / selected.len() as f64
        }
    }

    /// Get pitch value at a specific time.
    ///
    /// # Arguments
    ///
    /// * `time` - Time in seconds
    /// * `interpolation` - Interpolation method ("linear" or "nearest")
    ///
    /// # Returns
    ///
    /// Pitch value in Hz, or None if unvoiced or outside range
    pub fn get_value_at_time(&self, time: f64, interpolation: &str) -> Result<Option<f64>> {
        if self.n_frames() == 0 {
            return Ok(None);
        }

        let idx_float = (time - self.frames[0].time) / self.time_step;
        if idx_float < -0.5 || idx_float > self.n_frames() as f64 - 0.5 {
            return Ok(None);
        }

        let value = match interpolation.to_ascii_lowercase().as_str() {
            "nearest" => {
                let idx = (idx_float.round().max(0.0) as usize).min(self.n_frames() - 1);
                let frame = &self.frames[idx];
                self.is_voiced(frame).then(|| frame.frequency())
            }
            "linear" => {
                let idx = idx_float.floor() as isize;
                let frac = idx_float - idx as f64;
                let last = self.n_frames() as isize - 1;

                let f1 = &self.frames[idx.clamp(0, last) as usize];
                let f2 = &self.frames[(idx + 1).clamp(0, last) as usize];
                let (v1, v2) = (self.is_voiced(f1), self.is_voiced(f2));

                // Both frames must be voiced for interpolation
                match (v1, v2) {
                    (true, true) => Some(f1.frequency() * (1.0 - frac) + f2.frequency() * frac),
                    (true, false) if frac < 0.5 => Some(f1.frequency()),
                    (false, true) if frac >= 0.5 => Some(f2.frequency()),
                    _ => None,
                }
            }
            other => return Err(Error::praat(format!("Unknown interpolation \"{}\".", other))),
        };
        Ok(value)
    }

    /// Compare with another contour frame by frame.
    ///
    /// Returns `None` when the two contours are not sampled on the same grid.
    pub fn count_differences(&self, other: &Pitch) -> Option<PitchDifference> {
        if self.nx() != other.nx() || self.dx() != other.dx() || self.x1() != other.x1() {
            return None;
        }
        let mut diff = PitchDifference::default();
        for (mine, theirs) in self.frames.iter().zip(&other.frames) {
            let (my_voiced, their_voiced) = (self.is_voiced(mine), other.is_voiced(theirs));
            match (my_voiced, their_voiced) {
                (true, true) => {
                    let cents = 1200.0 * (theirs.frequency() / mine.frequency()).log2();
                    if cents > 600.0 {
                        diff.upward_octave_jumps += 1;
                    } else if cents < -600.0 {
                        diff.downward_octave_jumps += 1;
                    }
                }
                (false, true) => diff.unvoiced_to_voiced += 1,
                (true, false) => diff.voiced_to_unvoiced += 1,
                (false, false) => {}
            }
        }
        Some(diff)
    }
}

impl Sampled for Pitch {
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

/// Generate Hanning window.
fn hanning_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0];
    }

    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Lagged products Σ x[i]·x[i+lag] for lags 0 to max_lag.
fn compute_autocorrelation(samples: &[f64], max_lag: usize) -> Vec<f64> {
    let n = samples.len();
    let mut r = vec![0.0; max_lag + 1];

    for (lag, slot) in r.iter_mut().enumerate().take(n.min(max_lag + 1)) {
        *slot = samples[..n - lag]
            .iter()
            .zip(samples[lag..].iter())
            .map(|(&a, &b)| a * b)
            .sum();
    }

    r
}

/// Full-frame cross-correlation for the CC pitch method:
///
/// ```text
/// r(τ) = Σ(x[i] × x[i+τ]) / sqrt(Σx[0:n-τ]² × Σx[τ:n]²)
/// ```
fn compute_cross_correlation(samples: &[f64], min_lag: usize, max_lag: usize) -> Vec<f64> {
    let n = samples.len();
    let mut r = vec![0.0; max_lag + 1];

    for lag in min_lag..=max_lag.min(n.saturating_sub(1)) {
        let x1 = &samples[..n - lag];
        let x2 = &samples[lag..];

        let corr: f64 = x1.iter().zip(x2.iter()).map(|(&a, &b)| a * b).sum();
        let e1: f64 = x1.iter().map(|&x| x * x).sum();
        let e2: f64 = x2.iter().map(|&x| x * x).sum();

        if e1 > 0.0 && e2 > 0.0 {
            r[lag] = corr / (e1 * e2).sqrt();
        }
    }

    r
}

/// Local maxima of a normalized correlation, strongest first.
///
/// Frequencies are refined by parabolic interpolation; strengths stay at the
/// raw peak value to avoid overshoot.
fn find_peaks(r: &[f64], min_lag: usize, max_lag: usize, sample_rate: f64, max_candidates: usize) -> Vec<(f64, f64)> {
    let mut candidates = Vec::new();
    let lo = min_lag.max(1);
    let hi = max_lag.min(r.len().saturating_sub(1));

    for lag in lo..hi {
        let (r_prev, r_curr, r_next) = (r[lag - 1], r[lag], r[lag + 1]);
        if r_curr > r_prev && r_curr > r_next {
            let denom = r_prev - 2.0 * r_curr + r_next;
            let delta = if denom.abs() > 1e-10 { 0.5 * (r_prev - r_next) / denom } else { 0.0 };
            let refined_lag = if delta.abs() < 1.0 { lag as f64 + delta } else { lag as f64 };
            candidates.push((sample_rate / refined_lag, r_curr));
        }
    }

    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(max_candidates);
    candidates
}

/// Apply Viterbi algorithm to find optimal path through candidates.
///
/// From Boersma (1993) Eq. 27, the transition cost is:
/// - 0 if both unvoiced
/// - voiced_unvoiced_cost if voicing changes
/// - octave_jump_cost × |log₂(F1/F2)| if both voiced
///
/// The costs are corrected for time step: multiply by 0.01 / time_step.
/// Candidates are reordered in place so the chosen one comes first.
fn viterbi_path(frames: &mut [PitchFrame], time_step: f64, octave_jump_cost: f64, voiced_unvoiced_cost: f64) {
    let n_frames = frames.len();
    if n_frames <= 1 {
        return;
    }

    let time_correction = 0.01 / time_step;
    let n_cands: Vec<usize> = frames.iter().map(|f| f.candidates.len()).collect();

    let mut best_cost: Vec<Vec<f64>> = n_cands.iter().map(|&n| vec![f64::INFINITY; n]).collect();
    let mut best_prev: Vec<Vec<usize>> = n_cands.iter().map(|&n| vec![0; n]).collect();

    for (j, cand) in frames[0].candidates.iter().enumerate() {
        best_cost[0][j] = -cand.strength;
    }

    for i in 1..n_frames {
        for j in 0..n_cands[i] {
            let cand_j = &frames[i].candidates[j];
            for k in 0..n_cands[i - 1] {
                let f_k = frames[i - 1].candidates[k].frequency;
                let f_j = cand_j.frequency;

                let trans_cost = if f_k == 0.0 && f_j == 0.0 {
                    0.0
                } else if f_k == 0.0 || f_j == 0.0 {
                    voiced_unvoiced_cost
                } else {
                    octave_jump_cost * (f_j / f_k).log2().abs()
                } * time_correction;

                let total_cost = best_cost[i - 1][k] + trans_cost - cand_j.strength;
                if total_cost < best_cost[i][j] {
                    best_cost[i][j] = total_cost;
                    best_prev[i][j] = k;
                }
            }
        }
    }

    // Backward pass
    let mut path = vec![0usize; n_frames];
    path[n_frames - 1] = best_cost[n_frames - 1]
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    for i in (0..n_frames - 1).rev() {
        path[i] = best_prev[i + 1][path[i + 1]];
    }

    for (frame, &best_idx) in frames.iter_mut().zip(&path) {
        if best_idx > 0 {
            frame.candidates.swap(0, best_idx);
        }
    }
}

/// Compute pitch from sound using autocorrelation method with default settings.
///
/// # Arguments
///
/// * `sound` - Sound object
/// * `time_step` - Time step in seconds (0 = auto: 0.75/floor)
/// * `pitch_floor` - Minimum pitch in Hz
/// * `pitch_ceiling` - Maximum pitch in Hz
pub fn sound_to_pitch_ac(sound: &Sound, time_step: f64, pitch_floor: f64, pitch_ceiling: f64) -> Pitch {
    let settings = PitchSettings {
        time_step,
        pitch_floor,
        pitch_ceiling,
        ..PitchSettings::default()
    };
    sound_to_pitch(sound, PitchMethod::Ac, &settings)
}

/// Compute pitch from sound using cross-correlation method with default settings.
pub fn sound_to_pitch_cc(sound: &Sound, time_step: f64, pitch_floor: f64, pitch_ceiling: f64) -> Pitch {
    let settings = PitchSettings {
        time_step,
        pitch_floor,
        pitch_ceiling,
        ..PitchSettings::default()
    };
    sound_to_pitch(sound, PitchMethod::Cc, &settings)
}

/// Pitch computation with full parameter control.
pub fn sound_to_pitch(sound: &Sound, method: PitchMethod, settings: &PitchSettings) -> Pitch {
    sound_to_pitch_windowed(sound, method, settings, settings.periods_per_window(method))
}

/// Pitch analysis with a window of `periods_per_window` periods of the floor.
pub(crate) fn sound_to_pitch_windowed(
    sound: &Sound,
    method: PitchMethod,
    settings: &PitchSettings,
    periods_per_window: f64,
) -> Pitch {
    let samples = sound.mono().to_vec();
    let sample_rate = sound.sample_rate();
    let duration = sound.duration();
    let offset = sound.xmin();
    let first_sample_time = sound.x1() - offset;
    let pitch_floor = settings.pitch_floor;

    let time_step = if settings.time_step <= 0.0 { 0.75 / pitch_floor } else { settings.time_step };

    let window_duration = periods_per_window / pitch_floor;

    // Lag range for pitch search
    let min_lag = (sample_rate / settings.pitch_ceiling).ceil().max(2.0) as usize;
    let max_lag = (sample_rate / pitch_floor).floor() as usize;

    let mut window_samples = (window_duration * sample_rate).round() as usize;
    if window_samples % 2 == 0 {
        window_samples += 1;
    }
    let half_window_samples = window_samples / 2;

    // AC windows the frame and normalizes by the window's own autocorrelation.
    let (window, r_w) = match method {
        PitchMethod::Ac => {
            let w = hanning_window(window_samples);
            let rw = compute_autocorrelation(&w, max_lag);
            (w, rw)
        }
        PitchMethod::Cc => (Vec::new(), Vec::new()),
    };

    // Frames centred in the signal
    let n_frames = if duration > window_duration {
        ((duration - window_duration) / time_step + 1e-9).floor() as usize + 1
    } else {
        1
    };
    let t1 = (duration - (n_frames - 1) as f64 * time_step) / 2.0;

    let global_peak = samples.iter().map(|&s| s.abs()).fold(0.0f64, f64::max);
    let n_samples = samples.len() as isize;
    let max_candidates = settings.max_candidates.max(2) - 1;

    let mut frames = Vec::with_capacity(n_frames);
    for i in 0..n_frames {
        let t = t1 + i as f64 * time_step;

        let center_sample = ((t - first_sample_time) * sample_rate).round() as isize;
        let start_sample = center_sample - half_window_samples as isize;

        let mut frame_samples = vec![0.0; window_samples];
        for (j, slot) in frame_samples.iter_mut().enumerate() {
            let src = start_sample + j as isize;
            if src >= 0 && src < n_samples {
                *slot = samples[src as usize];
            }
        }

        let local_peak = frame_samples.iter().map(|&s| s.abs()).fold(0.0f64, f64::max);
        let local_intensity = local_peak / (global_peak + 1e-30);

        let peaks = match method {
            PitchMethod::Ac => {
                let windowed: Vec<f64> = frame_samples.iter().zip(&window).map(|(&s, &w)| s * w).collect();
                let r = compute_autocorrelation(&windowed, max_lag);
                if r[0] <= 0.0 {
                    Vec::new()
                } else {
                    let r_norm: Vec<f64> = (0..=max_lag)
                        .map(|lag| {
                            if r_w[lag] > 0.0 {
                                (r[lag] / r[0]) / (r_w[lag] / r_w[0])
                            } else {
                                0.0
                            }
                        })
                        .collect();
                    find_peaks(&r_norm, min_lag, max_lag, sample_rate, max_candidates)
                }
            }
            PitchMethod::Cc => {
                let r = compute_cross_correlation(&frame_samples, min_lag, max_lag);
                find_peaks(&r, min_lag, max_lag, sample_rate, max_candidates)
            }
        };

        // Unvoiced candidate, Boersma (1993) Eq. 23
        let unvoiced_strength = settings.voicing_threshold
            + (2.0 - local_intensity / (settings.silence_threshold / (1.0 + settings.voicing_threshold))).max(0.0);
        let mut candidates = vec![PitchCandidate::new(0.0, unvoiced_strength)];

        for (freq, strength) in peaks {
            if freq > 0.0 && strength > 0.0 {
                // Octave cost, Eq. 24
                let adjusted = strength - settings.octave_cost * (pitch_floor / freq).log2();
                candidates.push(PitchCandidate::new(freq, adjusted));
            }
        }

        candidates.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));
        frames.push(PitchFrame::new(offset + t, candidates, local_intensity));
    }

    viterbi_path(&mut frames, time_step, settings.octave_jump_cost, settings.voiced_unvoiced_cost);

    Pitch::new(sound.xmin(), sound.xmax(), frames, time_step, pitch_floor, settings.pitch_ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, seconds: f64) -> Sound {
        let sr = 16000.0;
        let n = (sr * seconds) as usize;
        let samples = Array1::from_iter((0..n).map(|i| 0.5 * (2.0 * std::f64::consts::PI * freq * i as f64 / sr).sin()));
        Sound::new(samples, sr)
    }

    #[test]
    fn ac_tracks_a_steady_tone() {
        let pitch = tone(200.0, 0.5).to_pitch_ac(0.0, 75.0, 600.0);
        assert!(pitch.count_voiced_frames() > pitch.n_frames() / 2);
        let mean = pitch.mean(0.0, 0.0);
        assert!((mean - 200.0).abs() < 5.0, "mean {}", mean);
    }

    #[test]
    fn cc_tracks_a_steady_tone() {
        let pitch = tone(150.0, 0.5).to_pitch_cc(0.0, 75.0, 600.0);
        let mean = pitch.mean(0.0, 0.0);
        assert!((mean - 150.0).abs() < 5.0, "mean {}", mean);
    }

    #[test]
    fn silence_is_unvoiced() {
        let pitch = Sound::new(Array1::zeros(8000), 16000.0).to_pitch_ac(0.0, 75.0, 600.0);
        assert_eq!(pitch.count_voiced_frames(), 0);
        assert!(pitch.mean(0.0, 0.0).is_nan());
        assert!(pitch.values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ac_and_cc_grids_differ() {
        let sound = tone(200.0, 0.5);
        let ac = sound.to_pitch_ac(0.0, 75.0, 600.0);
        let cc = sound.to_pitch_cc(0.0, 75.0, 600.0);
        assert_ne!(ac.n_frames(), cc.n_frames());
        assert!(ac.count_differences(&cc).is_none());
    }

    #[test]
    fn identical_contours_have_no_differences() {
        let pitch = tone(200.0, 0.3).to_pitch_ac(0.0, 75.0, 600.0);
        let diff = pitch.count_differences(&pitch.clone()).unwrap();
        assert_eq!(diff, PitchDifference::default());
        assert!(diff.to_string().starts_with("Difference between two Pitches:\n"));
    }

    #[test]
    fn value_at_time_rejects_unknown_interpolation() {
        let pitch = tone(200.0, 0.3).to_pitch_ac(0.0, 75.0, 600.0);
        let mid = pitch.times()[pitch.n_frames() / 2];
        let v = pitch.get_value_at_time(mid, "linear").unwrap().unwrap();
        assert!((v - 200.0).abs() < 5.0);
        assert!(pitch.get_value_at_time(mid, "spline").is_err());
    }
}
