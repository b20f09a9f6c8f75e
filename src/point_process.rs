//! PointProcess - Sorted time points, typically glottal pulses.
//!
//! Besides editing and set operations, this module holds the voice-quality
//! measures computed on pulse sequences:
//!
//! - **Jitter**: cycle-to-cycle variation of the period (local, local
//!   absolute, RAP, PPQ5, DDP).
//! - **Shimmer**: cycle-to-cycle variation of the peak amplitude, which needs
//!   the Sound the pulses were taken from (local, local dB, APQ3, APQ5,
//!   APQ11, DDA).
//! - **Voice breaks**: intervals longer than a maximum period.
//!
//! # Period Validity
//!
//! Every measure only uses intervals that count as periods: an interval
//! between consecutive points must lie within `[shortest, longest]` and may
//! differ from at least one neighbouring interval by at most
//! `max_period_factor`.
//! When `shortest == longest`, every interval counts.
//!
//! Indices in the public API are 1-based, matching Praat scripts.

use ndarray::Array1;
use rand::Rng;

use crate::error::{praat_bail, Result};
use crate::pitch::Pitch;
use crate::sampled::Sampled;
use crate::sound::{parabolic_peak, PeakInterpolation, Sound};
use crate::value::format_number;

/// Range and tolerance parameters shared by the jitter and shimmer queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodWindow {
    /// Start of the analysed range (`tmax <= tmin` means everything).
    pub tmin: f64,
    /// End of the analysed range.
    pub tmax: f64,
    /// Shortest interval that counts as a period.
    pub shortest: f64,
    /// Longest interval that counts as a period.
    pub longest: f64,
    /// Largest ratio between consecutive periods.
    pub max_period_factor: f64,
}

impl Default for PeriodWindow {
    fn default() -> Self {
        Self {
            tmin: 0.0,
            tmax: 0.0,
            shortest: 0.0001,
            longest: 0.02,
            max_period_factor: 1.3,
        }
    }
}

/// Counts and durations of voice breaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceBreaks {
    /// Number of interior intervals longer than the maximum period.
    pub count: usize,
    /// Unvoiced duration divided by the analysed duration.
    pub fraction: f64,
    /// Total unvoiced duration.
    pub duration: f64,
    /// Duration of the analysed range.
    pub analysed: f64,
}

/// A sorted set of time points within `[xmin, xmax]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointProcess {
    xmin: f64,
    xmax: f64,
    times: Vec<f64>,
}

impl PointProcess {
    /// An empty process on `[start, end]`.
    pub fn empty(start: f64, end: f64) -> Result<Self> {
        if end < start {
            praat_bail!(
                "Your end time ({}) should not be less than your start time ({}).",
                format_number(end),
                format_number(start)
            );
        }
        Ok(Self {
            xmin: start,
            xmax: end,
            times: Vec::new(),
        })
    }

    /// A process holding `times`; the domain defaults to their range.
    pub fn from_times(times: &[f64], domain: Option<(f64, f64)>) -> Result<Self> {
        let (lo, hi) = times
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)));
        let (start, end) = domain.unwrap_or(if times.is_empty() { (0.0, 0.0) } else { (lo, hi) });
        let mut process = Self::empty(start, end)?;
        process.add_points(times);
        Ok(process)
    }

    /// Homogeneous Poisson process with `density` points per second.
    pub fn poisson<R: Rng>(rng: &mut R, start: f64, end: f64, density: f64) -> Result<Self> {
        let mut process = Self::empty(start, end)?;
        if density <= 0.0 {
            praat_bail!("The density should be positive.");
        }
        // Exponential inter-arrival times
        let mut t = start;
        loop {
            let u: f64 = rng.gen();
            t += -(1.0 - u).ln() / density;
            if t > end {
                break;
            }
            process.times.push(t);
        }
        Ok(process)
    }

    /// Start of the domain.
    #[inline]
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    /// End of the domain.
    #[inline]
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    /// The points, in increasing order.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The points as an array.
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_vec(self.times.clone())
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether there are no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time of 1-based point `index`.
    pub fn time_from_index(&self, index: usize) -> f64 {
        if index < 1 || index > self.len() {
            return f64::NAN;
        }
        self.times[index - 1]
    }

    /// Index of the last point at or before `t`; 0 if none.
    pub fn low_index(&self, t: f64) -> usize {
        self.times.partition_point(|&x| x <= t)
    }

    /// Index of the first point at or after `t`; `len + 1` if none.
    pub fn high_index(&self, t: f64) -> usize {
        self.times.partition_point(|&x| x < t) + 1
    }

    /// Index of the point nearest to `t`; 0 if there are no points.
    pub fn nearest_index(&self, t: f64) -> usize {
        if self.is_empty() {
            return 0;
        }
        let low = self.low_index(t);
        if low == 0 {
            return 1;
        }
        if low >= self.len() {
            return self.len();
        }
        if t - self.times[low - 1] > self.times[low] - t {
            low + 1
        } else {
            low
        }
    }

    /// Length of the interval containing `t`; undefined outside the points.
    pub fn interval(&self, t: f64) -> f64 {
        let low = self.low_index(t);
        if low == 0 || low >= self.len() {
            return f64::NAN;
        }
        self.times[low] - self.times[low - 1]
    }

    /// First and last 1-based indices of the points inside `[tmin, tmax]`.
    pub fn window_points(&self, tmin: f64, tmax: f64) -> (usize, usize) {
        let (tmin, tmax) = self.range(tmin, tmax);
        (self.high_index(tmin), self.low_index(tmax))
    }

    fn range(&self, tmin: f64, tmax: f64) -> (f64, f64) {
        if tmax <= tmin {
            (self.xmin, self.xmax)
        } else {
            (tmin, tmax)
        }
    }

    // ========== Editing ==========

    /// Insert a point, keeping order; an existing identical point is kept once.
    pub fn add_point(&mut self, t: f64) {
        let at = self.times.partition_point(|&x| x < t);
        if self.times.get(at) != Some(&t) {
            self.times.insert(at, t);
        }
    }

    /// Insert several points.
    pub fn add_points(&mut self, times: &[f64]) {
        for &t in times {
            self.add_point(t);
        }
    }

    /// Remove 1-based point `index`; out-of-range indices are ignored.
    pub fn remove_point(&mut self, index: usize) {
        if index >= 1 && index <= self.len() {
            self.times.remove(index - 1);
        }
    }

    /// Remove the point nearest to `t`.
    pub fn remove_point_near(&mut self, t: f64) {
        let index = self.nearest_index(t);
        self.remove_point(index);
    }

    /// Remove the points with 1-based indices `from..=to`, clamped to the valid range.
    pub fn remove_points(&mut self, from: usize, to: usize) {
        let from = from.max(1);
        let to = to.min(self.len());
        if from <= to {
            self.times.drain(from - 1..to);
        }
    }

    /// Remove the points inside `[tmin, tmax]`.
    pub fn remove_points_between(&mut self, tmin: f64, tmax: f64) {
        self.times.retain(|&t| t < tmin || t > tmax);
    }

    /// Add evenly spaced points in `[tmin, tmax]`, centred in the range.
    pub fn fill(&mut self, tmin: f64, tmax: f64, period: f64) -> Result<()> {
        if period <= 0.0 {
            praat_bail!("The period should be positive.");
        }
        let (tmin, tmax) = self.range(tmin, tmax);
        let n = ((tmax - tmin) / period).floor() as usize;
        let first = 0.5 * (tmin + tmax - n as f64 * period);
        for i in 0..n {
            self.add_point(first + i as f64 * period);
        }
        Ok(())
    }

    /// Fill every gap longer than `max_gap` (including the domain edges)
    /// with points spaced by about `period`.
    pub fn voice(&mut self, period: f64, max_gap: f64) -> Result<()> {
        if period <= 0.0 {
            praat_bail!("The period should be positive.");
        }
        let mut bounds = Vec::with_capacity(self.len() + 2);
        bounds.push(self.xmin);
        bounds.extend_from_slice(&self.times);
        bounds.push(self.xmax);

        let mut added = Vec::new();
        for pair in bounds.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            let gap = right - left;
            if gap > max_gap {
                let n = (gap / period).floor() as usize;
                let step = gap / (n.max(1) as f64);
                added.extend((1..n).map(|k| left + k as f64 * step));
            }
        }
        self.add_points(&added);
        Ok(())
    }

    // ========== Set operations ==========

    /// All points of both processes; the domain covers both.
    pub fn union(&self, other: &PointProcess) -> PointProcess {
        let mut result = PointProcess {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            times: self.times.clone(),
        };
        result.add_points(&other.times);
        result
    }

    /// Points present in both processes; the domain is the overlap.
    pub fn intersection(&self, other: &PointProcess) -> PointProcess {
        PointProcess {
            xmin: self.xmin.max(other.xmin),
            xmax: self.xmax.min(other.xmax),
            times: self.times.iter().copied().filter(|t| other.contains(*t)).collect(),
        }
    }

    /// Points of `self` not in `other`; the domain is that of `self`.
    pub fn difference(&self, other: &PointProcess) -> PointProcess {
        PointProcess {
            xmin: self.xmin,
            xmax: self.xmax,
            times: self.times.iter().copied().filter(|t| !other.contains(*t)).collect(),
        }
    }

    fn contains(&self, t: f64) -> bool {
        self.times.binary_search_by(|x| x.total_cmp(&t)).is_ok()
    }

    // ========== Periods ==========

    /// Whether the interval after 0-based point `left` counts as a period.
    fn is_period(&self, left: usize, shortest: f64, longest: f64, factor: f64) -> bool {
        let right = left + 1;
        if right >= self.len() {
            return false;
        }
        let interval = self.times[right] - self.times[left];
        if interval <= 0.0 || interval < shortest || interval > longest {
            return false;
        }
        if factor.is_nan() || factor < 1.0 {
            return true;
        }
        let ratio = |neighbour: f64| {
            if neighbour <= 0.0 {
                return None;
            }
            let r = interval / neighbour;
            Some(if r < 1.0 { 1.0 / r } else { r })
        };
        let previous = (left > 0).then(|| self.times[left] - self.times[left - 1]).and_then(ratio);
        let next = (right + 1 < self.len())
            .then(|| self.times[right + 1] - self.times[right])
            .and_then(ratio);
        match (previous, next) {
            (None, None) => true,
            // One matching neighbour suffices.
            _ => previous.is_some_and(|r| r <= factor) || next.is_some_and(|r| r <= factor),
        }
    }

    /// 0-based `[first, last]` point indices inside the window, if any.
    fn window_indices(&self, w: &PeriodWindow) -> Option<(usize, usize)> {
        let (first, last) = self.window_points(w.tmin, w.tmax);
        if first == 0 || last < first || last > self.len() {
            return None;
        }
        Some((first - 1, last - 1))
    }

    /// Intervals that count as periods, as `(left index, length)`.
    fn periods(&self, w: &PeriodWindow) -> Vec<(usize, f64)> {
        let Some((first, last)) = self.window_indices(w) else {
            return Vec::new();
        };
        (first..last)
            .filter(|&i| self.is_period(i, w.shortest, w.longest, w.max_period_factor))
            .map(|i| (i, self.times[i + 1] - self.times[i]))
            .collect()
    }

    /// Number of intervals that count as periods.
    pub fn number_of_periods(&self, w: &PeriodWindow) -> usize {
        self.periods(w).len()
    }

    /// Mean period length.
    pub fn mean_period(&self, w: &PeriodWindow) -> f64 {
        let periods = self.periods(w);
        if periods.is_empty() {
            return f64::NAN;
        }
        periods.iter().map(|p| p.1).sum::<f64>() / periods.len() as f64
    }

    /// Sample standard deviation of the period lengths.
    pub fn stdev_period(&self, w: &PeriodWindow) -> f64 {
        let periods = self.periods(w);
        if periods.len() < 2 {
            return f64::NAN;
        }
        let mean = periods.iter().map(|p| p.1).sum::<f64>() / periods.len() as f64;
        let ss: f64 = periods.iter().map(|p| (p.1 - mean).powi(2)).sum();
        (ss / (periods.len() - 1) as f64).sqrt()
    }

    /// Runs of consecutive valid periods, as interval lengths.
    fn period_runs(&self, w: &PeriodWindow) -> Vec<Vec<f64>> {
        let mut runs: Vec<Vec<f64>> = Vec::new();
        let mut previous: Option<usize> = None;
        for (left, length) in self.periods(w) {
            match (previous, runs.last_mut()) {
                (Some(p), Some(run)) if p + 1 == left => run.push(length),
                _ => runs.push(vec![length]),
            }
            previous = Some(left);
        }
        runs
    }

    /// Mean absolute deviation of each period from a moving average over
    /// `width` neighbouring periods (width 1 compares consecutive periods).
    fn perturbation(&self, w: &PeriodWindow, width: usize) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for run in self.period_runs(w) {
            if width == 1 {
                for pair in run.windows(2) {
                    sum += (pair[1] - pair[0]).abs();
                    count += 1;
                }
            } else {
                for group in run.windows(width) {
                    let average = group.iter().sum::<f64>() / width as f64;
                    sum += (group[width / 2] - average).abs();
                    count += 1;
                }
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Jitter (local): mean absolute difference of consecutive periods over the mean period.
    pub fn jitter_local(&self, w: &PeriodWindow) -> f64 {
        self.jitter_local_absolute(w) / self.mean_period(w)
    }

    /// Jitter (local, absolute), in seconds.
    pub fn jitter_local_absolute(&self, w: &PeriodWindow) -> f64 {
        self.perturbation(w, 1).unwrap_or(f64::NAN)
    }

    /// Relative average perturbation over three periods.
    pub fn jitter_rap(&self, w: &PeriodWindow) -> f64 {
        self.perturbation(w, 3).unwrap_or(f64::NAN) / self.mean_period(w)
    }

    /// Five-point period perturbation quotient.
    pub fn jitter_ppq5(&self, w: &PeriodWindow) -> f64 {
        self.perturbation(w, 5).unwrap_or(f64::NAN) / self.mean_period(w)
    }

    /// Mean absolute difference of consecutive period differences over the mean period.
    pub fn jitter_ddp(&self, w: &PeriodWindow) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for run in self.period_runs(w) {
            for t in run.windows(3) {
                sum += ((t[2] - t[1]) - (t[1] - t[0])).abs();
                count += 1;
            }
        }
        if count == 0 {
            return f64::NAN;
        }
        sum / count as f64 / self.mean_period(w)
    }

    // ========== Shimmer ==========

    /// Peak amplitudes of consecutive valid periods, grouped in runs.
    ///
    /// A run is also broken where consecutive amplitudes differ by more
    /// than `max_amplitude_factor`.
    fn amplitude_runs(&self, sound: &Sound, w: &PeriodWindow, max_amplitude_factor: f64) -> Vec<Vec<f64>> {
        let signal = sound.mono();
        let mut runs: Vec<Vec<f64>> = Vec::new();
        let mut previous: Option<usize> = None;
        for (left, _) in self.periods(w) {
            let (first, last) = sound.sample_range(self.times[left], self.times[left + 1]);
            let peak = (first..last).map(|i| signal[i].abs()).fold(0.0f64, f64::max);
            if peak <= 0.0 {
                previous = None;
                continue;
            }
            let continues = previous == Some(left.wrapping_sub(1))
                && runs.last().and_then(|r| r.last()).is_some_and(|&a| {
                    let ratio = if a > peak { a / peak } else { peak / a };
                    max_amplitude_factor.is_nan() || max_amplitude_factor < 1.0 || ratio <= max_amplitude_factor
                });
            match runs.last_mut() {
                Some(run) if continues => run.push(peak),
                _ => runs.push(vec![peak]),
            }
            previous = Some(left);
        }
        runs
    }

    fn amplitude_mean(runs: &[Vec<f64>]) -> f64 {
        let all: Vec<f64> = runs.iter().flatten().copied().collect();
        if all.is_empty() {
            f64::NAN
        } else {
            all.iter().sum::<f64>() / all.len() as f64
        }
    }

    fn amplitude_perturbation(runs: &[Vec<f64>], width: usize) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for run in runs {
            if width == 1 {
                for pair in run.windows(2) {
                    sum += (pair[1] - pair[0]).abs();
                    count += 1;
                }
            } else {
                for group in run.windows(width) {
                    let average = group.iter().sum::<f64>() / width as f64;
                    sum += (group[width / 2] - average).abs();
                    count += 1;
                }
            }
        }
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64 / Self::amplitude_mean(runs)
        }
    }

    /// Shimmer (local): mean absolute difference of consecutive amplitudes over the mean amplitude.
    pub fn shimmer_local(&self, sound: &Sound, w: &PeriodWindow, max_amplitude_factor: f64) -> f64 {
        Self::amplitude_perturbation(&self.amplitude_runs(sound, w, max_amplitude_factor), 1)
    }

    /// Shimmer (local, dB): mean absolute ratio of consecutive amplitudes in dB.
    pub fn shimmer_local_db(&self, sound: &Sound, w: &PeriodWindow, max_amplitude_factor: f64) -> f64 {
        let runs = self.amplitude_runs(sound, w, max_amplitude_factor);
        let ratios: Vec<f64> = runs
            .iter()
            .flat_map(|run| run.windows(2).map(|p| (20.0 * (p[1] / p[0]).log10()).abs()))
            .collect();
        if ratios.is_empty() {
            f64::NAN
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        }
    }

    /// Three-point amplitude perturbation quotient.
    pub fn shimmer_apq3(&self, sound: &Sound, w: &PeriodWindow, max_amplitude_factor: f64) -> f64 {
        Self::amplitude_perturbation(&self.amplitude_runs(sound, w, max_amplitude_factor), 3)
    }

    /// Five-point amplitude perturbation quotient.
    pub fn shimmer_apq5(&self, sound: &Sound, w: &PeriodWindow, max_amplitude_factor: f64) -> f64 {
        Self::amplitude_perturbation(&self.amplitude_runs(sound, w, max_amplitude_factor), 5)
    }

    /// Eleven-point amplitude perturbation quotient.
    pub fn shimmer_apq11(&self, sound: &Sound, w: &PeriodWindow, max_amplitude_factor: f64) -> f64 {
        Self::amplitude_perturbation(&self.amplitude_runs(sound, w, max_amplitude_factor), 11)
    }

    /// Mean absolute difference of consecutive amplitude differences over the mean amplitude.
    pub fn shimmer_dda(&self, sound: &Sound, w: &PeriodWindow, max_amplitude_factor: f64) -> f64 {
        let runs = self.amplitude_runs(sound, w, max_amplitude_factor);
        let diffs: Vec<f64> = runs
            .iter()
            .flat_map(|run| run.windows(3).map(|a| ((a[2] - a[1]) - (a[1] - a[0])).abs()))
            .collect();
        if diffs.is_empty() {
            return f64::NAN;
        }
        diffs.iter().sum::<f64>() / diffs.len() as f64 / Self::amplitude_mean(&runs)
    }

    // ========== Voice breaks ==========

    /// Count interior gaps longer than `max_period`; gaps at the range edges
    /// add to the unvoiced duration but are not counted as breaks.
    pub fn voice_breaks(&self, tmin: f64, tmax: f64, max_period: f64) -> VoiceBreaks {
        let (tmin, tmax) = self.range(tmin, tmax);
        let analysed = tmax - tmin;
        let inside: Vec<f64> = self.times.iter().copied().filter(|&t| t >= tmin && t <= tmax).collect();
        let (Some(&first), Some(&last)) = (inside.first(), inside.last()) else {
            return VoiceBreaks {
                count: 0,
                fraction: if analysed > 0.0 { 1.0 } else { f64::NAN },
                duration: analysed,
                analysed,
            };
        };
        let mut duration = 0.0;
        for edge in [first - tmin, tmax - last] {
            if edge > max_period {
                duration += edge;
            }
        }
        let mut count = 0;
        for pair in inside.windows(2) {
            let gap = pair[1] - pair[0];
            if gap > max_period {
                duration += gap;
                count += 1;
            }
        }
        VoiceBreaks {
            count,
            fraction: duration / analysed,
            duration,
            analysed,
        }
    }
}

impl std::ops::Index<usize> for PointProcess {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.times[index]
    }
}

// ========== Conversions from Sound and Pitch ==========

/// Voiced stretches of a Pitch, as `(start, end)` times.
fn voiced_intervals(pitch: &Pitch) -> Vec<(f64, f64)> {
    let half = 0.5 * pitch.dx();
    let mut intervals: Vec<(f64, f64)> = Vec::new();
    let values = pitch.values();
    for (frame, value) in pitch.frames().iter().zip(values.iter()) {
        if value.is_nan() {
            continue;
        }
        let (start, end) = ((frame.time - half).max(pitch.xmin()), (frame.time + half).min(pitch.xmax()));
        match intervals.last_mut() {
            Some(last) if (last.1 - start).abs() < 1e-9 => last.1 = end,
            _ => intervals.push((start, end)),
        }
    }
    intervals
}

fn frequency_at(pitch: &Pitch, t: f64) -> Option<f64> {
    pitch.get_value_at_time(t, "linear").ok().flatten()
}

/// Pulses derived from the pitch contour alone, one per period.
pub fn pitch_to_point_process(pitch: &Pitch) -> PointProcess {
    let mut process = PointProcess {
        xmin: pitch.xmin(),
        xmax: pitch.xmax(),
        times: Vec::new(),
    };
    for (start, end) in voiced_intervals(pitch) {
        let mut t = start;
        while t < end {
            let Some(f) = frequency_at(pitch, t) else {
                break;
            };
            process.times.push(t);
            t += 1.0 / f;
        }
    }
    process
}

/// Sample index of the largest (or smallest) value in `[first, last)`.
fn extreme_sample(signal: &Array1<f64>, first: usize, last: usize, maxima: bool, minima: bool) -> Option<usize> {
    (first..last).max_by(|&a, &b| {
        let score = |i: usize| match (maxima, minima) {
            (true, true) => signal[i].abs(),
            (false, true) => -signal[i],
            _ => signal[i],
        };
        score(a).total_cmp(&score(b))
    })
}

/// Pulses at the waveform peaks of each pitch period.
pub fn sound_pitch_to_point_process_peaks(
    sound: &Sound,
    pitch: &Pitch,
    include_maxima: bool,
    include_minima: bool,
) -> PointProcess {
    let signal = sound.mono();
    let mut process = PointProcess {
        xmin: sound.xmin(),
        xmax: sound.xmax(),
        times: Vec::new(),
    };
    for (start, end) in voiced_intervals(pitch) {
        let mut t = start;
        while t < end {
            let Some(f) = frequency_at(pitch, t.min(end)) else {
                break;
            };
            let period = 1.0 / f;
            let (first, last) = sound.sample_range(t, (t + period).min(end));
            if let Some(i) = extreme_sample(&signal, first, last, include_maxima, include_minima) {
                let pulse = sound.sample_time(i);
                process.add_point(pulse);
                t = pulse + 0.5 * period;
            } else {
                t += period;
            }
        }
    }
    process
}

/// Pulses placed by cross-correlating each period with the previous one.
pub fn sound_pitch_to_point_process_cc(sound: &Sound, pitch: &Pitch) -> PointProcess {
    let signal = sound.mono();
    let n = signal.len();
    let mut process = PointProcess {
        xmin: sound.xmin(),
        xmax: sound.xmax(),
        times: Vec::new(),
    };
    let sample_rate = sound.sample_rate();
    for (start, end) in voiced_intervals(pitch) {
        let Some(f) = frequency_at(pitch, 0.5 * (start + end)) else {
            continue;
        };
        // Anchor on the absolute peak of the first period.
        let (first, last) = sound.sample_range(start, (start + 1.0 / f).min(end));
        let Some(mut anchor) = extreme_sample(&signal, first, last, true, true) else {
            continue;
        };
        process.add_point(sound.sample_time(anchor));
        loop {
            let t = sound.sample_time(anchor);
            let Some(f) = frequency_at(pitch, t) else {
                break;
            };
            let period = (sample_rate / f).round() as usize;
            let half = period / 2;
            let lo = (period as f64 * 0.8) as usize;
            let hi = (period as f64 * 1.2).ceil() as usize;
            if anchor < half || anchor + hi + half >= n {
                break;
            }
            let reference = signal.slice(ndarray::s![anchor - half..anchor + half]);
            let best = (lo..=hi).max_by(|&a, &b| {
                let corr = |lag: usize| {
                    let candidate = signal.slice(ndarray::s![anchor + lag - half..anchor + lag + half]);
                    reference.dot(&candidate) / (candidate.dot(&candidate).sqrt() + 1e-30)
                };
                corr(a).total_cmp(&corr(b))
            });
            let Some(lag) = best else {
                break;
            };
            anchor += lag;
            let next = sound.sample_time(anchor);
            if next > end {
                break;
            }
            process.add_point(next);
        }
    }
    process
}

/// Times of local extrema of one channel (1-based).
pub fn sound_to_point_process_extrema(
    sound: &Sound,
    channel: usize,
    include_maxima: bool,
    include_minima: bool,
    interpolation: PeakInterpolation,
) -> Result<PointProcess> {
    if channel < 1 || channel > sound.n_channels() {
        praat_bail!("Channel {} does not exist.", channel);
    }
    let signal = sound.channel(channel - 1);
    let mut process = PointProcess {
        xmin: sound.xmin(),
        xmax: sound.xmax(),
        times: Vec::new(),
    };
    for i in 1..signal.len().saturating_sub(1) {
        let (a, b, c) = (signal[i - 1], signal[i], signal[i + 1]);
        let is_max = include_maxima && b > a && b >= c;
        let is_min = include_minima && b < a && b <= c;
        if !(is_max || is_min) {
            continue;
        }
        let offset = match interpolation {
            PeakInterpolation::None => 0.0,
            PeakInterpolation::Parabolic => parabolic_peak(a, b, c).0,
        };
        process.times.push(sound.sample_time(i) + offset * sound.dx());
    }
    Ok(process)
}

impl Pitch {
    /// Pulses derived from this contour alone.
    pub fn to_point_process(&self) -> PointProcess {
        pitch_to_point_process(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(period: f64, n: usize) -> PointProcess {
        let times: Vec<f64> = (0..n).map(|i| 0.1 + i as f64 * period).collect();
        PointProcess::from_times(&times, Some((0.0, 1.0))).unwrap()
    }

    #[test]
    fn domain_defaults_to_point_range() {
        let pp = PointProcess::from_times(&[0.1, 0.4, 1.2, 2.4, 0.5], None).unwrap();
        assert_eq!(pp.xmin(), 0.1);
        assert_eq!(pp.xmax(), 2.4);
        assert_eq!(pp.times(), &[0.1, 0.4, 0.5, 1.2, 2.4]);
    }

    #[test]
    fn empty_with_reversed_domain_fails() {
        let err = PointProcess::empty(1.0, 0.0).unwrap_err();
        assert_eq!(err.to_string(), "Your end time (0) should not be less than your start time (1).");
    }

    #[test]
    fn indices_around_a_time() {
        let pp = PointProcess::from_times(&[0.1, 0.2, 0.3, 0.4], Some((0.0, 1.0))).unwrap();
        assert_eq!(pp.low_index(0.25), 2);
        assert_eq!(pp.high_index(0.25), 3);
        assert_eq!(pp.nearest_index(0.26), 3);
        assert_eq!(pp.low_index(0.05), 0);
        assert_eq!(pp.high_index(0.5), 5);
        assert!((pp.interval(0.25) - 0.1).abs() < 1e-12);
        assert!(pp.interval(0.05).is_nan());
        assert_eq!(pp.window_points(0.15, 0.35), (2, 3));
    }

    #[test]
    fn editing_keeps_points_sorted() {
        let mut pp = regular(0.01, 10);
        pp.add_point(0.155);
        assert_eq!(pp.len(), 11);
        pp.add_point(0.155);
        assert_eq!(pp.len(), 11);
        pp.remove_point(1);
        assert!((pp[0] - 0.11).abs() < 1e-12);
        pp.remove_point_near(0.156);
        assert!(!pp.times().contains(&0.155));
        pp.remove_points(2, 4);
        assert_eq!(pp.len(), 6);
        pp.remove_points_between(0.17, 1.0);
        assert!(pp.times().iter().all(|&t| t < 0.17));
    }

    #[test]
    fn fill_matches_a_regular_grid() {
        let mut pp = PointProcess::empty(0.0, 2.0).unwrap();
        pp.fill(0.5, 1.5, 0.01).unwrap();
        assert_eq!(pp.len(), 100);
        assert!((pp[0] - 0.5).abs() < 1e-12);
        assert!((pp[99] - 1.49).abs() < 1e-12);
    }

    #[test]
    fn set_operations() {
        let a = PointProcess::from_times(&[0.1, 0.3, 0.5, 0.7], None).unwrap();
        let b = PointProcess::from_times(&[0.1, 0.2, 0.3, 0.4], None).unwrap();
        assert_eq!(a.union(&b).times(), &[0.1, 0.2, 0.3, 0.4, 0.5, 0.7]);
        let i = a.intersection(&b);
        assert_eq!(i.times(), &[0.1, 0.3]);
        assert_eq!((i.xmin(), i.xmax()), (0.1, 0.4));
        let d = a.difference(&b);
        assert_eq!(d.times(), &[0.5, 0.7]);
        assert_eq!((d.xmin(), d.xmax()), (0.1, 0.7));
    }

    #[test]
    fn perfectly_regular_pulses_have_no_jitter() {
        let pp = regular(0.005, 100);
        let w = PeriodWindow::default();
        assert_eq!(pp.number_of_periods(&w), 99);
        assert!((pp.mean_period(&w) - 0.005).abs() < 1e-12);
        assert!(pp.jitter_local(&w) < 1e-9);
        assert!(pp.jitter_rap(&w) < 1e-9);
        assert!(pp.jitter_ppq5(&w) < 1e-9);
        assert!(pp.jitter_ddp(&w) < 1e-9);
    }

    #[test]
    fn alternating_periods_give_known_jitter() {
        let mut times = vec![0.0];
        for i in 0..20 {
            let p = if i % 2 == 0 { 0.010 } else { 0.011 };
            times.push(times[i] + p);
        }
        let pp = PointProcess::from_times(&times, None).unwrap();
        let w = PeriodWindow::default();
        assert!((pp.jitter_local_absolute(&w) - 0.001).abs() < 1e-9);
        assert!((pp.jitter_local(&w) - 0.001 / 0.0105).abs() < 1e-6);
        assert!((pp.jitter_ddp(&w) - 0.002 / 0.0105).abs() < 1e-6);
    }

    #[test]
    fn long_intervals_are_not_periods() {
        let pp = PointProcess::from_times(&[0.0, 0.01, 0.02, 0.1, 0.11], None).unwrap();
        assert_eq!(pp.number_of_periods(&PeriodWindow::default()), 2);
    }

    #[test]
    fn voicing_removes_breaks() {
        let mut pp = PointProcess::from_times(&[0.2, 0.21, 0.22, 0.6, 0.61], Some((0.0, 1.0))).unwrap();
        let before = pp.voice_breaks(0.0, 0.0, 0.02);
        assert_eq!(before.count, 1);
        assert!(before.fraction > 0.5);
        pp.voice(0.01, 0.02000000001).unwrap();
        let after = pp.voice_breaks(0.0, 0.0, 0.02000000001);
        assert_eq!(after.count, 0);
        assert_eq!(after.fraction, 0.0);
    }

    #[test]
    fn poisson_process_stays_in_domain() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(5489);
        let pp = PointProcess::poisson(&mut rng, 0.0, 1.0, 100.0).unwrap();
        assert!(pp.len() > 50 && pp.len() < 150);
        assert!(pp.times().windows(2).all(|w| w[0] < w[1]));
        assert!(pp.times().iter().all(|&t| (0.0..=1.0).contains(&t)));
    }

    #[test]
    fn shimmer_of_constant_amplitude_is_zero() {
        let sr = 10000.0;
        let samples = Array1::from_iter((0..10000).map(|i| (2.0 * std::f64::consts::PI * 100.0 * i as f64 / sr).sin()));
        let sound = Sound::new(samples, sr);
        let pp = sound
            .to_point_process_extrema(1, true, false, PeakInterpolation::None)
            .unwrap();
        let w = PeriodWindow::default();
        assert!(pp.len() > 90);
        assert!(pp.shimmer_local(&sound, &w, 1.6) < 1e-3);
        assert!(pp.shimmer_local_db(&sound, &w, 1.6) < 1e-2);
        assert!(pp.shimmer_apq11(&sound, &w, 1.6) < 1e-3);
    }
}
