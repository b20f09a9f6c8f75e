//! TextGrid - Annotation tiers over a time domain.
//!
//! A TextGrid holds interval tiers (contiguous labelled intervals covering
//! the whole domain) and point tiers (labelled time points). Tier, interval
//! and point numbers are 1-based.

use crate::error::{praat_bail, Result};
use crate::sound::Sound;
use crate::value::format_number;

/// One labelled interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    /// Start time.
    pub xmin: f64,
    /// End time.
    pub xmax: f64,
    /// Label.
    pub text: String,
}

/// One labelled point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Time of the point.
    pub time: f64,
    /// Label.
    pub mark: String,
}

/// The two kinds of tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierKind {
    /// Contiguous intervals from `xmin` to `xmax`.
    Intervals(Vec<Interval>),
    /// Sorted points.
    Points(Vec<Point>),
}

/// A named tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    /// Tier name.
    pub name: String,
    /// Start of the tier domain.
    pub xmin: f64,
    /// End of the tier domain.
    pub xmax: f64,
    /// Contents.
    pub kind: TierKind,
}

impl Tier {
    /// An interval tier with one empty interval.
    pub fn intervals(name: &str, xmin: f64, xmax: f64) -> Self {
        Self {
            name: name.to_string(),
            xmin,
            xmax,
            kind: TierKind::Intervals(vec![Interval {
                xmin,
                xmax,
                text: String::new(),
            }]),
        }
    }

    /// An empty point tier.
    pub fn points(name: &str, xmin: f64, xmax: f64) -> Self {
        Self {
            name: name.to_string(),
            xmin,
            xmax,
            kind: TierKind::Points(Vec::new()),
        }
    }

    /// Whether this is an interval tier.
    pub fn is_interval_tier(&self) -> bool {
        matches!(self.kind, TierKind::Intervals(_))
    }
}

/// A set of annotation tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGrid {
    xmin: f64,
    xmax: f64,
    tiers: Vec<Tier>,
}

impl TextGrid {
    /// A TextGrid from explicit tiers.
    pub fn new(xmin: f64, xmax: f64, tiers: Vec<Tier>) -> Result<Self> {
        if xmax <= xmin {
            praat_bail!("The end time should be greater than the start time.");
        }
        Ok(Self { xmin, xmax, tiers })
    }

    /// An empty TextGrid with the space-separated `tier_names`; those also
    /// listed in `point_tiers` become point tiers.
    pub fn from_names(xmin: f64, xmax: f64, tier_names: &str, point_tiers: &str) -> Result<Self> {
        if xmax <= xmin {
            praat_bail!("The end time should be greater than the start time.");
        }
        let names: Vec<&str> = tier_names.split_whitespace().collect();
        for point in point_tiers.split_whitespace() {
            if !names.contains(&point) {
                praat_bail!("Point tier name '{}' is not in list of all tier names.", point);
            }
        }
        let points: Vec<&str> = point_tiers.split_whitespace().collect();
        let tiers = names
            .iter()
            .map(|name| {
                if points.contains(name) {
                    Tier::points(name, xmin, xmax)
                } else {
                    Tier::intervals(name, xmin, xmax)
                }
            })
            .collect();
        Ok(Self { xmin, xmax, tiers })
    }

    /// Start time.
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    /// End time.
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    /// All tiers.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Number of tiers.
    pub fn n_tiers(&self) -> usize {
        self.tiers.len()
    }

    /// 1-based tier `number`.
    pub fn tier(&self, number: usize) -> Result<&Tier> {
        if number < 1 || number > self.tiers.len() {
            praat_bail!(
                "The tier number ({}) should not be greater than the number of tiers ({}).",
                number,
                self.tiers.len()
            );
        }
        Ok(&self.tiers[number - 1])
    }

    fn tier_mut(&mut self, number: usize) -> Result<&mut Tier> {
        self.tier(number)?;
        Ok(&mut self.tiers[number - 1])
    }

    /// Names of all tiers.
    pub fn tier_names(&self) -> Vec<String> {
        self.tiers.iter().map(|t| t.name.clone()).collect()
    }

    fn intervals(&self, tier: usize) -> Result<&[Interval]> {
        match &self.tier(tier)?.kind {
            TierKind::Intervals(intervals) => Ok(intervals),
            TierKind::Points(_) => praat_bail!("Tier {} is not an interval tier.", tier),
        }
    }

    fn points(&self, tier: usize) -> Result<&[Point]> {
        match &self.tier(tier)?.kind {
            TierKind::Points(points) => Ok(points),
            TierKind::Intervals(_) => praat_bail!("Tier {} is not a point tier.", tier),
        }
    }

    /// Number of intervals on an interval tier.
    pub fn n_intervals(&self, tier: usize) -> Result<usize> {
        Ok(self.intervals(tier)?.len())
    }

    /// 1-based interval of an interval tier.
    pub fn interval(&self, tier: usize, number: usize) -> Result<&Interval> {
        let intervals = self.intervals(tier)?;
        if number < 1 || number > intervals.len() {
            praat_bail!(
                "Interval number {} is out of range (tier {} has {} intervals).",
                number,
                tier,
                intervals.len()
            );
        }
        Ok(&intervals[number - 1])
    }

    /// Number of points on a point tier.
    pub fn n_points(&self, tier: usize) -> Result<usize> {
        Ok(self.points(tier)?.len())
    }

    /// 1-based point of a point tier.
    pub fn point(&self, tier: usize, number: usize) -> Result<&Point> {
        let points = self.points(tier)?;
        if number < 1 || number > points.len() {
            praat_bail!(
                "Point number {} is out of range (tier {} has {} points).",
                number,
                tier,
                points.len()
            );
        }
        Ok(&points[number - 1])
    }

    /// Split the interval containing `time` in two.
    pub fn insert_boundary(&mut self, tier: usize, time: f64) -> Result<()> {
        let (xmin, xmax) = (self.xmin, self.xmax);
        let TierKind::Intervals(intervals) = &mut self.tier_mut(tier)?.kind else {
            praat_bail!("Tier {} is not an interval tier.", tier);
        };
        if time <= xmin || time >= xmax {
            praat_bail!("Cannot add a boundary at {} seconds, because this is outside the time domain of the intervals.", format_number(time));
        }
        if intervals.iter().any(|i| i.xmin == time) {
            praat_bail!("Cannot add a boundary at {} seconds, because there is already a boundary there.", format_number(time));
        }
        let Some(at) = intervals.iter().position(|i| time > i.xmin && time < i.xmax) else {
            praat_bail!("Cannot add a boundary at {} seconds.", format_number(time));
        };
        let right = Interval {
            xmin: time,
            xmax: intervals[at].xmax,
            text: String::new(),
        };
        intervals[at].xmax = time;
        intervals.insert(at + 1, right);
        Ok(())
    }

    /// Replace the label of an interval.
    pub fn set_interval_text(&mut self, tier: usize, number: usize, text: &str) -> Result<()> {
        self.interval(tier, number)?;
        if let TierKind::Intervals(intervals) = &mut self.tier_mut(tier)?.kind {
            intervals[number - 1].text = text.to_string();
        }
        Ok(())
    }

    /// Add a labelled point, keeping the tier sorted.
    pub fn insert_point(&mut self, tier: usize, time: f64, mark: &str) -> Result<()> {
        let TierKind::Points(points) = &mut self.tier_mut(tier)?.kind else {
            praat_bail!("Tier {} is not a point tier.", tier);
        };
        if points.iter().any(|p| p.time == time) {
            praat_bail!("Cannot add a point at {} seconds, because there is already a point there.", format_number(time));
        }
        let at = points.partition_point(|p| p.time < time);
        points.insert(
            at,
            Point {
                time,
                mark: mark.to_string(),
            },
        );
        Ok(())
    }

    /// The parts of `sound` under the labelled intervals of `tier`.
    ///
    /// Parts are named after their labels; an empty result means there was
    /// nothing to extract, and the caller decides whether to warn.
    pub fn extract_non_empty_intervals(
        &self,
        sound: &Sound,
        tier: usize,
        preserve_times: bool,
    ) -> Result<Vec<(String, Sound)>> {
        let mut parts = Vec::new();
        for interval in self.intervals(tier)? {
            if interval.text.is_empty() {
                continue;
            }
            let part = sound.extract_part(
                interval.xmin,
                interval.xmax,
                crate::sound::WindowShape::Rectangular,
                1.0,
                preserve_times,
            )?;
            parts.push((interval.text.clone(), part));
        }
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_with_point_tiers() {
        let tg = TextGrid::from_names(0.0, 1.0, "a b c d e", "b d e").unwrap();
        assert_eq!(tg.n_tiers(), 5);
        assert_eq!(tg.tier_names(), vec!["a", "b", "c", "d", "e"]);
        assert!(tg.tier(1).unwrap().is_interval_tier());
        assert!(!tg.tier(2).unwrap().is_interval_tier());
        assert_eq!(tg.n_intervals(1).unwrap(), 1);
        assert_eq!(tg.n_points(4).unwrap(), 0);
    }

    #[test]
    fn invalid_creation_messages() {
        let err = TextGrid::from_names(1.0, 0.0, "a", "").unwrap_err();
        assert_eq!(err.to_string(), "The end time should be greater than the start time.");
        let err = TextGrid::from_names(0.0, 1.0, "a b", "b c").unwrap_err();
        assert_eq!(err.to_string(), "Point tier name 'c' is not in list of all tier names.");
    }

    #[test]
    fn boundaries_split_intervals() {
        let mut tg = TextGrid::from_names(0.0, 1.0, "words", "").unwrap();
        tg.insert_boundary(1, 0.3).unwrap();
        tg.insert_boundary(1, 0.6).unwrap();
        tg.set_interval_text(1, 2, "hello").unwrap();
        assert_eq!(tg.n_intervals(1).unwrap(), 3);
        let middle = tg.interval(1, 2).unwrap();
        assert_eq!((middle.xmin, middle.xmax, middle.text.as_str()), (0.3, 0.6, "hello"));
        assert!(tg.insert_boundary(1, 0.3).is_err());
        assert!(tg.insert_boundary(1, 1.5).is_err());
    }

    #[test]
    fn points_stay_sorted() {
        let mut tg = TextGrid::from_names(0.0, 1.0, "a tones", "tones").unwrap();
        tg.insert_point(2, 0.7, "L").unwrap();
        tg.insert_point(2, 0.2, "H").unwrap();
        assert_eq!(tg.point(2, 1).unwrap().mark, "H");
        assert_eq!(tg.point(2, 2).unwrap().time, 0.7);
        assert!(tg.insert_point(1, 0.5, "x").is_err());
    }

    #[test]
    fn extract_labelled_parts() {
        let sound = Sound::from_slice(&vec![0.1; 1000], 1000.0);
        let mut tg = sound.to_textgrid("tier", "").unwrap();
        assert!(tg.extract_non_empty_intervals(&sound, 1, true).unwrap().is_empty());
        tg.insert_boundary(1, 0.25).unwrap();
        tg.insert_boundary(1, 0.5).unwrap();
        tg.set_interval_text(1, 2, "a").unwrap();
        let parts = tg.extract_non_empty_intervals(&sound, 1, true).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].0, "a");
        assert!((parts[0].1.duration() - 0.25).abs() < 1e-9);
    }
}
