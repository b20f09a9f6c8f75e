//! Sampled time domains.
//!
//! Sound, Intensity, Pitch, Spectrogram and Matrix all sample a function on
//! a regular grid: `nx` points starting at `x1` with step `dx`, inside a
//! domain `[xmin, xmax]`. Frame numbers are 1-based, as in Praat scripts.

use ndarray::{Array1, Array2};

/// A regularly sampled x (usually time) domain.
pub trait Sampled {
    /// Start of the domain.
    fn xmin(&self) -> f64;
    /// End of the domain.
    fn xmax(&self) -> f64;
    /// Number of samples or frames.
    fn nx(&self) -> usize;
    /// Step between samples.
    fn dx(&self) -> f64;
    /// Position of the first sample.
    fn x1(&self) -> f64;

    /// Total length of the domain.
    #[inline]
    fn total_duration(&self) -> f64 {
        self.xmax() - self.xmin()
    }

    /// x of 1-based frame `frame`.
    #[inline]
    fn frame_to_x(&self, frame: f64) -> f64 {
        self.x1() + (frame - 1.0) * self.dx()
    }

    /// Fractional 1-based frame number of `x`.
    #[inline]
    fn x_to_frame(&self, x: f64) -> f64 {
        (x - self.x1()) / self.dx() + 1.0
    }

    /// Nearest 1-based frame number of `x`, clamped to the valid range.
    fn nearest_frame(&self, x: f64) -> usize {
        let frame = self.x_to_frame(x).round();
        if frame < 1.0 {
            1
        } else if frame > self.nx() as f64 {
            self.nx().max(1)
        } else {
            frame as usize
        }
    }

    /// Sample positions.
    fn xs(&self) -> Array1<f64> {
        let (x1, dx) = (self.x1(), self.dx());
        Array1::from_iter((0..self.nx()).map(|i| x1 + dx * i as f64))
    }

    /// Cell edges around the samples (`nx + 1` values).
    fn x_grid(&self) -> Array1<f64> {
        let (x1, dx) = (self.x1(), self.dx());
        Array1::from_iter((0..=self.nx()).map(|i| x1 + dx * (i as f64 - 0.5)))
    }

    /// Cell bounds per sample (`nx` rows of `[left, right]`).
    fn x_bins(&self) -> Array2<f64> {
        let grid = self.x_grid();
        let nx = self.nx();
        Array2::from_shape_fn((nx, 2), |(i, j)| grid[i + j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Grid;

    impl Sampled for Grid {
        fn xmin(&self) -> f64 {
            0.0
        }
        fn xmax(&self) -> f64 {
            1.0
        }
        fn nx(&self) -> usize {
            4
        }
        fn dx(&self) -> f64 {
            0.25
        }
        fn x1(&self) -> f64 {
            0.125
        }
    }

    #[test]
    fn grid_and_bins_surround_samples() {
        let g = Grid;
        assert_eq!(g.xs().to_vec(), vec![0.125, 0.375, 0.625, 0.875]);
        assert_eq!(g.x_grid().to_vec(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let bins = g.x_bins();
        assert_eq!(bins.dim(), (4, 2));
        assert_eq!(bins[[2, 0]], 0.5);
        assert_eq!(bins[[2, 1]], 0.75);
    }

    #[test]
    fn frames_are_one_based() {
        let g = Grid;
        assert_eq!(g.frame_to_x(1.0), 0.125);
        assert_eq!(g.x_to_frame(0.375), 2.0);
        assert_eq!(g.nearest_frame(-3.0), 1);
        assert_eq!(g.nearest_frame(3.0), 4);
        assert_eq!(g.total_duration(), 1.0);
    }
}
