//! Matrix - A function sampled on a regular two-dimensional grid.
//!
//! Rows run along y, columns along x. Both axes follow the same sampling
//! conventions as [`Sampled`]: `nx` columns starting at `x1` with step `dx`,
//! `ny` rows starting at `y1` with step `dy`.

use std::io::Write;
use std::path::Path;

use ndarray::Array2;

use crate::error::{praat_bail, Error, Result};
use crate::sampled::Sampled;

/// The y axis of a Matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    /// Start of the domain.
    pub min: f64,
    /// End of the domain.
    pub max: f64,
    /// Step between cells.
    pub step: f64,
    /// Position of the first cell.
    pub first: f64,
}

/// Position of a cell, handed to formulas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// 1-based row number.
    pub row: usize,
    /// 1-based column number.
    pub col: usize,
    /// x of the column.
    pub x: f64,
    /// y of the row.
    pub y: f64,
    /// Current value.
    pub value: f64,
}

/// A sampled 2-D function.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    x: Axis,
    y: Axis,
    values: Array2<f64>,
}

impl Matrix {
    /// A zero matrix of `ny` rows and `nx` columns.
    pub fn zeros(x: Axis, nx: usize, y: Axis, ny: usize) -> Result<Self> {
        if x.max < x.min || y.max < y.min {
            praat_bail!("The end of a domain should not be less than its start.");
        }
        if nx == 0 || ny == 0 {
            praat_bail!("A Matrix should have at least one row and one column.");
        }
        Ok(Self {
            x,
            y,
            values: Array2::zeros((ny, nx)),
        })
    }

    /// A matrix with explicit axes; rows run along `y`.
    pub fn new(x: Axis, y: Axis, values: Array2<f64>) -> Self {
        Self { x, y, values }
    }

    /// A matrix with unit-spaced cells around `1..=n`, as read from text.
    pub fn from_values(values: Array2<f64>) -> Self {
        let (rows, cols) = values.dim();
        let unit = |n: usize| Axis {
            min: 0.5,
            max: n as f64 + 0.5,
            step: 1.0,
            first: 1.0,
        };
        Self {
            x: unit(cols),
            y: unit(rows),
            values,
        }
    }

    /// Read whitespace-separated numbers, one row per non-empty line.
    pub fn read_raw_text<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|_| Error::praat(format!("Cannot open file “{}”.", path.display())))?;
        Self::parse_raw_text(&text)
    }

    /// Parse the contents of a raw text matrix file.
    pub fn parse_raw_text(text: &str) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|word| {
                    word.parse::<f64>()
                        .map_err(|_| Error::praat(format!("Line {}: \"{}\" is not a number.", n + 1, word)))
                })
                .collect::<Result<Vec<f64>>>()?;
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    praat_bail!("Line {} has {} numbers instead of {}.", n + 1, row.len(), first.len());
                }
            }
            rows.push(row);
        }
        let Some(cols) = rows.first().map(Vec::len) else {
            praat_bail!("The file contains no numbers.");
        };
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((rows.len(), cols), flat).map_err(|e| Error::praat(e.to_string()))?;
        Ok(Self::from_values(values))
    }

    /// Write the values as tab-separated rows without any header.
    pub fn save_headerless_spreadsheet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = std::fs::File::create(path)
            .map_err(|_| Error::praat(format!("Cannot create file “{}”.", path.display())))?;
        for row in self.values.rows() {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(file, "{}", line.join("\t"))?;
        }
        Ok(())
    }

    /// The cell values (rows along y).
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// The y axis.
    pub fn y_axis(&self) -> Axis {
        self.y
    }

    /// The x axis.
    pub fn x_axis(&self) -> Axis {
        self.x
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.values.ncols()
    }

    /// Value in 1-based cell (`row`, `col`).
    pub fn value_in_cell(&self, row: usize, col: usize) -> Result<f64> {
        if row < 1 || row > self.n_rows() {
            praat_bail!("Row number {} out of range.", row);
        }
        if col < 1 || col > self.n_columns() {
            praat_bail!("Column number {} out of range.", col);
        }
        Ok(self.values[[row - 1, col - 1]])
    }

    /// Sum over all cells.
    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    /// Replace every cell by `formula(cell)`, row by row.
    pub fn apply_formula<F>(&mut self, mut formula: F) -> Result<()>
    where
        F: FnMut(&Cell) -> Result<f64>,
    {
        let (x1, dx, y1, dy) = (self.x.first, self.x.step, self.y.first, self.y.step);
        for ((r, c), value) in self.values.indexed_iter_mut() {
            let cell = Cell {
                row: r + 1,
                col: c + 1,
                x: x1 + c as f64 * dx,
                y: y1 + r as f64 * dy,
                value: *value,
            };
            *value = formula(&cell)?;
        }
        Ok(())
    }
}

impl Sampled for Matrix {
    fn xmin(&self) -> f64 {
        self.x.min
    }
    fn xmax(&self) -> f64 {
        self.x.max
    }
    fn nx(&self) -> usize {
        self.values.ncols()
    }
    fn dx(&self) -> f64 {
        self.x.step
    }
    fn x1(&self) -> f64 {
        self.x.first
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_text_gets_unit_domains() {
        let m = Matrix::parse_raw_text("1 2 3\n4 5 6\n\n").unwrap();
        assert_eq!((m.n_rows(), m.n_columns()), (2, 3));
        assert_eq!((m.xmin(), m.xmax(), m.dx(), m.x1()), (0.5, 3.5, 1.0, 1.0));
        assert_eq!(m.y_axis().max, 2.5);
        assert_eq!(m.value_in_cell(2, 3).unwrap(), 6.0);
        assert_eq!(m.sum(), 21.0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(Matrix::parse_raw_text("1 2\n3\n").is_err());
        assert!(Matrix::parse_raw_text("1 x\n").is_err());
    }

    #[test]
    fn formula_sees_cell_coordinates() {
        let axis = Axis {
            min: 0.0,
            max: 2.0,
            step: 1.0,
            first: 0.5,
        };
        let mut m = Matrix::zeros(axis, 2, axis, 2).unwrap();
        m.apply_formula(|cell| Ok(cell.row as f64 * 10.0 + cell.x)).unwrap();
        assert_eq!(m.values()[[0, 0]], 10.5);
        assert_eq!(m.values()[[1, 1]], 21.5);
    }

    #[test]
    fn spreadsheet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.txt");
        let m = Matrix::parse_raw_text("0.25 -1\n3 4e-3\n").unwrap();
        m.save_headerless_spreadsheet(&path).unwrap();
        assert_eq!(Matrix::read_raw_text(&path).unwrap(), m);
    }
}
