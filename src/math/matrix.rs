use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NnError, Result};

/// Dense row-major matrix of `f64`.
///
/// Methods taking `&self` allocate a new matrix and leave their operands
/// untouched. Methods taking `&mut self` rewrite the receiver in place and
/// hand it back so calls can be chained:
///
/// ```
/// # use ferrite_evo::Matrix;
/// let mut m = Matrix::from_vec(&[1.0, 2.0, 3.0]).unwrap();
/// m.multiply(2.0).subtract(1.0);
/// assert_eq!(m.to_vec(), vec![1.0, 3.0, 5.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Vec<f64>>,
}

/// Unchecked wire form; converted through `Matrix::from_data` so a
/// deserialized grid always agrees with its declared shape.
#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Vec<f64>>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = NnError;

    fn try_from(raw: RawMatrix) -> Result<Matrix> {
        Matrix::from_data(raw.rows, raw.cols, raw.data)
    }
}

impl Matrix {
    /// Callers supply a non-empty shape; public construction goes through
    /// `from_data` or `from_vec`.
    pub(crate) fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// Every cell drawn uniformly from [-1, 1). Same shape contract as `zeros`.
    pub(crate) fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);
        res.map(|_, _, _| Matrix::random_value(rng));
        res
    }

    /// A single uniform draw from [-1, 1); the same distribution `random` fills with.
    pub fn random_value<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        rng.gen::<f64>() * 2.0 - 1.0
    }

    /// Wraps an existing grid, failing if it disagrees with `rows` x `cols`.
    pub fn from_data(rows: usize, cols: usize, data: Vec<Vec<f64>>) -> Result<Matrix> {
        if rows == 0 || cols == 0 {
            return Err(NnError::DimensionMismatch(format!(
                "Matrix constructor: {rows}x{cols} is empty"
            )));
        }
        if data.len() != rows || data.iter().any(|row| row.len() != cols) {
            return Err(NnError::DimensionMismatch(format!(
                "Matrix constructor: data does not fit {rows}x{cols}"
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Column vector (len x 1). Fails on an empty slice.
    pub fn from_vec(values: &[f64]) -> Result<Matrix> {
        if values.is_empty() {
            return Err(NnError::DimensionMismatch(
                "Matrix from_vec: a column needs at least one value".into(),
            ));
        }
        Ok(Matrix {
            rows: values.len(),
            cols: 1,
            data: values.iter().map(|&v| vec![v]).collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Flattens the grid in row-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().flatten().copied().collect()
    }

    pub fn is_column(&self) -> bool {
        self.cols == 1
    }

    // ---------------------------------------------------------------------
    // Pure operations
    // ---------------------------------------------------------------------

    /// Matrix product. Requires `a.cols == b.rows`; result is `a.rows x b.cols`.
    pub fn dot(a: &Matrix, b: &Matrix) -> Result<Matrix> {
        if a.cols != b.rows {
            return Err(size_mismatch("dot", a, b));
        }

        let mut res = Matrix::zeros(a.rows, b.cols);

        for i in 0..res.rows {
            for j in 0..res.cols {
                let mut sum = 0.0;

                for k in 0..a.cols {
                    sum += a.data[i][k] * b.data[k][j];
                }

                res.data[i][j] = sum;
            }
        }

        Ok(res)
    }

    /// `a - b` for two column vectors of equal length.
    pub fn difference(a: &Matrix, b: &Matrix) -> Result<Matrix> {
        if !a.is_column() || !b.is_column() {
            return Err(NnError::DimensionMismatch(format!(
                "Matrix difference: only column vectors can be used, got {}x{} and {}x{}",
                a.rows, a.cols, b.rows, b.cols
            )));
        }
        if a.rows != b.rows {
            return Err(size_mismatch("difference", a, b));
        }

        let mut res = a.clone();
        res.map(|v, row, col| v - b.data[row][col]);
        Ok(res)
    }

    /// Elementwise mean of a non-empty list of same-shaped matrices.
    pub fn average(matrices: &[Matrix]) -> Result<Matrix> {
        let (first, rest) = matrices.split_first().ok_or_else(|| {
            NnError::DimensionMismatch("Matrix average: no matrices given".into())
        })?;

        let mut sum = first.clone();
        for m in rest {
            sum.add_matrix(m)?;
        }
        sum.divide(matrices.len() as f64)?;
        Ok(sum)
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    /// Rounds every cell to the nearest integer. Binarizes sigmoid outputs
    /// so they can be compared against 0/1 targets.
    pub fn round(&self) -> Matrix {
        let mut res = self.clone();
        res.map(|v, _, _| v.round());
        res
    }

    /// Index of the largest cell of a column vector; ties go to the first.
    pub fn argmax_column(&self) -> Result<usize> {
        if !self.is_column() {
            return Err(NnError::DimensionMismatch(format!(
                "Matrix argmax_column: only column vectors can be used, got {}x{}",
                self.rows, self.cols
            )));
        }

        let mut best = 0;
        for (i, row) in self.data.iter().enumerate() {
            if row[0] > self.data[best][0] {
                best = i;
            }
        }
        Ok(best)
    }

    pub fn equals(&self, m: &Matrix) -> Result<bool> {
        self.check_sizes(m, "equals")?;
        Ok(self.data == m.data)
    }

    // ---------------------------------------------------------------------
    // In-place operations
    // ---------------------------------------------------------------------

    /// Replaces every cell with `f(value, row, col)`.
    pub fn map<F>(&mut self, mut f: F) -> &mut Self
    where
        F: FnMut(f64, usize, usize) -> f64,
    {
        for (i, row) in self.data.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = f(*cell, i, j);
            }
        }
        self
    }

    pub fn add_matrix(&mut self, m: &Matrix) -> Result<&mut Self> {
        self.check_sizes(m, "add_matrix")?;
        Ok(self.map(|v, row, col| v + m.data[row][col]))
    }

    pub fn subtract_matrix(&mut self, m: &Matrix) -> Result<&mut Self> {
        self.check_sizes(m, "subtract_matrix")?;
        Ok(self.map(|v, row, col| v - m.data[row][col]))
    }

    /// Elementwise (Hadamard) product.
    pub fn multiply_matrix(&mut self, m: &Matrix) -> Result<&mut Self> {
        self.check_sizes(m, "multiply_matrix")?;
        Ok(self.map(|v, row, col| v * m.data[row][col]))
    }

    pub fn subtract(&mut self, num: f64) -> &mut Self {
        self.map(|v, _, _| v - num)
    }

    pub fn multiply(&mut self, num: f64) -> &mut Self {
        self.map(|v, _, _| v * num)
    }

    pub fn divide(&mut self, num: f64) -> Result<&mut Self> {
        if num == 0.0 {
            return Err(NnError::DivideByZero("Matrix divide: cannot divide by 0".into()));
        }
        Ok(self.map(|v, _, _| v / num))
    }

    fn check_sizes(&self, m: &Matrix, method: &str) -> Result<()> {
        if self.rows != m.rows || self.cols != m.cols {
            return Err(size_mismatch(method, self, m));
        }
        Ok(())
    }
}

fn size_mismatch(method: &str, a: &Matrix, b: &Matrix) -> NnError {
    NnError::DimensionMismatch(format!(
        "Matrix {method}: {}x{} and {}x{} do not fit",
        a.rows, a.cols, b.rows, b.cols
    ))
}
