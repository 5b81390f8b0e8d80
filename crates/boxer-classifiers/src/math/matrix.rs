use std::error::Error;
use std::fmt;
use std::ops::{Index, IndexMut};

use num_traits::Zero;

/// Row-major dense matrix that can grow in both dimensions.
///
/// Coefficient blocks use one row per feature and one column per class.
/// Growing never truncates: existing cells keep their values and their
/// `(row, col)` coordinates, new cells are zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Array2<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Array2<T> {
    pub fn from_shape_vec(shape: (usize, usize), data: Vec<T>) -> Result<Self, ShapeError> {
        let (rows, cols) = shape;
        if data.len() != rows * cols {
            return Err(ShapeError {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn row_slice(&self, row: usize) -> &[T] {
        let start = self.offset(row, 0);
        &self.data[start..start + self.cols]
    }

    pub fn row_slice_mut(&mut self, row: usize) -> &mut [T] {
        let start = self.offset(row, 0);
        let cols = self.cols;
        &mut self.data[start..start + cols]
    }

    /// Checked element access.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            Some(&self.data[self.offset(row, col)])
        } else {
            None
        }
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.data.clone()
    }
}

impl<T: Clone + Zero> Array2<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_elem(rows, cols, T::zero())
    }

    pub fn from_elem(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Grow to at least `rows x cols`, zero-filling new cells.
    pub fn grow_to(&mut self, rows: usize, cols: usize) {
        self.grow_with(rows, cols, T::zero());
    }

    /// Grow to at least `rows x cols`, filling new cells with `fill`.
    ///
    /// A smaller target in either dimension leaves that dimension alone.
    pub fn grow_with(&mut self, rows: usize, cols: usize, fill: T) {
        let new_rows = rows.max(self.rows);
        let new_cols = cols.max(self.cols);
        if new_rows == self.rows && new_cols == self.cols {
            return;
        }

        if new_cols == self.cols {
            // Row-major: appending rows keeps every offset intact.
            self.data.resize(new_rows * new_cols, fill);
            self.rows = new_rows;
            return;
        }

        let mut data = Vec::with_capacity(new_rows * new_cols);
        for row in 0..self.rows {
            data.extend_from_slice(self.row_slice(row));
            data.extend(std::iter::repeat(fill.clone()).take(new_cols - self.cols));
        }
        data.resize(new_rows * new_cols, fill);

        self.data = data;
        self.rows = new_rows;
        self.cols = new_cols;
    }
}

impl<T> Index<(usize, usize)> for Array2<T> {
    type Output = T;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let offset = self.offset(index.0, index.1);
        &self.data[offset]
    }
}

impl<T> IndexMut<(usize, usize)> for Array2<T> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let offset = self.offset(index.0, index.1);
        &mut self.data[offset]
    }
}

#[derive(Debug, Clone)]
pub struct ShapeError {
    rows: usize,
    cols: usize,
    len: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid shape ({}, {}) for buffer of length {}",
            self.rows, self.cols, self.len
        )
    }
}

impl Error for ShapeError {}
