use super::ConfigError;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Adapter trait for borrowing one contiguous 1D signal.
pub trait Read1D<T> {
    /// Borrow the underlying input as a contiguous slice.
    fn read_slice(&self) -> Result<&[T], ConfigError>;
}

/// Adapter trait for borrowing a batch of signals, one per row.
///
/// Rows must all have the same length; ragged input is rejected.
pub trait ReadBatch<T> {
    /// Borrow every row as a contiguous slice.
    fn read_rows(&self) -> Result<Vec<&[T]>, ConfigError>;
}

impl<T> Read1D<T> for [T] {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self)
    }
}

impl<T, const N: usize> Read1D<T> for [T; N] {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self)
    }
}

impl<T> Read1D<T> for Vec<T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self.as_slice())
    }
}

impl<T> Read1D<T> for Array1<T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        self.as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "signal" })
    }
}

impl<'a, T> Read1D<T> for ArrayView1<'a, T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        self.as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "signal" })
    }
}

fn check_equal_rows<T>(rows: Vec<&[T]>) -> Result<Vec<&[T]>, ConfigError> {
    let first = rows.first().ok_or(ConfigError::EmptyInput { arg: "batch" })?;
    let expected = first.len();
    if let Some(bad) = rows.iter().find(|r| r.len() != expected) {
        return Err(ConfigError::LengthMismatch {
            arg: "batch",
            expected,
            got: bad.len(),
        });
    }
    Ok(rows)
}

impl<T> ReadBatch<T> for [&[T]] {
    fn read_rows(&self) -> Result<Vec<&[T]>, ConfigError> {
        check_equal_rows(self.to_vec())
    }
}

impl<T> ReadBatch<T> for [Vec<T>] {
    fn read_rows(&self) -> Result<Vec<&[T]>, ConfigError> {
        check_equal_rows(self.iter().map(Vec::as_slice).collect())
    }
}

impl<T> ReadBatch<T> for Vec<Vec<T>> {
    fn read_rows(&self) -> Result<Vec<&[T]>, ConfigError> {
        self.as_slice().read_rows()
    }
}

impl<'a, T> ReadBatch<T> for ArrayView2<'a, T> {
    fn read_rows(&self) -> Result<Vec<&[T]>, ConfigError> {
        if self.nrows() == 0 {
            return Err(ConfigError::EmptyInput { arg: "batch" });
        }
        let cols = self.ncols();
        let flat = self
            .to_slice()
            .ok_or(ConfigError::NonContiguous { arg: "batch" })?;
        if cols == 0 {
            return Err(ConfigError::EmptyInput { arg: "signal" });
        }
        Ok(flat.chunks_exact(cols).collect())
    }
}

impl<T> ReadBatch<T> for Array2<T> {
    fn read_rows(&self) -> Result<Vec<&[T]>, ConfigError> {
        if self.nrows() == 0 {
            return Err(ConfigError::EmptyInput { arg: "batch" });
        }
        let cols = self.ncols();
        let flat = self
            .as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "batch" })?;
        if cols == 0 {
            return Err(ConfigError::EmptyInput { arg: "signal" });
        }
        Ok(flat.chunks_exact(cols).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, Read1D, ReadBatch};
    use ndarray::{Array1, Array2};

    #[test]
    fn slice_vec_and_array_signals() {
        let a = [1.0f64, 2.0, 3.0];
        assert_eq!(a.read_slice().expect("array adapter").len(), 3);

        let v = vec![0.5f64; 8];
        assert_eq!(v.read_slice().expect("vec adapter")[7], 0.5);

        let arr = Array1::from(vec![1.0f64, 2.0, 3.0]);
        assert_eq!(arr.read_slice().expect("array1 read")[2], 3.0);
    }

    #[test]
    fn strided_view_is_rejected() {
        let arr = Array1::from(vec![1.0f64, 2.0, 3.0, 4.0]);
        let strided = arr.slice(ndarray::s![..;2]);
        assert_eq!(
            strided.read_slice().expect_err("strided view"),
            ConfigError::NonContiguous { arg: "signal" }
        );
    }

    #[test]
    fn batch_rows_from_array2() {
        let batch = Array2::from_shape_vec((2, 3), vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])
            .expect("shape");
        let rows = batch.read_rows().expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], &[4.0, 5.0, 6.0]);

        let view = batch.view();
        assert_eq!(view.read_rows().expect("view rows")[0], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn ragged_batch_is_rejected() {
        let ragged = vec![vec![1.0f64; 4], vec![1.0f64; 3]];
        assert_eq!(
            ragged.read_rows().expect_err("ragged rows"),
            ConfigError::LengthMismatch {
                arg: "batch",
                expected: 4,
                got: 3,
            }
        );
        let empty: Vec<Vec<f64>> = Vec::new();
        assert_eq!(
            empty.read_rows().expect_err("empty batch"),
            ConfigError::EmptyInput { arg: "batch" }
        );
    }
}
