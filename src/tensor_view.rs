//! Read-only multi-dimensional view over a flat, row-major buffer.
//!
//! The view never copies element data. It keeps the shape, the derived
//! strides and the ranges of the innermost slices, which the codec uses as
//! independent units of parallel work.

use core::ops::Range;

use log::debug;

use crate::{Error, Result};

/// Checks that `shape` is non-empty and covers exactly `elements` elements.
pub(crate) fn check_shape(shape: &[usize], elements: usize) -> Result<()> {
    if shape.is_empty() {
        return Err(Error::EmptyShape);
    }
    let product = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d));
    if shape.contains(&0) || product != Some(elements) {
        return Err(Error::ShapeMismatch {
            shape: shape.to_vec(),
            elements,
        });
    }
    Ok(())
}

/// Shape-aware view over `&[T]`.
///
/// # Beispiel
///
/// ```
/// use accelbits::TensorView;
///
/// let data = [1, 2, 3, 4, 5, 6];
/// let view = TensorView::new(&data, &[2, 3]).unwrap();
/// assert_eq!(view.strides(), &[3, 1]);
/// assert_eq!(view.most_inner_dims(), vec![&data[0..3], &data[3..6]]);
/// assert_eq!(view.get(&[1, 0]), Some(&4));
/// ```
#[derive(Debug, Clone)]
pub struct TensorView<'a, T> {
    data: &'a [T],
    shape: Vec<usize>,
    strides: Vec<usize>,
    inner: Vec<Range<usize>>,
}

impl<'a, T> TensorView<'a, T> {
    /// Creates a view of `data` with the given row-major `shape`.
    ///
    /// Fails with [`Error::EmptyShape`] for a shape without dimensions and
    /// with [`Error::ShapeMismatch`] if the shape does not cover `data`
    /// exactly (a zero dimension never does).
    pub fn new(data: &'a [T], shape: &[usize]) -> Result<Self> {
        let mut view = Self {
            data,
            shape: Vec::new(),
            strides: Vec::new(),
            inner: Vec::new(),
        };
        view.set_shape(shape)?;
        Ok(view)
    }

    /// Reinterprets the data with a new shape.
    ///
    /// On error the view keeps its previous shape.
    pub fn set_shape(&mut self, shape: &[usize]) -> Result<()> {
        check_shape(shape, self.data.len())?;

        let mut strides = vec![1usize; shape.len()];
        for d in (0..shape.len() - 1).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }

        let inner_len = shape[shape.len() - 1];
        self.inner = (0..self.data.len() / inner_len)
            .map(|s| s * inner_len..(s + 1) * inner_len)
            .collect();
        self.shape = shape.to_vec();
        self.strides = strides;
        debug!(
            "TensorView: shape {:?}, {} innermost slices of {}",
            self.shape,
            self.inner.len(),
            inner_len
        );
        Ok(())
    }

    /// The innermost slices in memory order.
    pub fn most_inner_dims(&self) -> Vec<&'a [T]> {
        let data = self.data;
        self.inner.iter().map(|r| &data[r.clone()]).collect()
    }

    /// Index ranges of the innermost slices within [`data`](Self::data).
    pub fn inner_ranges(&self) -> &[Range<usize>] {
        &self.inner
    }

    /// Extent of the innermost dimension.
    pub fn inner_len(&self) -> usize {
        self.shape.last().copied().unwrap_or(0)
    }

    /// The underlying flat buffer.
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat offset of a multi-index, or `None` if it is out of bounds or has
    /// the wrong number of dimensions.
    pub fn index_of(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &dim), &stride) in index.iter().zip(&self.shape).zip(&self.strides) {
            if i >= dim {
                return None;
            }
            offset += i * stride;
        }
        Some(offset)
    }

    pub fn get(&self, index: &[usize]) -> Option<&'a T> {
        self.index_of(index).map(|i| &self.data[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_by_three_slices() {
        let data = [10, 11, 12, 13, 14, 15];
        let view = TensorView::new(&data, &[2, 3]).unwrap();
        assert_eq!(view.inner_ranges(), &[0..3, 3..6]);
        assert_eq!(view.most_inner_dims(), vec![&data[0..3], &data[3..6]]);
        assert_eq!(view.ndim(), 2);
        assert_eq!(view.inner_len(), 3);
    }

    #[test]
    fn slices_cover_buffer_in_order() {
        let data: Vec<u32> = (0..120).collect();
        let view = TensorView::new(&data, &[2, 3, 4, 5]).unwrap();
        assert_eq!(view.strides(), &[60, 20, 5, 1]);
        let joined: Vec<u32> = view.most_inner_dims().concat();
        assert_eq!(joined, data);
        assert!(view.most_inner_dims().iter().all(|s| s.len() == 5));
    }

    #[test]
    fn one_dimensional_is_single_slice() {
        let data = [1u8, 2, 3];
        let view = TensorView::new(&data, &[3]).unwrap();
        assert_eq!(view.strides(), &[1]);
        assert_eq!(view.inner_ranges(), &[0..3]);
    }

    #[test]
    fn shape_errors() {
        let data = [0i8; 6];
        assert_eq!(TensorView::new(&data, &[]).unwrap_err(), Error::EmptyShape);
        assert_eq!(
            TensorView::new(&data, &[4, 2]).unwrap_err(),
            Error::ShapeMismatch { shape: vec![4, 2], elements: 6 }
        );
        assert!(matches!(
            TensorView::new(&data, &[0, 6]),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            TensorView::new(&data, &[usize::MAX, 2]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn set_shape_recomputes_and_keeps_old_on_error() {
        let data = [1, 2, 3, 4, 5, 6];
        let mut view = TensorView::new(&data, &[2, 3]).unwrap();
        view.set_shape(&[3, 2]).unwrap();
        assert_eq!(view.inner_ranges(), &[0..2, 2..4, 4..6]);
        assert_eq!(view.get(&[2, 1]), Some(&6));

        assert!(view.set_shape(&[5]).is_err());
        assert_eq!(view.shape(), &[3, 2]);
    }

    #[test]
    fn index_of_bounds() {
        let data = [0u16; 24];
        let view = TensorView::new(&data, &[2, 3, 4]).unwrap();
        assert_eq!(view.index_of(&[1, 2, 3]), Some(23));
        assert_eq!(view.index_of(&[0, 1, 0]), Some(4));
        assert_eq!(view.index_of(&[2, 0, 0]), None);
        assert_eq!(view.index_of(&[0, 0]), None);
    }
}
