//! Action class labels and labeled boxes.

use anyhow::{ensure, Result};
use bbox::{Transform, XYXY};
use ndarray::Array2;
use num_traits::Num;
use serde::{Deserialize, Serialize};
use std::{fmt, num::ParseIntError, ops::Mul, str::FromStr};

/// The 1-based class id of an action, or the "no label" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLabel(i64);

impl ClassLabel {
    /// The sentinel for a box that carries no action label.
    pub const UNKNOWN: Self = Self(-1);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> i64 {
        self.0
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Map the label to a zero-based class column.
    ///
    /// Returns `None` for the sentinel. Any other id must lie in
    /// `1..=num_classes`.
    pub fn class_index(&self, num_classes: usize) -> Result<Option<usize>> {
        if self.is_unknown() {
            return Ok(None);
        }
        ensure!(
            self.0 >= 1 && self.0 as u64 <= num_classes as u64,
            "class label {} is out of range 1..={}",
            self.0,
            num_classes
        );
        Ok(Some(self.0 as usize - 1))
    }
}

impl FromStr for ClassLabel {
    type Err = ParseIntError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Ok(Self::UNKNOWN);
        }
        Ok(Self(text.trim().parse()?))
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A box with every label attached to it, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLabel<R, C = ClassLabel> {
    pub rect: R,
    pub classes: Vec<C>,
}

impl<R, C> MultiLabel<R, C> {
    pub fn new(rect: R) -> Self {
        Self {
            rect,
            classes: vec![],
        }
    }

    pub fn push(&mut self, class: C) {
        self.classes.push(class);
    }
}

impl<R> MultiLabel<R, ClassLabel> {
    /// The number of labels other than the sentinel.
    pub fn num_known(&self) -> usize {
        self.classes
            .iter()
            .filter(|class| !class.is_unknown())
            .count()
    }
}

impl<'a, T, C> Mul<&'a MultiLabel<XYXY<T>, C>> for &'a Transform<T>
where
    T: Copy + Num + PartialOrd,
    C: Clone,
{
    type Output = MultiLabel<XYXY<T>, C>;

    fn mul(self, rhs: &'a MultiLabel<XYXY<T>, C>) -> Self::Output {
        MultiLabel {
            rect: self * &rhs.rect,
            classes: rhs.classes.clone(),
        }
    }
}

/// Build a `num_boxes x num_classes` multi-hot matrix.
///
/// The sentinel is skipped. Label `k` sets column `k - 1`.
pub fn label_matrix<R>(entries: &[MultiLabel<R>], num_classes: usize) -> Result<Array2<i32>> {
    let mut matrix = Array2::zeros((entries.len(), num_classes));

    for (row, entry) in entries.iter().enumerate() {
        for class in &entry.classes {
            if let Some(col) = class.class_index(num_classes)? {
                matrix[[row, col]] = 1;
            }
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbox::HW;

    #[test]
    fn parse_class_label() {
        assert_eq!("".parse::<ClassLabel>().unwrap(), ClassLabel::UNKNOWN);
        assert_eq!("12".parse::<ClassLabel>().unwrap(), ClassLabel::new(12));
        assert_eq!(" 7 ".parse::<ClassLabel>().unwrap(), ClassLabel::new(7));
        assert!("walk".parse::<ClassLabel>().is_err());
        assert!(" ".parse::<ClassLabel>().is_err());
    }

    #[test]
    fn class_index_range() {
        assert_eq!(ClassLabel::UNKNOWN.class_index(80).unwrap(), None);
        assert_eq!(ClassLabel::new(1).class_index(80).unwrap(), Some(0));
        assert_eq!(ClassLabel::new(80).class_index(80).unwrap(), Some(79));
        assert!(ClassLabel::new(0).class_index(80).is_err());
        assert!(ClassLabel::new(81).class_index(80).is_err());
    }

    #[test]
    fn count_known_labels() {
        let mut entry = MultiLabel::new(XYXY::new([0.1, 0.1, 0.5, 0.5]));
        entry.push(ClassLabel::new(3));
        entry.push(ClassLabel::UNKNOWN);
        entry.push(ClassLabel::new(3));
        assert_eq!(entry.num_known(), 2);
    }

    #[test]
    fn build_label_matrix() {
        let entries = vec![
            MultiLabel {
                rect: XYXY::new([0.1, 0.1, 0.5, 0.5]),
                classes: vec![ClassLabel::new(3), ClassLabel::new(7)],
            },
            MultiLabel {
                rect: XYXY::new([0.2, 0.2, 0.6, 0.6]),
                classes: vec![ClassLabel::UNKNOWN],
            },
        ];
        let matrix = label_matrix(&entries, 10).unwrap();
        assert_eq!(matrix.dim(), (2, 10));
        assert_eq!(matrix[[0, 2]], 1);
        assert_eq!(matrix[[0, 6]], 1);
        assert_eq!(matrix.row(0).sum(), 2);
        assert_eq!(matrix.row(1).sum(), 0);
    }

    #[test]
    fn label_matrix_rejects_out_of_range() {
        let entries = vec![MultiLabel {
            rect: XYXY::new([0.1, 0.1, 0.5, 0.5]),
            classes: vec![ClassLabel::new(81)],
        }];
        assert!(label_matrix(&entries, 80).is_err());
    }

    #[test]
    fn transform_keeps_labels() {
        let entry = MultiLabel {
            rect: XYXY::new([0.5, 0.5, 1.0, 1.0]),
            classes: vec![ClassLabel::new(4)],
        };
        let transform = Transform::from_unit_to_pixel(&HW::from_hw([10.0, 20.0]));
        let scaled = &transform * &entry;
        assert_eq!(scaled.rect.xyxy(), [10.0, 5.0, 20.0, 10.0]);
        assert_eq!(scaled.classes, vec![ClassLabel::new(4)]);
    }
}
