use crate::{common::*, Transform, HW};

/// Bounding box in `x1, y1, x2, y2` corner order.
///
/// The box is stored as given. Corner order is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XYXY<T> {
    pub(crate) x1: T,
    pub(crate) y1: T,
    pub(crate) x2: T,
    pub(crate) y2: T,
}

impl<T> XYXY<T>
where
    T: Copy,
{
    /// Build a box without checking corner order.
    pub fn new(xyxy: [T; 4]) -> Self {
        let [x1, y1, x2, y2] = xyxy;
        Self { x1, y1, x2, y2 }
    }

    pub fn x1(&self) -> T {
        self.x1
    }

    pub fn y1(&self) -> T {
        self.y1
    }

    pub fn x2(&self) -> T {
        self.x2
    }

    pub fn y2(&self) -> T {
        self.y2
    }

    pub fn xyxy(&self) -> [T; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl<T> XYXY<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn h(&self) -> T {
        self.y2 - self.y1
    }

    pub fn w(&self) -> T {
        self.x2 - self.x1
    }

    pub fn transform(&self, transform: &Transform<T>) -> Self {
        Self {
            x1: self.x1 * transform.sx + transform.tx,
            y1: self.y1 * transform.sy + transform.ty,
            x2: self.x2 * transform.sx + transform.tx,
            y2: self.y2 * transform.sy + transform.ty,
        }
    }

    /// Clamp pixel coordinates into `[0, w - 1]` and `[0, h - 1]`.
    pub fn clip_to_image(&self, size: &HW<T>) -> Self {
        let zero = T::zero();
        let max_x = size.w() - T::one();
        let max_y = size.h() - T::one();

        Self {
            x1: clamp(self.x1, zero, max_x),
            y1: clamp(self.y1, zero, max_y),
            x2: clamp(self.x2, zero, max_x),
            y2: clamp(self.y2, zero, max_y),
        }
    }
}

fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: PartialOrd,
{
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}
