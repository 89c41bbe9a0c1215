use crate::{common::*, HW, XYXY};

/// Per-axis scaling followed by translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn from_rects(src: &XYXY<T>, tgt: &XYXY<T>) -> Self {
        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.y1() - src.y1() * sy;
        let tx = tgt.x1() - src.x1() * sx;

        Self { sy, sx, ty, tx }
    }

    pub fn from_sizes_exact(src_size: &HW<T>, tgt_size: &HW<T>) -> Self {
        let zero = T::zero();
        let src = XYXY::new([zero, zero, src_size.w(), src_size.h()]);
        let tgt = XYXY::new([zero, zero, tgt_size.w(), tgt_size.h()]);
        Self::from_rects(&src, &tgt)
    }

    /// The transform from normalized `[0, 1]` coordinates to pixel units.
    pub fn from_unit_to_pixel(image_size: &HW<T>) -> Self {
        Self::from_sizes_exact(&HW::unit(), image_size)
    }
}

impl<T> Mul<&XYXY<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = XYXY<T>;

    fn mul(self, rhs: &XYXY<T>) -> Self::Output {
        rhs.transform(self)
    }
}
