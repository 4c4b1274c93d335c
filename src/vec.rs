//! Vector types the solver is generic over.

use crate::float::Float;
use core::ops::{Add, Neg, Sub};

/// Vector operations needed by chain constraints.
///
/// Constraints only need dot products and scaling, so the whole solver is
/// written once for any dimensionality.
pub trait Vec:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + PartialEq
    + Default
    + Send
    + Sync
    + core::fmt::Debug
{
    type Scalar: Float;

    fn zero() -> Self;
    fn dot(self, other: Self) -> Self::Scalar;
    fn scale(self, s: Self::Scalar) -> Self;

    /// True when every component is finite.
    fn is_finite(self) -> bool;

    fn length_sq(self) -> Self::Scalar {
        self.dot(self)
    }

    fn length(self) -> Self::Scalar {
        self.length_sq().sqrt()
    }

    fn distance(self, other: Self) -> Self::Scalar {
        (self - other).length()
    }

    fn lerp(self, other: Self, t: Self::Scalar) -> Self {
        self + (other - self).scale(t)
    }
}

macro_rules! impl_vector {
    ($name:ident, $doc:literal, $($field:ident),+) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Debug, Default, PartialEq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name<F: Float> {
            $(pub $field: F,)+
        }

        impl<F: Float> $name<F> {
            pub fn new($($field: F),+) -> Self {
                $name { $($field),+ }
            }
        }

        impl<F: Float> Add for $name<F> {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                $name { $($field: self.$field + rhs.$field),+ }
            }
        }

        impl<F: Float> Sub for $name<F> {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                $name { $($field: self.$field - rhs.$field),+ }
            }
        }

        impl<F: Float> Neg for $name<F> {
            type Output = Self;
            fn neg(self) -> Self {
                $name { $($field: -self.$field),+ }
            }
        }

        impl<F: Float> Vec for $name<F> {
            type Scalar = F;

            fn zero() -> Self {
                $name { $($field: F::zero()),+ }
            }

            fn dot(self, other: Self) -> F {
                F::zero() $(+ self.$field * other.$field)+
            }

            fn scale(self, s: F) -> Self {
                $name { $($field: self.$field * s),+ }
            }

            fn is_finite(self) -> bool {
                true $(&& self.$field.is_finite())+
            }
        }
    };
}

impl_vector!(Vec2, "2D vector for side-scrolling and planar ropes.", x, y);
impl_vector!(Vec3, "3D vector for ropes in world space.", x, y, z);
