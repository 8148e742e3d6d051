mod session;

pub use session::TransformSession;

use crate::error::{OperationError, Result};
use crate::math::{Matrix4, Point3, UnitQuaternion, Vector3, TOLERANCE};

/// An affine transform applied to the selected corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Translate(Vector3),
    Rotate {
        rotation: UnitQuaternion,
        center: Point3,
    },
    Scale {
        factors: Vector3,
        center: Point3,
    },
    Custom(Matrix4),
}

impl Transform {
    /// Rotation by `angle` radians around an axis through `center`.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is zero-length.
    pub fn rotation(center: Point3, axis: Vector3, angle: f64) -> Result<Self> {
        let len = axis.norm();
        if len < TOLERANCE {
            return Err(OperationError::InvalidInput("rotation axis must be non-zero".into()).into());
        }
        let axis = nalgebra::Unit::new_unchecked(axis / len);
        Ok(Self::Rotate {
            rotation: UnitQuaternion::from_axis_angle(&axis, angle),
            center,
        })
    }

    /// The homogeneous matrix of this transform.
    #[must_use]
    pub fn matrix(&self) -> Matrix4 {
        match self {
            Self::Translate(offset) => Matrix4::new_translation(offset),
            Self::Rotate { rotation, center } => about(center, &rotation.to_homogeneous()),
            Self::Scale { factors, center } => about(center, &Matrix4::new_nonuniform_scaling(factors)),
            Self::Custom(matrix) => *matrix,
        }
    }

    /// Snaps a translation to multiples of `increment`; other transforms
    /// are returned unchanged.
    #[must_use]
    pub fn snapped(self, increment: Option<f64>) -> Self {
        match (self, increment) {
            (Self::Translate(offset), Some(step)) if step > TOLERANCE => {
                Self::Translate(offset.map(|c| (c / step).round() * step))
            }
            _ => self,
        }
    }
}

/// Conjugates `matrix` so it acts around `center` instead of the origin.
fn about(center: &Point3, matrix: &Matrix4) -> Matrix4 {
    Matrix4::new_translation(&center.coords) * matrix * Matrix4::new_translation(&(-center.coords))
}

/// Transforms a point by a 4x4 matrix.
pub(crate) fn transform_point(matrix: &Matrix4, point: &Point3) -> Point3 {
    let v = matrix * nalgebra::Vector4::new(point.x, point.y, point.z, 1.0);
    Point3::new(v.x, v.y, v.z)
}

/// Transforms a surface normal by a 4x4 matrix, renormalized.
///
/// Normals follow the inverse transpose of the linear part, so they stay
/// perpendicular to the surface under non-uniform scaling. Returns `None`
/// for singular matrices.
pub(crate) fn transform_normal(matrix: &Matrix4, normal: &Vector3) -> Option<Vector3> {
    let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    let inverse = linear.try_inverse()?;
    (inverse.transpose() * normal).try_normalize(TOLERANCE)
}
