use nalgebra::{Matrix3, Vector3};

const ABS_TOLERANCE: f32 = 1.0e-8;
const REL_TOLERANCE: f32 = 1.0e-5;

/// Returns true when `x` and `y` are equal within the combined
/// absolute/relative tolerance used by the Euler extraction guard.
pub(crate) fn is_close(x: f32, y: f32) -> bool {
    (x - y).abs() <= ABS_TOLERANCE + REL_TOLERANCE * y.abs()
}

/// A rigid frame: 3x3 rotation part plus translation.
///
/// Frames are value types; every operation returns a new frame and never
/// mutates its operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CFrame {
    pub rotation: Matrix3<f32>,
    pub translation: Vector3<f32>,
}

impl Default for CFrame {
    fn default() -> Self {
        Self::identity()
    }
}

impl CFrame {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::new(x, y, z),
        }
    }

    /// Rotation about the X axis by `rad` radians.
    pub fn rotation_x(rad: f32) -> Self {
        let (sin, cos) = rad.sin_cos();
        Self {
            rotation: Matrix3::new(
                1.0, 0.0, 0.0, //
                0.0, cos, -sin, //
                0.0, sin, cos,
            ),
            translation: Vector3::zeros(),
        }
    }

    /// Rotation about the Y axis by `rad` radians.
    pub fn rotation_y(rad: f32) -> Self {
        let (sin, cos) = rad.sin_cos();
        Self {
            rotation: Matrix3::new(
                cos, 0.0, sin, //
                0.0, 1.0, 0.0, //
                -sin, 0.0, cos,
            ),
            translation: Vector3::zeros(),
        }
    }

    /// Rotation about the Z axis by `rad` radians.
    pub fn rotation_z(rad: f32) -> Self {
        let (sin, cos) = rad.sin_cos();
        Self {
            rotation: Matrix3::new(
                cos, -sin, 0.0, //
                sin, cos, 0.0, //
                0.0, 0.0, 1.0,
            ),
            translation: Vector3::zeros(),
        }
    }

    /// Frame equivalent to applying `other` first, then `self`.
    pub fn compose(&self, other: &CFrame) -> CFrame {
        CFrame {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Inverse frame, assuming an orthonormal rotation part:
    /// `f.compose(&f.inverse())` is identity.
    pub fn inverse(&self) -> CFrame {
        let rotation = self.rotation.transpose();
        CFrame {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// Transforms a position (rotation plus translation).
    pub fn transform_point(&self, p: Vector3<f32>) -> Vector3<f32> {
        self.rotation * p + self.translation
    }

    /// Transforms a direction (rotation only).
    pub fn transform_vector(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.rotation * v
    }

    /// Converts from the source engine's coordinate convention to the export
    /// tool's convention by negating the X and Z translation components.
    /// The rotation part is left untouched.
    pub fn to_export_space(&self) -> CFrame {
        CFrame {
            rotation: self.rotation,
            translation: Vector3::new(-self.translation.x, self.translation.y, -self.translation.z),
        }
    }

    /// Extracts Euler angles in degrees as `(rx, ry, rz)` such that the
    /// rotation equals `Rz(rz) * Ry(ry) * Rx(rx)`.
    ///
    /// When the (2,0) element sits on the gimbal singularity (within
    /// tolerance of +-1), ry is pinned to +-90 degrees and rx is recovered
    /// from the remaining off-diagonal terms; rz is zero in that branch.
    pub fn euler_zyx_degrees(&self) -> Vector3<f32> {
        let r = &self.rotation;
        let r20 = r[(2, 0)];

        let (psi, theta, phi) = if is_close(r20, -1.0) {
            let theta = std::f32::consts::FRAC_PI_2;
            (r[(0, 1)].atan2(r[(0, 2)]), theta, 0.0)
        } else if is_close(r20, 1.0) {
            let theta = -std::f32::consts::FRAC_PI_2;
            ((-r[(0, 1)]).atan2(-r[(0, 2)]), theta, 0.0)
        } else {
            let theta = (-r20).asin();
            // cos(theta) cannot be zero here: the singular cases are handled
            // by the tolerance branches above.
            let cos_theta = theta.cos();
            let psi = (r[(2, 1)] / cos_theta).atan2(r[(2, 2)] / cos_theta);
            let phi = (r[(1, 0)] / cos_theta).atan2(r[(0, 0)] / cos_theta);
            (psi, theta, phi)
        };

        Vector3::new(psi.to_degrees(), theta.to_degrees(), phi.to_degrees())
    }
}

impl std::ops::Mul for CFrame {
    type Output = CFrame;

    fn mul(self, rhs: CFrame) -> CFrame {
        self.compose(&rhs)
    }
}
