mod document;

pub use document::FbxDocument;

use nalgebra::Vector3;
use uuid::Uuid;

use crate::transform::CFrame;

/// Identifier of an emitted document object. `ROOT` stands for the implicit
/// document root that top-level objects connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const ROOT: ObjectId = ObjectId(0);

    pub fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

const OBJECT_ID_LIMIT: u128 = 10_000_000_000_000;

/// Allocates a process-unique 13-decimal-digit object id: the leading
/// decimal digits of a v4 UUID. Ids are generated once per object and never
/// reused within a process.
pub(crate) fn generate_object_id() -> ObjectId {
    loop {
        let mut value = Uuid::new_v4().as_u128();
        while value >= OBJECT_ID_LIMIT {
            value /= 10;
        }
        if value != 0 {
            return ObjectId(value as u64);
        }
    }
}

/// Decomposed node transform as the document stores it: translation, Euler
/// rotation in degrees (ZYX composition order) and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FbxTransform {
    pub translation: Vector3<f32>,
    pub rotation_deg: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for FbxTransform {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation_deg: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl FbxTransform {
    pub fn from_frame(frame: &CFrame) -> Self {
        Self {
            translation: frame.translation,
            rotation_deg: frame.euler_zyx_degrees(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FbxColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl FbxColor {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_generated_ids_when_compared_then_unique_and_in_range() {
        let ids: Vec<ObjectId> = (0..64).map(|_| generate_object_id()).collect();
        for (i, &a) in ids.iter().enumerate() {
            assert!(!a.is_root());
            assert!(a.0 < OBJECT_ID_LIMIT as u64);
            assert!(ids[i + 1..].iter().all(|&b| b != a));
        }
    }

    #[test]
    fn given_identity_frame_when_decomposed_then_transform_is_default() {
        let transform = FbxTransform::from_frame(&CFrame::identity());
        assert_eq!(transform, FbxTransform::default());
    }
}
