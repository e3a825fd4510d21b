//! Math utilities and types
//!
//! Provides the vector, matrix and quaternion aliases used by the scene graph,
//! plus a decomposed TRS pose type.

pub use nalgebra::{
    Vector3,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Scale components below this magnitude are treated as degenerate when decomposing.
const DEGENERATE_SCALE: f32 = 1e-8;

/// Decomposed translation, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Translation
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Per-axis scale factors
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Pose {
    /// Identity pose
    pub fn identity() -> Self {
        Self::default()
    }

    /// Pose with only a translation
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Pose from all three parts
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// Compose into a matrix in T * R * S order
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Decompose an affine TRS matrix.
    ///
    /// Shear is discarded. A degenerate (zero) scale axis keeps an identity
    /// rotation column so the result never contains NaNs.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let axis_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31);
        let axis_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32);
        let axis_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33);
        let scale = Vec3::new(axis_x.magnitude(), axis_y.magnitude(), axis_z.magnitude());

        let unit_column = |axis: Vec3, length: f32, fallback: Vec3| {
            if length > DEGENERATE_SCALE { axis / length } else { fallback }
        };
        let rx = unit_column(axis_x, scale.x, Vec3::x());
        let ry = unit_column(axis_y, scale.y, Vec3::y());
        let rz = unit_column(axis_z, scale.z, Vec3::z());

        let rotation_matrix = Mat3::from_columns(&[rx, ry, rz]);
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Express `world` relative to `parent_world`, i.e. `inverse(parent) * world`.
    ///
    /// Returns `None` when the parent matrix is singular.
    pub fn relative_to(world: &Mat4, parent_world: &Mat4) -> Option<Self> {
        let inverse = parent_world.try_inverse()?;
        Some(Self::from_matrix(&(inverse * world)))
    }

    /// Apply this pose to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.position + self.rotation * self.scale.component_mul(point)
    }
}

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Quaternion rotating `radians` around the world Y axis
    pub fn yaw(radians: f32) -> super::Quat {
        super::Quat::from_axis_angle(&super::Vec3::y_axis(), radians)
    }
}
