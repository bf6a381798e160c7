//! Math utilities and types

pub use nalgebra::{Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Projection helpers for Vulkan clip space
pub trait Mat4Ext {
    /// Right-handed perspective projection mapping depth to `[0, 1]`
    ///
    /// The camera looks down `-Z`. `fov_y` is the vertical field of view in
    /// radians.
    fn perspective_rh_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Negate the Y row so that +Y in view space ends up at the top of a
    /// top-left-origin image
    #[must_use]
    fn flip_clip_y(self) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective_rh_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let focal = 1.0 / (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = focal / aspect;
        result[(1, 1)] = focal;
        result[(2, 2)] = far / (near - far);
        result[(2, 3)] = -(far * near) / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn flip_clip_y(mut self) -> Mat4 {
        let mut row = self.row_mut(1);
        row *= -1.0;
        self
    }
}

/// Flatten a matrix into column-major arrays, the layout GLSL expects for `mat4`
pub fn to_columns(matrix: &Mat4) -> [[f32; 4]; 4] {
    let mut columns = [[0.0; 4]; 4];
    for (c, column) in columns.iter_mut().enumerate() {
        for (r, value) in column.iter_mut().enumerate() {
            *value = matrix[(r, c)];
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let projection = Mat4::perspective_rh_zo(60f32.to_radians(), 1.5, 0.1, 100.0);

        let near = projection * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = projection * Vec4::new(0.0, 0.0, -100.0, 1.0);

        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_focal_terms() {
        let fov = 60f32.to_radians();
        let projection = Mat4::perspective_rh_zo(fov, 2.0, 0.1, 100.0);
        let focal = 1.0 / (fov * 0.5).tan();

        assert_relative_eq!(projection[(1, 1)], focal);
        assert_relative_eq!(projection[(0, 0)], focal / 2.0);
        assert_relative_eq!(projection[(3, 2)], -1.0);
        assert_relative_eq!(projection[(3, 3)], 0.0);
    }

    #[test]
    fn test_flip_clip_y_only_touches_second_row() {
        let projection = Mat4::perspective_rh_zo(1.0, 1.0, 0.1, 10.0);
        let flipped = projection.flip_clip_y();

        assert_eq!(flipped.row(0), projection.row(0));
        assert_eq!(flipped.row(1), -projection.row(1));
        assert_eq!(flipped.row(2), projection.row(2));
        assert_eq!(flipped.row(3), projection.row(3));
    }

    #[test]
    fn test_to_columns_is_column_major() {
        let translation = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let columns = to_columns(&translation);

        assert_eq!(columns[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(columns[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
