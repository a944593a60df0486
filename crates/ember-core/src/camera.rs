use glam::{Mat4, Quat, Vec3};

/// Camera state the cascade kernels need for ray generation: view and
/// projection matrices plus their inverses for unprojecting probe cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Camera {
    pub fn new_perspective(fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y,
            aspect_ratio,
            near_plane: near,
            far_plane: far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near_plane, self.far_plane)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn inverse_view_projection_matrix(&self) -> Mat4 {
        self.view_projection_matrix().inverse()
    }

    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        let mat3 = glam::Mat3::from_cols(right, up, -forward);
        self.rotation = Quat::from_mat3(&mat3);
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Camera;
    use glam::{Vec3, Vec4};

    #[test]
    fn inverse_round_trips_clip_space() {
        let mut cam = Camera::default();
        cam.position = Vec3::new(1.0, 2.0, 3.0);
        cam.look_at(Vec3::ZERO, Vec3::Y);

        let vp = cam.view_projection_matrix();
        let inv = cam.inverse_view_projection_matrix();
        let world = Vec4::new(0.5, -0.25, -2.0, 1.0);
        let clip = vp * world;
        let back = inv * clip;
        let back = back / back.w;
        assert!((back - world).length() < 1e-4);
    }
}
