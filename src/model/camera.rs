use glam::{Mat4, Vec3, Vec4Swizzles};

use crate::model::pose::{euler_to_quat, Pose};

/// Projection parameters. The eye pose lives on the camera entity and is
/// written by the motion controller.
pub struct Camera {
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            fov_y: 55f32.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: 0.1,
            z_far: 500.0,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Looking down -Z at zero orientation
    pub fn forward(pose: &Pose) -> Vec3 {
        euler_to_quat(pose.euler) * Vec3::NEG_Z
    }

    pub fn view(pose: &Pose) -> Mat4 {
        let up = euler_to_quat(pose.euler) * Vec3::Y;
        Mat4::look_to_rh(pose.position, Self::forward(pose), up)
    }

    pub fn view_proj(&self, pose: &Pose) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * Self::view(pose)
    }

    /// Project a world point to screen pixels (origin top-left). `None` when
    /// the point is behind the eye.
    pub fn world_to_screen(&self, pose: &Pose, point: Vec3, width: f32, height: f32) -> Option<(f32, f32)> {
        let clip = self.view_proj(pose) * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(((ndc.x * 0.5 + 0.5) * width, (0.5 - ndc.y * 0.5) * height))
    }
}
