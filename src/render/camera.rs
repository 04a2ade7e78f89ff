use crate::config::EditorConfig;
use glam::{Mat3, Quat, Vec3};

#[derive(Debug, Clone, Copy, Default)]
pub struct CameraMovement {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub aim_left: bool,
    pub aim_right: bool,
    pub aim_up: bool,
    pub aim_down: bool,
}

/// Camera pose plus the lens parameters the editor needs for framing.
#[derive(Debug, Clone, Copy)]
pub struct CameraRig {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    controls_enabled: bool,
    move_speed: f32,
    aim_speed: f32,
}

impl CameraRig {
    /// Camera at `position` looking down -Z.
    pub fn new(position: Vec3, config: &EditorConfig) -> Self {
        Self {
            position,
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            fov_y_degrees: config.fov_y_degrees,
            aspect: 16.0 / 9.0,
            controls_enabled: true,
            move_speed: config.move_speed,
            aim_speed: config.aim_speed,
        }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    /// Movement controls are locked while the selection is fixed.
    pub fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        camera_basis(self.yaw, self.pitch)
    }

    pub fn forward(&self) -> Vec3 {
        self.basis().0
    }

    /// Orientation with the camera looking down its local -Z.
    pub fn rotation(&self) -> Quat {
        let (forward, right, up) = self.basis();
        Quat::from_mat3(&Mat3::from_cols(right, up, -forward))
    }

    /// A point one unit in front of the camera; moving objects track its motion.
    pub fn anchor(&self) -> Vec3 {
        self.position + self.forward()
    }

    /// Distance at which a box of `size` fits the view both vertically and horizontally.
    pub fn fit_distance(&self, size: Vec3) -> f32 {
        let half_fov_y = (self.fov_y_degrees.to_radians() * 0.5).max(1e-3);
        let half_fov_x = (half_fov_y.tan() * self.aspect.max(1e-3)).atan();
        let vertical = size.y.abs() * 0.5 / half_fov_y.tan();
        let horizontal = size.x.abs() * 0.5 / half_fov_x.tan();
        vertical.max(horizontal) + size.z.abs() * 0.5
    }

    pub fn move_horizontal(&mut self, right: f32, up: f32, forward: f32) {
        let yaw = self.yaw;
        let forward_dir = Vec3::new(yaw.cos(), 0.0, yaw.sin());
        let right_dir = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
        self.position += right_dir * right + Vec3::Y * up + forward_dir * forward;
    }

    /// Apply one frame of locomotion. Does nothing while controls are locked.
    pub fn update_movement(&mut self, input: &CameraMovement, frame_dt: f32) -> bool {
        if !self.controls_enabled {
            return false;
        }
        let move_speed = self.move_speed * frame_dt;
        let aim_speed = self.aim_speed * frame_dt;
        let mut changed = false;

        if input.aim_left {
            self.yaw -= aim_speed;
            changed = true;
        }
        if input.aim_right {
            self.yaw += aim_speed;
            changed = true;
        }
        if input.aim_up {
            self.pitch += aim_speed;
            changed = true;
        }
        if input.aim_down {
            self.pitch -= aim_speed;
            changed = true;
        }
        let limit = std::f32::consts::FRAC_PI_2 - 1e-3;
        self.pitch = self.pitch.clamp(-limit, limit);

        let mut forward = 0.0;
        let mut right = 0.0;
        let mut up = 0.0;
        if input.move_forward {
            forward += move_speed;
        }
        if input.move_backward {
            forward -= move_speed;
        }
        if input.move_left {
            right -= move_speed;
        }
        if input.move_right {
            right += move_speed;
        }
        if input.move_up {
            up += move_speed;
        }
        if input.move_down {
            up -= move_speed;
        }

        if forward != 0.0 || right != 0.0 || up != 0.0 {
            self.move_horizontal(right, up, forward);
            changed = true;
        }

        changed
    }
}

fn camera_basis(yaw: f32, pitch: f32) -> (Vec3, Vec3, Vec3) {
    let cos_pitch = pitch.cos();
    let forward = Vec3::new(yaw.cos() * cos_pitch, pitch.sin(), yaw.sin() * cos_pitch);
    let right = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
    let up = right.cross(forward).normalize_or_zero();
    (forward, right, up)
}
