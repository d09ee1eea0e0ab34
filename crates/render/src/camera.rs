use glam::{Mat4, Vec3};
use ink_common::Direction;

/// Free-look camera driven by movement keys and mouse offsets.
///
/// Angles are in degrees. Pitch is held within ±80° when constrained and yaw
/// wraps once it passes a full turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    world_up: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

pub const DEFAULT_SPEED: f32 = 3.0;
pub const DEFAULT_SENSITIVITY: f32 = 5.0;
const PITCH_LIMIT: f32 = 80.0;

impl Camera {
    /// Camera at `position` looking along `direction`.
    pub fn new(position: Vec3, direction: Vec3, world_up: Vec3) -> Self {
        let dir = direction.try_normalize().unwrap_or(Vec3::NEG_Z);
        let pitch = dir.y.clamp(-1.0, 1.0).asin().to_degrees();
        let yaw = dir.z.atan2(dir.x).to_degrees();
        let mut camera = Self {
            position,
            world_up: world_up.try_normalize().unwrap_or(Vec3::Y),
            front: dir,
            right: Vec3::X,
            up: Vec3::Y,
            yaw,
            pitch,
            speed: DEFAULT_SPEED,
            sensitivity: DEFAULT_SENSITIVITY,
        };
        camera.update_vectors();
        camera
    }

    pub fn with_speed(mut self, speed: f32, sensitivity: f32) -> Self {
        self.speed = speed;
        self.sensitivity = sensitivity;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// One movement step of `speed * dt`.
    pub fn move_in(&mut self, dt: f32, direction: Direction) {
        let step = self.speed * dt;
        match direction {
            Direction::Forward => self.position += self.front * step,
            Direction::Backward => self.position -= self.front * step,
            Direction::Left => self.position -= self.right * step,
            Direction::Right => self.position += self.right * step,
            Direction::Up => self.position += self.world_up * step,
            Direction::Down => self.position -= self.world_up * step,
        }
    }

    /// Turn by a mouse offset. Positive `offset_y` (cursor moving down) pitches
    /// down.
    pub fn update_input(&mut self, dt: f32, constrain_pitch: bool, offset_x: f64, offset_y: f64) {
        let scale = self.sensitivity * dt;
        self.yaw += offset_x as f32 * scale;
        self.pitch -= offset_y as f32 * scale;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        if self.yaw.abs() > 360.0 {
            self.yaw %= 360.0;
        }
        self.update_vectors();
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z, Vec3::Y)
    }
}
