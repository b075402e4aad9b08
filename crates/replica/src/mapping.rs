use glam::{Mat3, Quat, Vec3};

pub const DEFAULT_POSITION_SCALE_FACTOR: f32 = 0.00051;
pub const DEFAULT_POSITION_OFFSET: Vec3 = Vec3::new(0.4, -0.05, -0.6);
pub const DEFAULT_REFERENCE_SCALE: Vec3 = Vec3::splat(0.0005);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapFrame {
    pub parent_position: Vec3,
    pub parent_rotation: Quat,
    pub map_scale: Vec3,
}

impl Default for MapFrame {
    fn default() -> Self {
        Self {
            parent_position: Vec3::ZERO,
            parent_rotation: Quat::IDENTITY,
            map_scale: DEFAULT_REFERENCE_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub scale_factor: f32,
    pub offset: Vec3,
    pub reference_scale: Vec3,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_POSITION_SCALE_FACTOR,
            offset: DEFAULT_POSITION_OFFSET,
            reference_scale: DEFAULT_REFERENCE_SCALE,
        }
    }
}

/// Maps a feed position `(x, z, y)` into rendering space.
pub fn map_position(raw: Vec3, frame: &MapFrame, calibration: &Calibration) -> Vec3 {
    let s = calibration.scale_factor;
    let nominal = Vec3::new(
        s * raw.x + calibration.offset.x,
        s * raw.z + calibration.offset.y,
        s * raw.y + calibration.offset.z,
    );
    let ratio = frame.map_scale / calibration.reference_scale;
    frame.parent_rotation * (nominal * ratio) + frame.parent_position
}

/// Maps a feed facing vector `(fx, fz, fy)` into rendering space. Rotation
/// only; the parent position does not apply to directions.
pub fn map_forward(raw: Vec3, frame: &MapFrame) -> Vec3 {
    frame.parent_rotation * Vec3::new(raw.x, raw.z, raw.y)
}

/// Rotation whose +Z axis points along `forward`, keeping +Y up.
pub fn facing_rotation(forward: Vec3) -> Quat {
    let Some(forward) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let Some(right) = Vec3::Y.cross(forward).try_normalize() else {
        // Looking straight up or down: no roll reference left.
        return Quat::from_rotation_arc(Vec3::Z, forward);
    };
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}
