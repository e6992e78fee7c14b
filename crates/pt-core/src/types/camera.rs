//! Camera configuration and perspective presets

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Smallest camera-to-target distance accepted by [`CameraConfig::rig`]
pub const MIN_CAMERA_DISTANCE: f32 = 0.5;

/// Orbit pitch limit in free mode, just short of straight up/down
pub const MAX_ORBIT_PITCH: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;

/// Perspective mode of the practice scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PerspectiveMode {
    /// One converging (depth) axis; cube face parallel to the picture plane
    OnePoint,
    /// Two converging horizontal axes
    #[default]
    TwoPoint,
    /// Two horizontal axes plus converging verticals (camera above or below)
    ThreePoint,
    /// Free orbit; no guides are derived
    Free,
}

impl PerspectiveMode {
    pub const ALL: [PerspectiveMode; 4] = [
        PerspectiveMode::OnePoint,
        PerspectiveMode::TwoPoint,
        PerspectiveMode::ThreePoint,
        PerspectiveMode::Free,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PerspectiveMode::OnePoint => "1-point",
            PerspectiveMode::TwoPoint => "2-point",
            PerspectiveMode::ThreePoint => "3-point",
            PerspectiveMode::Free => "free",
        }
    }

    /// Cube Y rotation used when the preset is selected
    pub fn preset_rotation(&self) -> f32 {
        match self {
            PerspectiveMode::OnePoint => 0.0,
            PerspectiveMode::TwoPoint | PerspectiveMode::ThreePoint => std::f32::consts::FRAC_PI_4,
            PerspectiveMode::Free => std::f32::consts::FRAC_PI_6,
        }
    }

    /// Whether the camera is locked to the frontal rig
    pub fn is_locked(&self) -> bool {
        !matches!(self, PerspectiveMode::Free)
    }

    /// Whether user rotation of the cube is ignored
    pub fn locks_rotation(&self) -> bool {
        matches!(self, PerspectiveMode::OnePoint)
    }

    /// Whether vanishing points are derived for this mode
    pub fn has_vanishing_points(&self) -> bool {
        self.is_locked()
    }
}

/// Camera placement parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Distance from the camera to the world origin along the view axis
    pub distance: f32,
    /// Eye height; only honoured in three-point mode
    pub height: f32,
    /// Orbit yaw in radians (free mode)
    pub yaw: f32,
    /// Orbit pitch in radians (free mode)
    pub pitch: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub mode: PerspectiveMode,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            distance: 15.0,
            height: 8.0,
            yaw: 0.0,
            pitch: 0.35,
            near_plane: 0.1,
            far_plane: 5000.0,
            mode: PerspectiveMode::default(),
        }
    }
}

impl CameraConfig {
    /// Default camera for a perspective preset
    pub fn preset(mode: PerspectiveMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.clamp(1.0, 179.0).to_radians()
    }

    /// Distance clamped away from the degenerate zero case
    pub fn effective_distance(&self) -> f32 {
        if self.distance.is_finite() {
            self.distance.max(MIN_CAMERA_DISTANCE)
        } else {
            MIN_CAMERA_DISTANCE
        }
    }

    /// Derive the camera placement for the current mode.
    ///
    /// Locked modes always look at the world origin. One- and two-point use
    /// an eye-level rig so vertical edges stay parallel; three-point raises or
    /// lowers the eye by `height`.
    pub fn rig(&self) -> CameraRig {
        let distance = self.effective_distance();
        let eye = match self.mode {
            PerspectiveMode::OnePoint | PerspectiveMode::TwoPoint => Vec3::new(0.0, 0.0, distance),
            PerspectiveMode::ThreePoint => Vec3::new(0.0, self.height, distance),
            PerspectiveMode::Free => {
                let pitch = self.pitch.clamp(-MAX_ORBIT_PITCH, MAX_ORBIT_PITCH);
                Vec3::new(
                    distance * pitch.cos() * self.yaw.sin(),
                    distance * pitch.sin(),
                    distance * pitch.cos() * self.yaw.cos(),
                )
            }
        };
        CameraRig {
            eye,
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }

    /// Orbit the free camera. Locked modes ignore the gesture.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        if self.mode.is_locked() {
            return;
        }
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-MAX_ORBIT_PITCH, MAX_ORBIT_PITCH);
    }
}

/// Resolved camera placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl CameraRig {
    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or(Vec3::NEG_Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_rigs_look_at_origin() {
        for mode in PerspectiveMode::ALL {
            let rig = CameraConfig::preset(mode).rig();
            assert_eq!(rig.target, Vec3::ZERO);
        }
        let rig = CameraConfig::preset(PerspectiveMode::TwoPoint).rig();
        assert_eq!(rig.eye, Vec3::new(0.0, 0.0, 15.0));
    }

    #[test]
    fn test_height_only_applies_to_three_point() {
        let mut config = CameraConfig::preset(PerspectiveMode::OnePoint);
        config.height = 20.0;
        assert_eq!(config.rig().eye.y, 0.0);
        config.mode = PerspectiveMode::ThreePoint;
        assert_eq!(config.rig().eye.y, 20.0);
    }

    #[test]
    fn test_zero_distance_is_clamped() {
        let mut config = CameraConfig::default();
        config.distance = 0.0;
        let rig = config.rig();
        assert!(rig.eye.distance(rig.target) >= MIN_CAMERA_DISTANCE);
        config.distance = f32::NAN;
        assert!(config.rig().eye.is_finite());
    }

    #[test]
    fn test_orbit_ignored_when_locked() {
        let mut config = CameraConfig::preset(PerspectiveMode::TwoPoint);
        config.orbit(1.0, 1.0);
        assert_eq!(config.yaw, 0.0);

        let mut free = CameraConfig::preset(PerspectiveMode::Free);
        free.orbit(0.0, 10.0);
        assert_eq!(free.pitch, MAX_ORBIT_PITCH);
    }
}
