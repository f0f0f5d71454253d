use tracing::{debug, info};

use crate::config::MotionConfig;
use crate::host::{EntityHost, EntityId};
use crate::model::{smooth_step, Pose};

/// Where a move is headed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// One of the configured waypoints
    Fixed(usize),
    /// A one-off pose such as a product's focus point. Never becomes the
    /// current waypoint.
    Adhoc(Pose),
}

/// Lateral input direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionState {
    pub current_index: usize,
    pub is_moving: bool,
    /// Linear progress in [0, 1]; eased separately for position and rotation
    pub progress: f32,
    pub start: Pose,
    pub target_pose: Pose,
    pub target: Option<Target>,
    pub total_distance: f32,
    pub is_locked: bool,
}

/// Glides the camera entity between fixed waypoints
pub struct CameraController {
    camera: EntityId,
    waypoints: Vec<Pose>,
    pub move_speed: f32,
    pub rotation_speed: f32,
    pub smooth_factor: f32,
    state: MotionState,
}

impl CameraController {
    /// Snaps the camera to the first waypoint
    pub fn new(camera: EntityId, waypoints: Vec<Pose>, config: &MotionConfig, host: &mut dyn EntityHost) -> Self {
        info!("camera controller initialized with {} waypoints", waypoints.len());

        let start = waypoints.first().copied().unwrap_or_else(|| Pose::new(host.position(camera), host.euler(camera)));
        host.set_position(camera, start.position);
        host.set_euler(camera, start.euler);

        Self {
            camera,
            waypoints,
            move_speed: config.move_speed,
            rotation_speed: config.rotation_speed,
            smooth_factor: config.smooth_factor,
            state: MotionState {
                current_index: 0,
                is_moving: false,
                progress: 0.0,
                start,
                target_pose: start,
                target: None,
                total_distance: 0.0,
                is_locked: config.locked,
            },
        }
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn camera(&self) -> EntityId {
        self.camera
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked
    }

    pub fn is_moving(&self) -> bool {
        self.state.is_moving
    }

    pub fn lock(&mut self) {
        self.state.is_locked = true;
        info!("camera movement locked");
    }

    pub fn unlock(&mut self) {
        self.state.is_locked = false;
        info!("camera movement unlocked");
    }

    /// User-initiated move. Ignored while locked or already moving.
    pub fn move_to(&mut self, target: Target, host: &dyn EntityHost) -> bool {
        if self.state.is_locked || self.state.is_moving {
            debug!(?target, locked = self.state.is_locked, "move request ignored");
            return false;
        }
        self.begin(target, host)
    }

    /// Programmatic move issued on behalf of a UI session. Bypasses the lock and
    /// retargets an in-flight move unless it already heads to `target`.
    pub fn focus_move(&mut self, target: Target, host: &dyn EntityHost) -> bool {
        if self.state.is_moving && self.state.target == Some(target) {
            return false;
        }
        self.begin(target, host)
    }

    /// Head back to the current waypoint
    pub fn return_to_waypoint(&mut self, host: &dyn EntityHost) -> bool {
        self.focus_move(Target::Fixed(self.state.current_index), host)
    }

    /// Advance or retreat one waypoint in response to scroll or arrow keys
    pub fn step(&mut self, direction: Step, host: &dyn EntityHost) -> bool {
        if self.state.is_locked || self.state.is_moving {
            return false;
        }
        let next = match direction {
            Step::Next if self.state.current_index + 1 < self.waypoints.len() => self.state.current_index + 1,
            Step::Previous if self.state.current_index > 0 => self.state.current_index - 1,
            _ => return false,
        };
        self.move_to(Target::Fixed(next), host)
    }

    fn begin(&mut self, target: Target, host: &dyn EntityHost) -> bool {
        let target_pose = match target {
            Target::Fixed(index) => match self.waypoints.get(index) {
                Some(pose) => {
                    self.state.current_index = index;
                    *pose
                }
                None => return false,
            },
            Target::Adhoc(pose) => pose,
        };

        let start = Pose::new(host.position(self.camera), host.euler(self.camera));
        self.state.start = start;
        self.state.target_pose = target_pose;
        self.state.target = Some(target);
        self.state.total_distance = start.distance(&target_pose);
        self.state.progress = 0.0;
        self.state.is_moving = true;

        debug!(?target, distance = self.state.total_distance, "camera move started");
        true
    }

    /// Advance the current move. Returns the waypoint index when a move to a
    /// fixed waypoint completes on this tick.
    pub fn tick(&mut self, dt: f32, host: &mut dyn EntityHost) -> Option<usize> {
        if !self.state.is_moving {
            return None;
        }

        let speed_multiplier = self.move_speed / (self.state.total_distance * 0.1).max(1.0);
        self.state.progress += dt.max(0.0) * speed_multiplier * self.smooth_factor;

        let mut reached = None;
        if self.state.progress >= 1.0 {
            self.state.progress = 1.0;
            self.state.is_moving = false;
            if let Some(Target::Fixed(index)) = self.state.target {
                reached = Some(index);
            }
            info!(index = ?reached, "camera movement complete");
        }

        let t = smooth_step(self.state.progress);
        let rot_t = smooth_step((self.state.progress * self.rotation_speed * 2.0).min(1.0));
        let pose = Pose::interpolate(&self.state.start, &self.state.target_pose, t, rot_t);
        host.set_position(self.camera, pose.position);
        host.set_euler(self.camera, pose.euler);

        reached
    }
}
