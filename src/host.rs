//! Contracts between the interaction core and whatever engine hosts it.
//!
//! The core never owns a clock, a scene graph or a decoder. It reads and writes
//! entity poses through [`EntityHost`] and drives playback surfaces through
//! [`MediaHost`]. The in-memory [`Scene`](crate::model::Scene) implements the
//! former; `view::media` has the native and browser implementations of the latter.

use glam::Vec3;

use crate::error::MediaError;

/// Opaque handle to an entity owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

/// Entity pose API. Orientations are Euler angles in degrees.
pub trait EntityHost {
    /// Resolve a configured entity name. Only used at setup.
    fn find(&self, name: &str) -> Option<EntityId>;
    /// The entity carries a clickable element
    fn is_clickable(&self, id: EntityId) -> bool;

    fn position(&self, id: EntityId) -> Vec3;
    fn set_position(&mut self, id: EntityId, position: Vec3);

    /// World-space orientation
    fn euler(&self, id: EntityId) -> Vec3;
    fn set_euler(&mut self, id: EntityId, euler: Vec3);

    /// Orientation relative to the parent
    fn local_euler(&self, id: EntityId) -> Vec3;
    fn set_local_euler(&mut self, id: EntityId, euler: Vec3);

    fn parent(&self, id: EntityId) -> Option<EntityId>;
    /// Move `id` under `parent` (`None` = scene root) keeping its world pose
    fn reparent(&mut self, id: EntityId, parent: Option<EntityId>);

    fn is_enabled(&self, id: EntityId) -> bool;
    fn set_enabled(&mut self, id: EntityId, enabled: bool);
    /// Enabled itself and under every ancestor
    fn is_enabled_in_hierarchy(&self, id: EntityId) -> bool;
}

/// Identity of one hidden playback surface. Hosts never reuse an id, which is
/// what lets a session tell a stale readiness notice from a current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// What the display material's emissive channel shows
#[derive(Debug, Clone, PartialEq)]
pub enum EmissiveBinding {
    Image(String),
    Video(SurfaceId),
}

/// Asynchronous notifications fired by the media host
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Enough data is buffered to play through
    Ready(SurfaceId),
    /// The host refused to start playback (autoplay policy)
    PlaybackRejected(SurfaceId, String),
    /// The source could not be fetched or decoded
    LoadFailed(SurfaceId, String),
}

pub trait MediaHost {
    /// Create a hidden, muted, looping playback surface and start buffering `url`
    fn load_video(&mut self, url: &str) -> Result<SurfaceId, MediaError>;
    fn play(&mut self, surface: SurfaceId) -> Result<(), MediaError>;
    fn pause(&mut self, surface: SurfaceId);
    /// Detach and destroy the surface and its texture
    fn release(&mut self, surface: SurfaceId);
    /// Copy the surface's current frame into its texture
    fn upload_frame(&mut self, surface: SurfaceId);

    /// Bind to the emissive channel of `display`'s material. Video bindings
    /// render unlit.
    fn bind_emissive(&mut self, display: EntityId, binding: EmissiveBinding);
    /// Drop the emissive binding and restore default lighting
    fn clear_emissive(&mut self, display: EntityId);

    fn poll_events(&mut self) -> Vec<MediaEvent>;
}
