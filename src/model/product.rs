use glam::Vec3;

use crate::host::EntityId;

/// Index of a product in the configured list. Products are matched to
/// waypoints by this index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductId(pub usize);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ProductEntry {
    pub model: EntityId,
    pub focus: Option<EntityId>,
    pub ui_panel: Option<EntityId>,
    pub affordance: Option<EntityId>,
    /// Parent of the affordance; counter-rotated while the product spins
    pub affordance_anchor: Option<EntityId>,
    /// Captured once at setup, the snap target of `stop_rotation`
    pub initial_euler: Vec3,
    pub is_rotating: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEntry {
    pub button: Option<EntityId>,
    pub is_video: bool,
    /// Video or image URL, depending on `is_video`
    pub media: Option<String>,
    /// Image shown when a video feature cannot be loaded
    pub poster: Option<String>,
}
