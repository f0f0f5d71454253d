// MODEL: Scene data and poses
pub mod camera;
pub mod pose;
pub mod product;
pub mod scene;

pub use camera::Camera;
pub use pose::{smooth_step, Pose};
pub use product::{FeatureEntry, ProductEntry, ProductId};
pub use scene::{Entity, Scene};
