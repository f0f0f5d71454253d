// VIEW: Rendering, GPU setup and media hosts
pub mod gpu_init;
pub mod media;
pub mod mesh;
pub mod render;

pub use gpu_init::{GpuContext, GpuInitError};
pub use media::EmissiveSource;
#[cfg(not(target_arch = "wasm32"))]
pub use media::NativeMedia;
#[cfg(target_arch = "wasm32")]
pub use media::WebMedia;
pub use render::{CameraResources, DrawItem, RenderState};
