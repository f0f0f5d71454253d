// CONTROLLER: Input, interaction state machines and the update loop
pub mod bus;
pub mod camera_controller;
pub mod input;
pub mod media;
pub mod product_manager;
pub mod product_ui;
pub mod showroom;

pub use bus::{EventBus, ShowroomEvent};
pub use camera_controller::{CameraController, MotionState, Step, Target};
pub use input::{InputEvent, InputProcessor, KeyBindings, MouseButton, PointerSource};
pub use media::MediaSlot;
pub use product_manager::ProductManager;
pub use product_ui::ProductUiSession;
pub use showroom::{ClickRoute, Showroom};
