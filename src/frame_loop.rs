use glam::{Mat4, Vec3};
use tracing::info;
use wgpu::{Device, Queue, Surface, TextureView};

use crate::config::ShowroomConfig;
use crate::controller::{InputEvent, Showroom};
use crate::error::ConfigError;
use crate::host::{EntityHost, MediaHost};
use crate::logging::ConsoleLog;
use crate::model::{Camera, Pose, Scene};
use crate::ui::{self, OverlayState, UiContext};
use crate::view::render::{self, RenderState};
use crate::view::{DrawItem, EmissiveSource, GpuContext};

/// Size of the quad a display area is drawn as
const DISPLAY_SIZE: Vec3 = Vec3::new(1.6, 0.9, 0.02);

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

/// Per-frame state shared by the browser and the native window
pub struct FrameLoopContext<M> {
    pub scene: Scene,
    pub showroom: Showroom,
    pub media: M,
    pub camera: Camera,
    pub console: ConsoleLog,
    pub overlay: OverlayState,
    pub egui_ctx: egui::Context,
    cam_buf: wgpu::Buffer,
    cam_buf_data: CameraUniform,
    cam_bg: wgpu::BindGroup,
    depth_view: TextureView,
}

impl<M: MediaHost + EmissiveSource> FrameLoopContext<M> {
    /// Build the scene and controllers from `config` and the GPU resources to
    /// draw them
    pub fn new(
        config: &ShowroomConfig,
        media: M,
        console: ConsoleLog,
        gpu: &GpuContext,
    ) -> Result<(Self, RenderState), ConfigError> {
        let mut scene = Scene::from_config(&config.entities)?;
        let mut showroom = Showroom::new(config, &mut scene)?;
        let overlay = OverlayState::new();
        showroom.subscribe(overlay.event_listener());

        let width = gpu.config.width;
        let height = gpu.config.height;
        let camera = Camera::new(width, height);

        // Camera, lighting buffers & bind groups
        let camera_resources = render::create_camera_resources(&gpu.device);
        let lighting = LightingUniform {
            sun_dir: Vec3::new(0.4, 1.0, 0.6).normalize().to_array(),
            sun_intensity: 0.8,
            ambient: 0.35,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        };
        gpu.queue.write_buffer(&camera_resources.lighting_buffer, 0, bytemuck::bytes_of(&lighting));

        let (_, depth_view) = render::create_depth_texture(&gpu.device, width, height);
        let render_state = RenderState::new(
            &gpu.device,
            gpu.format,
            gpu.config.alpha_mode,
            width,
            height,
            &camera_resources.bind_group_layout,
        );

        let mut frame = Self {
            scene,
            showroom,
            media,
            camera,
            console,
            overlay,
            egui_ctx: egui::Context::default(),
            cam_buf: camera_resources.camera_buffer,
            cam_buf_data: CameraUniform { view_proj: Mat4::IDENTITY.to_cols_array_2d() },
            cam_bg: camera_resources.camera_bind_group,
            depth_view,
        };
        frame.write_camera(&gpu.queue);
        info!("frame loop ready at {}x{}", width, height);
        Ok((frame, render_state))
    }

    /// Whether the overlay is using the pointer, in which case presses must
    /// not start a product drag
    pub fn pointer_over_ui(&self) -> bool {
        self.egui_ctx.is_pointer_over_area() || self.egui_ctx.wants_pointer_input()
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        if let InputEvent::KeyDown(key) = &event {
            let input = self.showroom.input();
            if input.wants_to_toggle_console(key) {
                self.console.toggle();
                return;
            }
            if input.wants_to_toggle_debug(key) {
                self.overlay.show_debug = !self.overlay.show_debug;
                return;
            }
        }
        if matches!(event, InputEvent::MouseDown { .. } | InputEvent::TouchStart { .. }) && self.pointer_over_ui() {
            return;
        }
        self.showroom.handle_input(&event, &mut self.scene, &mut self.media);
    }

    /// Advance the showroom by `dt`, run the overlay and prepare its output
    /// for [`RenderState::draw_frame`]
    pub fn update(&mut self, dt: f32, raw_input: egui::RawInput, queue: &Queue, render_state: &mut RenderState) {
        self.overlay.tick(dt);
        self.showroom.update(dt, &mut self.scene, &mut self.media);

        let (mut full_output, clicked) = ui::build_ui(
            &self.egui_ctx,
            raw_input,
            UiContext {
                scene: &self.scene,
                showroom: &self.showroom,
                camera: &self.camera,
                media: &self.media,
                console: &self.console,
                overlay: &mut self.overlay,
            },
        );
        for entity in clicked {
            self.showroom.handle_input(&InputEvent::Click(entity), &mut self.scene, &mut self.media);
        }

        self.write_camera(queue);

        // Tessellate and store for rendering in next step
        let dpr = full_output.pixels_per_point;
        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
        render_state.egui_primitives = Some(primitives);
        render_state.egui_full_output = Some(full_output);
        render_state.egui_dpr = dpr;
    }

    pub fn draw(&self, device: &Device, queue: &Queue, surface: &Surface, render_state: &mut RenderState) {
        let items = self.draw_items();
        render_state.draw_frame(device, queue, surface, &self.depth_view, &self.cam_bg, &items);
    }

    /// Visible product models, plus each display area that has something bound
    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut items = Vec::new();
        for (id, entity) in self.scene.iter() {
            if !self.scene.is_enabled_in_hierarchy(id) {
                continue;
            }
            let rotation = self.scene.world_rotation(id);
            let position = self.scene.position(id);

            if let Some(model) = &entity.model {
                let [r, g, b] = model.color;
                items.push(DrawItem {
                    entity: id,
                    model: Mat4::from_scale_rotation_translation(Vec3::splat(model.size), rotation, position),
                    color: [r, g, b, 1.0],
                    emissive: [0.0; 4],
                });
            } else if let Some([r, g, b]) = self.media.emissive(id) {
                items.push(DrawItem {
                    entity: id,
                    model: Mat4::from_scale_rotation_translation(DISPLAY_SIZE, rotation, position),
                    color: [0.0, 0.0, 0.0, 1.0],
                    emissive: [r, g, b, 1.0],
                });
            }
        }
        items
    }

    pub fn resize(&mut self, device: &Device, surface: &Surface, render_state: &mut RenderState, width: u32, height: u32) {
        if width == 0 || height == 0 || (width == render_state.width && height == render_state.height) {
            return;
        }
        self.camera.set_aspect(width, height);
        render_state.width = width;
        render_state.height = height;
        render_state.reconfigure(device, surface);

        // Recreate depth texture & view to match new size
        let (_, depth_view) = render::create_depth_texture(device, width, height);
        self.depth_view = depth_view;
    }

    pub fn teardown(&mut self) {
        self.showroom.teardown(&mut self.media);
    }

    fn write_camera(&mut self, queue: &Queue) {
        let eye = self.showroom.motion().camera();
        let pose = Pose::new(self.scene.position(eye), self.scene.euler(eye));
        self.cam_buf_data.view_proj = self.camera.view_proj(&pose).to_cols_array_2d();
        queue.write_buffer(&self.cam_buf, 0, bytemuck::bytes_of(&self.cam_buf_data));
    }
}
