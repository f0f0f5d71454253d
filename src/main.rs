use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::Key,
    window::Window,
};

// Import from the library crate
use showroom::{controller, logging, view, FrameLoopContext, ShowroomConfig};

use controller::{InputEvent, MouseButton as ShowroomButton};
use view::{GpuContext, NativeMedia, RenderState};

struct App {
    window: Arc<Window>,
    gpu: GpuContext,
    render_state: RenderState,
    frame: FrameLoopContext<NativeMedia>,
    egui_state: egui_winit::State,

    // Last cursor position in logical pixels
    cursor: (f32, f32),
    last_frame_time: Instant,
}

impl App {
    async fn new(window: Arc<Window>, config: &ShowroomConfig, console: logging::ConsoleLog) -> Result<Self, Box<dyn Error>> {
        let size = window.inner_size();
        let gpu = GpuContext::new_native(window.clone(), size.width, size.height).await?;

        let (frame, render_state) = FrameLoopContext::new(config, NativeMedia::new(), console, &gpu)?;
        let egui_state = egui_winit::State::new(
            frame.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Self {
            window,
            gpu,
            render_state,
            frame,
            egui_state,
            cursor: (0.0, 0.0),
            last_frame_time: Instant::now(),
        })
    }

    /// Returns true when the event was consumed
    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        let egui_captured = self.egui_state.on_window_event(self.window.as_ref(), event).consumed;
        if egui_captured {
            return true;
        }

        let scale = self.window.scale_factor();
        let input = match event {
            WindowEvent::KeyboardInput { event: KeyEvent { logical_key, state, .. }, .. } => {
                let Some(key) = key_name(logical_key) else { return false };
                match state {
                    ElementState::Pressed => InputEvent::KeyDown(key),
                    ElementState::Released => InputEvent::KeyUp(key),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports scrolling up as positive, the DOM the opposite
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -*y,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                InputEvent::Wheel { delta_y }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(scale);
                self.cursor = (logical.x, logical.y);
                InputEvent::MouseMove { x: logical.x, y: logical.y }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Right => ShowroomButton::Right,
                    MouseButton::Middle => ShowroomButton::Middle,
                    _ => ShowroomButton::Left,
                };
                let (x, y) = self.cursor;
                match state {
                    ElementState::Pressed => InputEvent::MouseDown { button, x, y },
                    ElementState::Released => InputEvent::MouseUp { button, x, y },
                }
            }
            WindowEvent::Touch(touch) => {
                let logical = touch.location.to_logical::<f32>(scale);
                let (id, x, y) = (touch.id, logical.x, logical.y);
                match touch.phase {
                    TouchPhase::Started => InputEvent::TouchStart { id, x, y },
                    TouchPhase::Moved => InputEvent::TouchMove { id, x, y },
                    TouchPhase::Ended | TouchPhase::Cancelled => InputEvent::TouchEnd { id, x, y },
                }
            }
            WindowEvent::Focused(false) => InputEvent::FocusLost,
            _ => return false,
        };

        self.frame.handle_input(input);
        true
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.frame.resize(
            &self.gpu.device,
            &self.gpu.surface,
            &mut self.render_state,
            new_size.width,
            new_size.height,
        );
    }

    fn update(&mut self, dt: f32) {
        self.frame.media.advance(dt);

        let raw_input = self.egui_state.take_egui_input(&self.window);
        self.frame.update(dt, raw_input, &self.gpu.queue, &mut self.render_state);

        if let Some(output) = self.render_state.egui_full_output.as_mut() {
            let platform_output = std::mem::take(&mut output.platform_output);
            self.egui_state.handle_platform_output(&self.window, platform_output);
        }
    }

    fn render(&mut self) {
        self.frame.draw(&self.gpu.device, &self.gpu.queue, &self.gpu.surface, &mut self.render_state);
    }
}

/// DOM-style key name: "ArrowDown", "F3", "`"
fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Named(named) => Some(format!("{:?}", named)),
        Key::Character(c) => Some(c.to_string()),
        _ => None,
    }
}

fn run(config: ShowroomConfig, console: logging::ConsoleLog) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title("Showroom")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window, &config, console))?;

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => {
                            app.frame.teardown();
                            elwt.exit();
                        }
                        WindowEvent::Resized(physical_size) => {
                            app.resize(*physical_size);
                        }
                        WindowEvent::RedrawRequested => {
                            let now = Instant::now();
                            let dt = (now - app.last_frame_time).as_secs_f32().min(0.1);
                            app.last_frame_time = now;

                            app.update(dt);
                            app.render();
                        }
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    })?;
    Ok(())
}

fn main() {
    let console = logging::ConsoleLog::new();
    logging::init(console.clone());

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("loading showroom from {}", path);
            ShowroomConfig::load(&path)
        }
        None => {
            warn!("no config path given, using the bundled demo");
            ShowroomConfig::demo()
        }
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config, console) {
        error!("{}", e);
        std::process::exit(1);
    }
}
