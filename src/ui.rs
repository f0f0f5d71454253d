use std::cell::Cell;
use std::rc::Rc;

use egui::{Color32, Context, RichText};
use tracing::Level;

use crate::controller::{ProductUiSession, Showroom, ShowroomEvent};
use crate::host::{EntityHost, EntityId};
use crate::logging::ConsoleLog;
use crate::model::{Camera, Pose, Scene};
use crate::view::EmissiveSource;

/// Overlay toggles and frame statistics
#[derive(Debug, Clone)]
pub struct OverlayState {
    pub show_debug: bool,
    fps: f32,
    frame_count: u32,
    fps_timer: f32,
    last_event: Rc<Cell<Option<ShowroomEvent>>>,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            show_debug: true,
            fps: 0.0,
            frame_count: 0,
            fps_timer: 0.0,
            last_event: Rc::new(Cell::new(None)),
        }
    }
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, dt: f32) {
        self.frame_count += 1;
        self.fps_timer += dt;
        if self.fps_timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer;
            self.frame_count = 0;
            self.fps_timer = 0.0;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Bus subscriber that records the latest event for the debug window
    pub fn event_listener(&self) -> impl FnMut(&ShowroomEvent) + 'static {
        let last = self.last_event.clone();
        move |event| last.set(Some(*event))
    }

    pub fn last_event(&self) -> Option<ShowroomEvent> {
        self.last_event.get()
    }
}

/// Everything the overlay reads in one frame
pub struct UiContext<'a> {
    pub scene: &'a Scene,
    pub showroom: &'a Showroom,
    pub camera: &'a Camera,
    pub media: &'a dyn EmissiveSource,
    pub console: &'a ConsoleLog,
    pub overlay: &'a mut OverlayState,
}

/// Build the complete UI. Returns the egui output and the clickable entities
/// pressed this frame.
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, view: UiContext<'_>) -> (egui::FullOutput, Vec<EntityId>) {
    let screen = raw_input
        .screen_rect
        .unwrap_or_else(|| egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0)));
    let UiContext { scene, showroom, camera, media, console, overlay } = view;
    let mut clicked = Vec::new();

    let output = egui_ctx.run(raw_input, |ctx| {
        draw_affordances(ctx, scene, showroom, camera, screen.size(), &mut clicked);
        if let Some(session) = showroom.sessions().find(|s| s.is_open()) {
            draw_product_panel(ctx, scene, session, media, screen.width(), &mut clicked);
        }
        if overlay.show_debug {
            draw_debug_window(ctx, scene, showroom, overlay);
        }
        draw_console(ctx, console, screen.height());
    });

    (output, clicked)
}

fn clickable(ui: &mut egui::Ui, scene: &Scene, id: Option<EntityId>, clicked: &mut Vec<EntityId>) {
    let Some(id) = id.filter(|id| scene.is_enabled_in_hierarchy(*id)) else { return };
    if ui.button(scene.label(id)).clicked() {
        clicked.push(id);
    }
}

/// "Tap to experience" buttons floating over their products
fn draw_affordances(
    ctx: &Context,
    scene: &Scene,
    showroom: &Showroom,
    camera: &Camera,
    size: egui::Vec2,
    clicked: &mut Vec<EntityId>,
) {
    let eye = showroom.motion().camera();
    let pose = Pose::new(scene.position(eye), scene.euler(eye));

    for (product, entry) in showroom.products().entries() {
        let Some(button) = entry.affordance.filter(|b| scene.is_enabled_in_hierarchy(*b)) else { continue };
        let Some((x, y)) = camera.world_to_screen(&pose, scene.position(button), size.x, size.y) else { continue };
        if x < 0.0 || y < 0.0 || x > size.x || y > size.y {
            continue;
        }

        egui::Area::new(egui::Id::new(("affordance", product.0)))
            .fixed_pos(egui::pos2(x, y))
            .pivot(egui::Align2::CENTER_CENTER)
            .show(ctx, |ui| {
                let text = RichText::new(scene.label(button)).strong();
                if ui.button(text).clicked() {
                    clicked.push(button);
                }
            });
    }
}

fn draw_product_panel(
    ctx: &Context,
    scene: &Scene,
    session: &ProductUiSession,
    media: &dyn EmissiveSource,
    screen_width: f32,
    clicked: &mut Vec<EntityId>,
) {
    let Some(panel) = session.panel().filter(|p| scene.is_enabled_in_hierarchy(*p)) else { return };
    let buttons = session.buttons();

    egui::Window::new(scene.label(panel))
        .id(egui::Id::new(("product_panel", session.product().0)))
        .default_pos([screen_width - 240.0, 8.0])
        .default_width(220.0)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(RichText::new("Drag to rotate").small().weak());
            ui.separator();

            ui.label(RichText::new("Features").small());
            ui.horizontal_wrapped(|ui| {
                for button in &buttons.features {
                    clickable(ui, scene, *button, clicked);
                }
            });

            if !buttons.colors.is_empty() {
                ui.label(RichText::new("Colors").small());
                ui.horizontal_wrapped(|ui| {
                    for button in &buttons.colors {
                        clickable(ui, scene, Some(*button), clicked);
                    }
                });
            }

            if session.feature_screen().is_some_and(|s| scene.is_enabled_in_hierarchy(s)) {
                ui.separator();
                draw_feature_screen(ui, scene, session, media, clicked);
            }

            ui.separator();
            clickable(ui, scene, buttons.back, clicked);
        });
}

fn draw_feature_screen(
    ui: &mut egui::Ui,
    scene: &Scene,
    session: &ProductUiSession,
    media: &dyn EmissiveSource,
    clicked: &mut Vec<EntityId>,
) {
    let display = session.display();
    let shown = display.and_then(|d| media.describe(d));
    let tint = display.and_then(|d| media.emissive(d));

    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(48.0, 27.0), egui::Sense::hover());
        let fill = tint
            .map(|[r, g, b]| Color32::from_rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8))
            .unwrap_or(Color32::BLACK);
        ui.painter().rect_filled(rect, 2.0, fill);

        ui.vertical(|ui| {
            if let Some(index) = session.active_feature() {
                ui.label(RichText::new(format!("Feature {}", index + 1)).small());
            }
            let status = match (&shown, session.media().current()) {
                (Some(what), _) => what.clone(),
                (None, Some(_)) => "buffering...".to_string(),
                (None, None) => "nothing shown".to_string(),
            };
            ui.label(RichText::new(status).small());
            if let Some(reason) = session.media().failure() {
                ui.label(RichText::new(format!("Video unavailable: {}", reason)).small().color(Color32::LIGHT_RED));
            }
            if session.media().awaiting_gesture() {
                ui.label(RichText::new("Tap anywhere to play").small().color(Color32::YELLOW));
            }
        });
    });
    clickable(ui, scene, session.buttons().feature_close, clicked);
}

fn draw_debug_window(ctx: &Context, scene: &Scene, showroom: &Showroom, overlay: &OverlayState) {
    let motion = showroom.motion();
    let state = motion.state();
    let eye = scene.position(motion.camera());

    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .show(ctx, |ui| {
            ui.label(RichText::new(format!("FPS: {:.0}", overlay.fps())).small());
            ui.label(RichText::new(format!("Pos: x: {:.1} y: {:.1} z: {:.1}", eye.x, eye.y, eye.z)).small());
            ui.label(
                RichText::new(format!("Waypoint: {} / {}", motion.current_index() + 1, motion.waypoint_count()))
                    .small(),
            );
            ui.label(
                RichText::new(format!(
                    "Moving: {} Locked: {} Progress: {:.2}",
                    motion.is_moving(),
                    motion.is_locked(),
                    state.progress
                ))
                .small(),
            );
            for (id, entry) in showroom.products().entries() {
                let name = scene.entity(entry.model).map(|e| e.name.as_str()).unwrap_or("?");
                ui.label(RichText::new(format!("Product {} ({}): rotating {}", id, name, entry.is_rotating)).small());
            }
            if let Some(event) = overlay.last_event() {
                ui.label(RichText::new(format!("Last event: {:?}", event)).small());
            }
            ui.separator();
            ui.label(RichText::new("Controls:").small());
            ui.label(RichText::new("Wheel / Arrows - Next or previous product").small());
            ui.label(RichText::new("Drag - Rotate open product").small());
            ui.label(RichText::new("` - Toggle console").small());
            ui.label(RichText::new("F3 - Toggle debug").small());
        });
}

fn level_color(level: Level) -> Color32 {
    match level {
        Level::ERROR => Color32::from_rgb(255, 90, 90),
        Level::WARN => Color32::from_rgb(255, 200, 80),
        Level::INFO => Color32::from_rgb(200, 200, 200),
        _ => Color32::GRAY,
    }
}

fn draw_console(ctx: &Context, console: &ConsoleLog, screen_height: f32) {
    if !console.is_visible() {
        egui::Area::new(egui::Id::new("console_toggle"))
            .anchor(egui::Align2::LEFT_BOTTOM, [8.0, -8.0])
            .show(ctx, |ui| {
                if ui.small_button("Console").clicked() {
                    console.set_visible(true);
                }
            });
        return;
    }

    egui::Window::new("Console")
        .default_pos([8.0, screen_height - 228.0])
        .default_size([420.0, 200.0])
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.small_button("Clear").clicked() {
                    console.clear();
                }
                if ui.small_button("Hide").clicked() {
                    console.set_visible(false);
                }
            });
            ui.separator();
            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for entry in console.entries() {
                        ui.label(
                            RichText::new(format!("[{}] {:>5} {}", entry.timestamp, entry.level, entry.message))
                                .small()
                                .monospace()
                                .color(level_color(entry.level)),
                        );
                    }
                });
        });
}
