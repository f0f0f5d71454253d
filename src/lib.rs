// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod ui;
pub mod frame_loop;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

pub use config::ShowroomConfig;
pub use error::{ConfigError, MediaError, ShowroomError};
pub use frame_loop::FrameLoopContext;

#[cfg(target_arch = "wasm32")]
use std::{cell::RefCell, rc::Rc};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, convert::FromWasmAbi, prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent, WheelEvent, Window};

#[cfg(target_arch = "wasm32")]
use controller::input::wasm::{self as web_input, TouchPhase};
#[cfg(target_arch = "wasm32")]
use controller::InputEvent;
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, WebMedia};

#[cfg(target_arch = "wasm32")]
type SharedFrame = Rc<RefCell<FrameLoopContext<WebMedia>>>;
#[cfg(target_arch = "wasm32")]
type EguiEvents = Rc<RefCell<Vec<egui::Event>>>;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    let console = logging::ConsoleLog::new();
    logging::init(console.clone());

    let (window, document, canvas) = init_canvas()?;
    setup_app(&window, &document, &canvas, console).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: &Window,
    document: &Document,
    canvas: &HtmlCanvasElement,
    console: logging::ConsoleLog,
) -> Result<(), JsValue> {
    let gpu = GpuContext::new(canvas, canvas.width(), canvas.height())
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;

    let config = ShowroomConfig::demo().map_err(|e| js_error(format!("invalid showroom config: {e}")))?;
    let media = WebMedia::new(document.clone());
    let (frame, mut render_state) = FrameLoopContext::new(&config, media, console, &gpu)
        .map_err(|e| js_error(format!("showroom setup failed: {e}")))?;

    let frame: SharedFrame = Rc::new(RefCell::new(frame));
    let egui_events: EguiEvents = Rc::new(RefCell::new(Vec::new()));
    setup_input_listeners(document, window, frame.clone(), egui_events.clone())?;

    // Continuous redraw using requestAnimationFrame
    let mut last_time = window.performance().map(|p| p.now()).unwrap_or(0.0);
    let f = RcCellCallback::new(window.clone(), {
        let window = window.clone();
        let canvas = canvas.clone();

        move || {
            let now = window.performance().map(|p| p.now()).unwrap_or(0.0);
            let dt = ((now - last_time) / 1000.0).clamp(0.0, 0.1) as f32;
            last_time = now;

            let dpr = window.device_pixel_ratio() as f32;
            let mut frame = frame.borrow_mut();
            handle_resize(&window, &canvas, dpr, &gpu, &mut frame, &mut render_state);

            // Build egui input from queued events
            let mut raw_input = egui::RawInput::default();
            raw_input.time = Some(now / 1000.0);
            raw_input.screen_rect = Some(egui::Rect::from_min_size(
                egui::Pos2::new(0.0, 0.0),
                egui::vec2(render_state.width as f32 / dpr, render_state.height as f32 / dpr),
            ));
            raw_input.events.extend(egui_events.borrow_mut().drain(..));
            frame.egui_ctx.set_pixels_per_point(dpr);

            frame.update(dt, raw_input, &gpu.queue, &mut render_state);
            frame.draw(&gpu.device, &gpu.queue, &gpu.surface, &mut render_state);
        }
    });
    f.start();

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn handle_resize(
    window: &Window,
    canvas: &HtmlCanvasElement,
    dpr: f32,
    gpu: &GpuContext,
    frame: &mut FrameLoopContext<WebMedia>,
    render_state: &mut view::RenderState,
) {
    let (Ok(w), Ok(h)) = (window.inner_width(), window.inner_height()) else { return };
    let nw = (w.as_f64().unwrap_or(800.0) as f32 * dpr) as u32;
    let nh = (h.as_f64().unwrap_or(600.0) as f32 * dpr) as u32;
    if nw != render_state.width || nh != render_state.height {
        canvas.set_width(nw);
        canvas.set_height(nh);
        frame.resize(&gpu.device, &gpu.surface, render_state, nw, nh);
    }
}

#[cfg(target_arch = "wasm32")]
fn listen<E: FromWasmAbi + 'static>(
    target: &EventTarget,
    name: &str,
    handler: impl FnMut(E) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn pointer_button(x: f32, y: f32, pressed: bool) -> egui::Event {
    egui::Event::PointerButton {
        pos: egui::pos2(x, y),
        button: egui::PointerButton::Primary,
        pressed,
        modifiers: egui::Modifiers::default(),
    }
}

/// Setup all input event listeners with platform-agnostic abstractions
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    frame: SharedFrame,
    egui_events: EguiEvents,
) -> Result<(), JsValue> {
    // Keyboard down
    {
        let frame = frame.clone();
        listen(document, "keydown", move |e: KeyboardEvent| {
            let key = e.key();
            if matches!(key.as_str(), "ArrowUp" | "ArrowDown" | "PageUp" | "PageDown") {
                e.prevent_default();
            }
            frame.borrow_mut().handle_input(web_input::keyboard_event_to_input(&e, true));
        })?;
    }

    // Keyboard up
    {
        let frame = frame.clone();
        listen(document, "keyup", move |e: KeyboardEvent| {
            frame.borrow_mut().handle_input(web_input::keyboard_event_to_input(&e, false));
        })?;
    }

    // Focus loss - end any drag
    {
        let frame = frame.clone();
        listen(window, "blur", move |_e: Event| {
            frame.borrow_mut().handle_input(InputEvent::FocusLost);
        })?;
    }

    // Page going away - stop playback and drop the video elements
    {
        let frame = frame.clone();
        listen(window, "pagehide", move |_e: Event| {
            frame.borrow_mut().teardown();
        })?;
    }

    // Mouse
    {
        let frame = frame.clone();
        let egui_events = egui_events.clone();
        listen(document, "mousedown", move |e: MouseEvent| {
            let (x, y) = (e.client_x() as f32, e.client_y() as f32);
            egui_events.borrow_mut().push(pointer_button(x, y, true));
            frame.borrow_mut().handle_input(web_input::mouse_down_to_input(&e));
        })?;
    }
    {
        let frame = frame.clone();
        let egui_events = egui_events.clone();
        listen(document, "mousemove", move |e: MouseEvent| {
            let (x, y) = (e.client_x() as f32, e.client_y() as f32);
            egui_events.borrow_mut().push(egui::Event::PointerMoved(egui::pos2(x, y)));
            frame.borrow_mut().handle_input(web_input::mouse_move_to_input(&e));
        })?;
    }
    {
        let frame = frame.clone();
        let egui_events = egui_events.clone();
        listen(document, "mouseup", move |e: MouseEvent| {
            let (x, y) = (e.client_x() as f32, e.client_y() as f32);
            egui_events.borrow_mut().push(pointer_button(x, y, false));
            frame.borrow_mut().handle_input(web_input::mouse_up_to_input(&e));
        })?;
    }

    // Context menu prevention
    listen(document, "contextmenu", move |e: MouseEvent| e.prevent_default())?;

    // Mouse wheel
    {
        let frame = frame.clone();
        listen(window, "wheel", move |e: WheelEvent| {
            if let Some(event) = web_input::wheel_to_input(&e) {
                frame.borrow_mut().handle_input(event);
            }
        })?;
    }

    // Touch, mirrored to egui as the primary pointer
    for (name, phase) in [
        ("touchstart", TouchPhase::Start),
        ("touchmove", TouchPhase::Move),
        ("touchend", TouchPhase::End),
        ("touchcancel", TouchPhase::End),
    ] {
        let frame = frame.clone();
        let egui_events = egui_events.clone();
        listen(document, name, move |e: TouchEvent| {
            let inputs = web_input::touch_to_inputs(&e, phase);
            if let Some(&InputEvent::TouchStart { x, y, .. }
            | &InputEvent::TouchMove { x, y, .. }
            | &InputEvent::TouchEnd { x, y, .. }) = inputs.first()
            {
                let mut queue = egui_events.borrow_mut();
                queue.push(egui::Event::PointerMoved(egui::pos2(x, y)));
                match phase {
                    TouchPhase::Start => queue.push(pointer_button(x, y, true)),
                    TouchPhase::End => queue.push(pointer_button(x, y, false)),
                    TouchPhase::Move => e.prevent_default(),
                }
            }
            let mut frame = frame.borrow_mut();
            for input in inputs {
                frame.handle_input(input);
            }
        })?;
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;

    let dpr = window.device_pixel_ratio();
    let width = window.inner_width()?.as_f64().unwrap_or(800.0) * dpr;
    let height = window.inner_height()?.as_f64().unwrap_or(600.0) * dpr;
    canvas_el.set_width(width as u32);
    canvas_el.set_height(height as u32);
    canvas_el.style().set_property("width", "100vw")?;
    canvas_el.style().set_property("height", "100vh")?;
    canvas_el.style().set_property("display", "block")?;
    body.style().set_property("margin", "0")?;
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            inner.borrow_mut().as_mut()();

            // Recursively schedule next frame
            if let Some(cb) = callback_clone.borrow().as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!("requestAnimationFrame failed: {:?}", e);
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            if let Err(e) = self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                tracing::error!("requestAnimationFrame start failed: {:?}", e);
            }
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
    }
}
