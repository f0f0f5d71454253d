//! Media hosts: a simulated one for the native window and tests, and one
//! backed by hidden `<video>` elements in the browser.
//!
//! The renderer draws a display's emissive binding as a flat unlit tint, so a
//! host only has to say which colour the display currently shows.

use crate::host::{EmissiveBinding, EntityId};

/// Colour a display currently emits, if it has a binding
pub trait EmissiveSource {
    fn emissive(&self, display: EntityId) -> Option<[f32; 3]>;

    /// Human readable description of what the display shows
    fn describe(&self, display: EntityId) -> Option<String>;
}

/// Stable tint for content the host cannot sample
fn url_tint(url: &str) -> [f32; 3] {
    let hash = url.bytes().fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
    let channel = |shift: u32| 0.35 + 0.65 * ((hash >> shift) & 0xff) as f32 / 255.0;
    [channel(0), channel(8), channel(16)]
}

/// Slow colour cycle standing in for moving pictures
fn playback_tint(seconds: f32) -> [f32; 3] {
    let phase = |offset: f32| 0.5 + 0.5 * (seconds * 1.3 + offset).sin();
    [phase(0.0), phase(2.1), phase(4.2)]
}

fn describe(binding: &EmissiveBinding) -> String {
    match binding {
        EmissiveBinding::Image(url) => format!("image {}", url),
        EmissiveBinding::Video(surface) => format!("video {:?}", surface),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::{NativeMedia, SimulatedVideo};

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::collections::HashMap;

    use tracing::{debug, info, warn};

    use super::*;
    use crate::error::MediaError;
    use crate::host::{MediaEvent, MediaHost, SurfaceId};

    /// Seconds of "buffering" before a simulated video reports readiness
    pub const DEFAULT_BUFFERING_DELAY: f32 = 0.4;

    #[derive(Debug, Clone)]
    pub struct SimulatedVideo {
        pub url: String,
        pub buffered: f32,
        pub ready_sent: bool,
        pub playing: bool,
        pub frames_uploaded: u64,
    }

    /// Decodes images with the `image` crate and simulates video playback: a
    /// surface becomes ready after a buffering delay and counts uploaded frames.
    pub struct NativeMedia {
        next_surface: u64,
        videos: HashMap<SurfaceId, SimulatedVideo>,
        bindings: HashMap<EntityId, EmissiveBinding>,
        image_tints: HashMap<String, [f32; 3]>,
        events: Vec<MediaEvent>,
        pub buffering_delay: f32,
        /// When false every `play` is refused, as a browser autoplay policy would
        pub autoplay_allowed: bool,
    }

    impl Default for NativeMedia {
        fn default() -> Self {
            Self {
                next_surface: 0,
                videos: HashMap::new(),
                bindings: HashMap::new(),
                image_tints: HashMap::new(),
                events: Vec::new(),
                buffering_delay: DEFAULT_BUFFERING_DELAY,
                autoplay_allowed: true,
            }
        }
    }

    impl NativeMedia {
        pub fn new() -> Self {
            Self::default()
        }

        /// Advance buffering; emits readiness once per surface
        pub fn advance(&mut self, dt: f32) {
            for (surface, video) in self.videos.iter_mut() {
                video.buffered += dt;
                if !video.ready_sent && video.buffered >= self.buffering_delay {
                    video.ready_sent = true;
                    debug!(?surface, url = %video.url, "can play through");
                    self.events.push(MediaEvent::Ready(*surface));
                }
            }
        }

        pub fn video(&self, surface: SurfaceId) -> Option<&SimulatedVideo> {
            self.videos.get(&surface)
        }

        pub fn live_surfaces(&self) -> usize {
            self.videos.len()
        }

        pub fn binding(&self, display: EntityId) -> Option<&EmissiveBinding> {
            self.bindings.get(&display)
        }

        /// Average colour of the image, or a stable tint when it cannot be decoded
        fn image_tint(&mut self, url: &str) -> [f32; 3] {
            if let Some(tint) = self.image_tints.get(url) {
                return *tint;
            }
            let tint = match image::open(url) {
                Ok(img) => {
                    let rgb = img.thumbnail(32, 32).to_rgb8();
                    let count = (rgb.width() * rgb.height()).max(1) as f32;
                    let sum = rgb.pixels().fold([0.0f32; 3], |mut acc, p| {
                        for (a, c) in acc.iter_mut().zip(p.0) {
                            *a += c as f32 / 255.0;
                        }
                        acc
                    });
                    sum.map(|c| c / count)
                }
                Err(e) => {
                    warn!("image {} could not be decoded: {}", url, e);
                    url_tint(url)
                }
            };
            self.image_tints.insert(url.to_string(), tint);
            tint
        }
    }

    impl MediaHost for NativeMedia {
        fn load_video(&mut self, url: &str) -> Result<SurfaceId, MediaError> {
            if url.is_empty() {
                return Err(MediaError::Load { url: url.to_string(), reason: "empty url".into() });
            }
            self.next_surface += 1;
            let surface = SurfaceId(self.next_surface);
            self.videos.insert(
                surface,
                SimulatedVideo {
                    url: url.to_string(),
                    buffered: 0.0,
                    ready_sent: false,
                    playing: false,
                    frames_uploaded: 0,
                },
            );
            Ok(surface)
        }

        fn play(&mut self, surface: SurfaceId) -> Result<(), MediaError> {
            let video = self.videos.get_mut(&surface).ok_or(MediaError::UnknownSurface(surface))?;
            if !self.autoplay_allowed {
                return Err(MediaError::PlaybackRejected(surface, "autoplay not allowed".into()));
            }
            video.playing = true;
            info!(?surface, "playback started");
            Ok(())
        }

        fn pause(&mut self, surface: SurfaceId) {
            if let Some(video) = self.videos.get_mut(&surface) {
                video.playing = false;
            }
        }

        fn release(&mut self, surface: SurfaceId) {
            self.videos.remove(&surface);
        }

        fn upload_frame(&mut self, surface: SurfaceId) {
            if let Some(video) = self.videos.get_mut(&surface).filter(|v| v.playing) {
                video.frames_uploaded += 1;
            }
        }

        fn bind_emissive(&mut self, display: EntityId, binding: EmissiveBinding) {
            if let EmissiveBinding::Image(url) = &binding {
                self.image_tint(url);
            }
            self.bindings.insert(display, binding);
        }

        fn clear_emissive(&mut self, display: EntityId) {
            self.bindings.remove(&display);
        }

        fn poll_events(&mut self) -> Vec<MediaEvent> {
            std::mem::take(&mut self.events)
        }
    }

    impl EmissiveSource for NativeMedia {
        fn emissive(&self, display: EntityId) -> Option<[f32; 3]> {
            match self.bindings.get(&display)? {
                EmissiveBinding::Image(url) => Some(self.image_tints.get(url).copied().unwrap_or_else(|| url_tint(url))),
                EmissiveBinding::Video(surface) => {
                    let frames = self.videos.get(surface).map(|v| v.frames_uploaded).unwrap_or(0);
                    Some(playback_tint(frames as f32 / 60.0))
                }
            }
        }

        fn describe(&self, display: EntityId) -> Option<String> {
            self.bindings.get(&display).map(describe)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_readiness_after_buffering_delay_once() {
            let mut media = NativeMedia::new();
            let surface = media.load_video("clip.mp4").unwrap();
            media.advance(0.1);
            assert!(media.poll_events().is_empty());
            media.advance(0.5);
            media.advance(0.5);
            assert_eq!(media.poll_events(), vec![MediaEvent::Ready(surface)]);
        }

        #[test]
        fn test_surfaces_are_never_reused() {
            let mut media = NativeMedia::new();
            let a = media.load_video("a.mp4").unwrap();
            media.release(a);
            let b = media.load_video("a.mp4").unwrap();
            assert_ne!(a, b);
            assert_eq!(media.live_surfaces(), 1);
        }

        #[test]
        fn test_refused_autoplay_and_frame_upload() {
            let mut media = NativeMedia { autoplay_allowed: false, ..NativeMedia::default() };
            let surface = media.load_video("a.mp4").unwrap();
            assert!(matches!(media.play(surface), Err(MediaError::PlaybackRejected(..))));
            media.upload_frame(surface);
            assert_eq!(media.video(surface).unwrap().frames_uploaded, 0);

            media.autoplay_allowed = true;
            media.play(surface).unwrap();
            media.upload_frame(surface);
            assert_eq!(media.video(surface).unwrap().frames_uploaded, 1);
            assert_eq!(media.play(SurfaceId(99)), Err(MediaError::UnknownSurface(SurfaceId(99))));
        }

        #[test]
        fn test_missing_image_falls_back_to_tint() {
            let mut media = NativeMedia::new();
            let display = EntityId(4);
            media.bind_emissive(display, EmissiveBinding::Image("does/not/exist.png".into()));
            assert_eq!(media.emissive(display), Some(url_tint("does/not/exist.png")));
            media.clear_emissive(display);
            assert_eq!(media.emissive(display), None);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebMedia;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use tracing::{debug, info};
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{AddEventListenerOptions, Document, HtmlVideoElement};

    use super::*;
    use crate::error::MediaError;
    use crate::host::{MediaEvent, MediaHost, SurfaceId};

    struct WebVideo {
        element: HtmlVideoElement,
        on_ready: Closure<dyn FnMut()>,
        on_error: Closure<dyn FnMut()>,
    }

    /// Hidden, muted, looping `<video>` elements appended to the page body.
    /// Readiness comes from a one-shot `canplaythrough`, load errors from
    /// `error`; a refused `play()` promise is reported as
    /// [`MediaEvent::PlaybackRejected`].
    pub struct WebMedia {
        document: Document,
        next_surface: u64,
        videos: HashMap<SurfaceId, WebVideo>,
        bindings: HashMap<EntityId, EmissiveBinding>,
        events: Rc<RefCell<Vec<MediaEvent>>>,
    }

    impl WebMedia {
        pub fn new(document: Document) -> Self {
            Self {
                document,
                next_surface: 0,
                videos: HashMap::new(),
                bindings: HashMap::new(),
                events: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn create_element(&self, url: &str) -> Result<HtmlVideoElement, wasm_bindgen::JsValue> {
            let video = self.document.create_element("video")?.dyn_into::<HtmlVideoElement>()?;
            video.set_cross_origin(Some("anonymous"));
            video.set_muted(true);
            video.set_loop(true);
            video.set_attribute("playsinline", "")?;
            video.style().set_property("display", "none")?;
            video.set_src(url);
            if let Some(body) = self.document.body() {
                body.append_child(&video)?;
            }
            Ok(video)
        }
    }

    impl MediaHost for WebMedia {
        fn load_video(&mut self, url: &str) -> Result<SurfaceId, MediaError> {
            let element = self.create_element(url).map_err(|e| MediaError::Load {
                url: url.to_string(),
                reason: format!("{:?}", e),
            })?;
            self.next_surface += 1;
            let surface = SurfaceId(self.next_surface);

            let load_error = |e| MediaError::Load { url: url.to_string(), reason: format!("{:?}", e) };
            let once = AddEventListenerOptions::new();
            once.set_once(true);

            let events = self.events.clone();
            let on_ready = Closure::wrap(Box::new(move || {
                events.borrow_mut().push(MediaEvent::Ready(surface));
            }) as Box<dyn FnMut()>);
            element
                .add_event_listener_with_callback_and_add_event_listener_options(
                    "canplaythrough",
                    on_ready.as_ref().unchecked_ref(),
                    &once,
                )
                .map_err(load_error)?;

            let events = self.events.clone();
            let source = url.to_string();
            let on_error = Closure::wrap(Box::new(move || {
                events
                    .borrow_mut()
                    .push(MediaEvent::LoadFailed(surface, format!("could not load {}", source)));
            }) as Box<dyn FnMut()>);
            element
                .add_event_listener_with_callback_and_add_event_listener_options(
                    "error",
                    on_error.as_ref().unchecked_ref(),
                    &once,
                )
                .map_err(load_error)?;
            element.load();

            self.videos.insert(surface, WebVideo { element, on_ready, on_error });
            Ok(surface)
        }

        fn play(&mut self, surface: SurfaceId) -> Result<(), MediaError> {
            let video = self.videos.get(&surface).ok_or(MediaError::UnknownSurface(surface))?;
            let promise = video
                .element
                .play()
                .map_err(|e| MediaError::PlaybackRejected(surface, format!("{:?}", e)))?;
            let events = self.events.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    events.borrow_mut().push(MediaEvent::PlaybackRejected(surface, format!("{:?}", e)));
                }
            });
            Ok(())
        }

        fn pause(&mut self, surface: SurfaceId) {
            if let Some(video) = self.videos.get(&surface) {
                let _ = video.element.pause();
            }
        }

        fn release(&mut self, surface: SurfaceId) {
            if let Some(video) = self.videos.remove(&surface) {
                // Clearing the source fires `error`; detach before the closures drop
                let _ = video
                    .element
                    .remove_event_listener_with_callback("canplaythrough", video.on_ready.as_ref().unchecked_ref());
                let _ = video
                    .element
                    .remove_event_listener_with_callback("error", video.on_error.as_ref().unchecked_ref());
                let _ = video.element.pause();
                video.element.remove_attribute("src").ok();
                video.element.load();
                video.element.remove();
                debug!(?surface, "video element removed");
            }
        }

        fn upload_frame(&mut self, _surface: SurfaceId) {
            // The tint is sampled from the element's clock in `emissive`
        }

        fn bind_emissive(&mut self, display: EntityId, binding: EmissiveBinding) {
            info!("display bound to {}", describe(&binding));
            self.bindings.insert(display, binding);
        }

        fn clear_emissive(&mut self, display: EntityId) {
            self.bindings.remove(&display);
        }

        fn poll_events(&mut self) -> Vec<MediaEvent> {
            std::mem::take(&mut *self.events.borrow_mut())
        }
    }

    impl EmissiveSource for WebMedia {
        fn emissive(&self, display: EntityId) -> Option<[f32; 3]> {
            match self.bindings.get(&display)? {
                EmissiveBinding::Image(url) => Some(url_tint(url)),
                EmissiveBinding::Video(surface) => {
                    let seconds = self.videos.get(surface).map(|v| v.element.current_time() as f32).unwrap_or(0.0);
                    Some(playback_tint(seconds))
                }
            }
        }

        fn describe(&self, display: EntityId) -> Option<String> {
            self.bindings.get(&display).map(describe)
        }
    }
}
