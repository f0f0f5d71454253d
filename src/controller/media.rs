use tracing::{debug, error, info, warn};

use crate::error::MediaError;
use crate::host::{EmissiveBinding, EntityId, MediaEvent, MediaHost, SurfaceId};

/// The one emissive binding of a product's display area.
///
/// Each video load gets a fresh [`SurfaceId`] from the host, so a readiness
/// notice naming any other surface is stale and can never bind.
#[derive(Debug, Default)]
pub struct MediaSlot {
    display: Option<EntityId>,
    current: Option<SurfaceId>,
    /// Surface to start on the next user gesture after autoplay was refused
    resume_on_gesture: Option<SurfaceId>,
    /// Still shown when the current video fails to load
    poster: Option<String>,
    failure: Option<String>,
}

impl MediaSlot {
    pub fn new(display: Option<EntityId>) -> Self {
        Self { display, ..Self::default() }
    }

    pub fn current(&self) -> Option<SurfaceId> {
        self.current
    }

    pub fn owns(&self, surface: SurfaceId) -> bool {
        self.current == Some(surface)
    }

    pub fn awaiting_gesture(&self) -> bool {
        self.resume_on_gesture.is_some()
    }

    /// Why the last video could not be shown, until something else is shown
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Replace whatever is shown with a freshly loading video surface. It is
    /// bound once the host reports it ready; `poster` is shown instead if
    /// loading fails.
    pub fn show_video(
        &mut self,
        url: &str,
        poster: Option<&str>,
        media: &mut dyn MediaHost,
    ) -> Result<SurfaceId, MediaError> {
        // An image may stay up while the new video buffers; a released video may not
        if self.current.is_some() {
            self.teardown(media);
            self.clear(media);
        }
        self.failure = None;
        self.poster = poster.map(str::to_string);
        let surface = media.load_video(url)?;
        info!(?surface, url, "video surface created, waiting for data");
        self.current = Some(surface);
        Ok(surface)
    }

    pub fn show_image(&mut self, url: &str, media: &mut dyn MediaHost) {
        self.teardown(media);
        self.failure = None;
        match self.display {
            Some(display) => {
                media.bind_emissive(display, EmissiveBinding::Image(url.to_string()));
                info!(url, "image bound to display");
            }
            None => warn!(url, "no display area to show image on"),
        }
    }

    /// Returns false when the event concerns a surface this slot does not own
    pub fn on_event(&mut self, event: &MediaEvent, media: &mut dyn MediaHost) -> bool {
        match event {
            MediaEvent::Ready(surface) if self.owns(*surface) => {
                if let Some(display) = self.display {
                    media.bind_emissive(display, EmissiveBinding::Video(*surface));
                }
                match media.play(*surface) {
                    Ok(()) => info!(?surface, "video playing"),
                    Err(e) => {
                        warn!("video play failed: {}; will resume on next interaction", e);
                        self.resume_on_gesture = Some(*surface);
                    }
                }
                true
            }
            MediaEvent::PlaybackRejected(surface, reason) if self.owns(*surface) => {
                warn!(?surface, "autoplay prevented: {}", reason);
                self.resume_on_gesture = Some(*surface);
                true
            }
            MediaEvent::LoadFailed(surface, reason) if self.owns(*surface) => {
                error!(?surface, "video failed to load: {}", reason);
                let poster = self.poster.take();
                self.teardown(media);
                self.clear(media);
                if let (Some(display), Some(poster)) = (self.display, poster) {
                    media.bind_emissive(display, EmissiveBinding::Image(poster));
                }
                self.failure = Some(reason.clone());
                true
            }
            _ => false,
        }
    }

    /// One-shot retry of a refused playback
    pub fn on_user_gesture(&mut self, media: &mut dyn MediaHost) {
        let Some(surface) = self.resume_on_gesture.take() else { return };
        if !self.owns(surface) {
            return;
        }
        match media.play(surface) {
            Ok(()) => info!(?surface, "video resumed after user interaction"),
            Err(e) => warn!("video still refused after interaction: {}", e),
        }
    }

    /// Per-frame texture refresh of the current surface
    pub fn upload(&mut self, media: &mut dyn MediaHost) {
        if let Some(surface) = self.current {
            media.upload_frame(surface);
        }
    }

    /// Pause, release and forget the current surface
    pub fn teardown(&mut self, media: &mut dyn MediaHost) {
        self.resume_on_gesture = None;
        self.poster = None;
        if let Some(surface) = self.current.take() {
            media.pause(surface);
            media.release(surface);
            debug!(?surface, "video surface released");
        }
    }

    /// Drop the emissive binding so the display is lit normally again
    pub fn clear(&mut self, media: &mut dyn MediaHost) {
        if let Some(display) = self.display {
            media.clear_emissive(display);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::recording::{Call, RecordingMedia};
    use super::*;

    const DISPLAY: EntityId = EntityId(7);

    #[test]
    fn test_ready_binds_and_plays_current_surface() {
        let mut media = RecordingMedia::default();
        let mut slot = MediaSlot::new(Some(DISPLAY));
        let surface = slot.show_video("a.mp4", None, &mut media).unwrap();

        assert!(slot.on_event(&MediaEvent::Ready(surface), &mut media));
        assert_eq!(media.bindings.get(&DISPLAY), Some(&EmissiveBinding::Video(surface)));
        assert_eq!(media.count(|c| *c == Call::Play(surface)), 1);
    }

    #[test]
    fn test_stale_readiness_never_binds() {
        let mut media = RecordingMedia::default();
        let mut slot = MediaSlot::new(Some(DISPLAY));
        let old = slot.show_video("a.mp4", None, &mut media).unwrap();
        slot.show_image("b.png", &mut media);

        assert!(!media.alive.contains(&old));
        assert!(!slot.on_event(&MediaEvent::Ready(old), &mut media));
        assert_eq!(media.bindings.get(&DISPLAY), Some(&EmissiveBinding::Image("b.png".into())));
        assert_eq!(media.count(|c| matches!(c, Call::Play(_))), 0);
    }

    #[test]
    fn test_video_after_video_unbinds_released_surface() {
        let mut media = RecordingMedia::default();
        let mut slot = MediaSlot::new(Some(DISPLAY));
        let first = slot.show_video("a.mp4", None, &mut media).unwrap();
        slot.on_event(&MediaEvent::Ready(first), &mut media);

        let second = slot.show_video("b.mp4", None, &mut media).unwrap();
        assert!(!media.alive.contains(&first));
        assert_eq!(media.bindings.get(&DISPLAY), None);

        slot.on_event(&MediaEvent::Ready(second), &mut media);
        assert_eq!(media.bindings.get(&DISPLAY), Some(&EmissiveBinding::Video(second)));
    }

    #[test]
    fn test_image_stays_bound_while_next_video_buffers() {
        let mut media = RecordingMedia::default();
        let mut slot = MediaSlot::new(Some(DISPLAY));
        slot.show_image("a.png", &mut media);
        slot.show_video("b.mp4", None, &mut media).unwrap();
        assert_eq!(media.bindings.get(&DISPLAY), Some(&EmissiveBinding::Image("a.png".into())));
    }

    #[test]
    fn test_failed_load_releases_and_shows_poster() {
        let mut media = RecordingMedia::default();
        let mut slot = MediaSlot::new(Some(DISPLAY));
        let surface = slot.show_video("a.mp4", Some("a.png"), &mut media).unwrap();

        assert!(slot.on_event(&MediaEvent::LoadFailed(surface, "404".into()), &mut media));
        assert_eq!(slot.current(), None);
        assert_eq!(slot.failure(), Some("404"));
        assert!(!media.alive.contains(&surface));
        assert_eq!(media.bindings.get(&DISPLAY), Some(&EmissiveBinding::Image("a.png".into())));

        // A late readiness notice for the failed surface changes nothing
        assert!(!slot.on_event(&MediaEvent::Ready(surface), &mut media));
        slot.show_image("b.png", &mut media);
        assert_eq!(slot.failure(), None);
    }

    #[test]
    fn test_refused_play_resumes_once_on_gesture() {
        let mut media = RecordingMedia { refuse_play: true, ..Default::default() };
        let mut slot = MediaSlot::new(Some(DISPLAY));
        let surface = slot.show_video("a.mp4", None, &mut media).unwrap();
        slot.on_event(&MediaEvent::Ready(surface), &mut media);
        assert!(slot.awaiting_gesture());

        media.refuse_play = false;
        slot.on_user_gesture(&mut media);
        slot.on_user_gesture(&mut media);
        assert_eq!(media.count(|c| *c == Call::Play(surface)), 2);
        assert!(!slot.awaiting_gesture());
    }

    #[test]
    fn test_teardown_releases_and_is_idempotent() {
        let mut media = RecordingMedia::default();
        let mut slot = MediaSlot::new(Some(DISPLAY));
        let surface = slot.show_video("a.mp4", None, &mut media).unwrap();
        slot.upload(&mut media);

        slot.teardown(&mut media);
        slot.teardown(&mut media);
        assert_eq!(slot.current(), None);
        assert_eq!(media.count(|c| *c == Call::Release(surface)), 1);
        assert_eq!(media.count(|c| *c == Call::Upload(surface)), 1);
    }
}
