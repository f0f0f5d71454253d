use glam::Vec3;
use tracing::{debug, info, warn};

use crate::config::ProductUiConfig;
use crate::controller::bus::{EventBus, ShowroomEvent};
use crate::controller::camera_controller::{CameraController, Target};
use crate::controller::input::PointerSource;
use crate::controller::media::MediaSlot;
use crate::controller::product_manager::resolve;
use crate::error::{Result, ShowroomError};
use crate::host::{EntityHost, EntityId, MediaEvent, MediaHost};
use crate::model::{FeatureEntry, Pose, ProductEntry, ProductId};

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    source: PointerSource,
    last_x: f32,
}

/// Entities of a product's panel that react to clicks
#[derive(Debug, Clone, Default)]
pub struct SessionButtons {
    pub back: Option<EntityId>,
    pub feature_close: Option<EntityId>,
    pub features: Vec<Option<EntityId>>,
    pub colors: Vec<EntityId>,
}

/// Interaction with one product while its panel is open: drag to rotate, the
/// feature gallery and the colour buttons.
pub struct ProductUiSession {
    product: ProductId,
    model: EntityId,
    ui_panel: Option<EntityId>,
    affordance: Option<EntityId>,
    initial_euler: Vec3,
    rotation_speed: f32,
    feature_screen: Option<EntityId>,
    display: Option<EntityId>,
    buttons: SessionButtons,
    features: Vec<FeatureEntry>,

    open: bool,
    detached: bool,
    drag: Option<DragState>,
    current_yaw: f32,
    active_feature: Option<usize>,
    media: MediaSlot,
}

impl ProductUiSession {
    pub fn new(product: ProductId, entry: &ProductEntry, config: &ProductUiConfig, host: &mut dyn EntityHost) -> Self {
        let feature_screen = resolve(host, config.feature_screen.as_deref(), "feature screen", product);
        let display = resolve(host, config.display_area.as_deref(), "display area", product);
        let back = resolve(host, config.back_button.as_deref(), "back button", product);
        let feature_close = resolve(host, config.feature_close_button.as_deref(), "feature close button", product);
        let colors = config
            .color_buttons
            .iter()
            .filter_map(|name| resolve(host, Some(name), "color button", product))
            .collect();

        let features: Vec<FeatureEntry> = config
            .features
            .iter()
            .map(|f| FeatureEntry {
                button: resolve(host, f.button.as_deref(), "feature button", product),
                is_video: f.is_video,
                media: if f.is_video { f.video.clone() } else { f.image.clone() },
                poster: if f.is_video { f.image.clone() } else { None },
            })
            .collect();

        if let Some(screen) = feature_screen {
            host.set_enabled(screen, false);
        }
        info!("product {} UI initialized with {} features", product, features.len());

        Self {
            product,
            model: entry.model,
            ui_panel: entry.ui_panel,
            affordance: entry.affordance,
            initial_euler: entry.initial_euler,
            rotation_speed: config.rotation_speed,
            feature_screen,
            display,
            buttons: SessionButtons {
                back,
                feature_close,
                features: features.iter().map(|f| f.button).collect(),
                colors,
            },
            features,
            open: false,
            detached: false,
            drag: None,
            current_yaw: entry.initial_euler.y,
            active_feature: None,
            media: MediaSlot::new(display),
        }
    }

    pub fn product(&self) -> ProductId {
        self.product
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn current_yaw(&self) -> f32 {
        self.current_yaw
    }

    pub fn active_feature(&self) -> Option<usize> {
        self.active_feature
    }

    pub fn features(&self) -> &[FeatureEntry] {
        &self.features
    }

    pub fn buttons(&self) -> &SessionButtons {
        &self.buttons
    }

    pub fn panel(&self) -> Option<EntityId> {
        self.ui_panel
    }

    pub fn feature_screen(&self) -> Option<EntityId> {
        self.feature_screen
    }

    pub fn display(&self) -> Option<EntityId> {
        self.display
    }

    pub fn media(&self) -> &MediaSlot {
        &self.media
    }

    /// Take over the product: lock the camera and glide to the focus point
    pub fn open(&mut self, focus: Option<Pose>, motion: &mut CameraController, host: &mut dyn EntityHost) {
        info!("opening UI for product {}", self.product);
        if let Some(button) = self.affordance {
            host.set_enabled(button, false);
        }
        host.set_euler(self.model, self.initial_euler);
        self.current_yaw = self.initial_euler.y;

        motion.lock();
        if let Some(focus) = focus {
            motion.focus_move(Target::Adhoc(focus), host);
        }
        if let Some(panel) = self.ui_panel {
            host.set_enabled(panel, true);
        }
        self.open = true;
        self.detached = false;
    }

    pub fn pointer_down(&mut self, source: PointerSource, x: f32, host: &dyn EntityHost) -> bool {
        if !self.open || self.detached || self.drag.is_some() {
            return false;
        }
        self.current_yaw = host.euler(self.model).y;
        self.drag = Some(DragState { source, last_x: x });
        debug!(?source, "drag started on product {}", self.product);
        true
    }

    pub fn pointer_move(&mut self, source: PointerSource, x: f32, host: &mut dyn EntityHost) {
        let Some(drag) = self.drag.as_mut().filter(|d| d.source == source) else { return };
        let delta = x - drag.last_x;
        drag.last_x = x;
        self.current_yaw += delta * self.rotation_speed * 0.1;
        host.set_euler(
            self.model,
            Vec3::new(self.initial_euler.x, self.current_yaw, self.initial_euler.z),
        );
    }

    pub fn pointer_up(&mut self, source: PointerSource) {
        if self.drag.map(|d| d.source) == Some(source) {
            self.drag = None;
        }
    }

    /// Show feature `index` on the display. Malformed feature data is
    /// rejected before anything on screen changes.
    pub fn select_feature(&mut self, index: usize, media: &mut dyn MediaHost, host: &mut dyn EntityHost) -> Result<()> {
        if !self.open || self.detached {
            debug!("product {} UI is not open, feature {} ignored", self.product, index);
            return Ok(());
        }
        let malformed = |reason| ShowroomError::MalformedFeature { product: self.product.0, index, reason };
        let feature = self.features.get(index).ok_or_else(|| malformed("no such feature"))?;
        let url = match (&feature.media, feature.is_video) {
            (Some(url), _) => url.clone(),
            (None, true) => return Err(malformed("video feature has no video url")),
            (None, false) => return Err(malformed("image feature has no image url")),
        };
        let is_video = feature.is_video;
        let poster = feature.poster.clone();

        info!("product {} showing feature {}", self.product, index);
        if let Some(screen) = self.feature_screen {
            host.set_enabled(screen, true);
        }
        self.active_feature = Some(index);

        if is_video {
            self.media.show_video(&url, poster.as_deref(), media)?;
        } else {
            self.media.show_image(&url, media);
        }
        Ok(())
    }

    pub fn close_feature(&mut self, media: &mut dyn MediaHost, host: &mut dyn EntityHost) {
        if !self.open {
            return;
        }
        if let Some(screen) = self.feature_screen {
            host.set_enabled(screen, false);
        }
        self.media.teardown(media);
        self.media.clear(media);
        self.active_feature = None;
    }

    /// Hand the product back: unlock the camera, return to the waypoint and
    /// announce that the product may spin again.
    pub fn close(
        &mut self,
        motion: &mut CameraController,
        bus: &mut EventBus,
        media: &mut dyn MediaHost,
        host: &mut dyn EntityHost,
    ) {
        if !self.open {
            debug!("product {} UI already closed", self.product);
            return;
        }
        info!("closing UI for product {}", self.product);
        self.close_feature(media, host);
        if let Some(panel) = self.ui_panel {
            host.set_enabled(panel, false);
        }
        host.set_euler(self.model, Vec3::ZERO);
        if let Some(button) = self.affordance {
            host.set_enabled(button, true);
        }

        motion.unlock();
        motion.return_to_waypoint(host);
        self.drag = None;
        self.open = false;
        bus.publish(ShowroomEvent::ResumeRotation(self.product));
    }

    pub fn color_selected(&self, index: usize) {
        if index < self.buttons.colors.len() {
            info!("product {} color {} selected", self.product, index);
        } else {
            warn!("product {} has no color {}", self.product, index);
        }
    }

    pub fn on_media_event(&mut self, event: &MediaEvent, media: &mut dyn MediaHost) -> bool {
        self.media.on_event(event, media)
    }

    pub fn on_user_gesture(&mut self, media: &mut dyn MediaHost) {
        self.media.on_user_gesture(media);
    }

    pub fn tick(&mut self, media: &mut dyn MediaHost) {
        self.media.upload(media);
    }

    /// Stop listening to pointers and force playback down. Safe to repeat.
    pub fn teardown(&mut self, media: &mut dyn MediaHost) {
        self.drag = None;
        self.detached = true;
        self.media.teardown(media);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeatureConfig, MotionConfig};
    use crate::controller::media::recording::{Call, RecordingMedia};
    use crate::host::{EmissiveBinding, SurfaceId};
    use crate::model::{Entity, Scene};

    struct Fixture {
        scene: Scene,
        motion: CameraController,
        session: ProductUiSession,
        media: RecordingMedia,
        bus: EventBus,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let camera = scene.spawn(Entity::new("camera"));
        let mut model = Entity::new("chair");
        model.local_euler = Vec3::new(10.0, 30.0, 0.0);
        let model = scene.spawn(model);
        let panel = scene.spawn(Entity::new("panel"));
        let tap = scene.spawn(Entity::new("tap"));
        for name in ["screen", "display", "back", "close", "f0", "f1", "f2", "red"] {
            scene.spawn(Entity::new(name));
        }

        let entry = ProductEntry {
            model,
            focus: None,
            ui_panel: Some(panel),
            affordance: Some(tap),
            affordance_anchor: None,
            initial_euler: Vec3::new(10.0, 30.0, 0.0),
            is_rotating: false,
        };
        let config = ProductUiConfig {
            rotation_speed: 2.0,
            feature_screen: Some("screen".into()),
            display_area: Some("display".into()),
            back_button: Some("back".into()),
            feature_close_button: Some("close".into()),
            color_buttons: vec!["red".into()],
            features: vec![
                FeatureConfig { button: Some("f0".into()), is_video: true, video: Some("a.mp4".into()), image: None },
                FeatureConfig { button: Some("f1".into()), is_video: false, video: None, image: Some("b.png".into()) },
                FeatureConfig { button: Some("f2".into()), is_video: true, video: None, image: Some("c.png".into()) },
            ],
        };
        let waypoints = vec![Pose::new(Vec3::new(0.0, 1.0, 4.0), Vec3::ZERO)];
        let motion = CameraController::new(camera, waypoints, &MotionConfig::default(), &mut scene);
        let session = ProductUiSession::new(ProductId(0), &entry, &config, &mut scene);
        Fixture { scene, motion, session, media: RecordingMedia::default(), bus: EventBus::new() }
    }

    fn open(f: &mut Fixture) {
        let focus = Pose::new(Vec3::new(0.0, 1.0, 2.0), Vec3::ZERO);
        f.session.open(Some(focus), &mut f.motion, &mut f.scene);
    }

    fn display(f: &Fixture) -> EntityId {
        f.session.display().unwrap()
    }

    #[test]
    fn test_open_locks_camera_and_shows_panel() {
        let mut f = fixture();
        open(&mut f);
        assert!(f.session.is_open());
        assert!(f.motion.is_locked());
        assert!(f.motion.is_moving());
        assert!(f.scene.is_enabled(f.scene.find("panel").unwrap()));
        assert!(!f.scene.is_enabled(f.scene.find("tap").unwrap()));
        assert!(!f.scene.is_enabled(f.scene.find("screen").unwrap()));
    }

    #[test]
    fn test_drag_rotates_about_yaw_only() {
        let mut f = fixture();
        let model = f.scene.find("chair").unwrap();

        assert!(!f.session.pointer_down(PointerSource::Mouse, 100.0, &f.scene), "closed session ignores drags");
        open(&mut f);
        assert!(f.session.pointer_down(PointerSource::Touch(3), 100.0, &f.scene));
        assert!(!f.session.pointer_down(PointerSource::Mouse, 0.0, &f.scene), "one drag at a time");

        f.session.pointer_move(PointerSource::Mouse, 500.0, &mut f.scene);
        assert_eq!(f.scene.euler(model).y, 30.0);

        f.session.pointer_move(PointerSource::Touch(3), 150.0, &mut f.scene);
        let euler = f.scene.euler(model);
        assert!((euler.y - 40.0).abs() < 1e-4);
        assert_eq!(euler.x, 10.0);
        assert_eq!(euler.z, 0.0);

        f.session.pointer_up(PointerSource::Touch(3));
        assert!(!f.session.is_dragging());
    }

    #[test]
    fn test_closed_session_ignores_feature_buttons() {
        let mut f = fixture();
        f.session.select_feature(0, &mut f.media, &mut f.scene).unwrap();
        f.session.close_feature(&mut f.media, &mut f.scene);
        assert_eq!(f.session.active_feature(), None);
        assert_eq!(f.session.media().current(), None);
        assert!(!f.scene.is_enabled(f.scene.find("screen").unwrap()));
        assert!(f.media.calls.is_empty());
    }

    #[test]
    fn test_malformed_feature_leaves_screen_alone() {
        let mut f = fixture();
        open(&mut f);
        let err = f.session.select_feature(2, &mut f.media, &mut f.scene).unwrap_err();
        assert!(matches!(err, ShowroomError::MalformedFeature { index: 2, .. }));
        assert!(f.session.select_feature(9, &mut f.media, &mut f.scene).is_err());
        assert!(!f.scene.is_enabled(f.scene.find("screen").unwrap()));
        assert!(f.media.calls.is_empty());
    }

    #[test]
    fn test_video_then_image_ignores_stale_readiness() {
        let mut f = fixture();
        open(&mut f);
        f.session.select_feature(0, &mut f.media, &mut f.scene).unwrap();
        let video = f.session.media().current().unwrap();
        f.session.select_feature(1, &mut f.media, &mut f.scene).unwrap();

        assert!(!f.session.on_media_event(&MediaEvent::Ready(video), &mut f.media));
        assert_eq!(
            f.media.bindings.get(&display(&f)),
            Some(&EmissiveBinding::Image("b.png".into()))
        );
        assert!(!f.media.alive.contains(&video));
        assert_eq!(f.session.active_feature(), Some(1));
    }

    #[test]
    fn test_close_restores_everything_and_publishes_resume() {
        let mut f = fixture();
        open(&mut f);
        f.session.select_feature(0, &mut f.media, &mut f.scene).unwrap();
        let video = f.session.media().current().unwrap();
        f.session.on_media_event(&MediaEvent::Ready(video), &mut f.media);

        f.session.close(&mut f.motion, &mut f.bus, &mut f.media, &mut f.scene);

        assert!(!f.session.is_open());
        assert!(!f.motion.is_locked());
        assert_eq!(f.motion.state().target, Some(Target::Fixed(0)));
        assert!(f.media.bindings.is_empty());
        assert!(!f.media.alive.contains(&video));
        assert!(!f.scene.is_enabled(f.scene.find("panel").unwrap()));
        assert!(f.scene.is_enabled(f.scene.find("tap").unwrap()));
        assert_eq!(f.scene.euler(f.scene.find("chair").unwrap()), Vec3::ZERO);
        assert_eq!(f.bus.pop(), Some(ShowroomEvent::ResumeRotation(ProductId(0))));
        assert!(f.bus.is_empty());
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut f = fixture();
        f.session.teardown(&mut f.media);
        assert!(f.media.calls.is_empty());

        open(&mut f);
        f.session.select_feature(0, &mut f.media, &mut f.scene).unwrap();
        f.session.pointer_down(PointerSource::Mouse, 0.0, &f.scene);
        f.session.teardown(&mut f.media);
        f.session.teardown(&mut f.media);

        assert!(!f.session.is_dragging());
        assert_eq!(f.media.count(|c| *c == Call::Release(SurfaceId(1))), 1);
        assert!(!f.session.pointer_down(PointerSource::Mouse, 0.0, &f.scene));
    }
}
