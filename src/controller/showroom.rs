use std::collections::{BTreeMap, HashMap};

use tracing::{debug, error, info, warn};

use crate::config::ShowroomConfig;
use crate::controller::bus::{EventBus, ShowroomEvent};
use crate::controller::camera_controller::CameraController;
use crate::controller::input::{InputEvent, InputProcessor, MouseButton, PointerSource};
use crate::controller::product_manager::ProductManager;
use crate::controller::product_ui::ProductUiSession;
use crate::error::ConfigError;
use crate::host::{EntityHost, EntityId, MediaEvent, MediaHost};
use crate::model::{Pose, ProductId};

/// What a click on a clickable entity does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRoute {
    Affordance(ProductId),
    Feature(ProductId, usize),
    Back(ProductId),
    CloseFeature(ProductId),
    Color(ProductId, usize),
}

/// Owns the controllers and wires them together: input routing, per-frame
/// update order and delivery of bus events.
pub struct Showroom {
    motion: CameraController,
    products: ProductManager,
    sessions: BTreeMap<ProductId, ProductUiSession>,
    bus: EventBus,
    input: InputProcessor,
    routes: HashMap<EntityId, ClickRoute>,
}

impl Showroom {
    pub fn new(config: &ShowroomConfig, host: &mut dyn EntityHost) -> Result<Self, ConfigError> {
        let camera = host
            .find(&config.camera)
            .ok_or_else(|| ConfigError::MissingCamera(config.camera.clone()))?;

        let mut waypoints = Vec::with_capacity(config.waypoints.len());
        for name in &config.waypoints {
            match host.find(name) {
                Some(id) => waypoints.push(Pose::new(host.position(id), host.euler(id))),
                None => warn!("waypoint `{}` not found, skipping", name),
            }
        }
        if waypoints.is_empty() {
            return Err(ConfigError::NoWaypoints);
        }

        let motion = CameraController::new(camera, waypoints, &config.motion, host);
        let products = ProductManager::new(&config.products, &config.rotation, host);

        let mut sessions = BTreeMap::new();
        for (id, entry) in products.entries() {
            if let Some(ui) = config.products.get(id.0).and_then(|p| p.ui.as_ref()) {
                sessions.insert(id, ProductUiSession::new(id, entry, ui, host));
            }
        }

        let mut routes = HashMap::new();
        let mut route = |entity: EntityId, target: ClickRoute, host: &dyn EntityHost| {
            if host.is_clickable(entity) {
                routes.insert(entity, target);
            } else {
                warn!(?target, "entity {:?} has no clickable element", entity);
            }
        };
        for (id, entry) in products.entries() {
            // Non-clickable affordances were already reported by the manager
            if let Some(button) = entry.affordance.filter(|b| host.is_clickable(*b)) {
                route(button, ClickRoute::Affordance(id), &*host);
            }
        }
        for (id, session) in &sessions {
            let buttons = session.buttons();
            for (i, button) in buttons.features.iter().enumerate() {
                if let Some(button) = button {
                    route(*button, ClickRoute::Feature(*id, i), &*host);
                }
            }
            if let Some(back) = buttons.back {
                route(back, ClickRoute::Back(*id), &*host);
            }
            if let Some(close) = buttons.feature_close {
                route(close, ClickRoute::CloseFeature(*id), &*host);
            }
            for (i, color) in buttons.colors.iter().enumerate() {
                route(*color, ClickRoute::Color(*id, i), &*host);
            }
        }

        info!(
            "showroom ready: {} waypoints, {} products, {} clickable elements",
            motion.waypoint_count(),
            products.entries().count(),
            routes.len()
        );

        Ok(Self {
            motion,
            products,
            sessions,
            bus: EventBus::new(),
            input: InputProcessor::default(),
            routes,
        })
    }

    pub fn motion(&self) -> &CameraController {
        &self.motion
    }

    pub fn products(&self) -> &ProductManager {
        &self.products
    }

    pub fn session(&self, id: ProductId) -> Option<&ProductUiSession> {
        self.sessions.get(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &ProductUiSession> {
        self.sessions.values()
    }

    pub fn route(&self, entity: EntityId) -> Option<ClickRoute> {
        self.routes.get(&entity).copied()
    }

    pub fn routes(&self) -> impl Iterator<Item = (EntityId, ClickRoute)> + '_ {
        self.routes.iter().map(|(e, r)| (*e, *r))
    }

    pub fn input(&self) -> &InputProcessor {
        &self.input
    }

    /// Observe bus traffic. Listeners run synchronously on publish, before the
    /// controllers see the event.
    pub fn subscribe(&mut self, listener: impl FnMut(&ShowroomEvent) + 'static) {
        self.bus.subscribe(listener);
    }

    /// One frame: media notices, camera motion, product rotation, playback
    /// upload. Bus events are delivered after each stage.
    pub fn update(&mut self, dt: f32, host: &mut dyn EntityHost, media: &mut dyn MediaHost) {
        for event in media.poll_events() {
            let handled = self.sessions.values_mut().any(|s| s.on_media_event(&event, media));
            if !handled {
                if let MediaEvent::Ready(surface) = event {
                    debug!(?surface, "readiness of a replaced surface ignored");
                    media.release(surface);
                }
            }
        }

        if let Some(index) = self.motion.tick(dt, host) {
            self.bus.publish(ShowroomEvent::WaypointReached(index));
        }
        self.dispatch(host);

        let camera_position = host.position(self.motion.camera());
        self.products.tick(dt, camera_position, host);

        for session in self.sessions.values_mut() {
            session.tick(media);
        }
        self.dispatch(host);
    }

    pub fn handle_input(&mut self, event: &InputEvent, host: &mut dyn EntityHost, media: &mut dyn MediaHost) {
        if event.is_gesture() {
            for session in self.sessions.values_mut() {
                session.on_user_gesture(media);
            }
        }

        match event {
            InputEvent::Wheel { delta_y } => {
                if let Some(step) = self.input.step_for_wheel(*delta_y) {
                    self.motion.step(step, host);
                }
            }
            InputEvent::KeyDown(key) => {
                if let Some(step) = self.input.step_for_key(key) {
                    self.motion.step(step, host);
                }
            }
            InputEvent::MouseDown { button: MouseButton::Left, x, .. } => {
                self.pointer_down(PointerSource::Mouse, *x, host);
            }
            InputEvent::MouseMove { x, .. } => self.pointer_move(PointerSource::Mouse, *x, host),
            InputEvent::MouseUp { button: MouseButton::Left, .. } => self.pointer_up(PointerSource::Mouse),
            InputEvent::TouchStart { id, x, .. } => self.pointer_down(PointerSource::Touch(*id), *x, host),
            InputEvent::TouchMove { id, x, .. } => self.pointer_move(PointerSource::Touch(*id), *x, host),
            InputEvent::TouchEnd { id, .. } => self.pointer_up(PointerSource::Touch(*id)),
            InputEvent::Click(entity) => self.click(*entity, host, media),
            InputEvent::FocusLost => {
                for session in self.sessions.values_mut() {
                    session.pointer_up(PointerSource::Mouse);
                }
            }
            _ => {}
        }
        self.dispatch(host);
    }

    /// Tear every session down. Safe to call more than once.
    pub fn teardown(&mut self, media: &mut dyn MediaHost) {
        for session in self.sessions.values_mut() {
            session.teardown(media);
        }
    }

    fn pointer_down(&mut self, source: PointerSource, x: f32, host: &dyn EntityHost) {
        if let Some(session) = self.sessions.values_mut().find(|s| s.is_open()) {
            session.pointer_down(source, x, host);
        }
    }

    fn pointer_move(&mut self, source: PointerSource, x: f32, host: &mut dyn EntityHost) {
        for session in self.sessions.values_mut().filter(|s| s.is_dragging()) {
            session.pointer_move(source, x, host);
        }
    }

    fn pointer_up(&mut self, source: PointerSource) {
        for session in self.sessions.values_mut() {
            session.pointer_up(source);
        }
    }

    fn click(&mut self, entity: EntityId, host: &mut dyn EntityHost, media: &mut dyn MediaHost) {
        let Some(route) = self.route(entity) else {
            debug!("click on {:?} has no handler", entity);
            return;
        };
        if !host.is_enabled_in_hierarchy(entity) {
            debug!(?route, "click on hidden element ignored");
            return;
        }

        match route {
            ClickRoute::Affordance(id) => {
                let focus = self.products.on_affordance_tapped(id, &mut self.motion, host);
                if let Some(session) = self.sessions.get_mut(&id) {
                    session.open(focus, &mut self.motion, host);
                }
            }
            ClickRoute::Feature(id, index) => {
                if let Some(session) = self.sessions.get_mut(&id) {
                    if let Err(e) = session.select_feature(index, media, host) {
                        error!("{}", e);
                    }
                }
            }
            ClickRoute::Back(id) => {
                if let Some(session) = self.sessions.get_mut(&id) {
                    session.close(&mut self.motion, &mut self.bus, media, host);
                }
            }
            ClickRoute::CloseFeature(id) => {
                if let Some(session) = self.sessions.get_mut(&id) {
                    session.close_feature(media, host);
                }
            }
            ClickRoute::Color(id, index) => {
                if let Some(session) = self.sessions.get(&id) {
                    session.color_selected(index);
                }
            }
        }
    }

    fn dispatch(&mut self, host: &mut dyn EntityHost) {
        while let Some(event) = self.bus.pop() {
            match event {
                ShowroomEvent::WaypointReached(index) => self.products.on_waypoint_reached(index, host),
                ShowroomEvent::ResumeRotation(id) => self.products.resume_rotation(id, host),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::media::recording::RecordingMedia;
    use crate::host::EmissiveBinding;
    use crate::model::Scene;

    fn demo() -> (Scene, Showroom, RecordingMedia) {
        let config = ShowroomConfig::demo().unwrap();
        let mut scene = Scene::from_config(&config.entities).unwrap();
        let showroom = Showroom::new(&config, &mut scene).unwrap();
        (scene, showroom, RecordingMedia::default())
    }

    fn settle(scene: &mut Scene, showroom: &mut Showroom, media: &mut RecordingMedia) {
        for _ in 0..600 {
            showroom.update(1.0 / 60.0, scene, media);
        }
    }

    fn affordance(scene: &Scene, product: &str) -> EntityId {
        scene.find(&format!("{}_tap", product)).unwrap()
    }

    #[test]
    fn test_routes_cover_demo_buttons() {
        let (scene, showroom, _) = demo();
        assert_eq!(showroom.route(affordance(&scene, "chair")), Some(ClickRoute::Affordance(ProductId(0))));
        assert_eq!(
            showroom.route(scene.find("lamp_feature_1").unwrap()),
            Some(ClickRoute::Feature(ProductId(1), 1))
        );
        assert_eq!(showroom.route(scene.find("speaker_back").unwrap()), Some(ClickRoute::Back(ProductId(2))));
    }

    #[test]
    fn test_scroll_reaches_next_product() {
        let (mut scene, mut showroom, mut media) = demo();
        showroom.handle_input(&InputEvent::Wheel { delta_y: 0.0 }, &mut scene, &mut media);
        assert!(!showroom.motion().is_moving());

        showroom.handle_input(&InputEvent::Wheel { delta_y: 100.0 }, &mut scene, &mut media);
        assert!(showroom.motion().is_moving());
        settle(&mut scene, &mut showroom, &mut media);

        assert_eq!(showroom.motion().current_index(), 1);
        assert!(!showroom.products().is_rotating(ProductId(1)));
        assert!(showroom.products().is_rotating(ProductId(2)));
        assert!(scene.is_enabled(affordance(&scene, "lamp")));
        assert!(!scene.is_enabled(affordance(&scene, "speaker")));
    }

    #[test]
    fn test_tap_open_video_close() {
        let (mut scene, mut showroom, mut media) = demo();
        settle(&mut scene, &mut showroom, &mut media);
        let tap = affordance(&scene, "chair");
        assert!(scene.is_enabled(tap));

        showroom.handle_input(&InputEvent::Click(tap), &mut scene, &mut media);
        assert!(showroom.motion().is_locked());
        assert!(showroom.session(ProductId(0)).unwrap().is_open());

        // Scrolling is ignored while the panel is open
        showroom.handle_input(&InputEvent::KeyDown("ArrowDown".into()), &mut scene, &mut media);
        settle(&mut scene, &mut showroom, &mut media);
        assert_eq!(showroom.motion().current_index(), 0);
        let focus = scene.find("chair_focus").unwrap();
        assert!((scene.position(showroom.motion().camera()) - scene.position(focus)).length() < 1e-4);

        let video_button = scene.find("chair_feature_1").unwrap();
        showroom.handle_input(&InputEvent::Click(video_button), &mut scene, &mut media);
        let surface = showroom.session(ProductId(0)).unwrap().media().current().unwrap();
        media.push_event(MediaEvent::Ready(surface));
        showroom.update(0.016, &mut scene, &mut media);
        let display = scene.find("chair_display").unwrap();
        assert_eq!(media.bindings.get(&display), Some(&EmissiveBinding::Video(surface)));

        let back = scene.find("chair_back").unwrap();
        showroom.handle_input(&InputEvent::Click(back), &mut scene, &mut media);
        assert!(!showroom.motion().is_locked());
        assert!(showroom.products().is_rotating(ProductId(0)));
        assert!(media.bindings.is_empty());
        assert!(!media.alive.contains(&surface));
    }

    #[test]
    fn test_stale_ready_after_close_is_released() {
        let (mut scene, mut showroom, mut media) = demo();
        settle(&mut scene, &mut showroom, &mut media);
        showroom.handle_input(&InputEvent::Click(affordance(&scene, "chair")), &mut scene, &mut media);
        let video_button = scene.find("chair_feature_1").unwrap();
        showroom.handle_input(&InputEvent::Click(video_button), &mut scene, &mut media);
        let surface = showroom.session(ProductId(0)).unwrap().media().current().unwrap();

        let close = scene.find("chair_feature_close").unwrap();
        showroom.handle_input(&InputEvent::Click(close), &mut scene, &mut media);
        media.push_event(MediaEvent::Ready(surface));
        showroom.update(0.016, &mut scene, &mut media);

        assert!(media.bindings.is_empty());
        showroom.teardown(&mut media);
        showroom.teardown(&mut media);
    }

    #[test]
    fn test_buttons_inside_hidden_panel_ignore_clicks() {
        let (mut scene, mut showroom, mut media) = demo();
        for _ in 0..10 {
            showroom.update(1.0 / 60.0, &mut scene, &mut media);
        }
        let video_button = scene.find("chair_feature_1").unwrap();
        assert!(scene.is_enabled(video_button));
        assert!(!scene.is_enabled_in_hierarchy(video_button));

        showroom.handle_input(&InputEvent::Click(video_button), &mut scene, &mut media);
        let session = showroom.session(ProductId(0)).unwrap();
        assert_eq!(session.active_feature(), None);
        assert_eq!(session.media().current(), None);
        assert!(!scene.is_enabled(scene.find("chair_feature_screen").unwrap()));
        assert!(media.alive.is_empty());
    }

    #[test]
    fn test_subscribers_see_resume_rotation() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let (mut scene, mut showroom, mut media) = demo();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            showroom.subscribe(move |e| seen.borrow_mut().push(*e));
        }
        settle(&mut scene, &mut showroom, &mut media);
        showroom.handle_input(&InputEvent::Click(affordance(&scene, "chair")), &mut scene, &mut media);
        let back = scene.find("chair_back").unwrap();
        showroom.handle_input(&InputEvent::Click(back), &mut scene, &mut media);

        assert_eq!(seen.borrow().last(), Some(&ShowroomEvent::ResumeRotation(ProductId(0))));
    }

    #[test]
    fn test_failed_video_falls_back_to_poster() {
        let (mut scene, mut showroom, mut media) = demo();
        settle(&mut scene, &mut showroom, &mut media);
        showroom.handle_input(&InputEvent::Click(affordance(&scene, "chair")), &mut scene, &mut media);
        let video_button = scene.find("chair_feature_1").unwrap();
        showroom.handle_input(&InputEvent::Click(video_button), &mut scene, &mut media);
        let surface = showroom.session(ProductId(0)).unwrap().media().current().unwrap();

        media.push_event(MediaEvent::LoadFailed(surface, "404".into()));
        showroom.update(0.016, &mut scene, &mut media);

        let display = scene.find("chair_display").unwrap();
        assert_eq!(
            media.bindings.get(&display),
            Some(&EmissiveBinding::Image("assets/media/chair_1.png".into()))
        );
        assert!(!media.alive.contains(&surface));
        assert_eq!(showroom.session(ProductId(0)).unwrap().media().failure(), Some("404"));
    }
}
