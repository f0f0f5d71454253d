use showroom::controller::{InputEvent, MouseButton, Showroom};
use showroom::host::{EmissiveBinding, EntityHost, EntityId};
use showroom::model::{ProductId, Scene};
use showroom::view::{EmissiveSource, NativeMedia};
use showroom::ShowroomConfig;

struct Demo {
    scene: Scene,
    showroom: Showroom,
    media: NativeMedia,
}

impl Demo {
    fn new() -> Self {
        let config = ShowroomConfig::demo().unwrap();
        let mut scene = Scene::from_config(&config.entities).unwrap();
        let showroom = Showroom::new(&config, &mut scene).unwrap();
        Self { scene, showroom, media: NativeMedia::new() }
    }

    fn entity(&self, name: &str) -> EntityId {
        self.scene.find(name).unwrap()
    }

    fn frames(&mut self, count: usize) {
        for _ in 0..count {
            self.media.advance(1.0 / 60.0);
            self.showroom.update(1.0 / 60.0, &mut self.scene, &mut self.media);
        }
    }

    fn send(&mut self, event: InputEvent) {
        self.showroom.handle_input(&event, &mut self.scene, &mut self.media);
    }

    fn click(&mut self, name: &str) {
        let id = self.entity(name);
        self.send(InputEvent::Click(id));
    }
}

#[test]
fn test_arrow_keys_walk_the_waypoints() {
    let mut demo = Demo::new();
    demo.frames(10);
    assert!(demo.showroom.products().is_rotating(ProductId(1)));
    assert!(!demo.showroom.products().is_rotating(ProductId(0)));

    demo.send(InputEvent::KeyDown("ArrowDown".into()));
    demo.frames(600);
    assert_eq!(demo.showroom.motion().current_index(), 1);
    let camera = demo.scene.position(demo.showroom.motion().camera());
    let waypoint = demo.scene.position(demo.entity("waypoint_1"));
    assert!((camera - waypoint).length() < 1e-4);

    demo.send(InputEvent::KeyDown("ArrowDown".into()));
    demo.frames(600);
    demo.send(InputEvent::KeyDown("ArrowDown".into()));
    demo.frames(10);
    assert_eq!(demo.showroom.motion().current_index(), 2);
    assert!(!demo.showroom.motion().is_moving());

    demo.send(InputEvent::KeyDown("ArrowUp".into()));
    demo.frames(600);
    assert_eq!(demo.showroom.motion().current_index(), 1);
}

#[test]
fn test_open_drag_and_play_video() {
    let mut demo = Demo::new();
    demo.frames(10);
    demo.click("chair_tap");
    demo.frames(300);

    let session = demo.showroom.session(ProductId(0)).unwrap();
    assert!(session.is_open());
    assert!(demo.scene.is_enabled(demo.entity("chair_panel")));
    assert!(!demo.scene.is_enabled(demo.entity("chair_tap")));

    // Drag right by 50 px at sensitivity 2.0
    let chair = demo.entity("chair");
    demo.send(InputEvent::MouseDown { button: MouseButton::Left, x: 100.0, y: 300.0 });
    demo.send(InputEvent::MouseMove { x: 150.0, y: 300.0 });
    demo.send(InputEvent::MouseUp { button: MouseButton::Left, x: 150.0, y: 300.0 });
    demo.send(InputEvent::MouseMove { x: 400.0, y: 300.0 });
    assert!((demo.scene.euler(chair).y - 10.0).abs() < 1e-4);

    demo.click("chair_feature_1");
    let surface = demo.showroom.session(ProductId(0)).unwrap().media().current().unwrap();
    let display = demo.entity("chair_display");
    assert_eq!(demo.media.binding(display), None);

    demo.frames(60);
    assert_eq!(demo.media.binding(display), Some(&EmissiveBinding::Video(surface)));
    let video = demo.media.video(surface).unwrap();
    assert!(video.playing);
    assert!(video.frames_uploaded > 0);
    assert!(demo.media.emissive(display).is_some());

    demo.click("chair_back");
    assert!(!demo.showroom.motion().is_locked());
    assert!(demo.showroom.products().is_rotating(ProductId(0)));
    assert_eq!(demo.media.live_surfaces(), 0);
    assert_eq!(demo.media.emissive(display), None);
}

#[test]
fn test_image_replacing_buffered_video_wins() {
    let mut demo = Demo::new();
    demo.frames(10);
    demo.click("chair_tap");
    demo.click("chair_feature_1");

    // Readiness is queued but not yet delivered when the image is chosen
    demo.media.advance(1.0);
    demo.click("chair_feature_2");
    demo.showroom.update(1.0 / 60.0, &mut demo.scene, &mut demo.media);

    let display = demo.entity("chair_display");
    assert_eq!(
        demo.media.binding(display),
        Some(&EmissiveBinding::Image("assets/media/chair_2.png".into()))
    );
    assert_eq!(demo.media.live_surfaces(), 0);
}

#[test]
fn test_refused_autoplay_resumes_on_touch() {
    let mut demo = Demo::new();
    demo.media.autoplay_allowed = false;
    demo.frames(10);
    demo.click("chair_tap");
    demo.click("chair_feature_1");
    demo.frames(60);

    let session = demo.showroom.session(ProductId(0)).unwrap();
    let surface = session.media().current().unwrap();
    assert!(session.media().awaiting_gesture());
    assert!(!demo.media.video(surface).unwrap().playing);

    demo.media.autoplay_allowed = true;
    demo.send(InputEvent::TouchStart { id: 7, x: 10.0, y: 10.0 });
    demo.send(InputEvent::TouchEnd { id: 7, x: 10.0, y: 10.0 });
    assert!(demo.media.video(surface).unwrap().playing);
    assert!(!demo.showroom.session(ProductId(0)).unwrap().media().awaiting_gesture());
}

#[test]
fn test_hidden_buttons_ignore_clicks_and_teardown_repeats() {
    let mut demo = Demo::new();
    demo.frames(10);

    // The lamp's affordance is hidden until the camera reaches it
    demo.click("lamp_tap");
    assert!(!demo.showroom.motion().is_locked());
    assert!(!demo.showroom.session(ProductId(1)).unwrap().is_open());

    demo.click("chair_tap");
    demo.click("chair_feature_1");
    demo.showroom.teardown(&mut demo.media);
    demo.showroom.teardown(&mut demo.media);
    assert_eq!(demo.media.live_surfaces(), 0);

    // A torn down session no longer starts drags
    let chair = demo.entity("chair");
    let before = demo.scene.euler(chair);
    demo.send(InputEvent::MouseDown { button: MouseButton::Left, x: 0.0, y: 0.0 });
    demo.send(InputEvent::MouseMove { x: 200.0, y: 0.0 });
    assert_eq!(demo.scene.euler(chair), before);
}

#[test]
fn test_feature_button_of_closed_product_loads_nothing() {
    let mut demo = Demo::new();
    demo.frames(10);

    demo.click("chair_feature_1");
    demo.frames(60);
    let session = demo.showroom.session(ProductId(0)).unwrap();
    assert_eq!(session.active_feature(), None);
    assert_eq!(session.media().current(), None);
    assert!(!demo.scene.is_enabled(demo.entity("chair_feature_screen")));
    assert_eq!(demo.media.live_surfaces(), 0);
    assert_eq!(demo.media.binding(demo.entity("chair_display")), None);
}
