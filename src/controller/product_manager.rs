use std::collections::BTreeMap;

use glam::Vec3;
use tracing::{debug, error, info, warn};

use crate::config::{ProductConfig, RotationConfig};
use crate::controller::camera_controller::{CameraController, Target};
use crate::host::{EntityHost, EntityId};
use crate::model::pose::wrap_degrees;
use crate::model::{Pose, ProductEntry, ProductId};

/// Auto-rotates products, stops them when the camera comes near or arrives at
/// their waypoint, and manages the "tap to experience" affordances.
pub struct ProductManager {
    entries: BTreeMap<ProductId, ProductEntry>,
    pub proximity_threshold: f32,
    pub auto_rotate_speed: f32,
}

/// Resolve an optional entity name, warning when it is set but unknown
pub(crate) fn resolve(host: &dyn EntityHost, name: Option<&str>, what: &str, product: ProductId) -> Option<EntityId> {
    let name = name?;
    let found = host.find(name);
    if found.is_none() {
        warn!("product {}: {} `{}` not found", product, what, name);
    }
    found
}

impl ProductManager {
    pub fn new(products: &[ProductConfig], rotation: &RotationConfig, host: &mut dyn EntityHost) -> Self {
        let mut entries = BTreeMap::new();

        for (index, cfg) in products.iter().enumerate() {
            let id = ProductId(index);
            let Some(model) = resolve(host, cfg.model.as_deref(), "model", id) else {
                warn!("product not found for config {}, skipping", index);
                continue;
            };
            let focus = resolve(host, cfg.focus.as_deref(), "focus point", id);
            let ui_panel = resolve(host, cfg.panel.as_deref(), "UI panel", id);
            let affordance = resolve(host, cfg.affordance.as_deref(), "tap to experience", id);

            // UI hangs off the scene root so it does not inherit the spin
            if let Some(panel) = ui_panel {
                host.reparent(panel, None);
                host.set_enabled(panel, false);
                host.set_local_euler(panel, Vec3::ZERO);
            }
            let affordance_anchor = affordance.and_then(|a| host.parent(a));
            if let Some(anchor) = affordance_anchor {
                host.reparent(anchor, None);
                host.set_local_euler(anchor, Vec3::ZERO);
            }
            if let Some(button) = affordance {
                host.set_enabled(button, false);
                if !host.is_clickable(button) {
                    error!("tap to experience button {} missing clickable element", index);
                }
            }

            let initial_euler = host.euler(model);
            info!(
                "product {} at {:?}, initial rotation {:?}, rotating",
                index,
                host.position(model),
                initial_euler
            );

            entries.insert(
                id,
                ProductEntry {
                    model,
                    focus,
                    ui_panel,
                    affordance,
                    affordance_anchor,
                    initial_euler,
                    is_rotating: true,
                },
            );
        }

        Self {
            entries,
            proximity_threshold: rotation.proximity_threshold,
            auto_rotate_speed: rotation.auto_rotate_speed,
        }
    }

    pub fn entry(&self, id: ProductId) -> Option<&ProductEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (ProductId, &ProductEntry)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    pub fn ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_rotating(&self, id: ProductId) -> bool {
        self.entries.get(&id).map(|e| e.is_rotating).unwrap_or(false)
    }

    /// Spin rotating products and stop the ones the camera is near
    pub fn tick(&mut self, dt: f32, camera_position: Vec3, host: &mut dyn EntityHost) {
        for entry in self.entries.values_mut().filter(|e| e.is_rotating) {
            let mut euler = host.euler(entry.model);
            euler.y = wrap_degrees(euler.y + self.auto_rotate_speed * dt);
            host.set_euler(entry.model, euler);

            let counter = Vec3::new(0.0, -euler.y, 0.0);
            if let Some(panel) = entry.ui_panel {
                host.set_local_euler(panel, counter);
            }
            if let Some(anchor) = entry.affordance_anchor {
                host.set_local_euler(anchor, counter);
            }
        }

        for (id, entry) in self.entries.iter_mut() {
            if !entry.is_rotating {
                continue;
            }
            let distance = camera_position.distance(host.position(entry.model));
            if distance < self.proximity_threshold {
                info!("camera near product {} ({:.2}), stopping rotation", id, distance);
                stop(entry, host);
                if let Some(button) = entry.affordance {
                    host.set_enabled(button, true);
                }
            }
        }
    }

    /// Stop spinning and snap back to the initial orientation
    pub fn stop_rotation(&mut self, id: ProductId, host: &mut dyn EntityHost) {
        if let Some(entry) = self.entries.get_mut(&id) {
            stop(entry, host);
        }
    }

    /// Hand a product back to auto-rotation after its UI closed
    pub fn resume_rotation(&mut self, id: ProductId, host: &mut dyn EntityHost) {
        let Some(entry) = self.entries.get_mut(&id) else {
            debug!("resume for unknown product {}", id);
            return;
        };
        info!("restarting rotation of product {}", id);
        entry.is_rotating = true;
        host.set_enabled(entry.model, true);
        if let Some(panel) = entry.ui_panel {
            host.set_enabled(panel, false);
        }
        if let Some(button) = entry.affordance {
            host.set_enabled(button, true);
        }
    }

    /// Camera arrival: everything spins except the product at `index`, which
    /// becomes the only one ready to tap.
    pub fn on_waypoint_reached(&mut self, index: usize, host: &mut dyn EntityHost) {
        info!("camera reached waypoint {}", index);
        for entry in self.entries.values_mut() {
            entry.is_rotating = true;
            if let Some(button) = entry.affordance {
                host.set_enabled(button, false);
            }
        }

        if let Some(entry) = self.entries.get_mut(&ProductId(index)) {
            stop(entry, host);
            if let Some(button) = entry.affordance {
                host.set_enabled(button, true);
                debug!("enabled tap to experience for waypoint {}", index);
            }
        }
    }

    /// Stop the product, start the camera towards its focus point and reveal
    /// its panel. Returns the focus pose so the UI session can take over.
    pub fn on_affordance_tapped(
        &mut self,
        id: ProductId,
        motion: &mut CameraController,
        host: &mut dyn EntityHost,
    ) -> Option<Pose> {
        let entry = self.entries.get_mut(&id)?;
        info!("tap to experience for product {}", id);
        stop(entry, host);

        let focus = match entry.focus {
            Some(focus) => {
                let pose = Pose::new(host.position(focus), host.euler(focus));
                motion.move_to(Target::Adhoc(pose), host);
                Some(pose)
            }
            None => {
                warn!("product {} has no focus point, camera stays", id);
                None
            }
        };

        if let Some(panel) = entry.ui_panel {
            host.set_enabled(panel, true);
            let yaw = host.euler(entry.model).y;
            host.set_local_euler(panel, Vec3::new(0.0, -yaw, 0.0));
        }
        if let Some(button) = entry.affordance {
            host.set_enabled(button, false);
        }
        focus
    }
}

fn stop(entry: &mut ProductEntry, host: &mut dyn EntityHost) {
    entry.is_rotating = false;
    host.set_euler(entry.model, entry.initial_euler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotionConfig;
    use crate::model::{Entity, Scene};

    struct Fixture {
        scene: Scene,
        manager: ProductManager,
        motion: CameraController,
    }

    /// Products at x = 0, 10, 20; waypoints 4 units in front of each
    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let camera = scene.spawn(Entity::new("camera"));
        let mut products = Vec::new();
        let mut waypoints = Vec::new();
        for i in 0..3 {
            let x = i as f32 * 10.0;
            let mut model = Entity::new(format!("p{}", i));
            model.local_position = Vec3::new(x, 0.0, 0.0);
            model.local_euler = Vec3::new(5.0, 10.0 * i as f32, 0.0);
            scene.spawn(model);

            let mut focus = Entity::new(format!("p{}_focus", i));
            focus.local_position = Vec3::new(x, 0.0, 2.0);
            scene.spawn(focus);
            scene.spawn(Entity::new(format!("p{}_panel", i)));
            let anchor = scene.spawn(Entity::new(format!("p{}_anchor", i)));
            let mut tap = Entity::new(format!("p{}_tap", i));
            tap.parent = Some(anchor);
            tap.clickable = true;
            scene.spawn(tap);

            products.push(ProductConfig {
                model: Some(format!("p{}", i)),
                focus: Some(format!("p{}_focus", i)),
                panel: Some(format!("p{}_panel", i)),
                affordance: Some(format!("p{}_tap", i)),
                ui: None,
            });
            waypoints.push(Pose::new(Vec3::new(x, 0.0, 4.0), Vec3::ZERO));
        }
        let manager = ProductManager::new(&products, &RotationConfig::default(), &mut scene);
        let motion = CameraController::new(camera, waypoints, &MotionConfig::default(), &mut scene);
        Fixture { scene, manager, motion }
    }

    fn affordance_visible(f: &Fixture, id: usize) -> bool {
        let button = f.manager.entry(ProductId(id)).unwrap().affordance.unwrap();
        f.scene.is_enabled(button)
    }

    #[test]
    fn test_setup_hides_ui_and_captures_initial_rotation() {
        let f = fixture();
        for (id, entry) in f.manager.entries() {
            assert!(entry.is_rotating);
            assert!(!f.scene.is_enabled(entry.ui_panel.unwrap()));
            assert!(!f.scene.is_enabled(entry.affordance.unwrap()));
            assert_eq!(entry.initial_euler, Vec3::new(5.0, 10.0 * id.0 as f32, 0.0));
            assert_eq!(entry.affordance_anchor, f.scene.parent(entry.affordance.unwrap()));
        }
    }

    #[test]
    fn test_missing_model_is_skipped() {
        let mut scene = Scene::new();
        let products = vec![ProductConfig { model: Some("ghost".into()), ..ProductConfig::default() }];
        let manager = ProductManager::new(&products, &RotationConfig::default(), &mut scene);
        assert_eq!(manager.entries().count(), 0);
    }

    #[test]
    fn test_tick_spins_and_counter_rotates_ui() {
        let mut f = fixture();
        let far = Vec3::new(0.0, 100.0, 0.0);
        f.manager.tick(0.5, far, &mut f.scene);

        let entry = f.manager.entry(ProductId(1)).unwrap().clone();
        let yaw = f.scene.euler(entry.model).y;
        assert!((yaw - 55.0).abs() < 1e-4);
        assert_eq!(f.scene.local_euler(entry.ui_panel.unwrap()), Vec3::new(0.0, -yaw, 0.0));
        assert_eq!(f.scene.local_euler(entry.affordance_anchor.unwrap()), Vec3::new(0.0, -yaw, 0.0));

        f.manager.tick(4.0, far, &mut f.scene);
        let yaw = f.scene.euler(entry.model).y;
        assert!(yaw >= 0.0 && yaw < 360.0);
    }

    #[test]
    fn test_stop_then_resume_keeps_initial_orientation() {
        let mut f = fixture();
        let id = ProductId(2);
        let initial = f.manager.entry(id).unwrap().initial_euler;
        f.manager.tick(0.3, Vec3::splat(1000.0), &mut f.scene);

        f.manager.stop_rotation(id, &mut f.scene);
        assert!(!f.manager.is_rotating(id));
        assert_eq!(f.scene.euler(f.manager.entry(id).unwrap().model), initial);

        f.manager.resume_rotation(id, &mut f.scene);
        assert!(f.manager.is_rotating(id));
        assert_eq!(f.manager.entry(id).unwrap().initial_euler, initial);
        assert!(affordance_visible(&f, 2));
    }

    #[test]
    fn test_proximity_threshold_is_strict_and_stops_once() {
        let mut f = fixture();
        let model = f.manager.entry(ProductId(0)).unwrap().model;

        // Exactly at the threshold: keeps spinning
        f.manager.tick(0.0, Vec3::new(0.0, 0.0, 5.0), &mut f.scene);
        assert!(f.manager.is_rotating(ProductId(0)));
        assert!(!affordance_visible(&f, 0));

        // One unit closer: stopped
        f.manager.tick(0.0, Vec3::new(0.0, 0.0, 4.0), &mut f.scene);
        assert!(!f.manager.is_rotating(ProductId(0)));
        assert!(affordance_visible(&f, 0));

        // Already stopped: no second snap
        f.scene.set_euler(model, Vec3::new(0.0, 123.0, 0.0));
        f.manager.tick(0.1, Vec3::new(0.0, 0.0, 4.0), &mut f.scene);
        assert_eq!(f.scene.euler(model).y, 123.0);
    }

    #[test]
    fn test_waypoint_reached_singles_out_one_product() {
        let mut f = fixture();
        f.manager.stop_rotation(ProductId(0), &mut f.scene);
        f.manager.on_waypoint_reached(1, &mut f.scene);

        assert!(f.manager.is_rotating(ProductId(0)));
        assert!(!f.manager.is_rotating(ProductId(1)));
        assert!(f.manager.is_rotating(ProductId(2)));
        assert_eq!(
            (0..3).filter(|i| affordance_visible(&f, *i)).collect::<Vec<_>>(),
            vec![1]
        );
    }

    #[test]
    fn test_affordance_tap_moves_camera_and_reveals_panel() {
        let mut f = fixture();
        let id = ProductId(0);
        f.manager.on_waypoint_reached(0, &mut f.scene);

        let focus = f.manager.on_affordance_tapped(id, &mut f.motion, &mut f.scene).unwrap();
        assert_eq!(focus.position, Vec3::new(0.0, 0.0, 2.0));
        assert!(f.motion.is_moving());
        assert_eq!(f.motion.state().target, Some(Target::Adhoc(focus)));

        let entry = f.manager.entry(id).unwrap();
        assert!(!entry.is_rotating);
        assert!(f.scene.is_enabled(entry.ui_panel.unwrap()));
        assert_eq!(
            f.scene.local_euler(entry.ui_panel.unwrap()),
            Vec3::new(0.0, -entry.initial_euler.y, 0.0)
        );
        assert!(!affordance_visible(&f, 0));
    }
}
