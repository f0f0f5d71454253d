use std::collections::HashMap;

use glam::{Quat, Vec3};
use tracing::warn;

use crate::config::{EntityConfig, ModelConfig};
use crate::error::ConfigError;
use crate::host::{EntityHost, EntityId};
use crate::model::pose::{euler_to_quat, quat_to_euler};

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub parent: Option<EntityId>,
    pub local_position: Vec3,
    pub local_euler: Vec3,
    pub enabled: bool,
    pub clickable: bool,
    pub label: Option<String>,
    pub model: Option<ModelConfig>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            local_position: Vec3::ZERO,
            local_euler: Vec3::ZERO,
            enabled: true,
            clickable: false,
            label: None,
            model: None,
        }
    }
}

/// Flat entity store with parent links. Root entities keep their Euler angles
/// verbatim so a spinning yaw reads back exactly as written; children compose
/// through quaternions.
#[derive(Debug, Default)]
pub struct Scene {
    entities: Vec<Entity>,
    by_name: HashMap<String, EntityId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from declared entities. Declared poses are world-space; parents are
    /// attached afterwards keeping those poses.
    pub fn from_config(entities: &[EntityConfig]) -> Result<Self, ConfigError> {
        let mut scene = Scene::new();
        for cfg in entities {
            if scene.by_name.contains_key(&cfg.name) {
                return Err(ConfigError::DuplicateEntity(cfg.name.clone()));
            }
            scene.spawn(Entity {
                name: cfg.name.clone(),
                parent: None,
                local_position: cfg.position,
                local_euler: cfg.euler,
                enabled: cfg.enabled,
                clickable: cfg.clickable,
                label: cfg.label.clone(),
                model: cfg.model,
            });
        }

        for cfg in entities {
            let Some(parent_name) = &cfg.parent else { continue };
            let parent = scene.find(parent_name).ok_or_else(|| ConfigError::UnknownParent {
                entity: cfg.name.clone(),
                parent: parent_name.clone(),
            })?;
            let child = scene.by_name[&cfg.name];
            if parent == child || scene.is_ancestor(child, parent) {
                return Err(ConfigError::ParentCycle(cfg.name.clone()));
            }
            scene.reparent(child, Some(parent));
        }
        Ok(scene)
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        self.by_name.insert(entity.name.clone(), id);
        self.entities.push(entity);
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().enumerate().map(|(i, e)| (EntityId(i), e))
    }

    pub fn label(&self, id: EntityId) -> &str {
        self.entity(id)
            .and_then(|e| e.label.as_deref().or(Some(e.name.as_str())))
            .unwrap_or("")
    }

    /// Enabled itself and through every ancestor
    fn is_ancestor(&self, ancestor: EntityId, of: EntityId) -> bool {
        let mut current = self.entity(of).and_then(|e| e.parent);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.entity(c).and_then(|e| e.parent);
        }
        false
    }

    pub fn world_rotation(&self, id: EntityId) -> Quat {
        match self.entity(id) {
            Some(e) => {
                let local = euler_to_quat(e.local_euler);
                match e.parent {
                    Some(p) => self.world_rotation(p) * local,
                    None => local,
                }
            }
            None => Quat::IDENTITY,
        }
    }

    fn parent_frame(&self, id: EntityId) -> (Vec3, Quat) {
        match self.entity(id).and_then(|e| e.parent) {
            Some(p) => (self.position(p), self.world_rotation(p)),
            None => (Vec3::ZERO, Quat::IDENTITY),
        }
    }
}

impl EntityHost for Scene {
    fn find(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    fn is_clickable(&self, id: EntityId) -> bool {
        self.entity(id).map(|e| e.clickable).unwrap_or(false)
    }

    fn position(&self, id: EntityId) -> Vec3 {
        let Some(e) = self.entity(id) else { return Vec3::ZERO };
        match e.parent {
            Some(p) => self.position(p) + self.world_rotation(p) * e.local_position,
            None => e.local_position,
        }
    }

    fn set_position(&mut self, id: EntityId, position: Vec3) {
        let (origin, rotation) = self.parent_frame(id);
        if let Some(e) = self.entities.get_mut(id.0) {
            e.local_position = rotation.inverse() * (position - origin);
        }
    }

    fn euler(&self, id: EntityId) -> Vec3 {
        let Some(e) = self.entity(id) else { return Vec3::ZERO };
        match e.parent {
            Some(_) => quat_to_euler(self.world_rotation(id)),
            None => e.local_euler,
        }
    }

    fn set_euler(&mut self, id: EntityId, euler: Vec3) {
        let parent = self.entity(id).and_then(|e| e.parent);
        let local = match parent {
            Some(p) => quat_to_euler(self.world_rotation(p).inverse() * euler_to_quat(euler)),
            None => euler,
        };
        if let Some(e) = self.entities.get_mut(id.0) {
            e.local_euler = local;
        }
    }

    fn local_euler(&self, id: EntityId) -> Vec3 {
        self.entity(id).map(|e| e.local_euler).unwrap_or(Vec3::ZERO)
    }

    fn set_local_euler(&mut self, id: EntityId, euler: Vec3) {
        if let Some(e) = self.entities.get_mut(id.0) {
            e.local_euler = euler;
        }
    }

    fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.entity(id).and_then(|e| e.parent)
    }

    fn reparent(&mut self, id: EntityId, parent: Option<EntityId>) {
        if self.entity(id).is_none() || parent == Some(id) {
            return;
        }
        if let Some(p) = parent {
            if self.is_ancestor(id, p) {
                warn!(?id, ?p, "refusing to parent an entity under its own descendant");
                return;
            }
        }
        let position = self.position(id);
        let euler = self.euler(id);
        if let Some(e) = self.entities.get_mut(id.0) {
            e.parent = parent;
        }
        self.set_position(id, position);
        self.set_euler(id, euler);
    }

    fn is_enabled(&self, id: EntityId) -> bool {
        self.entity(id).map(|e| e.enabled).unwrap_or(false)
    }

    fn set_enabled(&mut self, id: EntityId, enabled: bool) {
        if let Some(e) = self.entities.get_mut(id.0) {
            e.enabled = enabled;
        }
    }

    fn is_enabled_in_hierarchy(&self, id: EntityId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.entity(c) {
                Some(e) if e.enabled => current = e.parent,
                _ => return false,
            }
        }
        true
    }
}
