// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-backed scene graph of renderable surface entities.
//!
//! The [`Scene`] owns every entity the session derives: wall and occlusion
//! surfaces, marker spheres, and the group nodes they hang from. Entities
//! live in a slot map with generational keys, so a key held after its
//! entity was detached simply stops resolving.
//!
//! Rendering is not done here. A [`SceneObserver`] receives every attach,
//! detach, enable and material change and forwards it to whatever backend
//! draws the scene.

use std::fmt;
use std::sync::{Arc, Mutex};

use room_designer_geometry::{Mesh, Pose};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key for an entity in the scene arena.
    pub struct EntityKey;
}

/// Linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Material descriptor handed to the render backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Flat color without lighting; translucent when `color.a < 1`
    Unlit { color: Color },
    /// Invisible, but writes depth so real-world surfaces hide virtual content
    Occlusion,
}

/// What an entity draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Draws nothing; parent for other entities
    Group,
    Mesh(Arc<Mesh>),
    Sphere { radius: f32 },
}

/// A named renderable object.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEntity {
    pub name: String,
    pub shape: Shape,
    pub material: Option<Material>,
    /// Local to world (entities are positioned in world space)
    pub pose: Pose,
    pub enabled: bool,
}

impl SurfaceEntity {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Group,
            material: None,
            pose: Pose::identity(),
            enabled: true,
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh, material: Material, pose: Pose) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Mesh(Arc::new(mesh)),
            material: Some(material),
            pose,
            enabled: true,
        }
    }

    pub fn sphere(name: impl Into<String>, radius: f32, material: Material, pose: Pose) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Sphere { radius },
            material: Some(material),
            pose,
            enabled: true,
        }
    }
}

/// Change notification emitted by the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Attached { key: EntityKey, parent: EntityKey, name: String },
    Detached { key: EntityKey, name: String },
    EnabledChanged { key: EntityKey, enabled: bool },
    MaterialChanged { key: EntityKey, material: Material },
}

/// Receives scene changes, typically to mirror them into a renderer.
pub trait SceneObserver: Send {
    fn on_event(&mut self, event: &SceneEvent);
}

/// Observer that records every event; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct SceneLog {
    events: Arc<Mutex<Vec<SceneEvent>>>,
}

impl SceneLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events recorded so far.
    pub fn events(&self) -> Vec<SceneEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of detach events for `key`.
    pub fn detach_count(&self, key: EntityKey) -> usize {
        self.events
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|e| matches!(e, SceneEvent::Detached { key: k, .. } if *k == key))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl SceneObserver for SceneLog {
    fn on_event(&mut self, event: &SceneEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[derive(Debug)]
struct Node {
    entity: SurfaceEntity,
    parent: Option<EntityKey>,
    children: Vec<EntityKey>,
}

/// Owner of every derived entity.
pub struct Scene {
    nodes: SlotMap<EntityKey, Node>,
    root: EntityKey,
    observer: Option<Box<dyn SceneObserver>>,
}

impl Scene {
    /// Scene containing only the root group.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            entity: SurfaceEntity::group("Root"),
            parent: None,
            children: Vec::new(),
        });
        Self {
            nodes,
            root,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn SceneObserver>) {
        self.observer = Some(observer);
    }

    pub fn root(&self) -> EntityKey {
        self.root
    }

    /// Attach `entity` under `parent`. A stale parent key falls back to the root.
    pub fn attach(&mut self, parent: EntityKey, entity: SurfaceEntity) -> EntityKey {
        let parent = if self.nodes.contains_key(parent) {
            parent
        } else {
            tracing::warn!(name = %entity.name, "Attach parent no longer exists, using scene root");
            self.root
        };

        let name = entity.name.clone();
        let key = self.nodes.insert(Node {
            entity,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(key);
        }

        self.emit(SceneEvent::Attached { key, parent, name });
        key
    }

    /// Detach and drop an entity and everything below it.
    ///
    /// Each removed entity produces exactly one `Detached` event, children
    /// before parents. Returns the entity itself; `None` for the root or a
    /// stale key.
    pub fn detach(&mut self, key: EntityKey) -> Option<SurfaceEntity> {
        if key == self.root || !self.nodes.contains_key(key) {
            return None;
        }

        let parent = self.nodes.get(key).and_then(|n| n.parent);
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.children.retain(|&c| c != key);
        }

        self.remove_subtree(key)
    }

    fn remove_subtree(&mut self, key: EntityKey) -> Option<SurfaceEntity> {
        let children = self.nodes.get(key).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            self.remove_subtree(child);
        }

        let node = self.nodes.remove(key)?;
        self.emit(SceneEvent::Detached {
            key,
            name: node.entity.name.clone(),
        });
        Some(node.entity)
    }

    /// Set the enabled flag. Emits only on an actual change.
    pub fn set_enabled(&mut self, key: EntityKey, enabled: bool) -> bool {
        let changed = match self.nodes.get_mut(key) {
            Some(node) if node.entity.enabled != enabled => {
                node.entity.enabled = enabled;
                true
            }
            _ => false,
        };
        if changed {
            self.emit(SceneEvent::EnabledChanged { key, enabled });
        }
        changed
    }

    /// Swap an entity's material in place.
    pub fn set_material(&mut self, key: EntityKey, material: Material) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) => {
                node.entity.material = Some(material);
                self.emit(SceneEvent::MaterialChanged { key, material });
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: EntityKey) -> Option<&SurfaceEntity> {
        self.nodes.get(key).map(|n| &n.entity)
    }

    pub fn parent(&self, key: EntityKey) -> Option<EntityKey> {
        self.nodes.get(key).and_then(|n| n.parent)
    }

    pub fn children(&self, key: EntityKey) -> &[EntityKey] {
        self.nodes.get(key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether the entity and all its ancestors are enabled.
    pub fn is_visible(&self, key: EntityKey) -> bool {
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            match self.nodes.get(k) {
                Some(node) if node.entity.enabled => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of entities, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn emit(&mut self, event: SceneEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_event(&event);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.nodes.len())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}
