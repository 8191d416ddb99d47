use super::*;
use crate::value::Value;
use bevy_ecs::prelude::{Entity, World};
use glam::{Mat4, Vec3};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashSet};

// ---------- Scene container ----------
pub struct SceneWorld {
    pub world: World,
    order: Vec<Entity>,
    scene_name: Option<String>,
    scene_dirty: bool,
    dirty_entities: HashSet<Entity>,
    next_component_id: u64,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneWorld {
    /// An empty world with no scene loaded.
    pub fn new() -> Self {
        Self {
            world: World::new(),
            order: Vec::new(),
            scene_name: None,
            scene_dirty: false,
            dirty_entities: HashSet::new(),
            next_component_id: 1,
        }
    }

    pub fn with_scene(name: impl Into<String>) -> Self {
        let mut world = Self::new();
        world.open_scene(name);
        world
    }

    pub fn open_scene(&mut self, name: impl Into<String>) {
        self.scene_name = Some(name.into());
    }

    pub fn scene_name(&self) -> Option<&str> {
        self.scene_name.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.scene_name.is_some()
    }

    pub fn clear_world(&mut self) {
        self.world.clear_entities();
        self.order.clear();
        self.dirty_entities.clear();
        self.scene_dirty = false;
    }

    // ---------- Hierarchy ----------
    pub fn spawn_named(&mut self, name: &str, parent: Option<Entity>) -> Entity {
        self.spawn_with_transform(name, Transform3D::default(), parent)
    }

    pub fn spawn_with_transform(&mut self, name: &str, transform: Transform3D, parent: Option<Entity>) -> Entity {
        let entity =
            self.world.spawn((EntityName(name.to_string()), transform, ComponentSet::default())).id();
        if let Some(parent) = parent.filter(|p| self.entity_exists(*p)) {
            self.world.entity_mut(entity).insert(Parent(parent));
            match self.world.get_mut::<Children>(parent) {
                Some(mut children) => children.0.push(entity),
                None => {
                    self.world.entity_mut(parent).insert(Children(vec![entity]));
                }
            }
        }
        self.order.push(entity);
        entity
    }

    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok()
    }

    pub fn despawn_entity(&mut self, entity: Entity) -> bool {
        if let Some(parent) = self.world.get::<Parent>(entity).copied() {
            if let Some(mut siblings) = self.world.get_mut::<Children>(parent.0) {
                siblings.0.retain(|&child| child != entity);
            }
        }
        let child_ids = self.world.get::<Children>(entity).map(|c| c.0.clone()).unwrap_or_default();
        for child in child_ids {
            self.despawn_entity(child);
        }
        let removed = self.world.despawn(entity);
        if removed {
            self.order.retain(|&e| e != entity);
            self.dirty_entities.remove(&entity);
            self.scene_dirty = true;
        }
        removed
    }

    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    /// Entities in spawn order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.order.iter().copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = Entity> + '_ {
        self.order.iter().copied().filter(|&e| self.world.get::<Parent>(e).is_none())
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<Parent>(entity).map(|p| p.0)
    }

    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.world.get::<Children>(entity).map(|c| c.0.as_slice()).unwrap_or(&[])
    }

    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.world.get::<EntityName>(entity).map(|n| n.0.as_str())
    }

    /// First entity in spawn order whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.entities().find(|&e| self.name(e) == Some(name))
    }

    /// Walks `path` ('/'-separated names) through the direct children of `root`.
    pub fn find_child_path(&self, root: Entity, path: &str) -> Option<Entity> {
        let mut current = root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = self.children(current).iter().copied().find(|&child| self.name(child) == Some(segment))?;
        }
        if current == root {
            None
        } else {
            Some(current)
        }
    }

    /// `entity` followed by its descendants, depth first.
    pub fn subtree(&self, entity: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack: SmallVec<[Entity; 32]> = SmallVec::new();
        stack.push(entity);
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn entity_info(&self, entity: Entity) -> Option<EntityInfo> {
        let name = self.name(entity)?.to_string();
        let transform = self.transform(entity)?;
        let component_types = self.components(entity).iter().map(|c| c.type_name.clone()).collect();
        Some(EntityInfo { entity, name, parent: self.parent(entity), transform, component_types })
    }

    // ---------- Transforms ----------
    pub fn transform(&self, entity: Entity) -> Option<Transform3D> {
        self.world.get::<Transform3D>(entity).copied()
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform3D) -> bool {
        if let Some(mut current) = self.world.get_mut::<Transform3D>(entity) {
            *current = transform;
            true
        } else {
            false
        }
    }

    pub fn world_matrix(&self, entity: Entity) -> Mat4 {
        let mut matrix = self.transform(entity).map(|t| t.matrix()).unwrap_or(Mat4::IDENTITY);
        let mut cursor = self.parent(entity);
        while let Some(parent) = cursor {
            let local = self.transform(parent).map(|t| t.matrix()).unwrap_or(Mat4::IDENTITY);
            matrix = local * matrix;
            cursor = self.parent(parent);
        }
        matrix
    }

    pub fn world_position(&self, entity: Entity) -> Vec3 {
        self.world_matrix(entity).w_axis.truncate()
    }

    /// Local translation that places `entity` at `position` in world space.
    pub fn local_from_world_position(&self, entity: Entity, position: Vec3) -> Vec3 {
        match self.parent(entity) {
            Some(parent) => self.world_matrix(parent).inverse().transform_point3(position),
            None => position,
        }
    }

    // ---------- Components ----------
    pub fn components(&self, entity: Entity) -> &[ComponentInstance] {
        self.world.get::<ComponentSet>(entity).map(|set| set.0.as_slice()).unwrap_or(&[])
    }

    pub fn component(&self, handle: ComponentHandle) -> Option<&ComponentInstance> {
        match handle.slot {
            ComponentSlot::Transform => None,
            ComponentSlot::Attached(id) => self.components(handle.entity).iter().find(|c| c.id == id),
        }
    }

    pub fn component_type(&self, handle: ComponentHandle) -> Option<&str> {
        match handle.slot {
            ComponentSlot::Transform => self.entity_exists(handle.entity).then_some(TRANSFORM_TYPE),
            ComponentSlot::Attached(_) => self.component(handle).map(|c| c.type_name.as_str()),
        }
    }

    /// Component of the given qualified type on `entity` itself.
    pub fn find_component(&self, entity: Entity, type_name: &str) -> Option<ComponentHandle> {
        self.find_component_where(entity, |candidate| candidate == type_name)
    }

    pub fn find_component_where<F>(&self, entity: Entity, mut predicate: F) -> Option<ComponentHandle>
    where
        F: FnMut(&str) -> bool,
    {
        if !self.entity_exists(entity) {
            return None;
        }
        if predicate(TRANSFORM_TYPE) {
            return Some(ComponentHandle::transform(entity));
        }
        self.components(entity)
            .iter()
            .find(|c| predicate(&c.type_name))
            .map(|c| ComponentHandle::attached(entity, c.id))
    }

    /// First match on `entity` or any descendant, depth first.
    pub fn find_component_in_subtree(&self, entity: Entity, type_name: &str) -> Option<ComponentHandle> {
        self.subtree(entity).into_iter().find_map(|e| self.find_component(e, type_name))
    }

    /// First match anywhere in the scene, in spawn order.
    pub fn find_component_anywhere(&self, type_name: &str) -> Option<ComponentHandle> {
        self.entities().find_map(|e| self.find_component(e, type_name))
    }

    pub fn add_component(
        &mut self,
        entity: Entity,
        type_name: &str,
        values: BTreeMap<String, Value>,
    ) -> Option<ComponentHandle> {
        if !self.entity_exists(entity) {
            return None;
        }
        let id = ComponentId(self.next_component_id);
        self.next_component_id += 1;
        let instance = ComponentInstance { id, type_name: type_name.to_string(), values };
        match self.world.get_mut::<ComponentSet>(entity) {
            Some(mut set) => set.0.push(instance),
            None => {
                let mut set = ComponentSet::default();
                set.0.push(instance);
                self.world.entity_mut(entity).insert(set);
            }
        }
        Some(ComponentHandle::attached(entity, id))
    }

    /// Re-inserts a component with its original id, used when restoring state.
    pub fn restore_component(&mut self, entity: Entity, instance: ComponentInstance) -> bool {
        if !self.entity_exists(entity) {
            return false;
        }
        self.next_component_id = self.next_component_id.max(instance.id.0 + 1);
        match self.world.get_mut::<ComponentSet>(entity) {
            Some(mut set) => set.0.push(instance),
            None => {
                let mut set = ComponentSet::default();
                set.0.push(instance);
                self.world.entity_mut(entity).insert(set);
            }
        }
        true
    }

    pub fn remove_component(&mut self, handle: ComponentHandle) -> Option<ComponentInstance> {
        let ComponentSlot::Attached(id) = handle.slot else {
            return None;
        };
        let mut set = self.world.get_mut::<ComponentSet>(handle.entity)?;
        let index = set.0.iter().position(|c| c.id == id)?;
        Some(set.0.remove(index))
    }

    pub fn value(&self, handle: ComponentHandle, member: &str) -> Option<&Value> {
        self.component(handle)?.values.get(member)
    }

    /// Stores `value` and returns whatever was there before.
    pub fn set_value(&mut self, handle: ComponentHandle, member: &str, value: Value) -> Option<Option<Value>> {
        let ComponentSlot::Attached(id) = handle.slot else {
            return None;
        };
        let mut set = self.world.get_mut::<ComponentSet>(handle.entity)?;
        let instance = set.0.iter_mut().find(|c| c.id == id)?;
        Some(instance.values.insert(member.to_string(), value))
    }

    pub fn clear_value(&mut self, handle: ComponentHandle, member: &str) -> bool {
        let ComponentSlot::Attached(id) = handle.slot else {
            return false;
        };
        let Some(mut set) = self.world.get_mut::<ComponentSet>(handle.entity) else {
            return false;
        };
        match set.0.iter_mut().find(|c| c.id == id) {
            Some(instance) => instance.values.remove(member).is_some(),
            None => false,
        }
    }

    // ---------- Dirty tracking ----------
    pub fn mark_dirty(&mut self, entity: Entity) {
        self.dirty_entities.insert(entity);
        self.scene_dirty = true;
    }

    pub fn mark_scene_dirty(&mut self) {
        if self.is_loaded() {
            self.scene_dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.scene_dirty
    }

    pub fn is_entity_dirty(&self, entity: Entity) -> bool {
        self.dirty_entities.contains(&entity)
    }

    /// Clears dirty state after the scene has been written out.
    pub fn mark_saved(&mut self) {
        self.scene_dirty = false;
        self.dirty_entities.clear();
    }
}
