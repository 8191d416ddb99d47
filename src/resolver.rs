use crate::components::{ComponentDescriptor, ComponentRegistry, MESH_RENDERER_TYPE, SHARED_MATERIAL_MEMBER};
use crate::ecs::{ComponentHandle, SceneWorld};
use crate::error::{DirectiveError, DirectiveResult};
use bevy_ecs::prelude::Entity;
use tracing::debug;

/// Component name that redirects to the first renderer's material.
pub const MATERIAL_SHORTCUT: &str = "Material";

/// Where a scene directive lands.
#[derive(Debug, Clone)]
pub struct ResolvedTarget<'r> {
    pub entity: Entity,
    /// The entity did not exist and was spawned during resolution.
    pub entity_created: bool,
    pub descriptor: &'r ComponentDescriptor,
    /// `None` when the component is absent (only possible when creating).
    pub component: Option<ComponentHandle>,
}

/// The renderer and shared material a `Material/...` directive edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialTarget {
    pub renderer: ComponentHandle,
    pub material: String,
}

/// Normalizes a directive path to `/` separators. Existence is the caller's concern.
pub fn resolve_file_target(path: &str) -> String {
    path.trim().replace('\\', "/")
}

/// Exact name first, then hierarchical paths, then a child search under every entity.
pub fn find_entity(scene: &SceneWorld, name: &str) -> Option<Entity> {
    if let Some(found) = scene.find_by_name(name) {
        return Some(found);
    }
    if let Some((first, rest)) = name.split_once('/') {
        let anchored = scene
            .entities()
            .filter(|&e| scene.name(e) == Some(first))
            .find_map(|e| scene.find_child_path(e, rest));
        if anchored.is_some() {
            return anchored;
        }
    }
    scene.entities().find_map(|e| scene.find_child_path(e, name))
}

/// Locates `object_path` and `component_name`. With `create`, a missing entity is
/// spawned and the component is looked up on that entity alone; otherwise the
/// entity and its descendants are searched depth first.
pub fn resolve_scene_target<'r>(
    scene: &mut SceneWorld,
    registry: &'r ComponentRegistry,
    object_path: &str,
    component_name: &str,
    create: bool,
) -> DirectiveResult<ResolvedTarget<'r>> {
    let descriptor = registry.resolve(component_name).ok_or_else(|| {
        DirectiveError::resolution(format!("Component type not found: {}", registry.qualify(component_name)))
    })?;

    let (entity, entity_created) = match find_entity(scene, object_path) {
        Some(entity) => (entity, false),
        None if create => {
            let entity = scene.spawn_named(object_path, None);
            debug!(target: "copilot::resolve", object = object_path, "created entity");
            (entity, true)
        }
        None => return Err(DirectiveError::resolution(format!("GameObject not found: {object_path}"))),
    };

    if create {
        let component = scene.find_component(entity, &descriptor.qualified);
        return Ok(ResolvedTarget { entity, entity_created, descriptor, component });
    }

    let component = scene.find_component_in_subtree(entity, &descriptor.qualified).ok_or_else(|| {
        DirectiveError::resolution(format!("Component not found: {component_name} on {object_path} or its children"))
    })?;
    debug!(target: "copilot::resolve", object = object_path, component = %component, "resolved component");
    Ok(ResolvedTarget { entity, entity_created, descriptor, component: Some(component) })
}

/// First renderer on the entity or below, plus the material it currently shares.
pub fn resolve_material_target(scene: &SceneWorld, object_path: &str) -> DirectiveResult<MaterialTarget> {
    let entity = find_entity(scene, object_path)
        .ok_or_else(|| DirectiveError::resolution(format!("GameObject not found: {object_path}")))?;
    let renderer = scene.find_component_in_subtree(entity, MESH_RENDERER_TYPE).ok_or_else(|| {
        DirectiveError::resolution(format!("MeshRenderer not found on {object_path} or its children"))
    })?;
    material_of(scene, renderer)
}

/// The shared material bound to `renderer`.
pub fn material_of(scene: &SceneWorld, renderer: ComponentHandle) -> DirectiveResult<MaterialTarget> {
    let material = scene.value(renderer, SHARED_MATERIAL_MEMBER).and_then(|v| v.as_material()).map(str::to_string);
    match material {
        Some(material) => Ok(MaterialTarget { renderer, material }),
        None => {
            let owner = scene.name(renderer.entity).unwrap_or_default();
            Err(DirectiveError::resolution(format!("No material found on MeshRenderer of {owner}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn finds_entities_by_name_and_path() {
        let mut scene = SceneWorld::with_scene("Main");
        let player = scene.spawn_named("Player", None);
        let body = scene.spawn_named("Body", Some(player));
        let hand = scene.spawn_named("Hand", Some(body));

        assert_eq!(find_entity(&scene, "Player"), Some(player));
        assert_eq!(find_entity(&scene, "Hand"), Some(hand));
        assert_eq!(find_entity(&scene, "Player/Body/Hand"), Some(hand));
        assert_eq!(find_entity(&scene, "Body/Hand"), Some(hand));
        assert_eq!(find_entity(&scene, "Ghost"), None);
    }

    #[test]
    fn component_search_descends_into_children() {
        let registry = ComponentRegistry::with_builtins();
        let mut scene = SceneWorld::with_scene("Main");
        let car = scene.spawn_named("Car", None);
        let chassis = scene.spawn_named("Chassis", Some(car));
        scene.add_component(chassis, "Engine.Physics.Rigidbody", BTreeMap::new());

        let target = resolve_scene_target(&mut scene, &registry, "Car", "Rigidbody", false).expect("resolves");
        assert_eq!(target.component.map(|h| h.entity), Some(chassis));

        let err = resolve_scene_target(&mut scene, &registry, "Car", "Light", false).unwrap_err();
        assert_eq!(err.to_string(), "Component not found: Light on Car or its children");
        let err = resolve_scene_target(&mut scene, &registry, "Car", "Hoverpad", false).unwrap_err();
        assert_eq!(err.to_string(), "Component type not found: Hoverpad");
    }

    #[test]
    fn unknown_type_creates_nothing() {
        let registry = ComponentRegistry::with_builtins();
        let mut scene = SceneWorld::with_scene("Main");
        assert!(resolve_scene_target(&mut scene, &registry, "Enemy", "Hoverpad", true).is_err());
        assert_eq!(scene.entity_count(), 0);
    }
}
