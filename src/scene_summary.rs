use crate::components::{ComponentRegistry, COLLIDER_FAMILY, MESH_RENDERER_TYPE};
use crate::ecs::{ComponentHandle, SceneWorld};
use bevy_ecs::prelude::Entity;
use glam::Vec3;
use std::fmt::Write as _;
use tracing::debug;

const CAMERA_TYPE: &str = "Engine.Camera";
const LIGHT_TYPE: &str = "Engine.Light";

/// Furthest a neighbour can be and still be reported.
const NEIGHBOUR_RANGE: f32 = 10.0;

const DIRECTIONS: [(Vec3, &str); 6] = [
    (Vec3::Y, "above"),
    (Vec3::NEG_Y, "below"),
    (Vec3::NEG_X, "to the left of"),
    (Vec3::X, "to the right of"),
    (Vec3::Z, "in front of"),
    (Vec3::NEG_Z, "behind"),
];

/// Memoized scene-structure and spatial text. Both go stale together and
/// only until `invalidate` is called.
#[derive(Debug, Default)]
pub struct SceneSummaryCache {
    cached: Option<String>,
    spatial: Option<String>,
    builds: u64,
}

impl SceneSummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&mut self, scene: &SceneWorld, registry: &ComponentRegistry) -> &str {
        if self.cached.is_none() {
            self.builds += 1;
            debug!(target: "copilot::summary", builds = self.builds, "rebuilding scene summary");
        }
        self.cached.get_or_insert_with(|| render_summary(scene, registry))
    }

    pub fn spatial(&mut self, scene: &SceneWorld, registry: &ComponentRegistry) -> &str {
        if self.spatial.is_none() {
            self.builds += 1;
            debug!(target: "copilot::summary", builds = self.builds, "rebuilding spatial analysis");
        }
        self.spatial.get_or_insert_with(|| render_spatial(scene, registry))
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
        self.spatial = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some() || self.spatial.is_some()
    }

    /// How many times the text has been rebuilt.
    pub fn builds(&self) -> u64 {
        self.builds
    }
}

fn fmt_vec3(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

pub fn render_summary(scene: &SceneWorld, registry: &ComponentRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Scene Structure Analysis");
    match scene.scene_name() {
        Some(name) => {
            let _ = writeln!(out, "Scene: {name}");
        }
        None => {
            let _ = writeln!(out, "No scene is currently loaded.");
            return out;
        }
    }
    let _ = writeln!(out, "Total objects in scene: {}", scene.entity_count());

    let _ = writeln!(out, "\n## Hierarchy:");
    for root in scene.roots() {
        append_entity(scene, registry, root, 0, &mut out);
    }

    let cameras: Vec<Entity> = scene.entities().filter(|&e| scene.find_component(e, CAMERA_TYPE).is_some()).collect();
    if !cameras.is_empty() {
        let _ = writeln!(out, "\n## Cameras:");
        for camera in cameras {
            let rotation = scene.transform(camera).map(|t| t.euler_degrees()).unwrap_or(Vec3::ZERO);
            let _ = writeln!(
                out,
                "- {}: Position {}, Rotation {}",
                scene.name(camera).unwrap_or_default(),
                fmt_vec3(scene.world_position(camera)),
                fmt_vec3(rotation)
            );
        }
    }

    let lights: Vec<_> = scene.entities().filter_map(|e| scene.find_component(e, LIGHT_TYPE)).collect();
    if !lights.is_empty() {
        let _ = writeln!(out, "\n## Lights:");
        for light in lights {
            let kind = scene.value(light, "type").map(|v| v.to_string()).unwrap_or_else(|| "Unknown".to_string());
            let _ = writeln!(
                out,
                "- {}: Type {kind}, Position {}",
                scene.name(light.entity).unwrap_or_default(),
                fmt_vec3(scene.world_position(light.entity))
            );
        }
    }
    out
}

/// World-aligned box around a collider or renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    center: Vec3,
    half: Vec3,
}

impl Bounds {
    fn min(&self) -> Vec3 {
        self.center - self.half
    }

    fn max(&self) -> Vec3 {
        self.center + self.half
    }

    fn encapsulate(&self, other: &Bounds) -> Bounds {
        let min = self.min().min(other.min());
        let max = self.max().max(other.max());
        Bounds { center: (min + max) * 0.5, half: (max - min) * 0.5 }
    }

    /// Distance along `direction` from `origin` to the near face, when the
    /// ray starts outside the box and reaches it within `range`.
    fn ray_distance(&self, origin: Vec3, direction: Vec3, range: f32) -> Option<f32> {
        let (min, max) = (self.min(), self.max());
        let mut near = f32::NEG_INFINITY;
        let mut far = f32::INFINITY;
        for axis in 0..3 {
            if direction[axis] == 0.0 {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
                continue;
            }
            let a = (min[axis] - origin[axis]) / direction[axis];
            let b = (max[axis] - origin[axis]) / direction[axis];
            near = near.max(a.min(b));
            far = far.min(a.max(b));
        }
        (near <= far && near >= 0.0 && near <= range).then_some(near)
    }
}

struct ColliderBox {
    entity: Entity,
    name: String,
    size: Vec3,
    bounds: Bounds,
}

/// Collider sizes scaled by the entity's world scale.
fn collider_size(scene: &SceneWorld, registry: &ComponentRegistry, handle: ComponentHandle, type_name: &str) -> Vec3 {
    let (scale, _, _) = scene.world_matrix(handle.entity).to_scale_rotation_translation();
    let scale = scale.abs();
    let float = |member: &str, fallback: f32| scene.value(handle, member).and_then(|v| v.as_f32()).unwrap_or(fallback);
    match registry.short_name(type_name) {
        "BoxCollider" => scene.value(handle, "size").and_then(|v| v.as_vec3()).unwrap_or(Vec3::ONE) * scale,
        "SphereCollider" => Vec3::splat(float("radius", 0.5) * scale.max_element() * 2.0),
        "CapsuleCollider" => {
            let diameter = float("radius", 0.5) * scale.x.max(scale.z) * 2.0;
            Vec3::new(diameter, float("height", 2.0) * scale.y, diameter)
        }
        _ => scale,
    }
}

fn collider_boxes(scene: &SceneWorld, registry: &ComponentRegistry) -> Vec<ColliderBox> {
    let mut boxes = Vec::new();
    for entity in scene.entities() {
        let Some(collider) = scene.components(entity).iter().find(|c| registry.is_in_family(&c.type_name, COLLIDER_FAMILY))
        else {
            continue;
        };
        let Some(handle) = scene.find_component(entity, &collider.type_name) else {
            continue;
        };
        let size = collider_size(scene, registry, handle, &collider.type_name);
        boxes.push(ColliderBox {
            entity,
            name: scene.name(entity).unwrap_or_default().to_string(),
            size,
            bounds: Bounds { center: scene.world_position(entity), half: size * 0.5 },
        });
    }
    boxes
}

/// Renderer bounds, taking built-in meshes as unit sized.
fn scene_bounds(scene: &SceneWorld) -> Option<Bounds> {
    scene
        .entities()
        .filter(|&e| scene.find_component(e, MESH_RENDERER_TYPE).is_some())
        .map(|e| {
            let (scale, _, translation) = scene.world_matrix(e).to_scale_rotation_translation();
            Bounds { center: translation, half: scale.abs() * 0.5 }
        })
        .reduce(|all, next| all.encapsulate(&next))
}

/// Collider positions and sizes, the nearest neighbour along each axis and
/// the box enclosing every renderer.
pub fn render_spatial(scene: &SceneWorld, registry: &ComponentRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Spatial Analysis");
    if !scene.is_loaded() {
        let _ = writeln!(out, "No scene is currently loaded.");
        return out;
    }

    let boxes = collider_boxes(scene, registry);
    if !boxes.is_empty() {
        let _ = writeln!(out, "\n## Object Positions and Bounds:");
    }
    for subject in &boxes {
        let _ = writeln!(out, "- {}: Position {}, Size {}", subject.name, fmt_vec3(subject.bounds.center), fmt_vec3(subject.size));
        for (direction, label) in DIRECTIONS {
            let origin = subject.bounds.center + direction * subject.bounds.half;
            let nearest = boxes
                .iter()
                .filter(|other| other.entity != subject.entity)
                .filter_map(|other| Some((other, other.bounds.ray_distance(origin, direction, NEIGHBOUR_RANGE)?)))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((other, distance)) = nearest {
                let _ = writeln!(out, "  * {} is {label} {} (distance: {distance:.2})", other.name, subject.name);
            }
        }
    }

    match scene_bounds(scene) {
        Some(bounds) => {
            let _ = writeln!(
                out,
                "\n## Scene Bounds: Center {}, Size {}, Min {}, Max {}",
                fmt_vec3(bounds.center),
                fmt_vec3(bounds.half * 2.0),
                fmt_vec3(bounds.min()),
                fmt_vec3(bounds.max())
            );
        }
        None => {
            let _ = writeln!(out, "\n## Scene Bounds: No renderers found in scene");
        }
    }
    out
}

fn append_entity(scene: &SceneWorld, registry: &ComponentRegistry, entity: Entity, depth: usize, out: &mut String) {
    let indent = " ".repeat(depth * 2);
    let _ = writeln!(out, "{indent}- {}", scene.name(entity).unwrap_or_default());
    for component in scene.components(entity) {
        let _ = writeln!(out, "{indent}  * {}", registry.short_name(&component.type_name));
    }
    for &child in scene.children(entity) {
        append_entity(scene, registry, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Transform3D;
    use glam::Quat;
    use std::collections::BTreeMap;

    #[test]
    fn cache_rebuilds_only_after_invalidation() {
        let registry = ComponentRegistry::with_builtins();
        let mut scene = SceneWorld::with_scene("Arena");
        let player = scene.spawn_named("Player", None);
        scene.spawn_named("Weapon", Some(player));
        scene.add_component(player, "Engine.Physics.Rigidbody", BTreeMap::new());

        let mut cache = SceneSummaryCache::new();
        let text = cache.summary(&scene, &registry).to_string();
        assert!(text.contains("Total objects in scene: 2"));
        assert!(text.contains("- Player\n  * Rigidbody\n  - Weapon"));

        scene.spawn_named("Enemy", None);
        assert_eq!(cache.summary(&scene, &registry), text, "cached until invalidated");
        cache.invalidate();
        assert!(cache.summary(&scene, &registry).contains("Total objects in scene: 3"));
        assert_eq!(cache.builds(), 2);
    }

    fn place(scene: &mut SceneWorld, name: &str, translation: Vec3, scale: Vec3) -> Entity {
        let transform = Transform3D { translation, rotation: Quat::IDENTITY, scale };
        let entity = scene.spawn_with_transform(name, transform, None);
        scene.add_component(entity, "Engine.Physics.BoxCollider", BTreeMap::new());
        entity
    }

    #[test]
    fn spatial_analysis_reports_neighbours_and_bounds() {
        let registry = ComponentRegistry::with_builtins();
        let mut scene = SceneWorld::with_scene("Yard");
        let floor = place(&mut scene, "Floor", Vec3::ZERO, Vec3::new(10.0, 1.0, 10.0));
        let crate_box = place(&mut scene, "Crate", Vec3::new(0.0, 2.0, 0.0), Vec3::ONE);
        place(&mut scene, "Wall", Vec3::new(4.0, 2.0, 0.0), Vec3::ONE);
        for entity in [floor, crate_box] {
            scene.add_component(entity, MESH_RENDERER_TYPE, BTreeMap::new());
        }

        let mut cache = SceneSummaryCache::new();
        let text = cache.spatial(&scene, &registry).to_string();
        assert!(text.contains("- Floor: Position (0.00, 0.00, 0.00), Size (10.00, 1.00, 10.00)"));
        assert!(text.contains("  * Crate is above Floor (distance: 1.00)"));
        assert!(text.contains("  * Floor is below Crate (distance: 1.00)"));
        assert!(text.contains("  * Wall is to the right of Crate (distance: 3.00)"));
        assert!(text.contains("  * Crate is to the left of Wall (distance: 3.00)"));
        assert!(text.contains("  * Floor is below Wall (distance: 1.00)"));
        assert!(!text.contains("Wall is above Floor"), "wall is outside the floor's upward ray");
        assert!(text.contains(
            "## Scene Bounds: Center (0.00, 1.00, 0.00), Size (10.00, 3.00, 10.00), \
             Min (-5.00, -0.50, -5.00), Max (5.00, 2.50, 5.00)"
        ));

        scene.set_transform(crate_box, Transform3D { translation: Vec3::new(0.0, 5.0, 0.0), ..Transform3D::default() });
        assert_eq!(cache.spatial(&scene, &registry), text, "cached until invalidated");
        cache.invalidate();
        assert!(!cache.is_cached());
        assert!(cache.spatial(&scene, &registry).contains("  * Crate is above Floor (distance: 4.00)"));
    }

    #[test]
    fn spatial_analysis_without_renderers_says_so() {
        let registry = ComponentRegistry::with_builtins();
        let mut scene = SceneWorld::with_scene("Bare");
        scene.spawn_named("Empty", None);
        let text = render_spatial(&scene, &registry);
        assert!(!text.contains("## Object Positions and Bounds:"));
        assert!(text.contains("## Scene Bounds: No renderers found in scene"));
        assert!(render_spatial(&SceneWorld::new(), &registry).contains("No scene is currently loaded."));
    }
}
