use glam::{EulerRot, Quat, Vec3, Vec4};
use kestrel_copilot::components::{ComponentRegistry, MESH_RENDERER_TYPE, SHARED_MATERIAL_MEMBER};
use kestrel_copilot::config::CopilotConfig;
use kestrel_copilot::ecs::SceneWorld;
use kestrel_copilot::material_registry::MaterialRegistry;
use kestrel_copilot::project::DiskProject;
use kestrel_copilot::value::Value;
use kestrel_copilot::{Copilot, MessageKind};
use tempfile::TempDir;

const RIGIDBODY: &str = "Engine.Physics.Rigidbody";
const SAVE_REMINDER: &str = "Scene modifications applied. Remember to save your scene.";

fn arena() -> (SceneWorld, MaterialRegistry) {
    let registry = ComponentRegistry::with_builtins();
    let mut scene = SceneWorld::with_scene("Arena");
    let mut materials = MaterialRegistry::new();
    materials.register("mat/stone", "Stone", Vec4::ONE);

    let player = scene.spawn_named("Player", None);
    let rigidbody = registry.get(RIGIDBODY).expect("rigidbody descriptor");
    scene.add_component(player, RIGIDBODY, rigidbody.default_values());

    let renderer = registry.get(MESH_RENDERER_TYPE).expect("renderer descriptor");
    for name in ["Cube", "Pillar"] {
        let entity = scene.spawn_named(name, None);
        let mut values = renderer.default_values();
        values.insert(SHARED_MATERIAL_MEMBER.to_string(), Value::Material(Some("mat/stone".to_string())));
        scene.add_component(entity, MESH_RENDERER_TYPE, values);
    }

    let turret = scene.spawn_named("Turret", None);
    let barrel = scene.spawn_named("Barrel", Some(turret));
    let light = registry.get("Engine.Light").expect("light descriptor");
    scene.add_component(barrel, "Engine.Light", light.default_values());
    (scene, materials)
}

fn session() -> (TempDir, Copilot) {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut copilot =
        Copilot::new(CopilotConfig::default(), Box::new(DiskProject::new(dir.path()))).expect("copilot");
    let (scene, materials) = arena();
    copilot.open_scene(scene, materials);
    (dir, copilot)
}

fn mass(copilot: &Copilot) -> Option<Value> {
    let scene = copilot.scene();
    let player = scene.find_by_name("Player")?;
    let handle = scene.find_component(player, RIGIDBODY)?;
    scene.value(handle, "mass").cloned()
}

fn material_of(copilot: &Copilot, name: &str) -> Option<String> {
    let scene = copilot.scene();
    let entity = scene.find_by_name(name)?;
    let renderer = scene.find_component(entity, MESH_RENDERER_TYPE)?;
    scene.value(renderer, SHARED_MATERIAL_MEMBER)?.as_material().map(str::to_string)
}

#[test]
fn set_mass_then_undo_restores_it() {
    let (_dir, mut copilot) = session();
    let messages = copilot.apply_response("Making the player heavier.\nscene:Player/Rigidbody/mass=10\n");
    let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["Set Player/Rigidbody/mass = 10", SAVE_REMINDER]);
    assert_eq!(mass(&copilot), Some(Value::Float(10.0)));
    assert!(copilot.scene().is_dirty());

    let undo = copilot.undo_last();
    assert_eq!(undo.text, "Undo: Set mass on Player");
    assert_eq!(mass(&copilot), Some(Value::Float(1.0)));
}

#[test]
fn create_twice_reports_already_exists_without_mutating() {
    let (_dir, mut copilot) = session();
    let before = copilot.scene().entity_count();

    let first = copilot.apply_response("scene:Create/Enemy/Rigidbody");
    assert_eq!(first[0].text, format!("Added component {RIGIDBODY} to Enemy"));
    assert_eq!(copilot.scene().entity_count(), before + 1);
    assert_eq!(copilot.ledger().len(), 1);

    let second = copilot.apply_response("scene:Create/Enemy/Rigidbody");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].text, format!("Component {RIGIDBODY} already exists on Enemy"));
    assert_eq!(copilot.scene().entity_count(), before + 1);
    assert_eq!(copilot.ledger().len(), 1);
    let enemy = copilot.scene().find_by_name("Enemy").expect("enemy");
    assert_eq!(copilot.scene().components(enemy).len(), 1);
}

#[test]
fn create_transform_spawns_entity_and_reports_existing_transform() {
    let (_dir, mut copilot) = session();
    let messages = copilot.apply_response("```scene:Create/Enemy/Transform```");
    assert_eq!(messages[0].text, "Component Engine.Transform already exists on Enemy");
    assert!(copilot.scene().find_by_name("Enemy").is_some());

    copilot.undo_last();
    assert!(copilot.scene().find_by_name("Enemy").is_none());
}

#[test]
fn unknown_component_type_creates_nothing() {
    let (_dir, mut copilot) = session();
    let messages = copilot.apply_response("scene:Create/Ghost/Jetpack");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::Error);
    assert_eq!(messages[0].text, "Component type not found: Jetpack");
    assert!(copilot.scene().find_by_name("Ghost").is_none());
    assert!(copilot.ledger().is_empty());
}

#[test]
fn bad_value_is_a_conversion_error_and_changes_nothing() {
    let (_dir, mut copilot) = session();
    let messages = copilot.apply_response("scene:Player/Rigidbody/mass=heavy");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::Error);
    assert!(messages[0].text.starts_with("Could not convert value:"), "{}", messages[0].text);
    assert_eq!(mass(&copilot), Some(Value::Float(1.0)));
    assert!(copilot.ledger().is_empty());
}

#[test]
fn bad_format_is_reported_and_skipped() {
    let (_dir, mut copilot) = session();
    let before = copilot.scene().entity_count();
    let messages = copilot.apply_response("scene:BadFormat");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "Invalid create command format: Create/BadFormat");
    assert_eq!(copilot.scene().entity_count(), before);
}

#[test]
fn one_failure_does_not_stop_the_rest() {
    let (_dir, mut copilot) = session();
    let messages = copilot.apply_response("scene:Nobody/Rigidbody/mass=3\nscene:Player/Rigidbody/drag=0.5\nscene:Player/Rigidbody/bounciness=2");
    let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "GameObject not found: Nobody",
            "Set Player/Rigidbody/drag = 0.5",
            "Property or field not found: bounciness on Rigidbody",
            SAVE_REMINDER,
        ]
    );
}

#[test]
fn components_on_children_are_found_from_the_parent() {
    let (_dir, mut copilot) = session();
    copilot.apply_response("scene:Turret/Light/intensity=2.5");
    let scene = copilot.scene();
    let barrel = scene.find_by_name("Barrel").expect("barrel");
    let light = scene.find_component(barrel, "Engine.Light").expect("light");
    assert_eq!(scene.value(light, "intensity"), Some(&Value::Float(2.5)));
}

#[test]
fn transform_position_and_scale_are_set_and_undone() {
    let (_dir, mut copilot) = session();
    copilot.apply_response("scene:Player/Transform/position=(1,2,3)\nscene:Player/Transform/scale=(2,2,2)");
    let player = copilot.scene().find_by_name("Player").expect("player");
    let transform = copilot.scene().transform(player).expect("transform");
    assert_eq!(transform.translation, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(transform.scale, Vec3::splat(2.0));

    let undone = copilot.undo_last_batch();
    assert_eq!(undone.len(), 2);
    let transform = copilot.scene().transform(player).expect("transform");
    assert_eq!(transform.translation, Vec3::ZERO);
    assert_eq!(transform.scale, Vec3::ONE);
}

fn yxz_degrees(x: f32, y: f32, z: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, y.to_radians(), x.to_radians(), z.to_radians())
}

fn same_rotation(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 1.0 - 1e-5
}

#[test]
fn rotation_is_set_from_euler_degrees_and_undone() {
    let (_dir, mut copilot) = session();
    let messages = copilot.apply_response("scene:Player/Transform/rotation=(0,90,0)");
    assert_eq!(messages[0].text, "Set transform rotation = (0,90,0) on Player");
    let player = copilot.scene().find_by_name("Player").expect("player");
    let rotation = copilot.scene().transform(player).expect("transform").rotation;
    assert!(same_rotation(rotation, yxz_degrees(0.0, 90.0, 0.0)), "{rotation:?}");

    copilot.undo_last();
    assert_eq!(copilot.scene().transform(player).map(|t| t.rotation), Some(Quat::IDENTITY));
}

#[test]
fn child_rotation_is_relative_to_the_parent() {
    let (_dir, mut copilot) = session();
    copilot.apply_response("scene:Turret/Transform/localEulerAngles=(0,90,0)");
    copilot.apply_response("scene:Barrel/Transform/rotation=(0,180,0)");

    let scene = copilot.scene();
    let turret = scene.find_by_name("Turret").expect("turret");
    let barrel = scene.find_by_name("Barrel").expect("barrel");
    let turret_local = scene.transform(turret).expect("turret transform").rotation;
    assert!(same_rotation(turret_local, yxz_degrees(0.0, 90.0, 0.0)));
    let barrel_local = scene.transform(barrel).expect("barrel transform").rotation;
    assert!(same_rotation(barrel_local, yxz_degrees(0.0, 90.0, 0.0)), "{barrel_local:?}");
    let (_, barrel_world, _) = scene.world_matrix(barrel).to_scale_rotation_translation();
    assert!(same_rotation(barrel_world, yxz_degrees(0.0, 180.0, 0.0)), "{barrel_world:?}");

    let undone = copilot.undo_last_batch();
    assert_eq!(undone.len(), 1);
    let scene = copilot.scene();
    assert_eq!(scene.transform(barrel).map(|t| t.rotation), Some(Quat::IDENTITY));
    let turret_local = scene.transform(turret).expect("turret transform").rotation;
    assert!(same_rotation(turret_local, yxz_degrees(0.0, 90.0, 0.0)));
}

#[test]
fn material_color_clones_the_shared_material() {
    let (_dir, mut copilot) = session();
    let messages = copilot.apply_response("scene:Cube/Material/color=(1,0,0)");
    assert_eq!(messages[0].text, "Set material color = (1,0,0) on Cube");

    let cube_material = material_of(&copilot, "Cube").expect("cube material");
    assert_ne!(cube_material, "mat/stone");
    assert_eq!(copilot.materials().color(&cube_material), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    assert_eq!(material_of(&copilot, "Pillar").as_deref(), Some("mat/stone"));
    assert_eq!(copilot.materials().color("mat/stone"), Some(Vec4::ONE));

    copilot.undo_last();
    assert_eq!(material_of(&copilot, "Cube").as_deref(), Some("mat/stone"));
    assert_eq!(copilot.materials().instance_count(), 0);
}

#[test]
fn renderer_color_property_also_clones() {
    let (_dir, mut copilot) = session();
    copilot.apply_response("scene:Pillar/MeshRenderer/color=(0,0,1,0.5)");
    let pillar_material = material_of(&copilot, "Pillar").expect("pillar material");
    assert_eq!(copilot.materials().color(&pillar_material), Some(Vec4::new(0.0, 0.0, 1.0, 0.5)));
    assert_eq!(material_of(&copilot, "Cube").as_deref(), Some("mat/stone"));
}

#[test]
fn batch_undo_reverts_the_whole_reply_then_reports_empty_ledger() {
    let (_dir, mut copilot) = session();
    copilot.apply_response("scene:Player/Rigidbody/mass=4");
    copilot.apply_response("scene:Player/Rigidbody/mass=7\nscene:Create/Enemy/Rigidbody");
    assert_eq!(copilot.batches().history().last().map(|b| b.entries), Some(2));

    let undone = copilot.undo_last_batch();
    assert_eq!(undone.len(), 2);
    assert!(copilot.scene().find_by_name("Enemy").is_none());
    assert_eq!(mass(&copilot), Some(Value::Float(4.0)));

    copilot.undo_last_batch();
    assert_eq!(mass(&copilot), Some(Value::Float(1.0)));
    let empty = copilot.undo_last();
    assert_eq!(empty.text, "Nothing to undo in scene 'Arena'");
}

#[test]
fn scene_edits_need_a_loaded_scene() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut copilot =
        Copilot::new(CopilotConfig::default(), Box::new(DiskProject::new(dir.path()))).expect("copilot");
    let messages = copilot.apply_response("scene:Player/Rigidbody/mass=10");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::Warning);
    assert_eq!(messages[0].text, "No scene is currently loaded. Scene edits were ignored.");
}

#[test]
fn summary_is_rebuilt_after_edits() {
    let (_dir, mut copilot) = session();
    assert!(copilot.scene_summary().contains("Total objects in scene: 5"));
    assert!(copilot.scene_summary().contains("- Turret\n  - Barrel\n    * Light"));
    copilot.apply_response("scene:Create/Enemy/Rigidbody");
    let summary = copilot.scene_summary();
    assert!(summary.contains("Total objects in scene: 6"));
    assert!(summary.contains("- Enemy\n  * Rigidbody"));
    assert!(summary.contains("## Lights:\n- Barrel: Type Directional"));
}
