use glam::{Quat, Vec3, Vec4};
use kestrel_copilot::components::{ComponentRegistry, MESH_RENDERER_TYPE, SHARED_MATERIAL_MEMBER};
use kestrel_copilot::config::CopilotConfig;
use kestrel_copilot::ecs::{SceneWorld, Transform3D};
use kestrel_copilot::material_registry::MaterialRegistry;
use kestrel_copilot::project::DiskProject;
use kestrel_copilot::value::Value;
use kestrel_copilot::{Copilot, MessageKind};
use tempfile::TempDir;

fn session_with_camera() -> (TempDir, Copilot) {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut copilot =
        Copilot::new(CopilotConfig::default(), Box::new(DiskProject::new(dir.path()))).expect("copilot");
    let registry = ComponentRegistry::with_builtins();
    let mut scene = SceneWorld::with_scene("Sandbox");
    let camera = scene.spawn_with_transform(
        "Main Camera",
        Transform3D { translation: Vec3::new(0.0, 1.0, -10.0), rotation: Quat::IDENTITY, scale: Vec3::ONE },
        None,
    );
    let descriptor = registry.get("Engine.Camera").expect("camera descriptor");
    scene.add_component(camera, "Engine.Camera", descriptor.default_values());
    copilot.open_scene(scene, MaterialRegistry::new());
    (dir, copilot)
}

fn renderer_color(copilot: &Copilot, name: &str) -> Option<Vec4> {
    let scene = copilot.scene();
    let entity = scene.find_by_name(name)?;
    let renderer = scene.find_component(entity, MESH_RENDERER_TYPE)?;
    let key = scene.value(renderer, SHARED_MATERIAL_MEMBER)?.as_material()?.to_string();
    copilot.materials().color(&key)
}

#[test]
fn red_cube_spawns_in_front_of_the_camera() {
    let (_dir, mut copilot) = session_with_camera();
    let messages = copilot.create_from_query("Create a red cube").expect("creation request");

    assert_eq!(messages[0].text, "Created object based on your request.");
    assert_eq!(messages[1].kind, MessageKind::Success);
    assert_eq!(messages[1].text, "Created Cube 'Cube' at (0.00, 1.00, -7.00) with scale (1.00, 1.00, 1.00)");

    let scene = copilot.scene();
    let cube = scene.find_by_name("Cube").expect("cube spawned");
    assert_eq!(scene.world_position(cube), Vec3::new(0.0, 1.0, -7.0));
    let types: Vec<&str> = scene.components(cube).iter().map(|c| c.type_name.as_str()).collect();
    assert_eq!(types, ["Engine.Rendering.MeshFilter", MESH_RENDERER_TYPE, "Engine.Physics.BoxCollider"]);
    let filter = scene.find_component(cube, "Engine.Rendering.MeshFilter").expect("mesh filter");
    assert_eq!(scene.value(filter, "sharedMesh"), Some(&Value::Asset(Some("builtin:Cube".to_string()))));
    assert_eq!(renderer_color(&copilot, "Cube"), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    assert_eq!(copilot.materials().color(copilot.materials().default_key()), Some(Vec4::ONE));
}

#[test]
fn each_creation_is_one_undo_entry() {
    let (_dir, mut copilot) = session_with_camera();
    copilot.create_from_query("spawn a sphere at (2, 0, 4) named orb").expect("sphere request");
    copilot.create_from_query("add a plane scale (10, 1, 10)").expect("plane request");
    assert_eq!(copilot.ledger().len(), 2);
    assert_eq!(copilot.materials().instance_count(), 2);

    let orb = copilot.scene().find_by_name("orb").expect("orb spawned");
    assert_eq!(copilot.scene().world_position(orb), Vec3::new(2.0, 0.0, 4.0));
    let plane = copilot.scene().find_by_name("Plane").expect("plane spawned");
    assert_eq!(copilot.scene().transform(plane).map(|t| t.scale), Some(Vec3::new(10.0, 1.0, 10.0)));
    assert!(copilot.scene().find_component(plane, "Engine.Physics.MeshCollider").is_some());

    assert_eq!(copilot.undo_last().text, "Undo: Create Plane");
    assert!(copilot.scene().find_by_name("Plane").is_none());
    assert!(copilot.scene().find_by_name("orb").is_some());
    assert_eq!(copilot.undo_last().text, "Undo: Create orb");
    assert!(copilot.scene().find_by_name("orb").is_none());
    assert_eq!(copilot.materials().instance_count(), 0);
    assert_eq!(copilot.undo_last().text, "Nothing to undo in scene 'Sandbox'");
}

#[test]
fn request_colors_are_bytes_but_directive_colors_are_fractions() {
    let (_dir, mut copilot) = session_with_camera();
    copilot.create_from_query("make a cube color (255, 128, 0) called crate").expect("cube request");
    assert_eq!(renderer_color(&copilot, "crate"), Some(Vec4::new(1.0, 128.0 / 255.0, 0.0, 1.0)));

    copilot.apply_response("scene:crate/Material/color=(0,0.5,1)");
    assert_eq!(renderer_color(&copilot, "crate"), Some(Vec4::new(0.0, 0.5, 1.0, 1.0)));
}

#[test]
fn without_a_camera_primitives_spawn_at_the_origin() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut copilot =
        Copilot::new(CopilotConfig::default(), Box::new(DiskProject::new(dir.path()))).expect("copilot");
    copilot.open_scene(SceneWorld::with_scene("Empty"), MaterialRegistry::new());

    copilot.create_from_query("place a capsule y=3").expect("capsule request");
    let capsule = copilot.scene().find_by_name("Capsule").expect("capsule spawned");
    assert_eq!(copilot.scene().world_position(capsule), Vec3::new(0.0, 3.0, 0.0));
    assert!(copilot.scene().find_component(capsule, "Engine.Physics.CapsuleCollider").is_some());
}

#[test]
fn questions_and_unloaded_scenes_create_nothing() {
    let (_dir, mut copilot) = session_with_camera();
    assert!(copilot.create_from_query("how do I make my player jump higher?").is_none());
    assert!(copilot.ledger().is_empty());

    let dir = tempfile::tempdir().expect("temp dir");
    let mut idle =
        Copilot::new(CopilotConfig::default(), Box::new(DiskProject::new(dir.path()))).expect("copilot");
    let messages = idle.create_from_query("create a cube").expect("creation request");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::Warning);
    assert!(idle.ledger().is_empty());
}

#[test]
fn spatial_information_follows_created_objects() {
    let (_dir, mut copilot) = session_with_camera();
    copilot.create_from_query("create a cube").expect("cube request");
    let before = copilot.spatial_information().to_string();
    assert!(before.contains("- Cube: Position (0.00, 1.00, -7.00), Size (1.00, 1.00, 1.00)"));
    assert!(!before.contains("is below Cube"));

    copilot.create_from_query("add a plane at (0, -1, -7) named ground").expect("plane request");
    let after = copilot.spatial_information();
    assert!(after.contains("  * ground is below Cube (distance: 1.00)"));
    assert!(after.contains("  * Cube is above ground (distance: 1.00)"));
}
