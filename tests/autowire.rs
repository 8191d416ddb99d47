use kestrel_copilot::components::{ComponentRegistry, MemberDescriptor};
use kestrel_copilot::config::CopilotConfig;
use kestrel_copilot::ecs::SceneWorld;
use kestrel_copilot::material_registry::MaterialRegistry;
use kestrel_copilot::prefab::AssetLibrary;
use kestrel_copilot::project::DiskProject;
use kestrel_copilot::value::{TypeTag, Value};
use kestrel_copilot::{Copilot, DenyAll};
use tempfile::TempDir;

const SCRIPT: &str = "Scripts.PlayerController";
const REPLY: &str = "```csharp:Assets/Scripts/PlayerController.cs\npublic class PlayerController : MonoBehaviour {}\n```";

fn player_controller_fields() -> Vec<MemberDescriptor> {
    vec![
        MemberDescriptor::field("bulletPrefab", TypeTag::AssetRef).described("Projectile"),
        MemberDescriptor::field("body", TypeTag::ComponentRef("Rigidbody".to_string())),
        MemberDescriptor::field("spawnPoint", TypeTag::EntityRef),
        MemberDescriptor::field("speed", TypeTag::Float).with_default(Value::Float(5.0)),
    ]
}

fn prefabs() -> AssetLibrary {
    let mut library = AssetLibrary::in_memory();
    library.register("Crate", "Assets/Prefabs/Crate.prefab");
    library.register("Bullet", "Assets/Prefabs/Bullet.prefab");
    library
}

fn session(config: CopilotConfig, scene: SceneWorld) -> (TempDir, Copilot) {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut copilot = Copilot::new(config, Box::new(DiskProject::new(dir.path())))
        .expect("copilot")
        .with_assets(prefabs());
    copilot.registry_mut().register_script("PlayerController", player_controller_fields());
    copilot.open_scene(scene, MaterialRegistry::new());
    (dir, copilot)
}

fn main_scene() -> SceneWorld {
    let mut scene = SceneWorld::with_scene("Main");
    scene.spawn_named("Ground", None);
    scene
}

fn texts(messages: &[kestrel_copilot::SystemMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.text.as_str()).collect()
}

#[test]
fn code_edit_attaches_and_wires_the_new_script() {
    let (dir, mut copilot) = session(CopilotConfig::default(), main_scene());
    let messages = copilot.apply_response(REPLY);
    assert_eq!(
        texts(&messages),
        vec![
            "Applied changes to Assets/Scripts/PlayerController.cs",
            "Created new GameObject 'PlayerController' for the script",
            "Attached script 'PlayerController' to GameObject 'PlayerController'",
            "Created and assigned new Rigidbody to body on PlayerController",
            "Created and assigned new GameObject 'spawnPoint' to spawnPoint on PlayerController",
            "Assigned prefab 'Bullet' to field 'bulletPrefab' in 'PlayerController'",
            "Added BoxCollider to PlayerController for collision detection",
            "Added AudioSource to PlayerController for audio playback",
            "Added Animator to PlayerController for animations",
            "Scene modifications applied. Remember to save your scene.",
        ]
    );

    let scene = copilot.scene();
    let owner = scene.find_by_name("PlayerController").expect("script owner");
    let script = scene.find_component(owner, SCRIPT).expect("attached script");
    let body = scene.find_component(owner, "Engine.Physics.Rigidbody").expect("rigidbody");
    let spawn = scene.find_by_name("spawnPoint").expect("spawn point");
    assert_eq!(scene.value(script, "body"), Some(&Value::Component(Some(body))));
    assert_eq!(scene.value(script, "spawnPoint"), Some(&Value::Entity(Some(spawn))));
    assert_eq!(scene.value(script, "bulletPrefab"), Some(&Value::Asset(Some("Assets/Prefabs/Bullet.prefab".into()))));
    assert_eq!(scene.value(script, "speed"), Some(&Value::Float(5.0)));
    assert_eq!(scene.components(owner).len(), 5);

    let undo = copilot.undo_last();
    assert_eq!(undo.text, "Undo: Attach PlayerController");
    assert!(copilot.scene().find_by_name("PlayerController").is_none());
    assert!(copilot.scene().find_by_name("spawnPoint").is_none());
    assert_eq!(copilot.scene().entity_count(), 1);
    assert!(dir.path().join("Assets/Scripts/PlayerController.cs").exists());

    copilot.undo_last();
    assert!(!dir.path().join("Assets/Scripts/PlayerController.cs").exists());
}

#[test]
fn denied_approval_still_writes_the_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut copilot = Copilot::new(CopilotConfig::default(), Box::new(DiskProject::new(dir.path())))
        .expect("copilot")
        .with_approval(Box::new(DenyAll));
    copilot.registry_mut().register_script("PlayerController", player_controller_fields());
    copilot.open_scene(main_scene(), MaterialRegistry::new());

    let messages = copilot.apply_response(REPLY);
    assert_eq!(
        texts(&messages),
        vec![
            "Applied changes to Assets/Scripts/PlayerController.cs",
            "Skipped creating GameObject for script 'PlayerController'",
        ]
    );
    assert_eq!(copilot.ledger().len(), 1);
    assert!(dir.path().join("Assets/Scripts/PlayerController.cs").exists());

    copilot.scene_mut().spawn_named("PlayerController", None);
    let messages = copilot.apply_response(REPLY);
    assert_eq!(messages[1].text, "Skipped attaching script 'PlayerController' to GameObject 'PlayerController'");
}

#[test]
fn unregistered_script_type_is_reported() {
    let (_dir, mut copilot) = session(CopilotConfig::default(), main_scene());
    let messages = copilot.apply_response("```cs:Assets/Scripts/Mystery.cs\nclass Mystery {}\n```");
    assert!(texts(&messages)
        .contains(&"Could not find script type 'Mystery'. Make sure the script name matches the class name."));
}

#[test]
fn already_attached_script_only_gets_assets() {
    let mut scene = main_scene();
    let registry = {
        let mut registry = ComponentRegistry::with_builtins();
        registry.register_script("PlayerController", player_controller_fields());
        registry
    };
    let owner = scene.spawn_named("PlayerController", None);
    let descriptor = registry.get(SCRIPT).expect("script descriptor");
    let script = scene.add_component(owner, SCRIPT, descriptor.default_values()).expect("attach");

    let (_dir, mut copilot) = session(CopilotConfig::default(), scene);
    let messages = copilot.apply_response(REPLY);
    assert_eq!(
        texts(&messages)[1..3],
        [
            "Script 'PlayerController' is already attached to GameObject 'PlayerController'",
            "Assigned prefab 'Bullet' to field 'bulletPrefab' in 'PlayerController'",
        ]
    );
    assert_eq!(copilot.scene().value(script, "body"), Some(&Value::Component(None)));
}

#[test]
fn scene_create_wires_references_but_adds_no_common_components() {
    let mut scene = main_scene();
    let registry = ComponentRegistry::with_builtins();
    let hero = scene.spawn_named("Hero", None);
    let rigidbody = registry.get("Engine.Physics.Rigidbody").expect("rigidbody");
    let body = scene.add_component(hero, "Engine.Physics.Rigidbody", rigidbody.default_values()).expect("body");

    let (_dir, mut copilot) = session(CopilotConfig::default(), scene);
    let messages = copilot.apply_response("scene:Create/Hero/PlayerController");
    let texts = texts(&messages);
    assert_eq!(texts[0], format!("Added component {SCRIPT} to Hero"));
    assert_eq!(texts[1], "Assigned existing Rigidbody to body on Hero");
    assert!(!texts.iter().any(|t| t.starts_with("Added BoxCollider")));

    let script = copilot.scene().find_component(hero, SCRIPT).expect("script");
    assert_eq!(copilot.scene().value(script, "body"), Some(&Value::Component(Some(body))));
}

#[test]
fn depth_limit_stops_component_creation() {
    let config = CopilotConfig { max_autowire_depth: 0, ..CopilotConfig::default() };
    let (_dir, mut copilot) = session(config, main_scene());
    let messages = copilot.apply_response(REPLY);
    let texts = texts(&messages);
    assert!(texts.contains(&"Stopped wiring body on PlayerController: dependency chain deeper than 0"));
    assert!(texts.contains(&"Added Rigidbody to PlayerController for physics-based movement"));

    let scene = copilot.scene();
    let owner = scene.find_by_name("PlayerController").expect("owner");
    let body = scene.find_component(owner, "Engine.Physics.Rigidbody").expect("rigidbody from heuristics");
    assert_eq!(scene.value(body, "constraints"), Some(&Value::Enum("FreezeRotation".into())));
}

#[test]
fn low_scoring_assets_are_left_unassigned() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut library = AssetLibrary::in_memory();
    library.register("Crate", "Assets/Prefabs/Crate.prefab");
    let mut copilot = Copilot::new(CopilotConfig::default(), Box::new(DiskProject::new(dir.path())))
        .expect("copilot")
        .with_assets(library);
    copilot.registry_mut().register_script("PlayerController", player_controller_fields());
    copilot.open_scene(main_scene(), MaterialRegistry::new());

    let messages = copilot.apply_response(REPLY);
    assert!(texts(&messages).contains(
        &"No suitable prefab found for field 'bulletPrefab' in 'PlayerController'. Please assign manually."
    ));
}

#[test]
fn autowire_can_be_switched_off() {
    let config = CopilotConfig { autowire: false, ..CopilotConfig::default() };
    let (_dir, mut copilot) = session(config, main_scene());
    let messages = copilot.apply_response(REPLY);
    assert_eq!(messages.len(), 4);
    let scene = copilot.scene();
    let owner = scene.find_by_name("PlayerController").expect("owner");
    let script = scene.find_component(owner, SCRIPT).expect("script");
    assert_eq!(scene.value(script, "bulletPrefab"), Some(&Value::Asset(None)));
    assert_eq!(scene.components(owner).len(), 1);
}
