use crate::ecs::TRANSFORM_TYPE;
use crate::value::{TypeTag, Value};
use std::collections::{BTreeMap, HashMap};

/// Namespace user scripts are registered under.
pub const SCRIPT_NAMESPACE: &str = "Scripts";

/// Short names accepted in directives and the qualified ids they stand for.
pub const COMPONENT_ALIASES: &[(&str, &str)] = &[
    ("Rigidbody", "Engine.Physics.Rigidbody"),
    ("BoxCollider", "Engine.Physics.BoxCollider"),
    ("SphereCollider", "Engine.Physics.SphereCollider"),
    ("CapsuleCollider", "Engine.Physics.CapsuleCollider"),
    ("MeshCollider", "Engine.Physics.MeshCollider"),
    ("MeshRenderer", "Engine.Rendering.MeshRenderer"),
    ("MeshFilter", "Engine.Rendering.MeshFilter"),
    ("Material", "Engine.Rendering.Material"),
    ("AudioSource", "Engine.Audio.AudioSource"),
    ("AudioListener", "Engine.Audio.AudioListener"),
    ("Camera", "Engine.Camera"),
    ("Light", "Engine.Light"),
    ("Animator", "Engine.Animator"),
    ("Animation", "Engine.Animation"),
    ("ParticleSystem", "Engine.ParticleSystem"),
    ("Text", "Engine.UI.Text"),
    ("Image", "Engine.UI.Image"),
    ("Button", "Engine.UI.Button"),
    ("Canvas", "Engine.Canvas"),
    ("CanvasGroup", "Engine.CanvasGroup"),
    ("RectTransform", "Engine.RectTransform"),
    ("Transform", TRANSFORM_TYPE),
];

pub const MESH_RENDERER_TYPE: &str = "Engine.Rendering.MeshRenderer";
pub const SHARED_MATERIAL_MEMBER: &str = "sharedMaterial";
pub const COLLIDER_FAMILY: &str = "Collider";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Field,
}

#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    pub name: String,
    pub kind: MemberKind,
    pub type_tag: TypeTag,
    /// Free text attached to the member, used when matching assets.
    pub description: Option<String>,
    pub default: Value,
}

impl MemberDescriptor {
    pub fn property(name: &str, type_tag: TypeTag) -> Self {
        Self::new(name, MemberKind::Property, type_tag)
    }

    pub fn field(name: &str, type_tag: TypeTag) -> Self {
        Self::new(name, MemberKind::Field, type_tag)
    }

    fn new(name: &str, kind: MemberKind, type_tag: TypeTag) -> Self {
        let default = type_tag.default_value();
        Self { name: name.to_string(), kind, type_tag, description: None, default }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    pub short_name: String,
    pub qualified: String,
    pub family: Option<String>,
    pub members: Vec<MemberDescriptor>,
}

impl ComponentDescriptor {
    pub fn new(short_name: &str, qualified: &str) -> Self {
        Self { short_name: short_name.to_string(), qualified: qualified.to_string(), family: None, members: Vec::new() }
    }

    pub fn in_family(mut self, family: &str) -> Self {
        self.family = Some(family.to_string());
        self
    }

    pub fn with(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    pub fn is_script(&self) -> bool {
        self.qualified.strip_prefix(SCRIPT_NAMESPACE).is_some_and(|rest| rest.starts_with('.'))
    }

    /// Exact-name lookup; properties shadow fields of the same name.
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members
            .iter()
            .find(|m| m.kind == MemberKind::Property && m.name == name)
            .or_else(|| self.members.iter().find(|m| m.kind == MemberKind::Field && m.name == name))
    }

    pub fn reference_members(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.members.iter().filter(|m| m.type_tag.is_reference())
    }

    pub fn default_values(&self) -> BTreeMap<String, Value> {
        self.members.iter().map(|m| (m.name.clone(), m.default.clone())).collect()
    }
}

/// Closed table of every component type a directive may name.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    descriptors: Vec<ComponentDescriptor>,
    by_qualified: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ComponentRegistry {
    pub fn empty() -> Self {
        let aliases = COMPONENT_ALIASES.iter().map(|(short, full)| (short.to_string(), full.to_string())).collect();
        Self { descriptors: Vec::new(), by_qualified: HashMap::new(), aliases }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for descriptor in builtin_descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// Adds or replaces a descriptor keyed by its qualified id.
    pub fn register(&mut self, descriptor: ComponentDescriptor) {
        match self.by_qualified.get(&descriptor.qualified) {
            Some(&index) => self.descriptors[index] = descriptor,
            None => {
                self.by_qualified.insert(descriptor.qualified.clone(), self.descriptors.len());
                self.descriptors.push(descriptor);
            }
        }
    }

    /// Registers a user script; returns its qualified id.
    pub fn register_script(&mut self, name: &str, fields: Vec<MemberDescriptor>) -> String {
        let qualified = format!("{SCRIPT_NAMESPACE}.{name}");
        let mut descriptor = ComponentDescriptor::new(name, &qualified);
        descriptor.members = fields;
        self.register(descriptor);
        qualified
    }

    /// Maps a directive's component name through the alias table.
    pub fn qualify<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn get(&self, qualified: &str) -> Option<&ComponentDescriptor> {
        self.by_qualified.get(qualified).map(|&index| &self.descriptors[index])
    }

    /// Alias, then qualified id, then `.Name` suffix in any namespace.
    pub fn resolve(&self, name: &str) -> Option<&ComponentDescriptor> {
        let qualified = self.qualify(name);
        if let Some(found) = self.get(qualified) {
            return Some(found);
        }
        let suffix = format!(".{name}");
        self.descriptors.iter().find(|d| d.qualified.ends_with(&suffix) || d.short_name == name)
    }

    pub fn in_family<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a ComponentDescriptor> + 'a {
        self.descriptors.iter().filter(move |d| d.family.as_deref() == Some(family))
    }

    pub fn is_in_family(&self, qualified: &str, family: &str) -> bool {
        self.get(qualified).and_then(|d| d.family.as_deref()) == Some(family)
    }

    pub fn descriptors(&self) -> &[ComponentDescriptor] {
        &self.descriptors
    }

    pub fn short_name<'a>(&'a self, qualified: &'a str) -> &'a str {
        self.get(qualified)
            .map(|d| d.short_name.as_str())
            .unwrap_or_else(|| qualified.rsplit('.').next().unwrap_or(qualified))
    }
}

fn collider(short: &str, qualified: &str) -> ComponentDescriptor {
    ComponentDescriptor::new(short, qualified)
        .in_family(COLLIDER_FAMILY)
        .with(MemberDescriptor::property("enabled", TypeTag::Bool).with_default(Value::Bool(true)))
        .with(MemberDescriptor::property("isTrigger", TypeTag::Bool))
        .with(MemberDescriptor::property("center", TypeTag::Vector3))
}

fn builtin_descriptors() -> Vec<ComponentDescriptor> {
    use glam::{Vec2, Vec3};
    use MemberDescriptor as M;
    let on = || Value::Bool(true);
    let one = || Value::Float(1.0);
    vec![
        ComponentDescriptor::new("Transform", TRANSFORM_TYPE)
            .with(M::property("position", TypeTag::Vector3))
            .with(M::property("localPosition", TypeTag::Vector3))
            .with(M::property("rotation", TypeTag::Vector3))
            .with(M::property("localEulerAngles", TypeTag::Vector3))
            .with(M::property("scale", TypeTag::Vector3))
            .with(M::property("localScale", TypeTag::Vector3)),
        ComponentDescriptor::new("RectTransform", "Engine.RectTransform")
            .with(M::property("anchoredPosition", TypeTag::Vector2))
            .with(M::property("sizeDelta", TypeTag::Vector2).with_default(Value::Vector2(Vec2::splat(100.0))))
            .with(M::property("pivot", TypeTag::Vector2).with_default(Value::Vector2(Vec2::splat(0.5)))),
        ComponentDescriptor::new("Rigidbody", "Engine.Physics.Rigidbody")
            .with(M::property("mass", TypeTag::Float).with_default(one()))
            .with(M::property("drag", TypeTag::Float))
            .with(M::property("angularDrag", TypeTag::Float).with_default(Value::Float(0.05)))
            .with(M::property("useGravity", TypeTag::Bool).with_default(on()))
            .with(M::property("isKinematic", TypeTag::Bool))
            .with(M::property("velocity", TypeTag::Vector3))
            .with(M::property(
                "constraints",
                TypeTag::enumeration(&["None", "FreezePosition", "FreezeRotation", "FreezeAll"]),
            )),
        collider("BoxCollider", "Engine.Physics.BoxCollider")
            .with(M::property("size", TypeTag::Vector3).with_default(Value::Vector3(Vec3::ONE))),
        collider("SphereCollider", "Engine.Physics.SphereCollider")
            .with(M::property("radius", TypeTag::Float).with_default(Value::Float(0.5))),
        collider("CapsuleCollider", "Engine.Physics.CapsuleCollider")
            .with(M::property("radius", TypeTag::Float).with_default(Value::Float(0.5)))
            .with(M::property("height", TypeTag::Float).with_default(Value::Float(2.0)))
            .with(M::property("direction", TypeTag::Int).with_default(Value::Int(1))),
        collider("MeshCollider", "Engine.Physics.MeshCollider").with(M::property("convex", TypeTag::Bool)),
        ComponentDescriptor::new("MeshRenderer", MESH_RENDERER_TYPE)
            .with(M::property("enabled", TypeTag::Bool).with_default(on()))
            .with(M::property(SHARED_MATERIAL_MEMBER, TypeTag::Material))
            .with(M::property("receiveShadows", TypeTag::Bool).with_default(on()))
            .with(M::property(
                "shadowCastingMode",
                TypeTag::enumeration(&["On", "Off", "TwoSided", "ShadowsOnly"]),
            )),
        ComponentDescriptor::new("MeshFilter", "Engine.Rendering.MeshFilter")
            .with(M::property("sharedMesh", TypeTag::AssetRef)),
        ComponentDescriptor::new("AudioSource", "Engine.Audio.AudioSource")
            .with(M::property("enabled", TypeTag::Bool).with_default(on()))
            .with(M::property("clip", TypeTag::AssetRef))
            .with(M::property("volume", TypeTag::Float).with_default(one()))
            .with(M::property("pitch", TypeTag::Float).with_default(one()))
            .with(M::property("loop", TypeTag::Bool))
            .with(M::property("mute", TypeTag::Bool))
            .with(M::property("playOnAwake", TypeTag::Bool).with_default(on())),
        ComponentDescriptor::new("AudioListener", "Engine.Audio.AudioListener")
            .with(M::property("enabled", TypeTag::Bool).with_default(on())),
        ComponentDescriptor::new("Camera", "Engine.Camera")
            .with(M::property("enabled", TypeTag::Bool).with_default(on()))
            .with(M::property("fieldOfView", TypeTag::Float).with_default(Value::Float(60.0)))
            .with(M::property("nearClipPlane", TypeTag::Float).with_default(Value::Float(0.3)))
            .with(M::property("farClipPlane", TypeTag::Float).with_default(Value::Float(1000.0)))
            .with(M::property("orthographic", TypeTag::Bool))
            .with(M::property("orthographicSize", TypeTag::Float).with_default(Value::Float(5.0)))
            .with(M::property("depth", TypeTag::Float))
            .with(M::property("backgroundColor", TypeTag::Color)),
        ComponentDescriptor::new("Light", "Engine.Light")
            .with(M::property("enabled", TypeTag::Bool).with_default(on()))
            .with(M::property("type", TypeTag::enumeration(&["Directional", "Point", "Spot", "Area"])))
            .with(M::property("color", TypeTag::Color))
            .with(M::property("intensity", TypeTag::Float).with_default(one()))
            .with(M::property("range", TypeTag::Float).with_default(Value::Float(10.0)))
            .with(M::property("spotAngle", TypeTag::Float).with_default(Value::Float(30.0)))
            .with(M::property("shadows", TypeTag::enumeration(&["None", "Hard", "Soft"]))),
        ComponentDescriptor::new("Animator", "Engine.Animator")
            .with(M::property("enabled", TypeTag::Bool).with_default(on()))
            .with(M::property("runtimeAnimatorController", TypeTag::AssetRef))
            .with(M::property("speed", TypeTag::Float).with_default(one()))
            .with(M::property("applyRootMotion", TypeTag::Bool)),
        ComponentDescriptor::new("Animation", "Engine.Animation")
            .with(M::property("clip", TypeTag::AssetRef))
            .with(M::property("playAutomatically", TypeTag::Bool).with_default(on())),
        ComponentDescriptor::new("ParticleSystem", "Engine.ParticleSystem")
            .with(M::property("useAutoRandomSeed", TypeTag::Bool).with_default(on()))
            .with(M::property("simulationSpeed", TypeTag::Float).with_default(one())),
        ComponentDescriptor::new("Text", "Engine.UI.Text")
            .with(M::property("text", TypeTag::String))
            .with(M::property("fontSize", TypeTag::Int).with_default(Value::Int(14)))
            .with(M::property("color", TypeTag::Color))
            .with(M::property(
                "alignment",
                TypeTag::enumeration(&["UpperLeft", "UpperCenter", "MiddleLeft", "MiddleCenter", "LowerCenter"]),
            )),
        ComponentDescriptor::new("Image", "Engine.UI.Image")
            .with(M::property("color", TypeTag::Color))
            .with(M::property("sprite", TypeTag::AssetRef))
            .with(M::property("fillAmount", TypeTag::Float).with_default(one()))
            .with(M::property("raycastTarget", TypeTag::Bool).with_default(on())),
        ComponentDescriptor::new("Button", "Engine.UI.Button")
            .with(M::property("interactable", TypeTag::Bool).with_default(on())),
        ComponentDescriptor::new("Canvas", "Engine.Canvas")
            .with(M::property(
                "renderMode",
                TypeTag::enumeration(&["ScreenSpaceOverlay", "ScreenSpaceCamera", "WorldSpace"]),
            ))
            .with(M::property("sortingOrder", TypeTag::Int)),
        ComponentDescriptor::new("CanvasGroup", "Engine.CanvasGroup")
            .with(M::property("alpha", TypeTag::Float).with_default(one()))
            .with(M::property("interactable", TypeTag::Bool).with_default(on()))
            .with(M::property("blocksRaycasts", TypeTag::Bool).with_default(on())),
    ]
}
