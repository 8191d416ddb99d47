use crate::components::{ComponentRegistry, MemberDescriptor};
use crate::ecs::{ComponentHandle, ComponentSlot, SceneWorld, Transform3D};
use crate::material_registry::{MaterialDefinition, MaterialRegistry};
use crate::value::{TypeTag, Value};
use anyhow::{anyhow, bail, Context, Result};
use bevy_ecs::prelude::Entity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// On-disk form of a scene: script declarations, materials and entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<ScriptData>,
    #[serde(default)]
    pub materials: Vec<MaterialData>,
    #[serde(default)]
    pub entities: Vec<EntityData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptData {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldData {
    pub name: String,
    /// `float`, `Vector3`, `enum:A|B`, `component:Rigidbody`, `GameObject`, `asset`, ...
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialData {
    pub key: String,
    #[serde(default)]
    pub label: String,
    pub color: ColorData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_of: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityData {
    pub name: String,
    /// Index into `entities`; must precede this entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    #[serde(default)]
    pub transform: TransformData,
    #[serde(default)]
    pub components: Vec<ComponentData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformData {
    pub translation: Vec3Data,
    pub rotation: QuatData,
    pub scale: Vec3Data,
}

impl Default for TransformData {
    fn default() -> Self {
        Transform3D::default().into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentData {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub values: BTreeMap<String, ValueData>,
}

/// `component` is an index into the owning entity's component list; `None` is its transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRefData {
    pub entity: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ValueData {
    Float(f32),
    Int(i64),
    Bool(bool),
    String(String),
    Vector2(Vec2Data),
    Vector3(Vec3Data),
    Vector4(Vec4Data),
    Quaternion(QuatData),
    Color(ColorData),
    Enum(String),
    Material(Option<String>),
    Component(Option<ComponentRefData>),
    Entity(Option<usize>),
    Asset(Option<String>),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vec2Data {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vec4Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuatData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ColorData {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "default_alpha")]
    pub a: f32,
}

const fn default_alpha() -> f32 {
    1.0
}

impl From<glam::Vec2> for Vec2Data {
    fn from(value: glam::Vec2) -> Self {
        Self { x: value.x, y: value.y }
    }
}

impl From<Vec2Data> for glam::Vec2 {
    fn from(value: Vec2Data) -> Self {
        glam::Vec2::new(value.x, value.y)
    }
}

impl From<glam::Vec3> for Vec3Data {
    fn from(value: glam::Vec3) -> Self {
        Self { x: value.x, y: value.y, z: value.z }
    }
}

impl From<Vec3Data> for glam::Vec3 {
    fn from(value: Vec3Data) -> Self {
        glam::Vec3::new(value.x, value.y, value.z)
    }
}

impl From<glam::Vec4> for Vec4Data {
    fn from(value: glam::Vec4) -> Self {
        Self { x: value.x, y: value.y, z: value.z, w: value.w }
    }
}

impl From<Vec4Data> for glam::Vec4 {
    fn from(value: Vec4Data) -> Self {
        glam::Vec4::new(value.x, value.y, value.z, value.w)
    }
}

impl From<glam::Quat> for QuatData {
    fn from(value: glam::Quat) -> Self {
        Self { x: value.x, y: value.y, z: value.z, w: value.w }
    }
}

impl From<QuatData> for glam::Quat {
    fn from(value: QuatData) -> Self {
        glam::Quat::from_xyzw(value.x, value.y, value.z, value.w).normalize()
    }
}

impl From<glam::Vec4> for ColorData {
    fn from(value: glam::Vec4) -> Self {
        Self { r: value.x, g: value.y, b: value.z, a: value.w }
    }
}

impl From<ColorData> for glam::Vec4 {
    fn from(value: ColorData) -> Self {
        glam::Vec4::new(value.r, value.g, value.b, value.a)
    }
}

impl From<Transform3D> for TransformData {
    fn from(value: Transform3D) -> Self {
        Self { translation: value.translation.into(), rotation: value.rotation.into(), scale: value.scale.into() }
    }
}

impl From<TransformData> for Transform3D {
    fn from(value: TransformData) -> Self {
        Self { translation: value.translation.into(), rotation: value.rotation.into(), scale: value.scale.into() }
    }
}

/// Parses a declared field type such as `Vector3`, `enum:Idle|Run` or `component:Rigidbody`.
pub fn parse_type_tag(text: &str) -> Result<TypeTag> {
    let text = text.trim();
    if let Some(variants) = text.strip_prefix("enum:") {
        let variants: Vec<&str> = variants.split('|').map(str::trim).filter(|v| !v.is_empty()).collect();
        if variants.is_empty() {
            bail!("Enum type '{text}' declares no variants");
        }
        return Ok(TypeTag::enumeration(&variants));
    }
    if let Some(component) = text.strip_prefix("component:") {
        return Ok(TypeTag::ComponentRef(component.trim().to_string()));
    }
    let tag = match text.to_ascii_lowercase().as_str() {
        "float" | "single" | "double" => TypeTag::Float,
        "int" | "integer" | "long" => TypeTag::Int,
        "bool" | "boolean" => TypeTag::Bool,
        "string" => TypeTag::String,
        "vector2" => TypeTag::Vector2,
        "vector3" => TypeTag::Vector3,
        "vector4" => TypeTag::Vector4,
        "quaternion" => TypeTag::Quaternion,
        "color" => TypeTag::Color,
        "material" => TypeTag::Material,
        "gameobject" | "entity" => TypeTag::EntityRef,
        "asset" | "prefab" => TypeTag::AssetRef,
        _ => bail!("Unknown field type '{text}'"),
    };
    Ok(tag)
}

fn type_tag_name(tag: &TypeTag) -> String {
    match tag {
        TypeTag::Enum(variants) => format!("enum:{}", variants.join("|")),
        TypeTag::ComponentRef(component) => format!("component:{component}"),
        TypeTag::EntityRef => "GameObject".to_string(),
        TypeTag::AssetRef => "asset".to_string(),
        other => other.label(),
    }
}

impl SceneDocument {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading scene file {}", path.display()))?;
        let doc = serde_json::from_slice::<SceneDocument>(&bytes)
            .with_context(|| format!("Parsing scene file {}", path.display()))?;
        Ok(doc)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Creating scene directory {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json.as_bytes()).with_context(|| format!("Writing scene file {}", path.display()))?;
        Ok(())
    }

    /// Registers the declared scripts and materials, then builds the world.
    pub fn instantiate(&self, registry: &mut ComponentRegistry, materials: &mut MaterialRegistry) -> Result<SceneWorld> {
        for script in &self.scripts {
            let fields = script
                .fields
                .iter()
                .map(|field| {
                    let tag = parse_type_tag(&field.type_name)
                        .with_context(|| format!("Script '{}' field '{}'", script.name, field.name))?;
                    let member = MemberDescriptor::field(&field.name, tag);
                    Ok(match &field.description {
                        Some(description) => member.described(description),
                        None => member,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            registry.register_script(&script.name, fields);
        }
        for material in &self.materials {
            let label = if material.label.is_empty() { material.key.clone() } else { material.label.clone() };
            materials.insert_definition(MaterialDefinition {
                key: material.key.clone(),
                label,
                color: material.color.into(),
                instance_of: material.instance_of.clone(),
            });
        }

        let mut world = SceneWorld::with_scene(self.name.clone());
        let mut spawned: Vec<Entity> = Vec::with_capacity(self.entities.len());
        let mut handles: Vec<Vec<ComponentHandle>> = Vec::with_capacity(self.entities.len());
        for (index, data) in self.entities.iter().enumerate() {
            let parent = match data.parent {
                Some(p) if p < index => Some(spawned[p]),
                Some(p) => bail!("Entity '{}' (#{index}) references parent #{p} defined after it", data.name),
                None => None,
            };
            let entity = world.spawn_with_transform(&data.name, data.transform.clone().into(), parent);
            let mut entity_handles = Vec::with_capacity(data.components.len());
            for component in &data.components {
                let descriptor = registry
                    .resolve(&component.type_name)
                    .ok_or_else(|| anyhow!("Unknown component type '{}' on '{}'", component.type_name, data.name))?;
                let handle = world
                    .add_component(entity, &descriptor.qualified, descriptor.default_values())
                    .ok_or_else(|| anyhow!("Entity '{}' vanished while loading", data.name))?;
                entity_handles.push(handle);
            }
            spawned.push(entity);
            handles.push(entity_handles);
        }

        // Values go in after every entity exists so references can point forward.
        for (data, entity_handles) in self.entities.iter().zip(&handles) {
            for (component, &handle) in data.components.iter().zip(entity_handles) {
                for (member, value) in &component.values {
                    let value = value_from_data(value, &spawned, &handles)
                        .with_context(|| format!("'{}' {}.{member}", data.name, component.type_name))?;
                    world.set_value(handle, member, value);
                }
            }
        }
        world.mark_saved();
        Ok(world)
    }

    /// Captures `world` and `materials` in document form.
    pub fn capture(world: &SceneWorld, registry: &ComponentRegistry, materials: &MaterialRegistry) -> Self {
        let order: Vec<Entity> = world.entities().collect();
        let index_of: HashMap<Entity, usize> = order.iter().enumerate().map(|(i, &e)| (e, i)).collect();
        let component_ref = |handle: ComponentHandle| -> Option<ComponentRefData> {
            let entity = *index_of.get(&handle.entity)?;
            let component = match handle.slot {
                ComponentSlot::Transform => None,
                ComponentSlot::Attached(id) => Some(world.components(handle.entity).iter().position(|c| c.id == id)?),
            };
            Some(ComponentRefData { entity, component })
        };

        let entities = order
            .iter()
            .map(|&entity| EntityData {
                name: world.name(entity).unwrap_or_default().to_string(),
                parent: world.parent(entity).and_then(|p| index_of.get(&p).copied()),
                transform: world.transform(entity).unwrap_or_default().into(),
                components: world
                    .components(entity)
                    .iter()
                    .map(|instance| ComponentData {
                        type_name: instance.type_name.clone(),
                        values: instance
                            .values
                            .iter()
                            .map(|(member, value)| {
                                (member.clone(), value_to_data(value, &index_of, &component_ref))
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let scripts = registry
            .descriptors()
            .iter()
            .filter(|d| d.is_script())
            .map(|d| ScriptData {
                name: d.short_name.clone(),
                fields: d
                    .members
                    .iter()
                    .map(|m| FieldData {
                        name: m.name.clone(),
                        type_name: type_tag_name(&m.type_tag),
                        description: m.description.clone(),
                    })
                    .collect(),
            })
            .collect();

        let materials = materials
            .definitions()
            .filter(|def| def.key != materials.default_key())
            .map(|def| MaterialData {
                key: def.key.clone(),
                label: def.label.clone(),
                color: def.color.into(),
                instance_of: def.instance_of.clone(),
            })
            .collect();

        SceneDocument { name: world.scene_name().unwrap_or_default().to_string(), scripts, materials, entities }
    }
}

fn value_to_data(
    value: &Value,
    index_of: &HashMap<Entity, usize>,
    component_ref: &dyn Fn(ComponentHandle) -> Option<ComponentRefData>,
) -> ValueData {
    match value {
        Value::Float(v) => ValueData::Float(*v),
        Value::Int(v) => ValueData::Int(*v),
        Value::Bool(v) => ValueData::Bool(*v),
        Value::String(v) => ValueData::String(v.clone()),
        Value::Vector2(v) => ValueData::Vector2((*v).into()),
        Value::Vector3(v) => ValueData::Vector3((*v).into()),
        Value::Vector4(v) => ValueData::Vector4((*v).into()),
        Value::Quaternion(q) => ValueData::Quaternion((*q).into()),
        Value::Color(c) => ValueData::Color((*c).into()),
        Value::Enum(v) => ValueData::Enum(v.clone()),
        Value::Material(key) => ValueData::Material(key.clone()),
        Value::Component(handle) => ValueData::Component(handle.and_then(component_ref)),
        Value::Entity(entity) => ValueData::Entity(entity.and_then(|e| index_of.get(&e).copied())),
        Value::Asset(path) => ValueData::Asset(path.clone()),
    }
}

fn value_from_data(data: &ValueData, spawned: &[Entity], handles: &[Vec<ComponentHandle>]) -> Result<Value> {
    let value = match data {
        ValueData::Float(v) => Value::Float(*v),
        ValueData::Int(v) => Value::Int(*v),
        ValueData::Bool(v) => Value::Bool(*v),
        ValueData::String(v) => Value::String(v.clone()),
        ValueData::Vector2(v) => Value::Vector2((*v).into()),
        ValueData::Vector3(v) => Value::Vector3((*v).into()),
        ValueData::Vector4(v) => Value::Vector4((*v).into()),
        ValueData::Quaternion(q) => Value::Quaternion((*q).into()),
        ValueData::Color(c) => Value::Color((*c).into()),
        ValueData::Enum(v) => Value::Enum(v.clone()),
        ValueData::Material(key) => Value::Material(key.clone()),
        ValueData::Asset(path) => Value::Asset(path.clone()),
        ValueData::Entity(None) => Value::Entity(None),
        ValueData::Entity(Some(index)) => {
            Value::Entity(Some(*spawned.get(*index).ok_or_else(|| anyhow!("Entity reference #{index} out of range"))?))
        }
        ValueData::Component(None) => Value::Component(None),
        ValueData::Component(Some(reference)) => {
            let entity = *spawned
                .get(reference.entity)
                .ok_or_else(|| anyhow!("Component reference to entity #{} out of range", reference.entity))?;
            let handle = match reference.component {
                None => ComponentHandle::transform(entity),
                Some(slot) => *handles
                    .get(reference.entity)
                    .and_then(|list| list.get(slot))
                    .ok_or_else(|| anyhow!("Component reference #{}:{slot} out of range", reference.entity))?,
            };
            Value::Component(Some(handle))
        }
    };
    Ok(value)
}
