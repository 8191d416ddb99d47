use crate::value::Value;
use bevy_ecs::prelude::*;
use glam::{EulerRot, Mat4, Quat, Vec3};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Qualified id of the implicit transform every entity carries.
pub const TRANSFORM_TYPE: &str = "Engine.Transform";

#[derive(Component, Clone, Debug)]
pub struct EntityName(pub String);

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}
impl Default for Transform3D {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}
impl Transform3D {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Euler angles in degrees, applied z then x then y.
    pub fn euler_degrees(&self) -> Vec3 {
        let (y, x, z) = self.rotation.to_euler(EulerRot::YXZ);
        Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }

    pub fn set_euler_degrees(&mut self, degrees: Vec3) {
        self.rotation = rotation_from_euler_degrees(degrees);
    }
}

pub fn rotation_from_euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

#[derive(Component, Clone, Copy)]
pub struct Parent(pub Entity);
#[derive(Component, Default, Clone)]
pub struct Children(pub Vec<Entity>);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentSlot {
    Transform,
    Attached(ComponentId),
}

/// Addresses one component on one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    pub entity: Entity,
    pub slot: ComponentSlot,
}

impl ComponentHandle {
    pub fn transform(entity: Entity) -> Self {
        Self { entity, slot: ComponentSlot::Transform }
    }

    pub fn attached(entity: Entity, id: ComponentId) -> Self {
        Self { entity, slot: ComponentSlot::Attached(id) }
    }
}

impl fmt::Display for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            ComponentSlot::Transform => write!(f, "{}#transform", self.entity.index()),
            ComponentSlot::Attached(id) => write!(f, "{}#{}", self.entity.index(), id.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComponentInstance {
    pub id: ComponentId,
    pub type_name: String,
    pub values: BTreeMap<String, Value>,
}

impl ComponentInstance {
    pub fn value(&self, member: &str) -> Option<&Value> {
        self.values.get(member)
    }
}

#[derive(Component, Default, Clone)]
pub struct ComponentSet(pub SmallVec<[ComponentInstance; 4]>);

/// Read-only view handed to callers that list an entity.
#[derive(Clone, Debug)]
pub struct EntityInfo {
    pub entity: Entity,
    pub name: String,
    pub parent: Option<Entity>,
    pub transform: Transform3D,
    pub component_types: Vec<String>,
}
