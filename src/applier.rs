use crate::autowire::{AssetScorer, AutoWirer, ComponentHeuristics, WireSettings};
use crate::batch::BatchId;
use crate::components::{ComponentRegistry, MESH_RENDERER_TYPE, SHARED_MATERIAL_MEMBER};
use crate::config::CopilotConfig;
use crate::directive::{FileEditDirective, SceneEditDirective};
use crate::ecs::{rotation_from_euler_degrees, ComponentHandle, ComponentSlot, SceneWorld, Transform3D};
use crate::error::{DirectiveError, DirectiveResult};
use crate::events::SystemMessage;
use crate::intent::PrimitiveRequest;
use crate::material_registry::MaterialRegistry;
use crate::prefab::AssetLibrary;
use crate::project::ProjectFs;
use crate::resolver::{
    find_entity, material_of, resolve_file_target, resolve_material_target, resolve_scene_target, MaterialTarget,
    MATERIAL_SHORTCUT,
};
use crate::undo::{FileSnapshot, SceneInverse, SceneMutation, UndoKind, UndoLedger};
use crate::value::{coerce, TypeTag, Value};
use bevy_ecs::prelude::Entity;
use glam::{Quat, Vec3, Vec4};
use tracing::{debug, info, warn};

/// Qualified id of the component that marks the viewpoint new objects spawn in front of.
const CAMERA_TYPE: &str = "Engine.Camera";

/// How far in front of the camera an unplaced primitive appears.
const SPAWN_DISTANCE: f32 = 3.0;

/// Marker the assistant leaves in place of unchanged code.
pub const EXISTING_CODE_MARKER: &str = "existing code";

/// Asks the user before the code-edit path touches the scene.
pub trait ApprovalGate {
    fn approve_entity_creation(&mut self, entity_name: &str) -> bool;
    fn approve_attach(&mut self, script: &str, entity_name: &str) -> bool;
}

/// Says yes to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ApprovalGate for AutoApprove {
    fn approve_entity_creation(&mut self, _entity_name: &str) -> bool {
        true
    }

    fn approve_attach(&mut self, _script: &str, _entity_name: &str) -> bool {
        true
    }
}

/// Says no to everything; file edits still land.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl ApprovalGate for DenyAll {
    fn approve_entity_creation(&mut self, _entity_name: &str) -> bool {
        false
    }

    fn approve_attach(&mut self, _script: &str, _entity_name: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    pub partial_merge: bool,
    pub autowire: bool,
    pub wire: WireSettings,
}

impl ApplyOptions {
    pub fn from_config(config: &CopilotConfig) -> Self {
        Self {
            partial_merge: config.partial_merge,
            autowire: config.autowire,
            wire: WireSettings {
                min_asset_score: config.min_asset_score,
                max_depth: config.max_autowire_depth,
                common_components: config.common_components,
            },
        }
    }
}

/// Applies resolved directives. Every mutation it makes is recorded in
/// `ledger` as exactly one entry before the call returns.
pub struct EditApplier<'a> {
    pub scene: &'a mut SceneWorld,
    pub materials: &'a mut MaterialRegistry,
    pub project: &'a mut dyn ProjectFs,
    pub ledger: &'a mut UndoLedger,
    pub registry: &'a ComponentRegistry,
    pub assets: &'a AssetLibrary,
    pub scorer: &'a dyn AssetScorer,
    pub heuristics: &'a ComponentHeuristics,
    pub approval: &'a mut dyn ApprovalGate,
    pub options: ApplyOptions,
    pub batch: Option<BatchId>,
    pub messages: &'a mut Vec<SystemMessage>,
}

impl EditApplier<'_> {
    // ---------- Files ----------

    /// Writes the file, records its prior state and attaches the script it defines.
    pub fn apply_file_edit(&mut self, edit: &FileEditDirective) -> DirectiveResult<()> {
        let path = resolve_file_target(&edit.path);
        self.write_file(&path, &edit.content)
            .map_err(|err| DirectiveError::application(format!("Error applying changes to {path}: {err:#}")))?;
        self.messages.push(SystemMessage::success(format!("Applied changes to {path}")));
        if self.scene.is_loaded() {
            self.attach_script(edit.stem());
        } else {
            debug!(target: "copilot::apply", path = %path, "no scene loaded, skipping script attach");
        }
        Ok(())
    }

    fn write_file(&mut self, path: &str, content: &str) -> anyhow::Result<()> {
        let prior = if self.project.exists(path) { Some(self.project.read(path)?) } else { None };
        let contents = match prior.as_deref() {
            Some(original) if self.options.partial_merge && content.contains(EXISTING_CODE_MARKER) => {
                match merge_partial(original, content) {
                    Some(merged) => merged,
                    None => {
                        warn!(target: "copilot::apply", path, "edited region not found, replacing whole file");
                        self.messages.push(SystemMessage::warning(format!(
                            "Could not locate the edited region in {path}; replaced the whole file"
                        )));
                        content.to_string()
                    }
                }
            }
            _ => content.to_string(),
        };
        self.project.write(path, &contents)?;
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let label = if prior.is_some() { format!("AI Edit: {file_name}") } else { format!("AI Create: {file_name}") };
        info!(target: "copilot::apply", path, new_file = prior.is_none(), "file written");
        self.ledger.push(label, self.batch, UndoKind::File(FileSnapshot { path: path.to_string(), prior }));
        self.project.refresh();
        Ok(())
    }

    /// Attaches script `stem` to the entity of the same name, asking first.
    fn attach_script(&mut self, stem: &str) {
        let mut mutation = SceneMutation::default();
        let entity = match find_entity(self.scene, stem) {
            Some(entity) => entity,
            None => {
                if !self.approval.approve_entity_creation(stem) {
                    self.messages.push(SystemMessage::info(format!("Skipped creating GameObject for script '{stem}'")));
                    return;
                }
                let entity = self.scene.spawn_named(stem, None);
                self.scene.mark_dirty(entity);
                mutation.push(SceneInverse::DespawnEntity { entity });
                self.messages.push(SystemMessage::success(format!("Created new GameObject '{stem}' for the script")));
                entity
            }
        };
        let entity_name = self.scene.name(entity).unwrap_or(stem).to_string();

        let registry = self.registry;
        match registry.resolve(stem) {
            None => self.messages.push(SystemMessage::warning(format!(
                "Could not find script type '{stem}'. Make sure the script name matches the class name."
            ))),
            Some(descriptor) => match self.scene.find_component(entity, &descriptor.qualified) {
                Some(existing) => {
                    self.messages.push(SystemMessage::info(format!(
                        "Script '{stem}' is already attached to GameObject '{entity_name}'"
                    )));
                    if self.options.autowire {
                        self.wirer(&mut mutation).assign_assets(existing);
                    }
                }
                None => {
                    if !self.approval.approve_attach(stem, &entity_name) {
                        self.messages.push(SystemMessage::info(format!(
                            "Skipped attaching script '{stem}' to GameObject '{entity_name}'"
                        )));
                    } else if let Some(handle) =
                        self.scene.add_component(entity, &descriptor.qualified, descriptor.default_values())
                    {
                        mutation.push(SceneInverse::RemoveComponent { handle });
                        self.scene.mark_dirty(entity);
                        self.messages.push(SystemMessage::success(format!(
                            "Attached script '{stem}' to GameObject '{entity_name}'"
                        )));
                        if self.options.autowire {
                            self.wirer(&mut mutation).initialize_component(handle, true);
                        }
                    }
                }
            },
        }
        self.record_scene(format!("Attach {stem}"), mutation);
    }

    // ---------- Scene ----------

    /// `Ok(true)` when the scene changed.
    pub fn apply_scene_edit(&mut self, edit: &SceneEditDirective) -> DirectiveResult<bool> {
        match edit {
            SceneEditDirective::CreateEntity { object_name, component_name } => {
                self.apply_create(object_name, component_name)
            }
            SceneEditDirective::SetProperty { object_path, component_name, property_name, raw_value } => {
                self.apply_set_property(object_path, component_name, property_name, raw_value).map(|_| true)
            }
        }
    }

    pub fn apply_create(&mut self, object_name: &str, component_name: &str) -> DirectiveResult<bool> {
        let registry = self.registry;
        let target = resolve_scene_target(self.scene, registry, object_name, component_name, true)?;
        let descriptor = target.descriptor;
        let mut mutation = SceneMutation::default();
        if target.entity_created {
            mutation.push(SceneInverse::DespawnEntity { entity: target.entity });
            self.scene.mark_dirty(target.entity);
            debug!(target: "copilot::apply", object = object_name, "created entity");
        }

        if target.component.is_some() {
            self.messages.push(SystemMessage::info(format!(
                "Component {} already exists on {object_name}",
                descriptor.qualified
            )));
            let changed = !mutation.is_empty();
            self.record_scene(format!("Create {object_name}"), mutation);
            return Ok(changed);
        }

        let handle = self
            .scene
            .add_component(target.entity, &descriptor.qualified, descriptor.default_values())
            .ok_or_else(|| DirectiveError::application(format!("Error adding component: {object_name} is gone")))?;
        mutation.push(SceneInverse::RemoveComponent { handle });
        self.scene.mark_dirty(target.entity);
        self.messages
            .push(SystemMessage::success(format!("Added component {} to {object_name}", descriptor.qualified)));
        if descriptor.is_script() && self.options.autowire {
            self.wirer(&mut mutation).initialize_component(handle, false);
        }
        self.record_scene(format!("Add {} to {object_name}", descriptor.short_name), mutation);
        Ok(true)
    }

    pub fn apply_set_property(
        &mut self,
        object_path: &str,
        component_name: &str,
        property_name: &str,
        raw_value: &str,
    ) -> DirectiveResult<()> {
        if component_name == MATERIAL_SHORTCUT {
            let target = resolve_material_target(self.scene, object_path)?;
            return self.set_material_color(target, object_path, raw_value);
        }

        let registry = self.registry;
        let target = resolve_scene_target(self.scene, registry, object_path, component_name, false)?;
        let handle = target
            .component
            .ok_or_else(|| DirectiveError::resolution(format!("Component not found: {component_name} on {object_path}")))?;
        let descriptor = target.descriptor;

        if handle.slot == ComponentSlot::Transform {
            return self.set_transform_property(handle.entity, object_path, component_name, property_name, raw_value);
        }
        if descriptor.qualified == MESH_RENDERER_TYPE && matches!(property_name, "color" | "material.color") {
            let target = material_of(self.scene, handle)?;
            return self.set_material_color(target, object_path, raw_value);
        }

        let member = descriptor.member(property_name).ok_or_else(|| {
            DirectiveError::resolution(format!("Property or field not found: {property_name} on {component_name}"))
        })?;
        let value = match &member.type_tag {
            TypeTag::Material => {
                let key = raw_value.trim();
                if !self.materials.has(key) {
                    return Err(DirectiveError::resolution(format!("Material not found: {key}")));
                }
                Value::Material(Some(key.to_string()))
            }
            tag => coerce(raw_value, tag)?,
        };
        let prior = self.scene.set_value(handle, &member.name, value).ok_or_else(|| {
            DirectiveError::application(format!("Error setting property: {component_name} is gone"))
        })?;
        self.scene.mark_dirty(handle.entity);
        let mut mutation = SceneMutation::default();
        mutation.push(SceneInverse::RestoreValue { handle, member: member.name.clone(), prior });
        self.record_scene(format!("Set {property_name} on {object_path}"), mutation);
        self.messages.push(SystemMessage::success(format!(
            "Set {object_path}/{component_name}/{property_name} = {raw_value}"
        )));
        Ok(())
    }

    fn set_transform_property(
        &mut self,
        entity: Entity,
        object_path: &str,
        component_name: &str,
        property_name: &str,
        raw_value: &str,
    ) -> DirectiveResult<()> {
        let Some(prior) = self.scene.transform(entity) else {
            return Err(DirectiveError::application(format!("Error setting property: {object_path} is gone")));
        };
        let mut next = prior;
        let label = match property_name {
            "position" | "localPosition" | "rotation" | "localEulerAngles" | "scale" | "localScale" => {
                let vector = coerce(raw_value, &TypeTag::Vector3)?.as_vec3().unwrap_or(Vec3::ZERO);
                match property_name {
                    "position" => {
                        next.translation = self.scene.local_from_world_position(entity, vector);
                        "position"
                    }
                    "localPosition" => {
                        next.translation = vector;
                        "localPosition"
                    }
                    "rotation" => {
                        let parent_rotation = self.parent_world_rotation(entity);
                        next.rotation = (parent_rotation.inverse() * rotation_from_euler_degrees(vector)).normalize();
                        "rotation"
                    }
                    "localEulerAngles" => {
                        next.set_euler_degrees(vector);
                        "localEulerAngles"
                    }
                    _ => {
                        next.scale = vector;
                        "scale"
                    }
                }
            }
            _ => {
                return Err(DirectiveError::resolution(format!(
                    "Property or field not found: {property_name} on {component_name}"
                )))
            }
        };
        self.scene.set_transform(entity, next);
        self.scene.mark_dirty(entity);
        let mut mutation = SceneMutation::default();
        mutation.push(SceneInverse::RestoreTransform { entity, prior });
        self.record_scene(format!("Set {label} on {object_path}"), mutation);
        self.messages.push(SystemMessage::success(format!("Set transform {label} = {raw_value} on {object_path}")));
        Ok(())
    }

    fn parent_world_rotation(&self, entity: Entity) -> Quat {
        match self.scene.parent(entity) {
            Some(parent) => self.scene.world_matrix(parent).to_scale_rotation_translation().1,
            None => Quat::IDENTITY,
        }
    }

    /// Clones the renderer's shared material and recolors the clone.
    fn set_material_color(&mut self, target: MaterialTarget, object_path: &str, raw_value: &str) -> DirectiveResult<()> {
        let color = coerce(raw_value, &TypeTag::Color)?.as_color().unwrap_or(Vec4::ONE);
        let instance = self.materials.instantiate(&target.material)?;
        self.materials.set_color(&instance, color)?;
        let renderer: ComponentHandle = target.renderer;
        let Some(prior) = self.scene.set_value(renderer, SHARED_MATERIAL_MEMBER, Value::Material(Some(instance.clone())))
        else {
            self.materials.remove_instance(&instance);
            return Err(DirectiveError::application(format!("Error setting material on {object_path}")));
        };
        let prior = prior.and_then(|v| v.as_material().map(str::to_string));
        self.scene.mark_dirty(renderer.entity);
        let mut mutation = SceneMutation::default();
        mutation.push(SceneInverse::RestoreMaterial { renderer, prior, instance });
        self.record_scene(format!("Set material color on {object_path}"), mutation);
        self.messages.push(SystemMessage::success(format!("Set material color = {raw_value} on {object_path}")));
        Ok(())
    }

    // ---------- Primitives ----------

    /// Builds a primitive the way the engine's "create primitive" menu does:
    /// mesh, renderer with its own colored material, and the matching collider.
    pub fn apply_primitive(&mut self, request: &PrimitiveRequest) -> DirectiveResult<Entity> {
        let registry = self.registry;
        let parts = ["MeshFilter", "MeshRenderer", request.shape.collider()];
        let mut descriptors = Vec::with_capacity(parts.len());
        for part in parts {
            let descriptor = registry
                .resolve(part)
                .ok_or_else(|| DirectiveError::resolution(format!("Component type not found: {part}")))?;
            descriptors.push(descriptor);
        }

        let position = request.placement.resolve(self.default_spawn_position());
        let transform = Transform3D { translation: position, rotation: Quat::IDENTITY, scale: request.scale };
        let entity = self.scene.spawn_with_transform(&request.name, transform, None);
        self.scene.mark_dirty(entity);
        let mut mutation = SceneMutation::default();
        mutation.push(SceneInverse::DespawnEntity { entity });

        for descriptor in descriptors {
            let mut values = descriptor.default_values();
            let mut instance = None;
            if descriptor.qualified == MESH_RENDERER_TYPE {
                let key = self.tinted_material(request.color)?;
                values.insert(SHARED_MATERIAL_MEMBER.to_string(), Value::Material(Some(key.clone())));
                instance = Some(key);
            } else if descriptor.member("sharedMesh").is_some() {
                values.insert("sharedMesh".to_string(), Value::Asset(Some(request.shape.mesh_asset())));
            }
            let Some(handle) = self.scene.add_component(entity, &descriptor.qualified, values) else {
                if let Some(instance) = instance {
                    self.materials.remove_instance(&instance);
                }
                continue;
            };
            if let Some(instance) = instance {
                mutation.push(SceneInverse::RestoreMaterial { renderer: handle, prior: None, instance });
            }
        }

        info!(target: "copilot::apply", shape = %request.shape, name = %request.name, "primitive created");
        self.record_scene(format!("Create {}", request.name), mutation);
        self.messages.push(SystemMessage::success(format!(
            "Created {} '{}' at ({:.2}, {:.2}, {:.2}) with scale ({:.2}, {:.2}, {:.2})",
            request.shape,
            request.name,
            position.x,
            position.y,
            position.z,
            request.scale.x,
            request.scale.y,
            request.scale.z
        )));
        Ok(entity)
    }

    fn tinted_material(&mut self, color: Vec4) -> DirectiveResult<String> {
        let default_key = self.materials.default_key().to_string();
        let instance = self.materials.instantiate(&default_key)?;
        self.materials.set_color(&instance, color)?;
        Ok(instance)
    }

    /// In front of the first camera in the scene, or the origin without one.
    fn default_spawn_position(&self) -> Vec3 {
        match self.scene.find_component_anywhere(CAMERA_TYPE) {
            Some(camera) => {
                let (_, rotation, translation) = self.scene.world_matrix(camera.entity).to_scale_rotation_translation();
                translation + rotation * Vec3::Z * SPAWN_DISTANCE
            }
            None => Vec3::ZERO,
        }
    }

    // ---------- Helpers ----------

    fn wirer<'w>(&'w mut self, mutation: &'w mut SceneMutation) -> AutoWirer<'w> {
        AutoWirer {
            scene: &mut *self.scene,
            registry: self.registry,
            assets: self.assets,
            scorer: self.scorer,
            heuristics: self.heuristics,
            settings: self.options.wire,
            mutation,
            messages: &mut *self.messages,
        }
    }

    fn record_scene(&mut self, label: String, mutation: SceneMutation) {
        if mutation.is_empty() {
            return;
        }
        self.ledger.push(label, self.batch, UndoKind::Scene(mutation));
    }
}

/// Splices an edit that elides unchanged code into `original`. The first
/// meaningful edit line anchors the region; `existing code` markers end it.
pub fn merge_partial(original: &str, edit: &str) -> Option<String> {
    let original_lines: Vec<&str> = original.split('\n').collect();
    let edit_lines: Vec<&str> = edit.split('\n').collect();

    let edit_start = edit_lines.iter().position(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with("//")
    })?;
    let anchor = edit_lines[edit_start].trim();
    let original_start = original_lines.iter().position(|line| line.trim() == anchor)?;

    let edit_end = (edit_start + 1..edit_lines.len())
        .find(|&i| edit_lines[i].contains(EXISTING_CODE_MARKER))
        .unwrap_or(edit_lines.len());
    let original_end = (original_start + 1..original_lines.len())
        .find(|&i| original_lines[i].contains(EXISTING_CODE_MARKER))
        .unwrap_or(original_lines.len());

    let mut merged: Vec<&str> = Vec::with_capacity(original_lines.len() + edit_lines.len());
    merged.extend_from_slice(&original_lines[..original_start]);
    merged.extend_from_slice(&edit_lines[edit_start..edit_end]);
    merged.extend_from_slice(&original_lines[original_end..]);
    Some(merged.join("\n"))
}
