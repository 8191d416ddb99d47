use crate::components::{ComponentRegistry, MemberDescriptor, COLLIDER_FAMILY};
use crate::ecs::{ComponentHandle, SceneWorld};
use crate::events::SystemMessage;
use crate::prefab::{AssetDescriptor, AssetLibrary};
use crate::undo::{SceneInverse, SceneMutation};
use crate::value::{TypeTag, Value};
use glam::Vec3;
use std::collections::HashMap;
use tracing::debug;

/// What a candidate asset is being compared against.
#[derive(Debug, Clone, Copy)]
pub struct ScoreQuery<'a> {
    pub field: &'a str,
    pub term: &'a str,
    pub description: Option<&'a str>,
    pub component: &'a str,
}

/// Scores how well an asset name fits a reference field. Higher is better.
pub trait AssetScorer {
    fn score(&self, asset_name: &str, query: &ScoreQuery<'_>) -> i32;
}

/// Substring heuristics over the asset name, all case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameSimilarityScorer;

impl AssetScorer for NameSimilarityScorer {
    fn score(&self, asset_name: &str, query: &ScoreQuery<'_>) -> i32 {
        let name = asset_name.to_lowercase();
        let contains = |needle: &str| !needle.is_empty() && name.contains(&needle.to_lowercase());
        let mut score = 0;
        if name == query.field.to_lowercase() {
            score += 100;
        }
        if contains(query.field) {
            score += 50;
        }
        if contains(query.term) {
            score += 30;
        }
        if query.description.is_some_and(contains) {
            score += 20;
        }
        if contains(query.component) {
            score += 10;
        }
        score
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAsset {
    pub asset: AssetDescriptor,
    pub score: i32,
}

/// Ordered, de-duplicated search terms for a reference field.
pub fn search_terms(field: &str, description: Option<&str>, component: &str) -> Vec<String> {
    let stripped = field.replace("Prefab", "");
    let mut terms = vec![field.to_string(), stripped.clone(), field.replace("prefab", "")];
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        terms.push(description.to_string());
        terms.push(description.to_lowercase());
    }
    terms.push(component.to_string());
    terms.push(component.to_lowercase());
    terms.push(field.to_lowercase());
    terms.push(stripped.to_lowercase());

    let mut unique = Vec::with_capacity(terms.len());
    for term in terms {
        if !term.trim().is_empty() && !unique.contains(&term) {
            unique.push(term);
        }
    }
    unique
}

/// Every asset any search term finds, best score first. Ties keep discovery order.
pub fn rank_assets(
    field: &str,
    description: Option<&str>,
    component: &str,
    library: &AssetLibrary,
    scorer: &dyn AssetScorer,
) -> Vec<RankedAsset> {
    let mut best: HashMap<String, (usize, RankedAsset)> = HashMap::new();
    for term in search_terms(field, description, component) {
        let query = ScoreQuery { field, term: &term, description, component };
        for asset in library.search(&term) {
            let score = scorer.score(&asset.name, &query);
            let discovered = best.len();
            let slot = best
                .entry(asset.path.clone())
                .or_insert_with(|| (discovered, RankedAsset { asset: asset.clone(), score }));
            slot.1.score = slot.1.score.max(score);
        }
    }
    let mut ranked: Vec<(usize, RankedAsset)> = best.into_values().collect();
    ranked.sort_by(|(a_order, a), (b_order, b)| b.score.cmp(&a.score).then_with(|| a_order.cmp(b_order)));
    ranked.into_iter().map(|(_, ranked)| ranked).collect()
}

/// A supporting component added when a script's name suggests it needs one.
#[derive(Debug, Clone)]
pub struct HeuristicRule {
    pub keywords: Vec<String>,
    pub component: String,
    /// Skip the rule when any component of this family is already present.
    pub family: Option<String>,
    pub preset: Vec<(String, Value)>,
    pub reason: String,
}

impl HeuristicRule {
    pub fn new(keywords: &[&str], component: &str, reason: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            component: component.to_string(),
            family: None,
            preset: Vec::new(),
            reason: reason.to_string(),
        }
    }

    pub fn preset(mut self, member: &str, value: Value) -> Self {
        self.preset.push((member.to_string(), value));
        self
    }

    pub fn unless_family(mut self, family: &str) -> Self {
        self.family = Some(family.to_string());
        self
    }

    pub fn matches(&self, script_name: &str) -> bool {
        let lowered = script_name.to_lowercase();
        self.keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct ComponentHeuristics {
    rules: Vec<HeuristicRule>,
}

impl Default for ComponentHeuristics {
    fn default() -> Self {
        Self {
            rules: vec![
                HeuristicRule::new(
                    &["player", "character", "movement", "physics"],
                    "Engine.Physics.Rigidbody",
                    "physics-based movement",
                )
                .preset("constraints", Value::Enum("FreezeRotation".to_string())),
                HeuristicRule::new(
                    &["player", "character", "collision", "physics"],
                    "Engine.Physics.BoxCollider",
                    "collision detection",
                )
                .unless_family(COLLIDER_FAMILY)
                .preset("size", Value::Vector3(Vec3::ONE)),
                HeuristicRule::new(&["audio", "sound", "music", "player"], "Engine.Audio.AudioSource", "audio playback"),
                HeuristicRule::new(&["animation", "animator", "player", "character"], "Engine.Animator", "animations"),
            ],
        }
    }
}

impl ComponentHeuristics {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: HeuristicRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn matching<'a>(&'a self, script_name: &'a str) -> impl Iterator<Item = &'a HeuristicRule> + 'a {
        self.rules.iter().filter(move |rule| rule.matches(script_name))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WireSettings {
    pub min_asset_score: i32,
    pub max_depth: usize,
    pub common_components: bool,
}

/// Best-effort dependency filling for a freshly attached component. Every
/// change lands in `mutation`; every decision lands in `messages`.
pub struct AutoWirer<'a> {
    pub scene: &'a mut SceneWorld,
    pub registry: &'a ComponentRegistry,
    pub assets: &'a AssetLibrary,
    pub scorer: &'a dyn AssetScorer,
    pub heuristics: &'a ComponentHeuristics,
    pub settings: WireSettings,
    pub mutation: &'a mut SceneMutation,
    pub messages: &'a mut Vec<SystemMessage>,
}

impl AutoWirer<'_> {
    /// Fills component and entity references, then assets. With `common`,
    /// supporting components suggested by the type name are added too.
    pub fn initialize_component(&mut self, handle: ComponentHandle, common: bool) {
        self.initialize_at_depth(handle, common, 0);
    }

    fn initialize_at_depth(&mut self, handle: ComponentHandle, common: bool, depth: usize) {
        let Some(type_name) = self.scene.component_type(handle).map(str::to_string) else {
            return;
        };
        let registry = self.registry;
        let Some(descriptor) = registry.get(&type_name) else {
            return;
        };
        for member in descriptor.reference_members() {
            match &member.type_tag {
                TypeTag::ComponentRef(target) => self.wire_component_ref(handle, member, target, common, depth),
                TypeTag::EntityRef => self.wire_entity_ref(handle, member),
                _ => {}
            }
        }
        self.assign_assets(handle);
        if common && self.settings.common_components {
            self.add_common_components(handle, &descriptor.short_name);
        }
    }

    fn owner_name(&self, handle: ComponentHandle) -> String {
        self.scene.name(handle.entity).unwrap_or_default().to_string()
    }

    fn set_reference(&mut self, handle: ComponentHandle, member: &str, value: Value) {
        if let Some(prior) = self.scene.set_value(handle, member, value) {
            self.mutation.push(SceneInverse::RestoreValue { handle, member: member.to_string(), prior });
            self.scene.mark_dirty(handle.entity);
        }
    }

    fn wire_component_ref(
        &mut self,
        handle: ComponentHandle,
        member: &MemberDescriptor,
        target: &str,
        common: bool,
        depth: usize,
    ) {
        let owner = self.owner_name(handle);
        let registry = self.registry;
        let Some(target_descriptor) = registry.resolve(target) else {
            self.messages.push(SystemMessage::warning(format!(
                "Cannot wire {} on {owner}: component type {target} not found",
                member.name
            )));
            return;
        };
        let qualified = target_descriptor.qualified.clone();
        let short = target_descriptor.short_name.clone();

        if let Some(existing) = self.scene.find_component(handle.entity, &qualified) {
            self.set_reference(handle, &member.name, Value::Component(Some(existing)));
            self.messages
                .push(SystemMessage::info(format!("Assigned existing {short} to {} on {owner}", member.name)));
            return;
        }
        if let Some(found) = self.scene.find_component_anywhere(&qualified) {
            self.set_reference(handle, &member.name, Value::Component(Some(found)));
            self.messages.push(SystemMessage::info(format!("Assigned scene {short} to {} on {owner}", member.name)));
            return;
        }
        if depth >= self.settings.max_depth {
            self.messages.push(SystemMessage::warning(format!(
                "Stopped wiring {} on {owner}: dependency chain deeper than {}",
                member.name, self.settings.max_depth
            )));
            return;
        }
        let Some(created) = self.scene.add_component(handle.entity, &qualified, target_descriptor.default_values())
        else {
            return;
        };
        self.mutation.push(SceneInverse::RemoveComponent { handle: created });
        self.set_reference(handle, &member.name, Value::Component(Some(created)));
        self.messages
            .push(SystemMessage::success(format!("Created and assigned new {short} to {} on {owner}", member.name)));
        debug!(target: "copilot::autowire", component = %qualified, depth, "recursing into new component");
        self.initialize_at_depth(created, common, depth + 1);
    }

    fn wire_entity_ref(&mut self, handle: ComponentHandle, member: &MemberDescriptor) {
        let owner = self.owner_name(handle);
        let field = member.name.as_str();
        if let Some(existing) = self.scene.find_by_name(field) {
            self.set_reference(handle, field, Value::Entity(Some(existing)));
            self.messages
                .push(SystemMessage::info(format!("Assigned existing GameObject '{field}' to {field} on {owner}")));
            return;
        }
        let created = self.scene.spawn_named(field, None);
        self.mutation.push(SceneInverse::DespawnEntity { entity: created });
        self.scene.mark_dirty(created);
        self.set_reference(handle, field, Value::Entity(Some(created)));
        self.messages
            .push(SystemMessage::success(format!("Created and assigned new GameObject '{field}' to {field} on {owner}")));
    }

    /// Points every asset field at the best-scoring library asset.
    pub fn assign_assets(&mut self, handle: ComponentHandle) {
        let Some(type_name) = self.scene.component_type(handle).map(str::to_string) else {
            return;
        };
        let registry = self.registry;
        let Some(descriptor) = registry.get(&type_name) else {
            return;
        };
        let script = descriptor.short_name.as_str();
        for member in descriptor.reference_members().filter(|m| m.type_tag == TypeTag::AssetRef) {
            let field = member.name.as_str();
            let ranked = rank_assets(field, member.description.as_deref(), script, self.assets, self.scorer);
            debug!(target: "copilot::autowire", field, candidates = ranked.len(), "ranked assets");
            match ranked.into_iter().next().filter(|best| best.score >= self.settings.min_asset_score) {
                Some(best) => {
                    self.set_reference(handle, field, Value::Asset(Some(best.asset.path.clone())));
                    self.messages.push(SystemMessage::success(format!(
                        "Assigned prefab '{}' to field '{field}' in '{script}'",
                        best.asset.name
                    )));
                }
                None => self.messages.push(SystemMessage::warning(format!(
                    "No suitable prefab found for field '{field}' in '{script}'. Please assign manually."
                ))),
            }
        }
    }

    fn add_common_components(&mut self, handle: ComponentHandle, script_name: &str) {
        let entity = handle.entity;
        let owner = self.owner_name(handle);
        let rules: Vec<HeuristicRule> = self.heuristics.matching(script_name).cloned().collect();
        for rule in rules {
            let Some(descriptor) = self.registry.get(&rule.component) else {
                continue;
            };
            if self.scene.find_component(entity, &descriptor.qualified).is_some() {
                continue;
            }
            if let Some(family) = rule.family.as_deref() {
                let registry = self.registry;
                if self.scene.find_component_where(entity, |t| registry.is_in_family(t, family)).is_some() {
                    continue;
                }
            }
            let mut values = descriptor.default_values();
            for (member, value) in &rule.preset {
                values.insert(member.clone(), value.clone());
            }
            let Some(added) = self.scene.add_component(entity, &descriptor.qualified, values) else {
                continue;
            };
            self.mutation.push(SceneInverse::RemoveComponent { handle: added });
            self.scene.mark_dirty(entity);
            self.messages.push(SystemMessage::success(format!(
                "Added {} to {owner} for {}",
                descriptor.short_name, rule.reason
            )));
        }
    }
}
