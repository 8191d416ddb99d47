use crate::applier::{ApplyOptions, AutoApprove, EditApplier};
use crate::autowire::{AssetScorer, ComponentHeuristics, NameSimilarityScorer};
use crate::batch::{BatchCoordinator, BatchId};
use crate::components::ComponentRegistry;
use crate::config::CopilotConfig;
use crate::directive::{Directive, DirectiveExtractor, FileEditDirective, SceneEditDirective};
use crate::ecs::SceneWorld;
use crate::error::DirectiveError;
use crate::events::{MessageLog, SystemMessage};
use crate::intent::CreationIntentParser;
use crate::material_registry::MaterialRegistry;
use crate::prefab::AssetLibrary;
use crate::project::ProjectFs;
use crate::scene::SceneDocument;
use crate::scene_summary::SceneSummaryCache;
use crate::undo::{UndoEntry, UndoKind, UndoLedger};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

pub use crate::applier::ApprovalGate;

/// Undo group every reply is applied under.
pub const BATCH_NAME: &str = "AI Batch Edits";

/// One editing session: the open scene, the project on disk and everything
/// needed to turn assistant replies into edits and take them back.
pub struct Copilot {
    scene: SceneWorld,
    materials: MaterialRegistry,
    project: Box<dyn ProjectFs>,
    assets: AssetLibrary,
    registry: ComponentRegistry,
    ledger: UndoLedger,
    batches: BatchCoordinator,
    summary: SceneSummaryCache,
    config: CopilotConfig,
    extractor: DirectiveExtractor,
    intent: CreationIntentParser,
    scorer: Box<dyn AssetScorer>,
    heuristics: ComponentHeuristics,
    approval: Box<dyn ApprovalGate>,
    log: MessageLog,
}

impl Copilot {
    pub fn new(config: CopilotConfig, project: Box<dyn ProjectFs>) -> Result<Self> {
        let extractor = DirectiveExtractor::new(&config.file_edit_languages)
            .with_context(|| format!("Building directive patterns for {:?}", config.file_edit_languages))?;
        let intent = CreationIntentParser::new().context("Building creation request patterns")?;
        Ok(Self {
            scene: SceneWorld::new(),
            materials: MaterialRegistry::new(),
            project,
            assets: AssetLibrary::in_memory(),
            registry: ComponentRegistry::with_builtins(),
            ledger: UndoLedger::new(config.undo_capacity),
            log: MessageLog::with_capacity(config.message_capacity),
            batches: BatchCoordinator::new(),
            summary: SceneSummaryCache::new(),
            config,
            extractor,
            intent,
            scorer: Box::new(NameSimilarityScorer),
            heuristics: ComponentHeuristics::default(),
            approval: Box::new(AutoApprove),
        })
    }

    pub fn with_assets(mut self, assets: AssetLibrary) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_approval(mut self, approval: Box<dyn ApprovalGate>) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn AssetScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_heuristics(mut self, heuristics: ComponentHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Replaces the open scene. Scene undo entries refer to the old world and
    /// are dropped; file snapshots stay undoable.
    pub fn open_scene(&mut self, scene: SceneWorld, materials: MaterialRegistry) {
        info!(target: "copilot::scene", scene = scene.scene_name().unwrap_or("<none>"), "scene opened");
        self.scene = scene;
        self.materials = materials;
        self.ledger.retain_files();
        self.summary.invalidate();
    }

    pub fn load_scene(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let doc = SceneDocument::load_from_path(path)?;
        let mut materials = MaterialRegistry::new();
        let scene = doc.instantiate(&mut self.registry, &mut materials)?;
        self.open_scene(scene, materials);
        Ok(())
    }

    pub fn save_scene(&mut self, path: impl AsRef<Path>) -> Result<()> {
        SceneDocument::capture(&self.scene, &self.registry, &self.materials).save_to_path(path)?;
        self.scene.mark_saved();
        Ok(())
    }

    pub fn scene(&self) -> &SceneWorld {
        &self.scene
    }

    /// Direct access for hosts; call `invalidate_summary` after editing.
    pub fn scene_mut(&mut self) -> &mut SceneWorld {
        &mut self.scene
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialRegistry {
        &mut self.materials
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn assets_mut(&mut self) -> &mut AssetLibrary {
        &mut self.assets
    }

    pub fn ledger(&self) -> &UndoLedger {
        &self.ledger
    }

    pub fn batches(&self) -> &BatchCoordinator {
        &self.batches
    }

    pub fn config(&self) -> &CopilotConfig {
        &self.config
    }

    /// Everything reported so far, oldest first.
    pub fn messages(&self) -> &MessageLog {
        &self.log
    }

    pub fn take_messages(&mut self) -> Vec<SystemMessage> {
        self.log.drain()
    }

    pub fn scene_summary(&mut self) -> &str {
        self.summary.summary(&self.scene, &self.registry)
    }

    /// Collider layout and scene bounds, cached alongside the summary.
    pub fn spatial_information(&mut self) -> &str {
        self.summary.spatial(&self.scene, &self.registry)
    }

    pub fn invalidate_summary(&mut self) {
        self.summary.invalidate();
    }

    /// Applies every directive in one assistant reply as a single batch.
    /// File edits run first so scripts exist before scene edits name them.
    pub fn apply_response(&mut self, text: &str) -> Vec<SystemMessage> {
        let directives = self.extractor.extract(text);
        if directives.is_empty() {
            debug!(target: "copilot::batch", "reply carried no directives");
            return Vec::new();
        }

        let mut files: Vec<FileEditDirective> = Vec::new();
        let mut scene_edits: Vec<Result<SceneEditDirective, DirectiveError>> = Vec::new();
        for directive in directives {
            match directive {
                Ok(Directive::FileEdit(edit)) => files.push(edit),
                Ok(Directive::SceneEdit(edit)) => scene_edits.push(Ok(edit)),
                Err(err) => scene_edits.push(Err(DirectiveError::Parse(err.message))),
            }
        }

        let batch = self.batches.open(BATCH_NAME);
        let mut messages = Vec::new();
        for edit in &files {
            if let Err(err) = self.applier(batch, &mut messages).apply_file_edit(edit) {
                warn!(target: "copilot::apply", class = err.class(), path = %edit.path, "{err}");
                messages.push(SystemMessage::from(&err));
            }
        }

        if !scene_edits.is_empty() && !self.scene.is_loaded() {
            messages.push(SystemMessage::warning("No scene is currently loaded. Scene edits were ignored."));
        } else {
            for edit in scene_edits {
                let outcome = edit.and_then(|edit| self.applier(batch, &mut messages).apply_scene_edit(&edit));
                if let Err(err) = outcome {
                    warn!(target: "copilot::apply", class = err.class(), "{err}");
                    messages.push(SystemMessage::from(&err));
                }
            }
        }

        let scene_changed =
            self.ledger.iter().any(|entry| entry.batch == Some(batch) && matches!(entry.kind, UndoKind::Scene(_)));
        if scene_changed {
            self.summary.invalidate();
            messages.push(SystemMessage::info("Scene modifications applied. Remember to save your scene."));
        }
        let entries = self.ledger.count_in_batch(batch);
        self.batches.close(batch, entries);
        self.scene.mark_scene_dirty();
        info!(target: "copilot::batch", %batch, entries, messages = messages.len(), "reply applied");

        self.log.extend(messages.iter().cloned());
        messages
    }

    /// Handles a plain request such as "create a red cube at (0, 1, 0)" without
    /// going through the assistant. Returns `None` when the text asks for
    /// nothing this can build.
    pub fn create_from_query(&mut self, query: &str) -> Option<Vec<SystemMessage>> {
        if !self.intent.has_creation_intent(query) {
            return None;
        }
        let request = self.intent.parse(query)?;
        if !self.scene.is_loaded() {
            let message = SystemMessage::warning("No scene is currently loaded. Open a scene before creating objects.");
            self.log.push(message.clone());
            return Some(vec![message]);
        }

        let batch = self.batches.open(BATCH_NAME);
        let mut messages = vec![SystemMessage::info("Created object based on your request.")];
        if let Err(err) = self.applier(batch, &mut messages).apply_primitive(&request) {
            warn!(target: "copilot::apply", class = err.class(), shape = %request.shape, "{err}");
            messages.push(SystemMessage::from(&err));
        }
        let entries = self.ledger.count_in_batch(batch);
        self.batches.close(batch, entries);
        if entries > 0 {
            self.summary.invalidate();
            self.scene.mark_scene_dirty();
        }
        info!(target: "copilot::batch", %batch, entries, "creation request applied");

        self.log.extend(messages.iter().cloned());
        Some(messages)
    }

    /// Reverts the newest ledger entry, file or scene alike.
    pub fn undo_last(&mut self) -> SystemMessage {
        let message = match self.ledger.pop() {
            Some(entry) => self.revert(entry),
            None => self.nothing_to_undo(),
        };
        self.log.push(message.clone());
        message
    }

    /// Reverts every entry recorded while applying the newest reply.
    pub fn undo_last_batch(&mut self) -> Vec<SystemMessage> {
        let entries = self.ledger.pop_batch();
        let messages = if entries.is_empty() {
            vec![self.nothing_to_undo()]
        } else {
            entries.into_iter().map(|entry| self.revert(entry)).collect()
        };
        self.log.extend(messages.iter().cloned());
        messages
    }

    fn revert(&mut self, entry: UndoEntry) -> SystemMessage {
        debug!(target: "copilot::undo", id = entry.id, label = %entry.label, "reverting");
        match entry.kind {
            UndoKind::File(snapshot) => match snapshot.restore(self.project.as_mut()) {
                Ok(text) => SystemMessage::success(text),
                Err(err) => {
                    warn!(target: "copilot::undo", path = %snapshot.path, "undo failed: {err:#}");
                    SystemMessage::error(format!("Error undoing changes to {}: {err:#}", snapshot.path))
                }
            },
            UndoKind::Scene(mutation) => {
                let applied = mutation.revert(&mut self.scene, &mut self.materials);
                self.summary.invalidate();
                if applied == 0 {
                    SystemMessage::warning(format!("Undo: '{}' had nothing left to revert", entry.label))
                } else {
                    SystemMessage::success(format!("Undo: {}", entry.label))
                }
            }
        }
    }

    fn nothing_to_undo(&self) -> SystemMessage {
        match self.scene.scene_name() {
            Some(name) => SystemMessage::info(format!("Nothing to undo in scene '{name}'")),
            None => SystemMessage::info("Nothing to undo"),
        }
    }

    fn applier<'a>(&'a mut self, batch: BatchId, messages: &'a mut Vec<SystemMessage>) -> EditApplier<'a> {
        EditApplier {
            scene: &mut self.scene,
            materials: &mut self.materials,
            project: self.project.as_mut(),
            ledger: &mut self.ledger,
            registry: &self.registry,
            assets: &self.assets,
            scorer: self.scorer.as_ref(),
            heuristics: &self.heuristics,
            approval: self.approval.as_mut(),
            options: ApplyOptions::from_config(&self.config),
            batch: Some(batch),
            messages,
        }
    }
}
