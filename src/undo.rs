use crate::batch::BatchId;
use crate::components::SHARED_MATERIAL_MEMBER;
use crate::ecs::{ComponentHandle, SceneWorld, Transform3D};
use crate::material_registry::MaterialRegistry;
use crate::project::ProjectFs;
use crate::value::Value;
use anyhow::Result;
use bevy_ecs::prelude::Entity;
use std::collections::VecDeque;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Prior state of one file. `prior == None` means the edit created the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub path: String,
    pub prior: Option<String>,
}

impl FileSnapshot {
    pub fn is_new_file(&self) -> bool {
        self.prior.is_none()
    }

    fn file_name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }

    /// Puts the file back and returns the message to show the user.
    pub fn restore(&self, project: &mut dyn ProjectFs) -> Result<String> {
        let message = match &self.prior {
            None => {
                if project.exists(&self.path) {
                    project.remove(&self.path)?;
                }
                format!("Undo: deleted new file '{}'", self.file_name())
            }
            Some(contents) => {
                project.write(&self.path, contents)?;
                format!("Undo: reverted code changes in '{}'", self.file_name())
            }
        };
        project.refresh();
        Ok(message)
    }
}

/// The exact reverse of one scene change, captured when the change was made.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneInverse {
    DespawnEntity { entity: Entity },
    RemoveComponent { handle: ComponentHandle },
    RestoreValue { handle: ComponentHandle, member: String, prior: Option<Value> },
    RestoreTransform { entity: Entity, prior: Transform3D },
    RestoreMaterial { renderer: ComponentHandle, prior: Option<String>, instance: String },
}

impl SceneInverse {
    fn apply(self, scene: &mut SceneWorld, materials: &mut MaterialRegistry) -> bool {
        match self {
            SceneInverse::DespawnEntity { entity } => scene.despawn_entity(entity),
            SceneInverse::RemoveComponent { handle } => {
                let removed = scene.remove_component(handle).is_some();
                if removed {
                    scene.mark_dirty(handle.entity);
                }
                removed
            }
            SceneInverse::RestoreValue { handle, member, prior } => {
                let restored = match prior {
                    Some(value) => scene.set_value(handle, &member, value).is_some(),
                    None => scene.clear_value(handle, &member),
                };
                if restored {
                    scene.mark_dirty(handle.entity);
                }
                restored
            }
            SceneInverse::RestoreTransform { entity, prior } => {
                let restored = scene.set_transform(entity, prior);
                if restored {
                    scene.mark_dirty(entity);
                }
                restored
            }
            SceneInverse::RestoreMaterial { renderer, prior, instance } => {
                let restored = scene.set_value(renderer, SHARED_MATERIAL_MEMBER, Value::Material(prior)).is_some();
                materials.remove_instance(&instance);
                if restored {
                    scene.mark_dirty(renderer.entity);
                }
                restored
            }
        }
    }
}

/// Every inverse for one applier operation, undone newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMutation {
    pub inverses: Vec<SceneInverse>,
}

impl SceneMutation {
    pub fn push(&mut self, inverse: SceneInverse) {
        self.inverses.push(inverse);
    }

    pub fn is_empty(&self) -> bool {
        self.inverses.is_empty()
    }

    /// Returns how many inverses found their target still in place.
    pub fn revert(self, scene: &mut SceneWorld, materials: &mut MaterialRegistry) -> usize {
        let mut applied = 0;
        for inverse in self.inverses.into_iter().rev() {
            if inverse.apply(scene, materials) {
                applied += 1;
            }
        }
        applied
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoKind {
    File(FileSnapshot),
    Scene(SceneMutation),
}

#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub id: u64,
    pub label: String,
    pub batch: Option<BatchId>,
    pub timestamp: SystemTime,
    pub kind: UndoKind,
}

/// One LIFO stack for file and scene changes alike.
pub struct UndoLedger {
    entries: VecDeque<UndoEntry>,
    capacity: usize,
    next_id: u64,
}

impl UndoLedger {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::new(), capacity: capacity.max(1), next_id: 1 }
    }

    pub fn push(&mut self, label: impl Into<String>, batch: Option<BatchId>, kind: UndoKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let label = label.into();
        debug!(target: "copilot::undo", id, label = %label, "recorded undo entry");
        self.entries.push_back(UndoEntry { id, label, batch, timestamp: SystemTime::now(), kind });
        while self.entries.len() > self.capacity {
            if let Some(dropped) = self.entries.pop_front() {
                warn!(target: "copilot::undo", id = dropped.id, label = %dropped.label, "undo history full, dropping oldest entry");
            }
        }
        id
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    /// Pops every entry sharing the newest entry's batch, newest first.
    pub fn pop_batch(&mut self) -> Vec<UndoEntry> {
        let Some(top) = self.entries.pop_back() else {
            return Vec::new();
        };
        let batch = top.batch;
        let mut popped = vec![top];
        if batch.is_some() {
            while self.entries.back().is_some_and(|entry| entry.batch == batch) {
                if let Some(entry) = self.entries.pop_back() {
                    popped.push(entry);
                }
            }
        }
        popped
    }

    pub fn peek(&self) -> Option<&UndoEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UndoEntry> {
        self.entries.iter()
    }

    pub fn count_in_batch(&self, batch: BatchId) -> usize {
        self.entries.iter().filter(|entry| entry.batch == Some(batch)).count()
    }

    /// Drops scene entries and keeps file snapshots; returns how many were dropped.
    pub fn retain_files(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| matches!(entry.kind, UndoKind::File(_)));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!(target: "copilot::undo", dropped, "dropped scene entries for the previous scene");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> UndoKind {
        UndoKind::File(FileSnapshot { path: path.to_string(), prior: None })
    }

    #[test]
    fn pop_batch_stops_at_batch_boundary() {
        let mut ledger = UndoLedger::new(16);
        ledger.push("a", Some(BatchId(1)), file("a"));
        ledger.push("b", Some(BatchId(2)), file("b"));
        ledger.push("c", Some(BatchId(2)), file("c"));
        let popped: Vec<_> = ledger.pop_batch().into_iter().map(|e| e.label).collect();
        assert_eq!(popped, vec!["c", "b"]);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut ledger = UndoLedger::new(2);
        ledger.push("a", None, file("a"));
        ledger.push("b", None, file("b"));
        ledger.push("c", None, file("c"));
        let labels: Vec<_> = ledger.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "c"]);
        assert_eq!(ledger.pop_batch().len(), 1, "unbatched entries pop one at a time");
    }

    #[test]
    fn retain_files_keeps_file_snapshots_in_order() {
        let mut ledger = UndoLedger::new(16);
        ledger.push("a", Some(BatchId(1)), file("a"));
        ledger.push("scene", Some(BatchId(1)), UndoKind::Scene(SceneMutation::default()));
        ledger.push("b", Some(BatchId(2)), file("b"));
        assert_eq!(ledger.retain_files(), 1);
        let labels: Vec<_> = ledger.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }
}
