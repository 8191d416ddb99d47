use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch {}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub id: BatchId,
    pub name: String,
    pub entries: usize,
}

/// Groups the undo entries recorded while handling one reply.
#[derive(Debug, Default)]
pub struct BatchCoordinator {
    next_id: u64,
    open: Option<(BatchId, String)>,
    history: Vec<BatchRecord>,
}

impl BatchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a named group. An unclosed group is closed empty first.
    pub fn open(&mut self, name: &str) -> BatchId {
        if let Some((id, name)) = self.open.take() {
            self.history.push(BatchRecord { id, name, entries: 0 });
        }
        self.next_id += 1;
        let id = BatchId(self.next_id);
        debug!(target: "copilot::batch", %id, name, "batch opened");
        self.open = Some((id, name.to_string()));
        id
    }

    /// Closes `id`, recording how many undo entries landed in it.
    pub fn close(&mut self, id: BatchId, entries: usize) -> Option<BatchRecord> {
        let (open_id, name) = self.open.take()?;
        if open_id != id {
            self.open = Some((open_id, name));
            return None;
        }
        debug!(target: "copilot::batch", %id, entries, "batch closed");
        let record = BatchRecord { id, name, entries };
        self.history.push(record.clone());
        Some(record)
    }

    pub fn current(&self) -> Option<BatchId> {
        self.open.as_ref().map(|(id, _)| *id)
    }

    pub fn name_of(&self, id: BatchId) -> Option<&str> {
        self.open
            .iter()
            .filter(|(open_id, _)| *open_id == id)
            .map(|(_, name)| name.as_str())
            .chain(self.history.iter().filter(|r| r.id == id).map(|r| r.name.as_str()))
            .next()
    }

    pub fn history(&self) -> &[BatchRecord] {
        &self.history
    }
}
