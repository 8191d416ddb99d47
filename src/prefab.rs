use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetKind {
    Prefab,
    Json,
}

impl AssetKind {
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Prefab => "prefab",
            AssetKind::Json => "json",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "prefab" => Some(AssetKind::Prefab),
            "json" => Some(AssetKind::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub name: String,
    pub kind: AssetKind,
    /// Project-relative path with `/` separators.
    pub path: String,
}

/// Index of prefab assets that reference fields can be wired to.
pub struct AssetLibrary {
    root: PathBuf,
    scanned: Vec<AssetDescriptor>,
    manual: Vec<AssetDescriptor>,
    revision: u64,
}

impl AssetLibrary {
    /// Scans `root`; descriptor paths start at the root directory's own name.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), scanned: Vec::new(), manual: Vec::new(), revision: 0 }
    }

    /// A library that only knows registered assets.
    pub fn in_memory() -> Self {
        Self::new(PathBuf::new())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn register(&mut self, name: &str, path: &str) {
        let kind = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(AssetKind::from_extension)
            .unwrap_or(AssetKind::Prefab);
        self.manual.retain(|asset| asset.path != path);
        self.manual.push(AssetDescriptor { name: name.to_string(), kind, path: path.to_string() });
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn entries(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.scanned.iter().chain(self.manual.iter())
    }

    /// Rescans the root directory tree. A missing root yields an empty scan.
    pub fn refresh(&mut self) -> Result<()> {
        let mut grouped: BTreeMap<String, AssetDescriptor> = BTreeMap::new();
        if !self.root.as_os_str().is_empty() && self.root.is_dir() {
            let mut pending = vec![self.root.clone()];
            while let Some(dir) = pending.pop() {
                for entry in
                    fs::read_dir(&dir).with_context(|| format!("Scanning assets under {}", dir.display()))?
                {
                    let entry = entry?;
                    let path = entry.path();
                    if entry.file_type()?.is_dir() {
                        pending.push(path);
                        continue;
                    }
                    let Some(kind) = path.extension().and_then(|ext| ext.to_str()).and_then(AssetKind::from_extension)
                    else {
                        continue;
                    };
                    let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                        continue;
                    };
                    let relative = self.relative_path(&path);
                    grouped.insert(
                        relative.clone(),
                        AssetDescriptor { name: name.to_string(), kind, path: relative },
                    );
                }
            }
        }
        self.scanned = grouped.into_values().collect();
        self.scanned
            .sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.path.cmp(&b.path)));
        self.revision = self.revision.wrapping_add(1);
        Ok(())
    }

    /// Assets whose name contains `term`, ignoring case. Empty terms match nothing.
    pub fn search(&self, term: &str) -> Vec<&AssetDescriptor> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries().filter(|asset| asset.name.to_lowercase().contains(&needle)).collect()
    }

    pub fn version(&self) -> u64 {
        self.revision
    }

    fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let joined = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
        match self.root.file_name().and_then(|name| name.to_str()) {
            Some(root_name) => format!("{root_name}/{joined}"),
            None => joined,
        }
    }
}
