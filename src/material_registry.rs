use anyhow::{anyhow, Result};
use glam::Vec4;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDefinition {
    pub key: String,
    pub label: String,
    pub color: Vec4,
    /// Material this one was cloned from, when it is a per-renderer instance.
    pub instance_of: Option<String>,
}

struct MaterialEntry {
    definition: MaterialDefinition,
    permanent: bool,
}

/// Shared materials plus the private instances cloned off them.
pub struct MaterialRegistry {
    materials: BTreeMap<String, MaterialEntry>,
    default_material: String,
    next_instance: u64,
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialRegistry {
    pub fn new() -> Self {
        let default_material = "material::default".to_string();
        let mut registry = Self { materials: BTreeMap::new(), default_material: default_material.clone(), next_instance: 1 };
        let definition =
            MaterialDefinition { key: default_material.clone(), label: "Default".to_string(), color: Vec4::ONE, instance_of: None };
        registry.materials.insert(default_material, MaterialEntry { definition, permanent: true });
        registry
    }

    pub fn default_key(&self) -> &str {
        &self.default_material
    }

    pub fn register(&mut self, key: &str, label: &str, color: Vec4) {
        let definition =
            MaterialDefinition { key: key.to_string(), label: label.to_string(), color, instance_of: None };
        self.materials.insert(key.to_string(), MaterialEntry { definition, permanent: false });
    }

    /// Re-adds a definition verbatim, instances included.
    pub fn insert_definition(&mut self, definition: MaterialDefinition) {
        self.bump_instance_counter(&definition.key);
        self.materials.insert(definition.key.clone(), MaterialEntry { definition, permanent: false });
    }

    pub fn has(&self, key: &str) -> bool {
        self.materials.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &MaterialDefinition> {
        self.materials.values().map(|entry| &entry.definition)
    }

    pub fn definition(&self, key: &str) -> Option<&MaterialDefinition> {
        self.materials.get(key).map(|entry| &entry.definition)
    }

    pub fn color(&self, key: &str) -> Option<Vec4> {
        self.definition(key).map(|def| def.color)
    }

    pub fn set_color(&mut self, key: &str, color: Vec4) -> Result<()> {
        let entry = self.materials.get_mut(key).ok_or_else(|| anyhow!("Material '{key}' is not registered"))?;
        entry.definition.color = color;
        Ok(())
    }

    /// Clones `key` into a fresh private material and returns the new key.
    pub fn instantiate(&mut self, key: &str) -> Result<String> {
        let source = self.definition(key).cloned().ok_or_else(|| anyhow!("Material '{key}' is not registered"))?;
        let base = source.instance_of.clone().unwrap_or_else(|| source.key.clone());
        let mut instance_key = format!("{base} (Instance {})", self.next_instance);
        while self.materials.contains_key(&instance_key) {
            self.next_instance += 1;
            instance_key = format!("{base} (Instance {})", self.next_instance);
        }
        self.next_instance += 1;
        let definition = MaterialDefinition {
            key: instance_key.clone(),
            label: format!("{} (Instance)", source.label),
            color: source.color,
            instance_of: Some(base),
        };
        self.materials.insert(instance_key.clone(), MaterialEntry { definition, permanent: false });
        Ok(instance_key)
    }

    /// Drops a cloned instance. Shared materials are never removed this way.
    pub fn remove_instance(&mut self, key: &str) -> bool {
        let removable = self
            .materials
            .get(key)
            .map(|entry| !entry.permanent && entry.definition.instance_of.is_some())
            .unwrap_or(false);
        if removable {
            self.materials.remove(key);
        }
        removable
    }

    pub fn instance_count(&self) -> usize {
        self.materials.values().filter(|entry| entry.definition.instance_of.is_some()).count()
    }

    fn bump_instance_counter(&mut self, key: &str) {
        let Some(number) = key
            .rsplit_once("(Instance ")
            .and_then(|(_, tail)| tail.strip_suffix(')'))
            .and_then(|n| n.parse::<u64>().ok())
        else {
            return;
        };
        self.next_instance = self.next_instance.max(number + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_leave_shared_material_untouched() {
        let mut registry = MaterialRegistry::new();
        registry.register("Stone", "Stone", Vec4::new(0.5, 0.5, 0.5, 1.0));
        let instance = registry.instantiate("Stone").expect("instantiate");
        assert_eq!(instance, "Stone (Instance 1)");
        registry.set_color(&instance, Vec4::new(1.0, 0.0, 0.0, 1.0)).expect("set color");
        assert_eq!(registry.color("Stone"), Some(Vec4::new(0.5, 0.5, 0.5, 1.0)));

        let again = registry.instantiate(&instance).expect("instantiate instance");
        assert_eq!(again, "Stone (Instance 2)", "instances of instances count from the shared base");
        assert_eq!(registry.instance_count(), 2);
    }

    #[test]
    fn only_instances_can_be_removed() {
        let mut registry = MaterialRegistry::new();
        registry.register("Glass", "Glass", Vec4::ONE);
        let instance = registry.instantiate("Glass").expect("instantiate");
        assert!(!registry.remove_instance("Glass"));
        assert!(!registry.remove_instance("material::default"));
        assert!(registry.remove_instance(&instance));
        assert!(!registry.has(&instance));
        assert!(registry.instantiate("Missing").is_err());
    }
}
