use super::{archives, automation, desktop, files, memory, meta, network, processes, security, system, utilities};
use super::{Command, CommandSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Command lookup by lowercase name.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registry holding the full built-in catalogue.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        files::register(&mut registry);
        processes::register(&mut registry);
        system::register(&mut registry);
        network::register(&mut registry);
        memory::register(&mut registry);
        utilities::register(&mut registry);
        security::register(&mut registry);
        archives::register(&mut registry);
        desktop::register(&mut registry);
        automation::register(&mut registry);
        meta::register(&mut registry);
        registry
    }

    pub fn register(&mut self, command: Arc<dyn Command>) -> &mut Self {
        self.commands
            .insert(command.spec().name.to_lowercase(), command);
        self
    }

    /// Exact, case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    /// Specs ordered by category, then name.
    pub fn specs(&self) -> Vec<CommandSpec> {
        let mut specs: Vec<CommandSpec> = self.commands.values().map(|c| c.spec()).collect();
        specs.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(b.name)));
        specs
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.commands.len()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::commands::Category;

    #[test]
    fn test_defaults_cover_catalogue() {
        let registry = CommandRegistry::with_defaults();
        for name in [
            "read_file",
            "search_files",
            "list_processes",
            "system_info",
            "ping",
            "remember",
            "calculator",
            "encrypt_file",
            "compress_archive",
            "take_screenshot",
            "backup_files",
            "help",
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert_eq!(registry.count(), registry.list().len());
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_exact() {
        let registry = CommandRegistry::with_defaults();
        assert!(registry.get("READ_FILE").is_some());
        assert!(registry.get("read_fil").is_none());
        assert!(registry.get("read").is_none());
    }

    #[test]
    fn test_specs_are_grouped() {
        let specs = CommandRegistry::with_defaults().specs();
        assert_eq!(specs.first().map(|s| s.category), Some(Category::Files));
        assert_eq!(specs.last().map(|s| s.category), Some(Category::Meta));
        for spec in &specs {
            assert!(spec.usage.starts_with(spec.name), "usage of {}", spec.name);
        }
    }
}
