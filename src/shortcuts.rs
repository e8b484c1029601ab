//! Named shortcuts for spreadsheet IDs
//!
//! `gsheet @timesheet` opens whatever ID `timesheet` was registered with.
//! Stored as a flat JSON object in `~/.config/gsheet-tui/shortcuts.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

pub struct ShortcutRegistry {
    path: PathBuf,
    shortcuts: BTreeMap<String, String>,
}

impl ShortcutRegistry {
    pub fn load_default() -> Result<Self> {
        let path = crate::config_paths::shortcuts_file().context("No config directory available")?;
        Self::load(&path)
    }

    /// A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let shortcuts = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path: path.to_path_buf(), shortcuts })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(&self.shortcuts)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Adds or replaces `name` and writes the registry to disk.
    pub fn add(&mut self, name: &str, sheet_id: &str) -> Result<()> {
        let name = name.trim_start_matches('@');
        if name.is_empty() {
            bail!("Shortcut name cannot be empty");
        }
        self.shortcuts.insert(name.to_string(), sheet_id.to_string());
        self.save()?;
        tracing::info!(name, sheet_id, "saved shortcut");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.shortcuts.get(name).map(String::as_str)
    }

    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.shortcuts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }

    /// `@name` must be a known shortcut. Anything else is a sheet ID,
    /// unless it happens to match a shortcut name exactly.
    pub fn resolve(&self, arg: &str) -> Result<String> {
        match arg.strip_prefix('@') {
            Some(name) => match self.get(name) {
                Some(id) => Ok(id.to_string()),
                None => bail!("Unknown shortcut: {}", name),
            },
            None => Ok(self.get(arg).unwrap_or(arg).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcuts.json");

        let mut registry = ShortcutRegistry::load(&path).unwrap();
        assert!(registry.is_empty());
        registry.add("timesheet", "1t54f4aRu9kQAW7r8").unwrap();
        registry.add("@budget", "9zzz").unwrap();

        let reloaded = ShortcutRegistry::load(&path).unwrap();
        let listed: Vec<_> = reloaded.list().collect();
        assert_eq!(listed, vec![("budget", "9zzz"), ("timesheet", "1t54f4aRu9kQAW7r8")]);
    }

    #[test]
    fn test_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ShortcutRegistry::load(&dir.path().join("s.json")).unwrap();
        registry.add("ts", "abc123").unwrap();

        assert_eq!(registry.resolve("@ts").unwrap(), "abc123");
        assert_eq!(registry.resolve("ts").unwrap(), "abc123");
        assert_eq!(registry.resolve("rawid").unwrap(), "rawid");
        assert!(registry.resolve("@missing").is_err());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcuts.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(ShortcutRegistry::load(&path).is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ShortcutRegistry::load(&dir.path().join("s.json")).unwrap();
        assert!(registry.add("@", "id").is_err());
    }
}
