use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::Environment;
use serde_json::Value;

/// Named template rendering capability.
pub trait PromptRenderer: Send + Sync {
    fn has_template(&self, name: &str) -> bool;

    /// Renders `name` with `data`. Unknown names are errors.
    fn render(&self, name: &str, data: &Value) -> Result<String>;
}

/// Template sources keyed by name, rendered through one shared environment.
pub struct PromptLibrary {
    env: Environment<'static>,
    templates: BTreeMap<String, String>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            templates: BTreeMap::new(),
        }
    }

    /// Loads every directory in order; missing directories and templates
    /// that fail to read or parse are skipped.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut library = Self::new();
        for path in paths {
            library.load_dir(path)?;
        }
        tracing::debug!(templates = library.templates.len(), "loaded prompt templates");
        Ok(library)
    }

    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "prompt directory not found, skipping");
            return Ok(0);
        }
        let mut entries = fs::read_dir(dir)
            .with_context(|| format!("failed to read prompt directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && is_template_file(path))
            .collect::<Vec<_>>();
        entries.sort();

        let mut loaded = 0_usize;
        for path in entries {
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let inserted = fs::read_to_string(&path)
                .with_context(|| format!("failed to read prompt template {}", path.display()))
                .and_then(|source| self.insert(name, source));
            if let Err(error) = inserted {
                tracing::warn!(path = %path.display(), error = %format!("{error:#}"), "skipping invalid prompt template");
                continue;
            }
            loaded = loaded.saturating_add(1);
        }
        Ok(loaded)
    }

    /// Registers `source` under `name`, replacing any earlier template.
    pub fn insert(&mut self, name: &str, source: impl Into<String>) -> Result<()> {
        let source = source.into();
        self.env
            .template_from_str(&source)
            .with_context(|| format!("failed to parse prompt template '{name}'"))?;
        if self.templates.insert(name.to_string(), source).is_some() {
            tracing::debug!(template = name, "prompt template overridden");
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl PromptRenderer for PromptLibrary {
    fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    fn render(&self, name: &str, data: &Value) -> Result<String> {
        let source = self
            .templates
            .get(name)
            .with_context(|| format!("prompt template '{name}' is not registered"))?;
        self.env
            .render_str(source, data)
            .with_context(|| format!("failed to render prompt template '{name}'"))
    }
}

fn is_template_file(path: &Path) -> bool {
    let is_markdown = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
    let is_readme = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case("README.md"));
    is_markdown && !is_readme
}
