//! Template registry for file-based and inline templates.
//!
//! [`TemplateRegistry`] resolves template names to source text from two
//! places: inline strings and template directories. It implements
//! [`PartialLoader`], so an engine can pull partials straight out of a
//! directory tree:
//!
//! ```rust,ignore
//! let mut registry = TemplateRegistry::new();
//! registry.add_template_dir("./templates")?;
//! let engine = MustacheEngine::new().with_loader(registry);
//! // {{> mod_quiz/attempt_summary_information}} now reads
//! // ./templates/mod_quiz/attempt_summary_information.mustache
//! ```
//!
//! # Template Resolution
//!
//! 1. Inline templates (added via [`TemplateRegistry::add_inline`]) have highest priority
//! 2. File templates are searched by their relative path
//! 3. Names can be given with or without extension: both `"header"` and
//!    `"header.mustache"` resolve
//!
//! # Supported Extensions
//!
//! | Priority | Extension |
//! |----------|-----------|
//! | 1 (highest) | `.mustache` |
//! | 2 | `.mst` |
//! | 3 | `.html` |
//! | 4 (lowest) | `.txt` |
//!
//! If `header.mustache` and `header.html` sit in the same directory, the
//! extensionless name `header` resolves to `header.mustache`.
//!
//! # Collision Handling
//!
//! The same name coming from two different directories is an error
//! ([`RegistryError::Collision`]) rather than an arbitrary winner.
//!
//! File contents are read when requested, not when registered, so an edited
//! file is picked up on the next render; the engine's content-hash cache then
//! compiles the new text under a new key.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::loader::PartialLoader;
use crate::error::RenderError;

/// Recognized template file extensions in priority order.
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".mustache", ".mst", ".html", ".txt"];

/// A template file discovered during directory walking.
///
/// For a file at `/app/templates/mod_quiz/summary.mustache` with root
/// `/app/templates`, `name` is `mod_quiz/summary` and `name_with_ext` is
/// `mod_quiz/summary.mustache`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Resolution name without extension
    pub name: String,
    /// Resolution name with extension
    pub name_with_ext: String,
    /// Absolute path to the template file
    pub absolute_path: PathBuf,
    /// The template directory root this file belongs to
    pub source_dir: PathBuf,
}

impl TemplateFile {
    pub fn new(
        name: impl Into<String>,
        name_with_ext: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            name_with_ext: name_with_ext.into(),
            absolute_path: absolute_path.into(),
            source_dir: source_dir.into(),
        }
    }

    /// Returns the extension priority (lower is higher priority).
    ///
    /// Returns `usize::MAX` if the extension is not recognized.
    pub fn extension_priority(&self) -> usize {
        TEMPLATE_EXTENSIONS
            .iter()
            .position(|ext| self.name_with_ext.ends_with(ext))
            .unwrap_or(usize::MAX)
    }
}

/// How a template's content is stored or accessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTemplate {
    /// Template content stored directly in memory.
    Inline(String),
    /// Template read from the filesystem on demand.
    File(PathBuf),
}

/// Error type for template registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two template directories contain files that resolve to the same name.
    #[error(
        "template collision detected for \"{name}\":\n  - {} (from {})\n  - {} (from {})",
        existing_path.display(),
        existing_dir.display(),
        conflicting_path.display(),
        conflicting_dir.display()
    )]
    Collision {
        name: String,
        existing_path: PathBuf,
        existing_dir: PathBuf,
        conflicting_path: PathBuf,
        conflicting_dir: PathBuf,
    },

    /// Template not found in registry.
    #[error("template not found: \"{name}\"")]
    NotFound { name: String },

    /// Failed to read a template file or directory.
    #[error("failed to read template \"{}\": {message}", path.display())]
    ReadError { path: PathBuf, message: String },
}

/// Registry for template resolution from inline strings and directories.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    inline: HashMap<String, String>,
    /// name (with and without extension) → path
    files: HashMap<String, PathBuf>,
    /// name → (path, source_dir), for collision detection
    sources: HashMap<String, (PathBuf, PathBuf)>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an inline template. Inline templates shadow files with the same name.
    pub fn add_inline(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.inline.insert(name.into(), content.into());
    }

    /// Walks a directory and registers every template file in it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ReadError`] if the directory can't be read and
    /// [`RegistryError::Collision`] if a name is already taken by another
    /// directory.
    pub fn add_template_dir<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RegistryError> {
        let path = path.as_ref();
        let files = walk_template_dir(path).map_err(|e| RegistryError::ReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(dir = %path.display(), files = files.len(), "added template directory");
        self.add_from_files(files)
    }

    /// Registers templates discovered by [`walk_template_dir`].
    ///
    /// Each file is reachable both with and without its extension. When two
    /// files in the same directory share a base name, the higher-priority
    /// extension takes the extensionless name.
    pub fn add_from_files(&mut self, files: Vec<TemplateFile>) -> Result<(), RegistryError> {
        let mut sorted_files = files;
        sorted_files.sort_by_key(TemplateFile::extension_priority);

        for file in sorted_files {
            if let Some((existing_path, existing_dir)) = self.sources.get(&file.name) {
                if existing_dir != &file.source_dir {
                    return Err(RegistryError::Collision {
                        name: file.name,
                        existing_path: existing_path.clone(),
                        existing_dir: existing_dir.clone(),
                        conflicting_path: file.absolute_path,
                        conflicting_dir: file.source_dir,
                    });
                }
                // Lower-priority extension in the same directory.
                self.files.insert(file.name_with_ext, file.absolute_path);
                continue;
            }

            self.sources.insert(
                file.name.clone(),
                (file.absolute_path.clone(), file.source_dir),
            );
            self.files.insert(file.name, file.absolute_path.clone());
            self.files.insert(file.name_with_ext, file.absolute_path);
        }

        Ok(())
    }

    /// Looks up a template by name.
    pub fn get(&self, name: &str) -> Result<ResolvedTemplate, RegistryError> {
        if let Some(content) = self.inline.get(name) {
            return Ok(ResolvedTemplate::Inline(content.clone()));
        }
        if let Some(path) = self.files.get(name) {
            return Ok(ResolvedTemplate::File(path.clone()));
        }
        Err(RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    /// Gets the content of a template, reading from disk if necessary.
    pub fn get_content(&self, name: &str) -> Result<String, RegistryError> {
        match self.get(name)? {
            ResolvedTemplate::Inline(content) => Ok(content),
            ResolvedTemplate::File(path) => {
                std::fs::read_to_string(&path).map_err(|e| RegistryError::ReadError {
                    path,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Number of registered names, counting extension variants separately.
    pub fn len(&self) -> usize {
        self.inline.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.files.is_empty()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .inline
            .keys()
            .chain(self.files.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl PartialLoader for TemplateRegistry {
    fn load(&self, name: &str) -> Result<Option<Cow<'_, str>>, RenderError> {
        match self.get_content(name) {
            Ok(content) => Ok(Some(Cow::Owned(content))),
            Err(RegistryError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Walks a template directory recursively and collects template files.
///
/// Names use `/` as separator on every platform. The result is sorted by
/// `name_with_ext` so registration order doesn't depend on the filesystem.
pub fn walk_template_dir(root: impl AsRef<Path>) -> Result<Vec<TemplateFile>, std::io::Error> {
    let root = root.as_ref().canonicalize()?;
    let mut files = Vec::new();
    walk_dir_recursive(&root, &root, &mut files)?;
    files.sort_by(|a, b| a.name_with_ext.cmp(&b.name_with_ext));
    Ok(files)
}

fn walk_dir_recursive(
    current: &Path,
    root: &Path,
    files: &mut Vec<TemplateFile>,
) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(current)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir_recursive(&path, root, files)?;
        } else if path.is_file() {
            if let Some(file) = template_file(&path, root) {
                files.push(file);
            }
        }
    }
    Ok(())
}

fn template_file(path: &Path, root: &Path) -> Option<TemplateFile> {
    let relative = path.strip_prefix(root).ok()?;
    let name_with_ext = relative
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/");
    let extension = TEMPLATE_EXTENSIONS
        .iter()
        .find(|ext| name_with_ext.ends_with(*ext))?;
    let name = name_with_ext.strip_suffix(extension)?.to_string();
    Some(TemplateFile::new(name, name_with_ext, path, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }

    #[test]
    fn test_template_file_extension_priority() {
        let mustache = TemplateFile::new("t", "t.mustache", "/a/t.mustache", "/a");
        let mst = TemplateFile::new("t", "t.mst", "/a/t.mst", "/a");
        let html = TemplateFile::new("t", "t.html", "/a/t.html", "/a");
        let txt = TemplateFile::new("t", "t.txt", "/a/t.txt", "/a");
        let unknown = TemplateFile::new("t", "t.jinja", "/a/t.jinja", "/a");

        assert_eq!(mustache.extension_priority(), 0);
        assert_eq!(mst.extension_priority(), 1);
        assert_eq!(html.extension_priority(), 2);
        assert_eq!(txt.extension_priority(), 3);
        assert_eq!(unknown.extension_priority(), usize::MAX);
    }

    #[test]
    fn test_registry_add_inline() {
        let mut registry = TemplateRegistry::new();
        registry.add_inline("header", "{{title}}");

        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.get_content("header").unwrap(), "{{title}}");
    }

    #[test]
    fn test_registry_not_found() {
        let registry = TemplateRegistry::new();
        assert!(matches!(
            registry.get("nonexistent"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_registry_add_from_files() {
        let mut registry = TemplateRegistry::new();
        registry
            .add_from_files(vec![
                TemplateFile::new("page", "page.mustache", "/t/page.mustache", "/t"),
                TemplateFile::new(
                    "mod_quiz/summary",
                    "mod_quiz/summary.mustache",
                    "/t/mod_quiz/summary.mustache",
                    "/t",
                ),
            ])
            .unwrap();

        assert_eq!(registry.len(), 4);
        assert!(registry.get("page").is_ok());
        assert!(registry.get("mod_quiz/summary").is_ok());
        assert!(registry.get("mod_quiz/summary.mustache").is_ok());
    }

    #[test]
    fn test_registry_extension_priority() {
        let mut registry = TemplateRegistry::new();
        registry
            .add_from_files(vec![
                TemplateFile::new("page", "page.html", "/t/page.html", "/t"),
                TemplateFile::new("page", "page.mustache", "/t/page.mustache", "/t"),
            ])
            .unwrap();

        assert_eq!(
            registry.get("page").unwrap(),
            ResolvedTemplate::File(PathBuf::from("/t/page.mustache"))
        );
        assert_eq!(
            registry.get("page.html").unwrap(),
            ResolvedTemplate::File(PathBuf::from("/t/page.html"))
        );
    }

    #[test]
    fn test_registry_collision_different_dirs() {
        let mut registry = TemplateRegistry::new();
        let err = registry
            .add_from_files(vec![
                TemplateFile::new("page", "page.mustache", "/a/page.mustache", "/a"),
                TemplateFile::new("page", "page.mustache", "/b/page.mustache", "/b"),
            ])
            .unwrap_err();

        match &err {
            RegistryError::Collision { name, .. } => assert_eq!(name, "page"),
            other => panic!("expected collision, got {:?}", other),
        }
        assert!(err.to_string().contains("/a/page.mustache"));
        assert!(err.to_string().contains("/b/page.mustache"));
    }

    #[test]
    fn test_inline_shadows_file() {
        let mut registry = TemplateRegistry::new();
        registry
            .add_from_files(vec![TemplateFile::new(
                "page",
                "page.mustache",
                "/t/page.mustache",
                "/t",
            )])
            .unwrap();
        registry.add_inline("page", "inline");
        assert_eq!(
            registry.get("page").unwrap(),
            ResolvedTemplate::Inline("inline".into())
        );
    }

    #[test]
    fn test_walk_template_dir() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "page.mustache", "page");
        create_file(dir.path(), "mod_quiz/summary.mst", "summary");
        create_file(dir.path(), "notes.md", "ignored");

        let files = walk_template_dir(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["mod_quiz/summary", "page"]);
    }

    #[test]
    fn test_add_template_dir_reads_on_demand() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "row.mustache", "v1");

        let mut registry = TemplateRegistry::new();
        registry.add_template_dir(dir.path()).unwrap();
        assert_eq!(registry.get_content("row").unwrap(), "v1");

        create_file(dir.path(), "row.mustache", "v2");
        assert_eq!(registry.get_content("row").unwrap(), "v2");
    }

    #[test]
    fn test_add_template_dir_missing() {
        let mut registry = TemplateRegistry::new();
        let err = registry
            .add_template_dir("/definitely/not/a/template/dir")
            .unwrap_err();
        assert!(matches!(err, RegistryError::ReadError { .. }));
    }

    #[test]
    fn test_loader_maps_not_found_to_none() {
        let mut registry = TemplateRegistry::new();
        registry.add_inline("a", "A");
        assert_eq!(registry.load("a").unwrap().as_deref(), Some("A"));
        assert!(registry.load("b").unwrap().is_none());
    }

    #[test]
    fn test_loader_reports_unreadable_file() {
        let mut registry = TemplateRegistry::new();
        registry
            .add_from_files(vec![TemplateFile::new(
                "gone",
                "gone.mustache",
                "/definitely/not/here/gone.mustache",
                "/definitely/not/here",
            )])
            .unwrap();
        assert!(matches!(
            registry.load("gone"),
            Err(RenderError::Registry(RegistryError::ReadError { .. }))
        ));
    }
}
