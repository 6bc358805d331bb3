use crate::category::Category;
use crate::plugin::PluginCatalog;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a plugin process is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// A compiled-in plugin served by the agent binary's `plugin` subcommand
    Builtin,
    /// A standalone executable speaking the protocol on stdin/stdout
    Executable(PathBuf),
}

/// A plugin that was found but not yet activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCandidate {
    pub name: String,
    pub category: Category,
    pub entry: EntryPoint,
}

impl PluginCandidate {
    pub fn builtin(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            entry: EntryPoint::Builtin,
        }
    }
}

/// Source of plugin candidates.
pub trait PluginDiscovery {
    fn discover(&self) -> Vec<PluginCandidate>;
}

impl PluginDiscovery for PluginCatalog {
    fn discover(&self) -> Vec<PluginCandidate> {
        self.entries()
            .map(|(name, category)| PluginCandidate::builtin(name, category))
            .collect()
    }
}

/// Plugin executables laid out as `<root>/<category>/<name>`.
#[derive(Debug, Clone)]
pub struct ExecutableDirectory {
    root: PathBuf,
}

impl ExecutableDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan(&self, category: Category, out: &mut Vec<PluginCandidate>) {
        let dir = self.root.join(category.as_str());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "no plugin directory");
                return;
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot read plugin directory");
                return;
            }
        };

        let mut found: Vec<PluginCandidate> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                if name.starts_with('.') {
                    return None;
                }
                Some(PluginCandidate {
                    name,
                    category,
                    entry: EntryPoint::Executable(path),
                })
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        out.extend(found);
    }
}

impl PluginDiscovery for ExecutableDirectory {
    fn discover(&self) -> Vec<PluginCandidate> {
        let mut out = Vec::new();
        for category in Category::ALL {
            self.scan(category, &mut out);
        }
        out
    }
}
