//! Repo-local architectural lint for the `usersync` ports-and-adapters layout.
//!
//! The synchronisation engine keeps its record model, document mapping, and
//! orchestration in `domain`, drives them from `inbound` (the CLI), and
//! reaches the filesystem and identity store through `outbound`. This crate
//! provides a lightweight lint that:
//!
//! - forbids `domain` code from depending on adapter or wiring modules
//!   (`inbound`, `outbound`, `app`, `settings`), on IO and CLI crates, or on
//!   `std::fs`
//! - forbids `inbound` adapters from importing `outbound` modules or
//!   filesystem crates directly
//! - forbids `outbound` adapters from importing `inbound` modules or CLI and
//!   configuration crates
//!
//! Run it with `cargo run -p architecture-lint`.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use syn::visit::Visit;

/// A single boundary violation discovered by the linter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File path relative to `usersync/src`.
    pub file: PathBuf,
    /// Human-readable description of the violated rule.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Failure modes returned by the architecture lint.
#[derive(Debug)]
pub enum ArchitectureLintError {
    /// Filesystem traversal or reading failed.
    Io(io::Error),
    /// Rust source parsing failed.
    Parse { file: PathBuf, message: String },
    /// One or more boundary violations were found.
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error while linting architecture: {err}"),
            Self::Parse { file, message } => write!(
                f,
                "Failed to parse Rust source while linting architecture ({}): {message}",
                file.display()
            ),
            Self::Violations(violations) => {
                writeln!(f, "Architecture boundary violations:")?;
                for violation in violations {
                    writeln!(f, "- {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Lint the `usersync` crate sources on disk.
///
/// `crate_dir` must be the `usersync/` directory at the repository root.
/// Only the `domain`, `inbound`, and `outbound` trees are read; wiring
/// modules such as `app` and `settings` may depend on every layer.
pub fn lint_usersync_sources(crate_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src_dir = crate_dir.join("src");
    let sources = collect_lint_sources(&src_dir)?;
    lint_sources(&sources)
}

/// Lint the provided Rust sources. Intended for unit and behaviour tests.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();

    for source in sources {
        let layer = ModuleLayer::infer_from_path(&source.file).ok_or_else(|| {
            ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: "unable to infer module layer from file path".to_owned(),
            }
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(lint_parsed_source(&source.file, layer, &parsed));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `usersync/src`.
    pub file: PathBuf,
    /// Rust source text.
    pub contents: String,
}

/// The architectural "layer" inferred from a file path under `usersync/src`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleLayer {
    Domain,
    Inbound,
    Outbound,
}

impl ModuleLayer {
    fn infer_from_path(relative_path: &Path) -> Option<Self> {
        let first = relative_path
            .components()
            .next()?
            .as_os_str()
            .to_string_lossy();
        match first.as_ref() {
            "domain" => Some(Self::Domain),
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }

    fn forbidden_module_roots(self) -> BTreeSet<&'static str> {
        match self {
            Self::Domain => BTreeSet::from(["app", "inbound", "outbound", "settings"]),
            Self::Inbound => BTreeSet::from(["outbound"]),
            Self::Outbound => BTreeSet::from(["app", "inbound", "settings"]),
        }
    }

    fn forbidden_crate_roots(self) -> BTreeSet<&'static str> {
        match self {
            Self::Domain => BTreeSet::from([
                "camino",
                "cap_std",
                "clap",
                "color_eyre",
                "example_users",
                "ortho_config",
                "tracing_subscriber",
            ]),
            Self::Inbound => BTreeSet::from(["camino", "cap_std"]),
            Self::Outbound => BTreeSet::from([
                "clap",
                "color_eyre",
                "ortho_config",
                "tracing_subscriber",
            ]),
        }
    }

    fn forbidden_std_modules(self) -> BTreeSet<&'static str> {
        match self {
            Self::Domain => BTreeSet::from(["fs"]),
            Self::Inbound | Self::Outbound => BTreeSet::new(),
        }
    }
}

fn lint_parsed_source(file: &Path, layer: ModuleLayer, parsed: &syn::File) -> Vec<Violation> {
    let forbidden_modules = layer.forbidden_module_roots();
    let forbidden_crates = layer.forbidden_crate_roots();
    let forbidden_std = layer.forbidden_std_modules();
    let layer_name = layer_name(layer);

    let mut collector = PathCollector::default();
    collector.visit_file(parsed);

    let mut messages = BTreeSet::new();
    for segments in &collector.paths {
        if let Some(root) = forbidden_internal_module_root(segments, &forbidden_modules) {
            messages.insert(format!(
                "{layer_name} module must not depend on crate::{root}"
            ));
        }

        if let Some(root) = forbidden_external_crate_root(segments, &forbidden_crates) {
            messages.insert(format!(
                "{layer_name} module must not depend on external crate `{root}`"
            ));
        }

        if let Some(module) = forbidden_std_module(segments, &forbidden_std) {
            messages.insert(format!(
                "{layer_name} module must not depend on std::{module}"
            ));
        }
    }

    messages
        .into_iter()
        .map(|message| Violation {
            file: file.to_path_buf(),
            message,
        })
        .collect()
}

const fn layer_name(layer: ModuleLayer) -> &'static str {
    match layer {
        ModuleLayer::Domain => "domain",
        ModuleLayer::Inbound => "inbound",
        ModuleLayer::Outbound => "outbound",
    }
}

fn forbidden_internal_module_root(
    segments: &[String],
    forbidden_roots: &BTreeSet<&'static str>,
) -> Option<&'static str> {
    let root = internal_module_root(segments)?;
    forbidden_roots.get(root).copied()
}

fn forbidden_external_crate_root(
    segments: &[String],
    forbidden_roots: &BTreeSet<&'static str>,
) -> Option<&'static str> {
    let root = external_crate_root(segments)?;
    forbidden_roots.get(root).copied()
}

fn forbidden_std_module(
    segments: &[String],
    forbidden_modules: &BTreeSet<&'static str>,
) -> Option<&'static str> {
    match segments {
        [root, module, ..] if root == "std" => forbidden_modules.get(module.as_str()).copied(),
        _ => None,
    }
}

fn is_relative_module_segment(segment: &str) -> bool {
    matches!(segment, "crate" | "self" | "super")
}

fn internal_module_root(segments: &[String]) -> Option<&str> {
    let first = segments.first()?.as_str();
    if matches!(first, "domain" | "inbound" | "outbound") {
        return Some(first);
    }
    let start_index = match first {
        "crate" | "self" | "super" => segments
            .iter()
            .position(|segment| !is_relative_module_segment(segment.as_str()))?,
        "usersync" => 1,
        _ => return None,
    };
    segments.get(start_index).map(|segment| segment.as_str())
}

fn external_crate_root(segments: &[String]) -> Option<&str> {
    let root = segments.first()?.as_str();
    if is_relative_module_segment(root) || root == "usersync" {
        return None;
    }
    Some(root)
}

#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn record_path(&mut self, path: &syn::Path) {
        let segments = path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect::<Vec<_>>();
        if segments.is_empty() {
            return;
        }
        self.paths.insert(segments);
    }

    fn record_use_tree(&mut self, tree: &syn::UseTree, prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                let mut next = prefix;
                next.push(path.ident.to_string());
                self.record_use_tree(&path.tree, next);
            }
            syn::UseTree::Name(name) => {
                let mut segments = prefix;
                segments.push(name.ident.to_string());
                self.paths.insert(segments);
            }
            syn::UseTree::Rename(rename) => {
                let mut segments = prefix;
                segments.push(rename.ident.to_string());
                self.paths.insert(segments);
            }
            syn::UseTree::Glob(_) => {
                let mut segments = prefix;
                segments.push("*".to_owned());
                self.paths.insert(segments);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        self.record_path(node);
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use_tree(&node.tree, Vec::new());
    }
}

const LAYER_DIRS: [&str; 3] = ["domain", "inbound", "outbound"];

fn collect_lint_sources(src_dir: &Path) -> Result<Vec<LintSource>, ArchitectureLintError> {
    let src = Dir::open_ambient_dir(src_dir, ambient_authority())?;
    let mut sources = Vec::new();
    for layer_dir in LAYER_DIRS {
        let dir = match src.open_dir(layer_dir) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err.into()),
        };
        collect_sources_under(&dir, Utf8PathBuf::from(layer_dir), &mut sources)?;
    }
    Ok(sources)
}

fn collect_sources_under(
    dir: &Dir,
    relative: Utf8PathBuf,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    let mut entries = dir.entries()?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(cap_std::fs::DirEntry::file_name);

    for entry in entries {
        let name = entry
            .file_name()
            .into_string()
            .map_err(|name| ArchitectureLintError::Parse {
                file: relative.join(name.to_string_lossy().as_ref()).into_std_path_buf(),
                message: "file name is not valid UTF-8".to_owned(),
            })?;
        let child = relative.join(&name);
        if entry.file_type()?.is_dir() {
            collect_sources_under(&entry.open_dir()?, child, sources)?;
            continue;
        }
        if child.extension() != Some("rs") {
            continue;
        }
        let contents = dir.read_to_string(&name)?;
        sources.push(LintSource {
            file: child.into_std_path_buf(),
            contents,
        });
    }
    Ok(())
}
