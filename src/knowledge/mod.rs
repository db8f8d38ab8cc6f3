//! Documentation resources served as context.
//!
//! Each resource is a plain text file under the knowledge directory,
//! addressed by an `insights://knowledge/...` URI. Files are read verbatim
//! on every request. A missing file is reported in the returned text rather
//! than as an error, since the content is advisory.

mod generate;

pub use generate::{extract_table_refs, generate_docs, write_docs, GenerateOptions};

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

/// URI prefix shared by every resource.
pub const URI_PREFIX: &str = "insights://knowledge/";

/// Fixed documents: (name, file, description).
const DOCUMENTS: &[(&str, &str, &str)] = &[
    (
        "catalog",
        "catalog.txt",
        "Schema catalog with table descriptions, column definitions, and relationships.",
    ),
    (
        "domain",
        "domain.txt",
        "Business domain knowledge, terminology, and business rules.",
    ),
    (
        "metrics",
        "metrics.txt",
        "Metric definitions and how key business metrics are computed.",
    ),
    (
        "examples",
        "examples.txt",
        "Example SQL queries for common analytics tasks.",
    ),
];

/// Directory of SQL templates, relative to the knowledge directory.
const QUERIES_DIR: &str = "queries";

/// A named documentation resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub uri: String,
    pub description: String,
    #[serde(skip)]
    pub path: PathBuf,
}

/// A non-empty SQL template from the queries directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFile {
    /// File stem, e.g. `Daily revenue`.
    pub name: String,
    pub path: PathBuf,
    /// Trimmed SQL text.
    pub sql: String,
}

/// Resources rooted at one knowledge directory.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    dir: PathBuf,
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"))
}

/// Turns a file stem into a URI-safe slug (`Creator level minutes` -> `creator-level-minutes`).
pub fn slugify(stem: &str) -> String {
    slug_pattern()
        .replace_all(&stem.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Reads a resource file, describing any failure in the returned text.
pub fn read_file(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read knowledge file");
            format!("Error reading file: {e}")
        }
    }
}

impl KnowledgeBase {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists every resource: the fixed documents, then one per SQL template.
    ///
    /// Fixed documents are listed even when their file is absent.
    pub fn resources(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = DOCUMENTS
            .iter()
            .map(|(name, file, description)| Resource {
                uri: format!("{URI_PREFIX}{name}"),
                description: description.to_string(),
                path: self.dir.join(file),
            })
            .collect();

        resources.extend(self.query_templates());
        resources
    }

    /// `*.sql` files in the queries directory, sorted by lower-cased file name.
    fn template_paths(&self) -> Vec<PathBuf> {
        let dir = self.dir.join(QUERIES_DIR);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "No query templates");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
            .collect();
        paths.sort_by_key(|p| p.file_name().map(|n| n.to_string_lossy().to_lowercase()));
        paths
    }

    /// Reads every query template. Empty and unreadable files are skipped.
    pub fn query_files(&self) -> Vec<QueryFile> {
        self.template_paths()
            .into_iter()
            .filter_map(|path| {
                let name = path.file_stem()?.to_string_lossy().into_owned();
                let sql = match std::fs::read_to_string(&path) {
                    Ok(sql) => sql.trim().to_string(),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable template");
                        return None;
                    }
                };
                (!sql.is_empty()).then_some(QueryFile { name, path, sql })
            })
            .collect()
    }

    fn query_templates(&self) -> Vec<Resource> {
        self.template_paths()
            .into_iter()
            .filter_map(|path| {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                let slug = slugify(&stem);
                if slug.is_empty() {
                    return None;
                }
                Some(Resource {
                    uri: format!("{URI_PREFIX}{QUERIES_DIR}/{slug}"),
                    description: format!("SQL query template: {stem}"),
                    path,
                })
            })
            .collect()
    }

    /// Returns the content of the resource at `uri`.
    ///
    /// Unknown URIs and unreadable files are described in the returned text.
    pub fn read(&self, uri: &str) -> String {
        match self.resources().into_iter().find(|r| r.uri == uri) {
            Some(resource) => read_file(&resource.path),
            None => format!("Unknown resource: {uri}"),
        }
    }
}
