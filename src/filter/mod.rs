use std::fs;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{PatchError, Result};
use crate::util::normalize_separators;

mod default;

pub use default::default_document;

/// On-disk shape of a filter ruleset (`filter.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDocument {
    #[serde(default)]
    pub exact_matches: Vec<String>,
    #[serde(default)]
    pub extension_matches: Vec<String>,
    #[serde(default)]
    pub glob_patterns: Vec<String>,
    #[serde(default)]
    pub base_matches: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl FilterDocument {
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| PatchError::parse("filter document", e))?;
        json.push('\n');
        fs::write(path, json).map_err(|e| PatchError::fs(path, e))
    }
}

/// A glob that targets the full relative path when it contains a separator,
/// otherwise the basename.
#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    matcher: GlobMatcher,
    full_path: bool,
}

impl Pattern {
    /// Backslashes are globset escapes here, not separators.
    fn new(pattern: &str) -> Result<Self> {
        let source = pattern.strip_prefix("./").unwrap_or(pattern).to_owned();
        let matcher = GlobBuilder::new(&source)
            .backslash_escape(true)
            .build()
            .map_err(|e| PatchError::InvalidPattern {
                pattern: pattern.to_owned(),
                source: e,
            })?
            .compile_matcher();
        let full_path = source.contains('/');
        Ok(Self {
            source,
            matcher,
            full_path,
        })
    }

    fn matches(&self, path: &str, basename: &str) -> bool {
        if self.full_path {
            self.matcher.is_match(path)
        } else {
            self.matcher.is_match(basename)
        }
    }
}

#[derive(Debug, Clone)]
enum Rule {
    Exclude(Pattern),
    Exact(String),
    Suffix(String),
    BasePath(String),
    Glob(Pattern),
}

impl Rule {
    /// `Some(ignored)` when the rule decides the path.
    fn verdict(&self, path: &str, basename: &str) -> Option<bool> {
        let hit = match self {
            Rule::Exclude(pattern) | Rule::Glob(pattern) => pattern.matches(path, basename),
            Rule::Exact(name) => basename == name,
            Rule::Suffix(suffix) => basename.ends_with(suffix.as_str()),
            Rule::BasePath(base) => path == base,
        };
        hit.then_some(!matches!(self, Rule::Exclude(_)))
    }

    fn label(&self) -> String {
        match self {
            Rule::Exclude(p) => format!("exclude {}", p.source),
            Rule::Exact(name) => format!("exact {name}"),
            Rule::Suffix(suffix) => format!("suffix {suffix}"),
            Rule::BasePath(base) => format!("base {base}"),
            Rule::Glob(p) => format!("glob {}", p.source),
        }
    }
}

/// Decides which local paths take part in reconciliation.
///
/// Rules are kept in precedence order (excludes, exact names, suffixes,
/// base paths, globs) and the first matching rule wins.
#[derive(Debug, Clone)]
pub struct Filter {
    rules: Vec<Rule>,
}

impl Filter {
    pub fn from_document(doc: &FilterDocument) -> Result<Self> {
        let mut rules = Vec::new();
        for pattern in &doc.exclude_patterns {
            rules.push(Rule::Exclude(Pattern::new(pattern)?));
        }
        rules.extend(doc.exact_matches.iter().cloned().map(Rule::Exact));
        rules.extend(doc.extension_matches.iter().cloned().map(Rule::Suffix));
        rules.extend(
            doc.base_matches
                .iter()
                .map(|base| Rule::BasePath(normalize_separators(base))),
        );
        for pattern in &doc.glob_patterns {
            rules.push(Rule::Glob(Pattern::new(pattern)?));
        }
        Ok(Self { rules })
    }

    pub fn builtin() -> Self {
        // The built-in table only holds valid globs.
        Self::from_document(&default_document()).unwrap_or(Self { rules: Vec::new() })
    }

    /// Read an override document. It replaces the built-in rules entirely.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PatchError::fs(path, e))?;
        let doc: FilterDocument = serde_json::from_str(&text)
            .map_err(|e| PatchError::parse(format!("filter {}", path.display()), e))?;
        Self::from_document(&doc)
    }

    /// Use the override at `path` when present, the built-in rules otherwise.
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.is_file() {
            info!("filter: using override {}", path.display());
            Self::load(path)
        } else {
            debug!("filter: no override at {}, using built-in rules", path.display());
            Ok(Self::builtin())
        }
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        let path = normalize_separators(path);
        let basename = path.rsplit('/').next().unwrap_or(&path);
        for rule in &self.rules {
            if let Some(ignored) = rule.verdict(&path, basename) {
                if ignored {
                    debug!("[+] ignored ({}): {}", rule.label(), path);
                } else {
                    debug!("[-] kept ({}): {}", rule.label(), path);
                }
                return ignored;
            }
        }
        false
    }
}
