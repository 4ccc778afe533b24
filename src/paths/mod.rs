//! Path filtering using .gitignore-style patterns
//!
//! Architectural Principle: Service Layer - PathFilter orchestrates path matching and discovery
//! - Encapsulates the rules for include/exclude pattern evaluation
//! - Limits discovery to C# sources
//! - Handles per-directory ignore file discovery and parsing

use crate::config::CONFIG_FILE_NAMES;
use crate::domain::violations::{GuardianError, GuardianResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of the files the rule analyzes
pub const SOURCE_EXTENSION: &str = "cs";

/// Default per-directory ignore file name
pub const DEFAULT_IGNORE_FILE: &str = ".sealedignore";

/// Whether `path` names a C# source file
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

/// Nearest directory at or above `path` holding a solution, project, repository or config file
pub fn find_project_root(path: &Path) -> Option<PathBuf> {
    let start = fs::canonicalize(path).ok()?;
    let start = if start.is_dir() {
        start.as_path()
    } else {
        start.parent()?
    };
    start
        .ancestors()
        .find(|dir| is_project_root(dir))
        .map(Path::to_path_buf)
}

fn is_project_root(dir: &Path) -> bool {
    if dir.join(".git").exists() || CONFIG_FILE_NAMES.iter().any(|name| dir.join(name).is_file()) {
        return true;
    }
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "csproj" || ext == "sln")
            })
        })
        .unwrap_or(false)
}

/// Manages path filtering using .gitignore-style patterns
#[derive(Debug, Clone)]
pub struct PathFilter {
    /// Include/exclude patterns
    patterns: Vec<FilterPattern>,
    /// Whether to process ignore files
    process_ignore_files: bool,
    /// Name of ignore files to process
    ignore_filename: String,
}

#[derive(Debug, Clone)]
struct FilterPattern {
    pattern: glob::Pattern,
    /// `!`-prefixed patterns re-include what earlier patterns excluded
    is_include: bool,
    original: String,
}

impl FilterPattern {
    fn parse(line: &str) -> Result<Self, glob::PatternError> {
        let (is_include, original) = match line.strip_prefix('!') {
            Some(stripped) => (true, stripped),
            None => (false, line),
        };
        let pattern = glob::Pattern::new(original.trim_end_matches('/'))?;
        Ok(Self {
            pattern,
            is_include,
            original: original.to_string(),
        })
    }

    /// Match using .gitignore conventions for slashes
    fn matches(&self, path: &Path) -> bool {
        if self.original.ends_with('/') && !path.is_dir() {
            return false;
        }

        let path_str = path.to_string_lossy();
        if let Some(anchored) = self.original.strip_prefix('/') {
            return glob::Pattern::new(anchored.trim_end_matches('/'))
                .map(|p| p.matches(&path_str))
                .unwrap_or(false);
        }

        if self.original.trim_end_matches('/').contains('/') {
            self.pattern.matches(&path_str)
        } else {
            path.file_name()
                .is_some_and(|name| self.pattern.matches(&name.to_string_lossy()))
        }
    }
}

impl PathFilter {
    /// Create a new path filter with the given patterns
    pub fn new(patterns: Vec<String>, ignore_filename: Option<String>) -> GuardianResult<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                FilterPattern::parse(pattern).map_err(|e| {
                    GuardianError::pattern(format!("Invalid pattern '{pattern}': {e}"))
                })
            })
            .collect::<GuardianResult<Vec<_>>>()?;

        Ok(Self {
            patterns,
            process_ignore_files: ignore_filename.is_some(),
            ignore_filename: ignore_filename.unwrap_or_else(|| DEFAULT_IGNORE_FILE.to_string()),
        })
    }

    /// Create a default path filter excluding build output and generated code
    pub fn with_defaults() -> GuardianResult<Self> {
        Self::new(
            vec![
                "**/bin/**".to_string(),
                "**/obj/**".to_string(),
                "**/.git/**".to_string(),
                "**/*.g.cs".to_string(),
                "**/*.Designer.cs".to_string(),
            ],
            Some(DEFAULT_IGNORE_FILE.to_string()),
        )
    }

    /// Stop reading ignore files
    pub fn without_ignore_files(mut self) -> Self {
        self.process_ignore_files = false;
        self
    }

    /// Check if a file should be analyzed based on all patterns and ignore files
    pub fn should_analyze<P: AsRef<Path>>(&self, path: P) -> GuardianResult<bool> {
        let path = path.as_ref();

        // Last matching pattern wins, as in .gitignore
        let mut should_include = true;
        for pattern in &self.patterns {
            if pattern.matches(path) {
                should_include = pattern.is_include;
            }
        }

        if !should_include {
            return Ok(false);
        }

        if self.process_ignore_files && self.is_ignored_by_files(path)? {
            return Ok(false);
        }

        Ok(true)
    }

    /// Check if path is ignored by ignore files in any ancestor directory
    fn is_ignored_by_files(&self, path: &Path) -> GuardianResult<bool> {
        let mut is_ignored = false;

        for dir in path.ancestors().skip(1) {
            let ignore_file = dir.join(&self.ignore_filename);
            if !ignore_file.is_file() {
                continue;
            }

            let Ok(relative_path) = path.strip_prefix(dir) else {
                continue;
            };
            for pattern in self.load_ignore_file(&ignore_file)? {
                if pattern.matches(relative_path) {
                    is_ignored = !pattern.is_include;
                }
            }
        }

        Ok(is_ignored)
    }

    /// Load patterns from an ignore file, skipping invalid lines
    fn load_ignore_file(&self, path: &Path) -> GuardianResult<Vec<FilterPattern>> {
        let content = fs::read_to_string(path).map_err(|e| {
            GuardianError::config(format!(
                "Failed to read ignore file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut patterns = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match FilterPattern::parse(line) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => {
                    tracing::warn!("Invalid pattern '{}' in {}: {}", line, path.display(), e);
                }
            }
        }

        Ok(patterns)
    }

    /// All C# sources under `root` that should be analyzed, in path order
    pub fn find_files<P: AsRef<Path>>(&self, root: P) -> GuardianResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root.as_ref())
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if entry.file_type().is_file() && is_source_file(path) && self.should_analyze(path)? {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Filter a list of paths to only those that should be analyzed
    pub fn filter_paths<P: AsRef<Path>>(&self, paths: &[P]) -> GuardianResult<Vec<PathBuf>> {
        let mut filtered = Vec::new();
        for path in paths {
            if self.should_analyze(path)? {
                filtered.push(path.as_ref().to_path_buf());
            }
        }
        Ok(filtered)
    }

    /// Add a pattern to the filter
    pub fn add_pattern(&mut self, pattern: String) -> GuardianResult<()> {
        let parsed = FilterPattern::parse(&pattern)
            .map_err(|e| GuardianError::pattern(format!("Invalid pattern '{pattern}': {e}")))?;
        self.patterns.push(parsed);
        Ok(())
    }

    /// Which patterns match `path`, for `--verbose` diagnostics
    pub fn debug_patterns<P: AsRef<Path>>(&self, path: P) -> Vec<String> {
        let path = path.as_ref();
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, pattern)| {
                format!(
                    "Pattern {}: {}{} -> {}",
                    i,
                    if pattern.is_include { "!" } else { "" },
                    pattern.original,
                    if pattern.matches(path) { "MATCH" } else { "no match" }
                )
            })
            .collect()
    }
}
