//! Glob rules for copy exclusions and post-copy removals.
//!
//! # Design
//! - Exclusions match on a single entry name, the way the mirror tool applies
//!   its directory and file denylists.
//! - Removals match on the path relative to the profile root.
//! - Matching is case-insensitive to mirror the target filesystem.

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::RuleError;

/// Outcome of evaluating a path against a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDecision {
    /// Keep the entry.
    Include,
    /// Leave the entry out (or remove it).
    Skip,
}

/// Directory and file denylists applied while copying and measuring.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    directories: Option<GlobSet>,
    files: Option<GlobSet>,
}

impl ExclusionRules {
    /// Compile the denylists.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] when a pattern is blank or does not compile.
    pub fn new(directories: &[String], files: &[String]) -> Result<Self, RuleError> {
        Ok(Self {
            directories: build_globset(parse_glob_list(directories, "exclude_dirs")?, "exclude_dirs")?,
            files: build_globset(parse_glob_list(files, "exclude_files")?, "exclude_files")?,
        })
    }

    /// Decision for a directory named `name`.
    #[must_use]
    pub fn evaluate_dir(&self, name: &Path) -> RuleDecision {
        decide(self.directories.as_ref(), name)
    }

    /// Decision for a file named `name`.
    #[must_use]
    pub fn evaluate_file(&self, name: &Path) -> RuleDecision {
        decide(self.files.as_ref(), name)
    }
}

/// Files removed from a copied profile.
#[derive(Debug, Clone)]
pub struct RemovalRules {
    patterns: Option<GlobSet>,
}

impl RemovalRules {
    /// Compile the removal globs.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] when a pattern is blank or does not compile.
    pub fn new(patterns: &[String]) -> Result<Self, RuleError> {
        Ok(Self {
            patterns: build_globset(parse_glob_list(patterns, "remove_files")?, "remove_files")?,
        })
    }

    /// Decision for `relative`, a path relative to the profile root.
    #[must_use]
    pub fn evaluate(&self, relative: &Path) -> RuleDecision {
        decide(self.patterns.as_ref(), relative)
    }

    /// Number of compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.as_ref().map_or(0, GlobSet::len)
    }

    /// Whether no pattern was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn decide(set: Option<&GlobSet>, path: &Path) -> RuleDecision {
    if set.is_some_and(|set| set.is_match(path)) {
        RuleDecision::Skip
    } else {
        RuleDecision::Include
    }
}

fn parse_glob_list(entries: &[String], field: &'static str) -> Result<Vec<String>, RuleError> {
    entries
        .iter()
        .map(|pattern| {
            if pattern.trim().is_empty() {
                Err(RuleError::EmptyPattern { field })
            } else {
                Ok(pattern.trim().to_string())
            }
        })
        .collect()
}

fn build_globset(patterns: Vec<String>, field: &'static str) -> Result<Option<GlobSet>, RuleError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RuleError::Glob {
                field,
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map(Some).map_err(|source| RuleError::Glob {
        field,
        pattern: "<set>".to_string(),
        source,
    })
}
