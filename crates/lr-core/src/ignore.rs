//! Ignore patterns for asset names.
//!
//! An [`IgnoreSpec`] holds zero or more patterns. An asset is ignored when its
//! name matches any of them. Two pattern flavours are accepted:
//!
//! - `/…/`: a regular expression, searched anywhere in the name
//!   (`/\.map$/` ignores source maps)
//! - anything else: a glob matched against the whole name, where `*` does
//!   not cross `/` (`*.css`, `**/*.json`)

use glob::{MatchOptions, Pattern};
use regex::Regex;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Error compiling an ignore pattern.
#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    /// Invalid glob pattern.
    #[error("invalid glob pattern `{pattern}`: {source}")]
    Glob {
        /// Pattern as written.
        pattern: String,
        /// Underlying glob error.
        source: glob::PatternError,
    },
    /// Invalid regular expression.
    #[error("invalid regex pattern `{pattern}`: {source}")]
    Regex {
        /// Pattern as written.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
}

#[derive(Clone, Debug)]
enum IgnorePattern {
    Glob(Pattern),
    Regex(Regex),
}

impl IgnorePattern {
    fn parse(raw: &str) -> Result<Self, IgnoreError> {
        if let Some(body) = raw
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
            .filter(|body| !body.is_empty())
        {
            return Regex::new(body)
                .map(Self::Regex)
                .map_err(|source| IgnoreError::Regex {
                    pattern: raw.to_owned(),
                    source,
                });
        }

        Pattern::new(raw)
            .map(Self::Glob)
            .map_err(|source| IgnoreError::Glob {
                pattern: raw.to_owned(),
                source,
            })
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches_with(name, GLOB_OPTIONS),
            Self::Regex(regex) => regex.is_match(name),
        }
    }
}

/// Ordered set of ignore patterns. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct IgnoreSpec {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreSpec {
    /// Spec that ignores nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Compile a list of patterns.
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, IgnoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| IgnorePattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns `true` if `name` matches any pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    /// Number of compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if no patterns are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
