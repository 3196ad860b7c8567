//! Exclude and keep rules
//!
//! Rules are regular expressions matched against paths relative to the mirror root, in
//! canonical forward-slash form. A walk rule must match the whole path. A rule applied to an
//! explicitly named file also matches when it covers a leading run of whole segments, so
//! excluding `build` drops `build/app.js` too.

use ftpmirror_types::{Error, Result};
use regex::Regex;
use std::borrow::Cow;
use std::path::MAIN_SEPARATOR;

/// What a rule does when it matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Remove the path from the sync entirely
    Exclude,
    /// Protect the remote path from orphan deletion
    Keep,
}

/// How a rule is anchored on the candidate path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The pattern must match the complete path
    WholePath,
    /// The pattern must match the path up to a segment boundary
    SegmentPrefix,
}

/// A compiled pattern tagged with its kind
#[derive(Debug, Clone)]
pub struct FilterRule {
    kind: RuleKind,
    anchor: Anchor,
    pattern: String,
    regex: Regex,
}

impl FilterRule {
    /// Compile a rule from a user supplied pattern
    pub fn new(pattern: &str, kind: RuleKind, anchor: Anchor) -> Result<Self> {
        let source = match anchor {
            Anchor::WholePath => format!("^(?:{pattern})$"),
            Anchor::SegmentPrefix => format!("^(?:{pattern})(?:/|$)"),
        };
        let regex = Regex::new(&source).map_err(|e| Error::Filter {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            kind,
            anchor,
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Rule kind
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Rule anchoring
    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// The pattern as given by the user
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Test a single path form against this rule
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Convert a relative path to canonical form: forward slashes, no leading `./`,
/// no leading or trailing separators.
pub fn normalize(path: &str) -> String {
    let mut canonical = if MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    };
    while let Some(rest) = canonical.strip_prefix("./") {
        canonical = rest.to_string();
    }
    canonical.trim_matches('/').to_string()
}

/// Path forms a rule is tried against: the canonical form, plus the native form when the
/// platform separator differs.
fn separator_forms(path: &str) -> Vec<Cow<'_, str>> {
    let mut forms = vec![Cow::Borrowed(path)];
    if MAIN_SEPARATOR != '/' && path.contains('/') {
        forms.push(Cow::Owned(path.replace('/', &MAIN_SEPARATOR.to_string())));
    }
    forms
}

/// Check whether any rule in `rules` matches `path` in any separator form
pub fn matches(path: &str, rules: &[FilterRule]) -> bool {
    let forms = separator_forms(path);
    rules
        .iter()
        .any(|rule| forms.iter().any(|form| rule.is_match(form)))
}

/// The full rule set of a run
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    excludes: Vec<FilterRule>,
    explicit_excludes: Vec<FilterRule>,
    keeps: Vec<FilterRule>,
}

impl PathFilter {
    /// Compile exclude and keep patterns
    pub fn new<S: AsRef<str>>(excludes: &[S], keeps: &[S]) -> Result<Self> {
        let mut filter = Self::default();
        for pattern in excludes {
            filter.push_exclude(pattern.as_ref())?;
        }
        for pattern in keeps {
            filter
                .keeps
                .push(FilterRule::new(pattern.as_ref(), RuleKind::Keep, Anchor::WholePath)?);
        }
        Ok(filter)
    }

    /// Also exclude a literal name, such as the calibration marker
    pub fn with_excluded_name(mut self, name: &str) -> Result<Self> {
        self.push_exclude(&regex::escape(name))?;
        Ok(self)
    }

    fn push_exclude(&mut self, pattern: &str) -> Result<()> {
        self.excludes
            .push(FilterRule::new(pattern, RuleKind::Exclude, Anchor::WholePath)?);
        self.explicit_excludes
            .push(FilterRule::new(pattern, RuleKind::Exclude, Anchor::SegmentPrefix)?);
        Ok(())
    }

    /// Whether a path met during the local walk is excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        matches(path, &self.excludes)
    }

    /// Whether an explicitly named file is excluded
    pub fn is_excluded_explicit(&self, path: &str) -> bool {
        matches(path, &self.explicit_excludes)
    }

    /// Whether a remote path is protected from orphan deletion
    pub fn is_kept(&self, path: &str) -> bool {
        matches(path, &self.keeps)
    }

    /// Number of exclude rules
    pub fn exclude_count(&self) -> usize {
        self.excludes.len()
    }

    /// Number of keep rules
    pub fn keep_count(&self) -> usize {
        self.keeps.len()
    }
}
