//! The selection fragment: `servers.html#12,40,7`.
//!
//! The fragment is the only place the selection lives. Reading it keeps the
//! tokens that are plain non-negative integers and silently drops the rest,
//! writing it always emits the ids in ascending numeric order.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::SVError;

/// Returns true for tokens made of one or more ascii digits.
pub fn is_server_id(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Numeric order for digit strings of any length. Ids that are not numbers
/// go after all numbers, in byte order.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (is_server_id(a), is_server_id(b)) {
        (true, true) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

/// The list of ids a fragment carries, in fragment order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn parse(fragment: &str) -> Self {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let ids = fragment
            .split(',')
            .filter(|token| is_server_id(token))
            .map(str::to_string)
            .collect();
        Self { ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Set view used to mark rows.
    pub fn as_set(&self) -> HashSet<&str> {
        self.ids.iter().map(String::as_str).collect()
    }

    pub fn push(&mut self, id: &str) {
        self.ids.push(id.to_string());
    }

    /// Removes the first occurrence of `id`. Returns false if it was absent.
    pub fn remove_first(&mut self, id: &str) -> bool {
        match self.ids.iter().position(|i| i == id) {
            Some(pos) => {
                self.ids.remove(pos);
                true
            }
            None => false,
        }
    }

    /// `#` followed by the ids in ascending numeric order.
    pub fn to_fragment(&self) -> String {
        let mut ids = self.ids.clone();
        ids.sort_by(|a, b| compare_ids(a, b));
        format!("#{}", ids.join(","))
    }
}

/// Where the listing came from plus the selection fragment, the terminal
/// counterpart of the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    fragment: String,
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        // A file whose name contains a '#' is taken as a whole.
        if Path::new(raw).exists() {
            return Self {
                path: raw.to_string(),
                fragment: String::new(),
            };
        }
        match raw.split_once('#') {
            Some((path, fragment)) => Self {
                path: path.to_string(),
                fragment: fragment.to_string(),
            },
            None => Self {
                path: raw.to_string(),
                fragment: String::new(),
            },
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fragment without the leading `#`.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Replaces the fragment. Returns false if nothing changed.
    pub fn set_fragment(&mut self, fragment: &str) -> bool {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        if self.fragment == fragment {
            return false;
        }
        self.fragment = fragment.to_string();
        true
    }

    pub fn selection(&self) -> Selection {
        Selection::parse(&self.fragment)
    }

    /// Path with `~` and environment variables expanded.
    pub fn expanded_path(&self) -> Result<PathBuf, SVError> {
        let expanded = shellexpand::full(&self.path)
            .map_err(|e| SVError::LoadingFailed(format!("{}: {}", self.path, e)))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fragment.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}#{}", self.path, self.fragment)
        }
    }
}
