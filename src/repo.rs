/// Repository identity resolution for GitHub URLs
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ExtensionConfig;

static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid name pattern"));

const MAX_NAME_LEN: usize = 39;

/// Top-level GitHub paths that are not users or organizations
const RESERVED_OWNERS: &[&str] = &[
    "features", "enterprise", "pricing", "marketplace",
    "explore", "topics", "collections", "events", "sponsors",
    "about", "contact", "blog", "careers", "help", "security",
    "settings", "notifications", "watching", "stars",
    "trending", "search", "new", "organizations",
    "advisories", "pulls", "issues",
];

/// Second path segments that never name a repository
const RESERVED_NAMES: &[&str] = &[
    "search", "new", "import", "codespaces", "settings",
    "organizations", "team", "teams",
];

/// An `{owner}/{name}` pair identifying a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoIdentity {
    pub owner: String,
    pub name: String,
}

impl RepoIdentity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> RepoIdentity {
        RepoIdentity {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// True when `other` is present and names the same repository
    pub fn same_as(&self, other: Option<&RepoIdentity>) -> bool {
        other.is_some_and(|o| o == self)
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Resolve the repository a page belongs to
///
/// Returns `None` for anything that is not a repository page on the
/// source host: other hosts, top-level pages (`/settings/profile`,
/// `/marketplace/...`), repo-less continuations (`/foo/codespaces`) and
/// unparsable input.
///
/// Examples:
/// - https://github.com/rust-lang/rust → rust-lang/rust
/// - https://github.com/rust-lang/rust/issues/5 → rust-lang/rust
/// - https://github.com/yewstack/yew.git → yewstack/yew
/// - https://github.com/settings/profile → None
pub fn resolve(url: &str, source_host: &str) -> Option<RepoIdentity> {
    let parsed = Url::parse(url.trim()).ok()?;

    if parsed.host_str()? != source_host {
        return None;
    }

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let raw_name = segments.next()?;
    let name = raw_name.strip_suffix(".git").unwrap_or(raw_name);

    if !is_valid_name(owner) || !is_valid_name(name) {
        return None;
    }

    if RESERVED_OWNERS.contains(&owner.to_lowercase().as_str()) {
        return None;
    }

    if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
        return None;
    }

    Some(RepoIdentity::new(owner, name))
}

/// Check a GitHub owner or repository name
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }

    if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
        return false;
    }

    VALID_NAME.is_match(name)
}

/// Documentation page for a repository
pub fn content_url(repo: &RepoIdentity, config: &ExtensionConfig) -> String {
    format!("https://{}/{}/{}", config.doc_host, repo.owner, repo.name)
}

/// Documentation site homepage, used as the fallback target
pub fn homepage_url(config: &ExtensionConfig) -> String {
    format!("https://{}/", config.doc_host)
}
