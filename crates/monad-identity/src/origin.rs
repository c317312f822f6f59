//! Origin URL grammar
//!
//! Accepted shapes, each with an optional trailing `/` and optional `.git`:
//!
//! ```text
//! https://[user@]host[:port]/org/repo      (also http, ssh, git schemes)
//! [user@]host:org/repo                     (scp-like ssh)
//! ```
//!
//! The path must be exactly two non-empty segments. Nested groups
//! (`group/sub/repo`), single-segment paths, and unknown schemes are
//! rejected instead of guessed at.

use crate::error::{IdentityError, IdentityResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

static URL_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?|ssh|git)://(?:[^@/\s]+@)?(?P<host>[A-Za-z0-9.-]+)(?::\d+)?/(?P<path>[^?#\s]*)$")
        .expect("url form pattern is valid")
});

static SCP_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[^@/:\s]+@)?(?P<host>[A-Za-z0-9.-]+):(?P<path>[^/\s][^?#\s]*)$")
        .expect("scp form pattern is valid")
});

/// Parsed repository origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OriginUrl {
    host: String,
    org: String,
    repo: String,
}

impl OriginUrl {
    /// Parse a remote URL
    ///
    /// # Errors
    /// Returns `IdentityError::MetadataParse` for any shape outside the grammar.
    ///
    /// # Examples
    /// ```
    /// # use monad_identity::OriginUrl;
    /// let origin = OriginUrl::parse("git@github.com:acme/svc.git").unwrap();
    /// assert_eq!(origin.org(), "acme");
    /// assert_eq!(origin.to_string(), "github.com/acme/svc");
    /// ```
    pub fn parse(url: &str) -> IdentityResult<Self> {
        let url = url.trim();
        let captures = URL_FORM
            .captures(url)
            .or_else(|| SCP_FORM.captures(url))
            .ok_or_else(|| IdentityError::metadata_parse(url, "unsupported remote url shape"))?;

        let host = &captures["host"];
        let path = captures["path"].trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [org, repo] if !org.is_empty() && !repo.is_empty() => Ok(Self {
                host: host.to_ascii_lowercase(),
                org: (*org).to_string(),
                repo: (*repo).to_string(),
            }),
            _ => Err(IdentityError::metadata_parse(
                url,
                format!("expected org/repo path, found '{path}'"),
            )),
        }
    }

    /// Hosting service, without user or port
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Owning organization
    #[inline]
    #[must_use]
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Repository name, without `.git`
    #[inline]
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl Display for OriginUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.org, self.repo)
    }
}

impl FromStr for OriginUrl {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(url: &str) -> (String, String, String) {
        let origin = OriginUrl::parse(url).unwrap();
        (
            origin.host().to_string(),
            origin.org().to_string(),
            origin.repo().to_string(),
        )
    }

    fn owned(host: &str, org: &str, repo: &str) -> (String, String, String) {
        (host.to_string(), org.to_string(), repo.to_string())
    }

    #[test]
    fn https_forms() {
        let expected = owned("github.com", "acme", "svc");
        assert_eq!(parts("https://github.com/acme/svc.git"), expected);
        assert_eq!(parts("https://github.com/acme/svc"), expected);
        assert_eq!(parts("https://github.com/acme/svc/"), expected);
        assert_eq!(parts("https://token@github.com/acme/svc.git"), expected);
        assert_eq!(parts("http://github.com:8080/acme/svc.git"), expected);
    }

    #[test]
    fn ssh_forms() {
        let expected = owned("github.com", "acme", "svc");
        assert_eq!(parts("git@github.com:acme/svc.git"), expected);
        assert_eq!(parts("github.com:acme/svc"), expected);
        assert_eq!(parts("ssh://git@github.com/acme/svc.git"), expected);
        assert_eq!(parts("ssh://git@github.com:22/acme/svc.git"), expected);
    }

    #[test]
    fn enterprise_hosts_are_accepted() {
        assert_eq!(
            parts("git@git.corp.example.com:platform/edge-router.git"),
            owned("git.corp.example.com", "platform", "edge-router")
        );
    }

    #[test]
    fn single_segment_is_rejected() {
        let err = OriginUrl::parse("https://example.com/not-github").unwrap_err();
        assert!(matches!(err, IdentityError::MetadataParse { .. }));
    }

    #[test]
    fn nested_groups_are_rejected() {
        assert!(OriginUrl::parse("https://gitlab.com/group/sub/repo.git").is_err());
    }

    #[test]
    fn malformed_urls_are_rejected() {
        for url in [
            "",
            "not a url",
            "ftp://github.com/acme/svc.git",
            "https://github.com//svc.git",
            "https://github.com/acme/.git",
            "/local/path/repo.git",
            "git@github.com:/acme/svc.git",
        ] {
            assert!(OriginUrl::parse(url).is_err(), "accepted {url:?}");
        }
    }

    #[test]
    fn display_is_host_org_repo() {
        let origin: OriginUrl = "git@GitHub.com:acme/svc.git".parse().unwrap();
        assert_eq!(origin.to_string(), "github.com/acme/svc");
    }
}
