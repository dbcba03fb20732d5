use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::bail;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Matches `github.com/OWNER/NAME` anywhere in an identifier string.
static GITHUB_REPO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"github\.com/([^/\s]+)/([^/\s?#]+)").expect("repository pattern should be a valid regex"));

/// A GitHub repository, identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    owner: Arc<str>,
    repo: Arc<str>,
}

impl RepoSpec {
    #[must_use]
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: Arc::from(owner),
            repo: Arc::from(repo),
        }
    }

    /// Resolve an identifier such as `https://github.com/owner/name/tree/main` to a repository.
    ///
    /// Anything after the repository name is ignored, as is a trailing `.git`.
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        let Some(captures) = GITHUB_REPO_PATTERN.captures(identifier) else {
            bail!("no GitHub repository found in '{identifier}'");
        };

        let owner = captures.get(1).map_or("", |m| m.as_str());
        let repo = captures.get(2).map_or("", |m| m.as_str()).trim_end_matches(".git");

        if owner.is_empty() || repo.is_empty() {
            bail!("invalid repository identifier: empty owner or repo name: '{identifier}'");
        }

        Ok(Self::new(owner, repo))
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl Display for RepoSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_url() {
        let spec = RepoSpec::from_identifier("https://github.com/tokio-rs/tokio").unwrap();

        assert_eq!(spec.owner(), "tokio-rs");
        assert_eq!(spec.repo(), "tokio");
        assert_eq!(spec.to_string(), "tokio-rs/tokio");
    }

    #[test]
    fn test_parse_url_without_scheme() {
        let spec = RepoSpec::from_identifier("www.github.com/godotengine/godot").unwrap();

        assert_eq!(spec.owner(), "godotengine");
        assert_eq!(spec.repo(), "godot");
    }

    #[test]
    fn test_parse_url_with_git_extension() {
        let spec = RepoSpec::from_identifier("https://github.com/serde-rs/serde.git").unwrap();
        assert_eq!(spec.repo(), "serde");
    }

    #[test]
    fn test_parse_url_with_additional_path_segments() {
        let spec = RepoSpec::from_identifier("https://github.com/tokio-rs/tokio/tree/master/tokio-util").unwrap();

        assert_eq!(spec.owner(), "tokio-rs");
        assert_eq!(spec.repo(), "tokio");
    }

    #[test]
    fn test_parse_url_with_query_and_fragment() {
        let spec = RepoSpec::from_identifier("https://github.com/bevyengine/bevy?tab=readme#install").unwrap();
        assert_eq!(spec.repo(), "bevy");
    }

    #[test]
    fn test_parse_identifier_embedded_in_text() {
        let spec = RepoSpec::from_identifier("source: https://github.com/owner/game and more").unwrap();

        assert_eq!(spec.owner(), "owner");
        assert_eq!(spec.repo(), "game");
    }

    #[test]
    fn test_same_repo_different_paths_are_equal() {
        let spec1 = RepoSpec::from_identifier("https://github.com/tokio-rs/tokio/tree/master/tokio").unwrap();
        let spec2 = RepoSpec::from_identifier("http://github.com/tokio-rs/tokio.git").unwrap();

        assert_eq!(spec1, spec2);
    }

    #[test]
    fn test_parse_non_github_url() {
        let _ = RepoSpec::from_identifier("https://gitlab.com/owner/repo").unwrap_err();
    }

    #[test]
    fn test_parse_only_owner() {
        let _ = RepoSpec::from_identifier("https://github.com/tokio-rs").unwrap_err();
        let _ = RepoSpec::from_identifier("https://github.com/tokio-rs/").unwrap_err();
    }

    #[test]
    fn test_parse_only_git_extension() {
        let _ = RepoSpec::from_identifier("https://github.com/owner/.git").unwrap_err();
    }

    #[test]
    fn test_parse_empty_identifier() {
        let _ = RepoSpec::from_identifier("").unwrap_err();
    }
}
