//! Finding a reachable CodeQL bundle.
//!
//! A workflow may run on a GitHub Enterprise server with a forked copy of the
//! action, while the bundle itself may only exist on github.com. Candidates
//! are therefore built from {current server, public server} x {this action's
//! repository, canonical repository} and tried in that order.

use qlrun_core::{Error, Result};
use reqwest::{Client, RequestBuilder, Url};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::repository::ActionRepository;
use crate::{GITHUB_DOTCOM_URL, default_bundle_suffix};

/// Inputs for building and trying candidate URLs.
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Access token, sent only to non-public hosts.
    pub token: String,
    /// Server the workflow runs on.
    pub server_url: String,
    /// Public GitHub server.
    pub public_url: String,
    /// Repository this action was installed from.
    pub action_repository: ActionRepository,
    /// Path below `releases/download/` identifying the bundle.
    pub bundle_suffix: String,
}

impl LocatorConfig {
    /// Config targeting the public server with the canonical repository.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            server_url: GITHUB_DOTCOM_URL.to_string(),
            public_url: GITHUB_DOTCOM_URL.to_string(),
            action_repository: ActionRepository::canonical(),
            bundle_suffix: default_bundle_suffix(),
        }
    }

    /// Set the current server.
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Set the public server.
    #[must_use]
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into();
        self
    }

    /// Set the action repository.
    #[must_use]
    pub fn with_action_repository(mut self, repository: ActionRepository) -> Self {
        self.action_repository = repository;
        self
    }
}

/// One candidate download location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    /// Server base URL.
    pub server: String,
    /// `owner/repo` slug.
    pub repository: String,
    /// Full download URL.
    pub url: String,
}

/// Tries candidate URLs and downloads bundles.
#[derive(Debug, Clone)]
pub struct BundleLocator {
    client: Client,
    config: LocatorConfig,
}

impl BundleLocator {
    /// Create a locator.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization failure).
    pub fn new(config: LocatorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("qlrun/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(&config.server_url, format!("failed to build client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The locator's configuration.
    #[must_use]
    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Candidate URLs in lookup order, without duplicates.
    #[must_use]
    pub fn candidates(&self) -> Vec<CandidateUrl> {
        let servers = [&self.config.server_url, &self.config.public_url];
        let repositories = [
            self.config.action_repository.as_str(),
            crate::CANONICAL_ACTION_REPOSITORY,
        ];

        let all = servers.iter().flat_map(|server| {
            repositories.iter().map(move |repo| CandidateUrl {
                server: (*server).clone(),
                repository: (*repo).to_string(),
                url: format!(
                    "{}/{}/releases/download/{}",
                    server.trim_end_matches('/'),
                    repo,
                    self.config.bundle_suffix
                ),
            })
        });
        dedup_by_url(all)
    }

    /// Whether a request to `url` carries the token.
    ///
    /// The token goes to every host except the public server.
    #[must_use]
    pub fn sends_token_to(&self, url: &str) -> bool {
        !same_host(url, &self.config.public_url)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        if self.sends_token_to(url) {
            request.header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", self.config.token),
            )
        } else {
            request
        }
    }

    /// Return the first candidate that answers a GET with success.
    ///
    /// GET is used rather than HEAD because the signed redirect target of
    /// a release asset may reject HEAD.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BundleUnavailable`] if no candidate succeeds.
    pub async fn locate(&self) -> Result<String> {
        let candidates = self.candidates();
        let mut tried = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            debug!(url = %candidate.url, "Trying bundle candidate");
            match self.get(&candidate.url).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        url = %candidate.url,
                        server = %candidate.server,
                        repository = %candidate.repository,
                        "Found CodeQL bundle"
                    );
                    return Ok(candidate.url);
                }
                Ok(response) => {
                    debug!(url = %candidate.url, status = %response.status(), "Bundle not found at candidate");
                }
                Err(e) => {
                    debug!(url = %candidate.url, error = %e, "Bundle candidate unavailable");
                }
            }
            tried.push(candidate.url);
        }

        Err(Error::BundleUnavailable { tried })
    }

    /// Download `url` to `dest`, streaming the body to disk.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// write failure.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!(%url, dest = %dest.display(), "Downloading CodeQL bundle");

        let mut response = self
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(url, e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::http(url, format!("HTTP {}", response.status())));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(e, parent, "create directory"))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io(e, dest, "create"))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::http(url, e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, dest, "write"))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| Error::io(e, dest, "write"))?;

        debug!(%url, bytes = written, "Download complete");
        Ok(())
    }
}

fn dedup_by_url(candidates: impl IntoIterator<Item = CandidateUrl>) -> Vec<CandidateUrl> {
    let mut unique: Vec<CandidateUrl> = Vec::new();
    for candidate in candidates {
        if !unique.iter().any(|c| c.url == candidate.url) {
            unique.push(candidate);
        }
    }
    unique
}

/// Compare host and port; unparseable URLs never match.
fn same_host(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.host_str().map(str::to_ascii_lowercase) == b.host_str().map(str::to_ascii_lowercase)
                && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(server: &str, repo: &str) -> BundleLocator {
        BundleLocator::new(
            LocatorConfig::new("secret")
                .with_server_url(server)
                .with_action_repository(ActionRepository::new(repo)),
        )
        .unwrap()
    }

    #[test]
    fn test_candidate_order() {
        let urls: Vec<_> = locator("https://ghe.example.com/", "acme/fork")
            .candidates()
            .into_iter()
            .map(|c| c.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://ghe.example.com/acme/fork/releases/download/codeql-bundle-20200610/codeql-bundle.tar.gz",
                "https://ghe.example.com/github/codeql-action/releases/download/codeql-bundle-20200610/codeql-bundle.tar.gz",
                "https://github.com/acme/fork/releases/download/codeql-bundle-20200610/codeql-bundle.tar.gz",
                "https://github.com/github/codeql-action/releases/download/codeql-bundle-20200610/codeql-bundle.tar.gz",
            ]
        );
    }

    #[test]
    fn test_candidates_dedup_on_dotcom() {
        let candidates = locator("https://github.com", "github/codeql-action").candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].server, "https://github.com");
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let c = |url: &str| CandidateUrl {
            server: String::new(),
            repository: String::new(),
            url: url.to_string(),
        };
        let unique = dedup_by_url([c("a"), c("b"), c("a"), c("d")]);
        let urls: Vec<_> = unique.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_token_only_for_non_public_hosts() {
        let locator = locator("https://ghe.example.com", "acme/fork");
        assert!(locator.sends_token_to("https://ghe.example.com/a/b"));
        assert!(!locator.sends_token_to("https://github.com/a/b"));
        assert!(!locator.sends_token_to("https://GitHub.com:443/a/b"));
        assert!(locator.sends_token_to("https://github.com.evil.example/a/b"));
        assert!(locator.sends_token_to("http://github.com:8080/a/b"));
    }
}
