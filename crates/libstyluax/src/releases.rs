use std::fmt;

use async_trait::async_trait;
use globset::Glob;
use reqwest::header;
use serde::Deserialize;

use crate::{Result, StyluaxError};

const GITHUB_API: &str = "https://api.github.com";

/// Repository stylua releases are fetched from by default.
pub const DEFAULT_REPO: &str = "JohnnyMorganz/StyLua";

/// Which release of the repository to track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Latest,
    Tag(String),
}

impl Channel {
    /// Parses the `version` configuration value: "latest" or an explicit tag.
    pub fn from_version(version: &str) -> Self {
        match version {
            "" | "latest" => Channel::Latest,
            tag => Channel::Tag(tag.to_string()),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Latest => write!(f, "latest"),
            Channel::Tag(tag) => write!(f, "tags/{}", tag),
        }
    }
}

/// A downloadable artifact attached to a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// A release descriptor: the version tag and its artifacts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    #[serde(rename = "tag_name")]
    pub version: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// The artifact for the current platform, if the release carries one.
    pub fn platform_asset(&self) -> Option<&ReleaseAsset> {
        let matcher = Glob::new(platform_pattern()).ok()?.compile_matcher();
        self.assets.iter().find(|asset| matcher.is_match(&asset.name))
    }
}

fn platform_pattern() -> &'static str {
    if cfg!(target_os = "windows") {
        "stylua-*win64.zip"
    } else if cfg!(target_os = "macos") {
        "stylua-*macos.zip"
    } else {
        "stylua-*linux.zip"
    }
}

/// Source of release descriptors and artifacts. Backed by the GitHub API in
/// production and stubbed in tests.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch the release descriptor for a channel.
    async fn fetch(&self, channel: &Channel) -> Result<Release>;

    /// Download an artifact's bytes.
    async fn fetch_asset(&self, asset: &ReleaseAsset) -> Result<Vec<u8>>;
}

/// Release source over a GitHub repository's releases.
pub struct GithubReleases {
    repo: String,
    client: reqwest::Client,
}

impl GithubReleases {
    pub fn new<S: Into<String>>(repo: S) -> Self {
        GithubReleases {
            repo: repo.into(),
            client: reqwest::Client::new(),
        }
    }

    fn release_url(&self, channel: &Channel) -> String {
        match channel {
            Channel::Latest => format!("{}/repos/{}/releases/latest", GITHUB_API, self.repo),
            Channel::Tag(tag) => {
                format!("{}/repos/{}/releases/tags/{}", GITHUB_API, self.repo, tag)
            }
        }
    }
}

#[async_trait]
impl ReleaseSource for GithubReleases {
    async fn fetch(&self, channel: &Channel) -> Result<Release> {
        let url = self.release_url(channel);
        let response = self
            .client
            .get(&url)
            // GitHub rejects requests without a user agent
            .header(header::USER_AGENT, "styluax")
            .send()
            .await
            .map_err(|e| StyluaxError::RemoteFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| StyluaxError::RemoteFetch(e.to_string()))?;
        response
            .json::<Release>()
            .await
            .map_err(|e| StyluaxError::RemoteFetch(format!("invalid release descriptor: {}", e)))
    }

    async fn fetch_asset(&self, asset: &ReleaseAsset) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&asset.download_url)
            .header(header::USER_AGENT, "styluax")
            .send()
            .await
            .map_err(|e| StyluaxError::RemoteFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| StyluaxError::RemoteFetch(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StyluaxError::RemoteFetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_channel_from_version() {
        assert_eq!(Channel::from_version("latest"), Channel::Latest);
        assert_eq!(Channel::from_version(""), Channel::Latest);
        assert_eq!(
            Channel::from_version("v0.20.0"),
            Channel::Tag("v0.20.0".to_string())
        );
    }

    #[test]
    fn test_release_url() {
        let source = GithubReleases::new(DEFAULT_REPO);
        assert_eq!(
            source.release_url(&Channel::Latest),
            "https://api.github.com/repos/JohnnyMorganz/StyLua/releases/latest"
        );
        assert_eq!(
            source.release_url(&Channel::Tag("v0.20.0".to_string())),
            "https://api.github.com/repos/JohnnyMorganz/StyLua/releases/tags/v0.20.0"
        );
    }

    #[test]
    fn test_release_deserialization() {
        let body = indoc! {r#"
            {
                "tag_name": "v0.20.0",
                "name": "v0.20.0",
                "prerelease": false,
                "assets": [
                    {
                        "name": "stylua-0.20.0-linux.zip",
                        "browser_download_url": "https://example.com/stylua-0.20.0-linux.zip",
                        "size": 123
                    }
                ]
            }
        "#};
        let release: Release = serde_json::from_str(body).unwrap();
        assert_eq!(release.version, "v0.20.0");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].name, "stylua-0.20.0-linux.zip");
    }

    #[test]
    fn test_platform_asset_selection() {
        let asset = |name: &str| ReleaseAsset {
            name: name.to_string(),
            download_url: format!("https://example.com/{}", name),
        };
        let release = Release {
            version: "v0.20.0".to_string(),
            assets: vec![
                asset("stylua-0.20.0-win64.zip"),
                asset("stylua-0.20.0-linux.zip"),
                asset("stylua-0.20.0-macos.zip"),
                asset("CHANGELOG.md"),
            ],
        };
        let expected = if cfg!(target_os = "windows") {
            "stylua-0.20.0-win64.zip"
        } else if cfg!(target_os = "macos") {
            "stylua-0.20.0-macos.zip"
        } else {
            "stylua-0.20.0-linux.zip"
        };
        assert_eq!(release.platform_asset().unwrap().name, expected);

        let bare = Release {
            version: "v0.20.0".to_string(),
            assets: vec![asset("source.tar.gz")],
        };
        assert!(bare.platform_asset().is_none());
    }
}
