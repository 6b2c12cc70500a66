//! Pact sources.

use crate::args::VerifierArgs;
use anyhow::{Context, Result};
use pact_models::Pact;
use reqwest::Client;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a pact is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PactSource {
    /// A pact file
    File(PathBuf),
    /// A directory of `*.json` pact files
    Dir(PathBuf),
    /// A pact served over HTTP
    Url(String),
}

impl fmt::Display for PactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) | Self::Dir(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

impl PactSource {
    /// Classify a positional source.
    #[must_use]
    pub fn from_positional(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else if Path::new(raw).is_dir() {
            Self::Dir(PathBuf::from(raw))
        } else {
            Self::File(PathBuf::from(raw))
        }
    }

    /// All sources named by the arguments: files, directories, URLs, then
    /// positional sources.
    #[must_use]
    pub fn from_args(args: &VerifierArgs) -> Vec<Self> {
        args.files
            .iter()
            .cloned()
            .map(Self::File)
            .chain(args.dirs.iter().cloned().map(Self::Dir))
            .chain(args.urls.iter().cloned().map(Self::Url))
            .chain(args.sources.iter().map(|raw| Self::from_positional(raw)))
            .collect()
    }
}

/// Credentials used when fetching pact URLs.
#[derive(Debug, Clone, Default)]
pub struct BrokerAuth {
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Bearer token, preferred over basic auth
    pub token: Option<String>,
}

impl BrokerAuth {
    /// Credentials from the verifier arguments.
    #[must_use]
    pub fn from_args(args: &VerifierArgs) -> Self {
        Self {
            username: args.broker_username.clone(),
            password: args.broker_password.clone(),
            token: args.broker_token.clone(),
        }
    }
}

/// A loaded pact, or why it could not be loaded.
#[derive(Debug)]
pub struct LoadedPact {
    /// Textual form of the source
    pub source: String,
    /// The pact, or the load error
    pub pact: Result<Pact>,
}

/// Load every pact named by `sources`, in order. Directories expand to
/// their `*.json` files sorted by name.
pub async fn load_all(sources: &[PactSource], client: &Client, auth: &BrokerAuth) -> Vec<LoadedPact> {
    let mut loaded = Vec::new();
    for source in sources {
        match source {
            PactSource::File(path) => loaded.push(LoadedPact {
                source: source.to_string(),
                pact: load_file(path),
            }),
            PactSource::Dir(dir) => match list_pact_files(dir) {
                Ok(files) => loaded.extend(files.into_iter().map(|path| LoadedPact {
                    source: path.display().to_string(),
                    pact: load_file(&path),
                })),
                Err(err) => loaded.push(LoadedPact {
                    source: source.to_string(),
                    pact: Err(err),
                }),
            },
            PactSource::Url(url) => loaded.push(LoadedPact {
                source: source.to_string(),
                pact: load_url(url, client, auth).await,
            }),
        }
    }
    loaded
}

fn load_file(path: &Path) -> Result<Pact> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pact file {}", path.display()))?;
    let pact = Pact::from_json(&text)
        .with_context(|| format!("failed to parse pact file {}", path.display()))?;
    debug!(path = %path.display(), interactions = pact.interactions.len(), "loaded pact file");
    Ok(pact)
}

fn list_pact_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read pact directory {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read pact directory {}", dir.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn load_url(url: &str, client: &Client, auth: &BrokerAuth) -> Result<Pact> {
    let mut request = client.get(url).header("Accept", "application/hal+json, application/json");
    if let Some(token) = &auth.token {
        request = request.bearer_auth(token);
    } else if let Some(username) = &auth.username {
        request = request.basic_auth(username, auth.password.as_ref());
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("failed to fetch pact from {url}"))?
        .error_for_status()
        .with_context(|| format!("failed to fetch pact from {url}"))?;
    let text = response
        .text()
        .await
        .with_context(|| format!("failed to read pact body from {url}"))?;
    let pact = Pact::from_json(&text).with_context(|| format!("failed to parse pact from {url}"))?;
    debug!(url, interactions = pact.interactions.len(), "loaded pact from URL");
    Ok(pact)
}
