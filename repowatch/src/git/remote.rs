//! Authenticated remote URLs

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::errors::WatchError;

const GITHUB_BASE: &str = "https://github.com";

/// Build a remote URL with `token` embedded as the userinfo.
///
/// `repo` is either an `owner/repo` shorthand, resolved against GitHub, or an
/// `http(s)` URL. Local `file://` remotes need no credentials and are
/// returned as they are.
pub fn authenticated_url(repo: &str, token: &SecretString) -> Result<SecretString, WatchError> {
    let repo = repo.trim();

    let mut url = match Url::parse(repo) {
        Ok(url) if matches!(url.scheme(), "https" | "http") => url,
        Ok(url) if url.scheme() == "file" => return Ok(SecretString::from(url.to_string())),
        Ok(url) => {
            return Err(WatchError::ConfigError(format!(
                "Cannot embed a token in a {} remote",
                url.scheme()
            )))
        }
        Err(_) => shorthand_url(repo)?,
    };

    url.set_username(token.expose_secret())
        .map_err(|_| WatchError::ConfigError(format!("Cannot embed a token in {}", repo)))?;

    Ok(SecretString::from(url.to_string()))
}

/// Mask every occurrence of `token` in `text`
pub fn redact(text: &str, token: &SecretString) -> String {
    let secret = token.expose_secret();
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "***")
}

fn shorthand_url(repo: &str) -> Result<Url, WatchError> {
    let mut parts = repo.trim_end_matches(".git").split('/');
    let (owner, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if is_slug(owner) && is_slug(name) => (owner, name),
        _ => {
            return Err(WatchError::ConfigError(format!(
                "Expected owner/repo or an https URL, got `{}`",
                repo
            )))
        }
    };

    Url::parse(&format!("{}/{}/{}.git", GITHUB_BASE, owner, name))
        .map_err(|e| WatchError::ConfigError(format!("Invalid repository `{}`: {}", repo, e)))
}

fn is_slug(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
