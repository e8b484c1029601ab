//! Access token lookup
//!
//! The token is obtained elsewhere (e.g. `gcloud auth print-access-token`)
//! and handed over through an environment variable or a file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use sheet_sync::StaticToken;

use crate::config::AppConfig;

pub fn access_token(config: &AppConfig) -> Result<StaticToken> {
    lookup(config, |name| std::env::var(name).ok())
}

fn lookup(config: &AppConfig, env: impl Fn(&str) -> Option<String>) -> Result<StaticToken> {
    if let Some(token) = env(&config.token_env).filter(|t| !t.trim().is_empty()) {
        tracing::debug!(var = %config.token_env, "using access token from environment");
        return Ok(StaticToken(token.trim().to_string()));
    }

    if let Some(path) = &config.token_file {
        let token = read_token_file(path)?;
        tracing::debug!(path = %path.display(), "using access token from file");
        return Ok(StaticToken(token));
    }

    bail!(
        "No access token: set {} or token_file in the config",
        config.token_env
    )
}

fn read_token_file(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file {}", path.display()))?;
    let token = token.trim();
    if token.is_empty() {
        bail!("Token file {} is empty", path.display());
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_env_wins() {
        let config = AppConfig { token_file: Some("/nonexistent".into()), ..AppConfig::default() };
        let token = lookup(&config, |name| {
            (name == "GSHEET_ACCESS_TOKEN").then(|| " ya29.abc\n".to_string())
        })
        .unwrap();
        assert_eq!(token.0, "ya29.abc");
    }

    #[test]
    fn test_file_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "ya29.file\n").unwrap();

        let config = AppConfig { token_file: Some(path), ..AppConfig::default() };
        assert_eq!(lookup(&config, no_env).unwrap().0, "ya29.file");
    }

    #[test]
    fn test_missing_token() {
        assert!(lookup(&AppConfig::default(), no_env).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();
        let config = AppConfig { token_file: Some(path), ..AppConfig::default() };
        assert!(lookup(&config, |_| Some(String::new())).is_err());
    }
}
