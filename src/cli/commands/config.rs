//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
///
/// `config_path` is the `--config` override, if any.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: Option<&str>) -> Result<()> {
    let config_path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            println!("{}", render(&settings)?);
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            init_config(&settings, &config_path, *force)?;
        }
    }

    Ok(())
}

fn render(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))
}

fn init_config(settings: &Settings, path: &PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        Output::warning(&format!("Config already exists at {}", path.display()));
        Output::info("Use --force to overwrite it.");
        return Ok(());
    }

    // Keys come from the environment; keep them out of the file.
    let mut settings = settings.clone();
    settings.llm.api_key = None;
    settings.web_search.api_key = None;

    settings.save_to(path)?;
    Output::success(&format!("Wrote config to {}", path.display()));

    let documents_dir = settings.documents_dir();
    if !documents_dir.exists() {
        std::fs::create_dir_all(&documents_dir)?;
        Output::info(&format!("Created documents directory {}", documents_dir.display()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_and_respects_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizrag").join("config.toml");

        let mut settings = Settings::default();
        settings.ingest.documents_dir = dir.path().join("docs").display().to_string();
        settings.llm.api_key = Some("sk-secret".to_string());
        settings.retrieval.k = 7;

        init_config(&settings, &path, false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("sk-secret"));
        assert!(dir.path().join("docs").is_dir());

        let loaded: Settings = toml::from_str(&written).unwrap();
        assert_eq!(loaded.retrieval.k, 7);

        settings.retrieval.k = 9;
        init_config(&settings, &path, false).unwrap();
        let loaded: Settings = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.retrieval.k, 7);

        init_config(&settings, &path, true).unwrap();
        let loaded: Settings = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.retrieval.k, 9);
    }
}
