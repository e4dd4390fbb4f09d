//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, config_path: Option<&str>, settings: Settings) -> Result<()> {
    let path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }

        ConfigAction::Init { force } => {
            write_default(&path, *force)?;
        }
    }

    Ok(())
}

fn write_default(path: &PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        Output::warning(&format!("Config already exists at {}", path.display()));
        Output::info("Use --force to overwrite it.");
        return Ok(());
    }

    Settings::default().save_to(path)?;
    Output::success(&format!("Wrote default config to {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[graph]\nrecursion_limit = 7\n").unwrap();

        write_default(&path, false).unwrap();
        let kept = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(kept.graph.recursion_limit, 7);

        write_default(&path, true).unwrap();
        let replaced = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(replaced.graph.recursion_limit, 25);
    }
}
