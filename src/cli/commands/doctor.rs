//! Doctor command - verify API keys, tools and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::openai::{azure_config, env_value, openai_api_key, FALLBACK_API_KEY_ENV};
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
///
/// `config_path` is the `--config` value, if any.
pub fn run_doctor(settings: &Settings, config_path: Option<&str>) -> anyhow::Result<()> {
    Output::header("Cogito Doctor");
    println!();
    println!("Checking API keys, tools and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let api_checks = vec![
        check_openai(settings),
        check_azure(settings),
        check_optional_key(
            &settings.tavily.api_key_env,
            "needed by search_chat and tool_chat",
        ),
        check_optional_key(
            &settings.crypto.api_key_env,
            "optional, the public market API works without it",
        ),
    ];
    for check in &api_checks {
        check.print();
    }
    checks.extend(api_checks);

    println!();

    println!("{}", style("Tools").bold());
    let interpreter = check_interpreter(&settings.python_repl.interpreter);
    interpreter.print();
    checks.push(interpreter);

    println!();

    println!("{}", style("Configuration").bold());
    let config_path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    let config_check = check_config_file(&config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Cogito.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Cogito is ready to use.");
    }

    Ok(())
}

/// Show the start and end of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_openai(settings: &Settings) -> CheckResult {
    let hint = format!(
        "Set with: export {}='sk-...' (or {})",
        settings.openai.api_key_env, FALLBACK_API_KEY_ENV
    );
    match openai_api_key(&settings.openai) {
        Some(key) if key.starts_with("sk-") => {
            CheckResult::ok("OpenAI API key", &format!("configured ({})", mask(&key)))
        }
        Some(_) => CheckResult::warning(
            "OpenAI API key",
            "set but format looks unusual",
            "Expected format: sk-... (fine for compatible endpoints)",
        ),
        None => CheckResult::error("OpenAI API key", "not set", &hint),
    }
}

fn check_azure(settings: &Settings) -> CheckResult {
    match azure_config(&settings.azure) {
        Ok(_) => CheckResult::ok("Azure OpenAI", "configured"),
        Err(e) => CheckResult::warning(
            "Azure OpenAI",
            &format!("not configured ({})", e),
            "The chat agent falls back to OpenAI",
        ),
    }
}

fn check_optional_key(name: &str, purpose: &str) -> CheckResult {
    match env_value(name) {
        Some(key) => CheckResult::ok(name, &format!("configured ({})", mask(&key))),
        None => CheckResult::warning(name, "not set", purpose),
    }
}

fn check_interpreter(interpreter: &str) -> CheckResult {
    match Command::new(interpreter).arg("--version").output() {
        Ok(output) if output.status.success() => {
            // Older Pythons print the version on stderr.
            let text = if output.stdout.is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            let version = String::from_utf8_lossy(&text)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok(interpreter, &version)
        }
        Ok(_) => CheckResult::warning(
            interpreter,
            "installed but not working",
            "crypto_charts and python_repl need a working interpreter",
        ),
        Err(_) => CheckResult::warning(
            interpreter,
            "not found",
            "Install Python 3 or set python_repl.interpreter",
        ),
    }
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: cogito config init",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "*****");
        assert_eq!(mask("sk-abcdefghijklmnop"), "sk-abcd...mnop");
    }

    #[test]
    fn test_missing_optional_key_is_warning() {
        let result = check_optional_key("COGITO_DOCTOR_VAR_THAT_IS_NEVER_SET", "optional");
        assert_eq!(result.status, CheckStatus::Warning);
    }

    #[test]
    fn test_config_file_checks_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let missing = check_config_file(&path);
        assert_eq!(missing.status, CheckStatus::Warning);

        std::fs::write(&path, "[graph]\nrecursion_limit = 5\n").unwrap();
        let found = check_config_file(&path);
        assert_eq!(found.status, CheckStatus::Ok);
        assert_eq!(found.message, path.display().to_string());
    }

    #[test]
    fn test_missing_interpreter_is_warning() {
        let result = check_interpreter("definitely-not-an-interpreter");
        assert_eq!(result.status, CheckStatus::Warning);
    }
}
