use crate::cli::ConfigAction;
use anyhow::{Context, Result};
use console::{Term, style};
use dialoguer::Confirm;
use torrent_grabber::ConfigManager;

pub async fn handle_config(config_manager: &mut ConfigManager, action: ConfigAction) -> Result<bool> {
    let term = Term::stdout();

    match action {
        ConfigAction::Show => {
            let content = toml::to_string_pretty(config_manager.config())
                .context("Failed to serialize config")?;
            term.write_line(&format!("{} Current configuration:", style("⚙️").cyan()))?;
            term.write_line("")?;
            term.write_line(&content)?;
        }

        ConfigAction::Path => {
            term.write_line(&config_manager.config_file().display().to_string())?;
        }

        ConfigAction::Validate => {
            term.write_line(&format!(
                "{} Validating configuration...",
                style("🔍").cyan()
            ))?;

            match config_manager.validate() {
                Ok(()) => {
                    term.write_line(&format!("{} Configuration is valid", style("✅").green()))?;
                    let agent = &config_manager.config().agent;
                    if agent.username.is_none() || agent.password.is_none() {
                        term.write_line(&format!(
                            "{} No agent credentials set; factory defaults will be tried",
                            style("⚠️").yellow()
                        ))?;
                    }
                }
                Err(e) => {
                    term.write_line(&format!("{} {}", style("❌").red(), e))?;
                    return Ok(false);
                }
            }
        }

        ConfigAction::Reset { yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Replace the configuration with defaults?")
                    .default(false)
                    .interact()?;

            if !confirmed {
                term.write_line(&format!("{} Reset cancelled", style("↩️").dim()))?;
                return Ok(true);
            }

            config_manager.reset()?;
            term.write_line(&format!(
                "{} Configuration reset: {}",
                style("✅").green(),
                config_manager.config_file().display()
            ))?;
        }
    }

    Ok(true)
}
