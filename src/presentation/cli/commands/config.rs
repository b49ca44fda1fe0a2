use std::path::Path;

use colored::Colorize;

use crate::application::config::AppConfig;

/// Print the effective configuration, or write the defaults with `init`.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized or written.
pub fn run_config(config: &AppConfig, path: &Path, init: bool) -> anyhow::Result<()> {
    if init {
        if path.exists() {
            println!("{} {}", "exists:".yellow(), path.display());
        } else {
            AppConfig::default().save_to(path)?;
            println!("{} {}", "created:".green(), path.display());
        }
        return Ok(());
    }

    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
