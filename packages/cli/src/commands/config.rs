use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use trellis_editor::{EditorConfig, CONFIG_FILE_NAME};

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Directory containing trellis.config.json (defaults to current directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

pub fn config(args: ConfigArgs, cwd: &str) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from(cwd));
    let path = dir.join(CONFIG_FILE_NAME);
    let config = EditorConfig::load(&dir)?;

    if path.exists() {
        println!("{} {}", "Config:".bright_blue().bold(), path.display());
    } else {
        println!("{} {}", "Config:".bright_blue().bold(), "defaults (no config file)".dimmed());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
