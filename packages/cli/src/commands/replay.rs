use crate::script::{Script, Step};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use trellis_code::{RecordingDiffService, RecordingWriteService};
use trellis_editor::{Collaborators, EditorConfig, EditorEngine};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Script to replay
    pub script: PathBuf,

    /// Directory containing trellis.config.json (defaults to current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print only the diff requests, as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config_dir = args.config.clone().unwrap_or_else(|| PathBuf::from(cwd));
    let config = EditorConfig::load(&config_dir)?;
    let script = Script::load(&args.script)?;
    tracing::debug!(surface = %script.surface, steps = script.steps.len(), "loaded replay script");

    let diffs = Arc::new(RecordingDiffService::new());
    let writes = Arc::new(RecordingWriteService::new());
    let collaborators = Collaborators {
        template_source: Arc::new(script.template_source()),
        instance_resolver: Arc::new(script.instance_resolver()),
        diff_service: diffs.clone(),
        write_service: writes.clone(),
    };

    let engine = EditorEngine::new(config, collaborators).await;
    engine.create_surface(&script.surface, &script.document).await?;

    if !args.json {
        println!(
            "{} {} ({} steps)",
            "▶ Replaying".bright_blue().bold(),
            args.script.display(),
            script.steps.len()
        );
    }

    for step in script.steps {
        let label = step.label();
        let applied = match step {
            Step::Run { action } => {
                engine.run(action).await;
                true
            }
            Step::Undo => engine.undo().await.is_some(),
            Step::Redo => engine.redo().await.is_some(),
            Step::StartTransaction => {
                engine.start_transaction().await;
                true
            }
            Step::CommitTransaction => {
                engine.commit_transaction().await;
                true
            }
        };

        if args.json {
            continue;
        }
        if applied {
            println!("  {} {}", "✓".green(), label);
        } else {
            println!("  {} {} {}", "·".dimmed(), label, "(nothing to do)".dimmed());
        }
    }

    engine.wait_idle().await;

    let batches = diffs.batches().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
        return Ok(());
    }

    println!();
    println!("{}", "Diff requests".bright_blue().bold());
    for (index, batch) in batches.iter().enumerate() {
        for request in batch {
            println!("  {} {}", format!("#{}", index + 1).dimmed(), request.oid.bold());
            println!("{}", indent(&serde_json::to_string_pretty(request)?, 4));
        }
    }

    let history = engine.history();
    println!();
    println!(
        "{} {} write(s), {} undo / {} redo entries",
        "✅".green(),
        writes.writes().await.len(),
        history.undo_len().await,
        history.redo_len().await
    );
    Ok(())
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_replay_demo_script() {
        let script = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/insert-and-undo.json");
        let config_dir = TempDir::new().unwrap();

        let args = ReplayArgs {
            script,
            config: Some(config_dir.path().to_path_buf()),
            json: true,
        };
        replay(args, ".").await.unwrap();
    }

    #[tokio::test]
    async fn test_replay_missing_script_fails() {
        let config_dir = TempDir::new().unwrap();
        let args = ReplayArgs {
            script: config_dir.path().join("missing.json"),
            config: Some(config_dir.path().to_path_buf()),
            json: false,
        };
        let err = replay(args, ".").await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read script"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\nb", 2), "  a\n  b");
    }
}
