mod cli;

use trackswitch::{commands, config, message::MessageWriter, message::OutwardMessage};

use anyhow::Result;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return report_usage_error(e),
    };

    // Logs go to stderr; stdout carries only JSON messages.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "trackswitch=debug,trackswitch_av=trace".to_string()
        } else {
            "trackswitch=info,trackswitch_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut writer = MessageWriter::stdout();

    match cli.command {
        Commands::GetTracks { video } => {
            let outcome = runtime().and_then(|rt| {
                rt.block_on(async {
                    let config = config::load_config_or_default(cli.config.as_deref())?;
                    commands::get_tracks(&config, &video, &mut writer).await?;
                    Ok::<(), anyhow::Error>(())
                })
            });
            report_failure(outcome, &mut writer)
        }
        Commands::SwitchTrack {
            input,
            track_index,
            output,
        } => {
            let outcome = runtime().and_then(|rt| {
                rt.block_on(switch_track(
                    cli.config.as_deref(),
                    &input,
                    track_index,
                    &output,
                    &mut writer,
                ))
            });
            report_failure(outcome, &mut writer)
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Version => {
            println!("trackswitch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

async fn switch_track(
    config_path: Option<&Path>,
    input: &Path,
    track_index: u32,
    output: &Path,
    writer: &mut MessageWriter<std::io::Stdout>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping ffmpeg");
            on_interrupt.cancel();
        }
    });

    commands::switch_track(&config, input, track_index, output, Some(cancel), writer).await?;
    Ok(())
}

/// Setup failures (config, runtime) still reach the caller as a message.
fn report_failure(outcome: Result<()>, writer: &mut MessageWriter<std::io::Stdout>) -> Result<()> {
    if let Err(e) = outcome {
        tracing::error!("{:#}", e);
        writer.emit(&OutwardMessage::failure(format!("{:#}", e)))?;
    }
    Ok(())
}

/// Argument errors are answered on the wire, with exit status 0.
fn report_usage_error(e: clap::Error) -> Result<()> {
    let message = match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            "No command specified".to_string()
        }
        ErrorKind::InvalidSubcommand => match e.get(ContextKind::InvalidSubcommand) {
            Some(ContextValue::String(name)) => format!("Unknown command: {name}"),
            _ => "Unknown command".to_string(),
        },
        _ => {
            // Drop the usage block and fold the rest onto one line.
            let rendered = e.to_string();
            let summary = rendered.split("\n\nUsage:").next().unwrap_or_default();
            let summary: Vec<&str> = summary.lines().map(str::trim).collect();
            summary.join(" ").trim_start_matches("error: ").to_string()
        }
    };

    MessageWriter::stdout().emit(&OutwardMessage::failure(message))?;
    Ok(())
}

/// Print where each tool resolves from and whether it runs.
fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tools = trackswitch_av::check_tools(&config.tools);

    for tool in &tools {
        let mark = if tool.available { "✓" } else { "✗" };
        let location = tool
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{mark} {:<8} {location} [{}]", tool.name, tool.source);

        if let Some(version) = &tool.version {
            println!("    {version}");
        }
        if let Some(skipped) = &tool.missing_override {
            println!("    configured path {} does not exist", skipped.display());
        }
    }

    if tools.iter().all(|t| t.available) {
        println!("\nffmpeg and ffprobe are ready.");
    } else {
        println!(
            "\nBoth ffmpeg and ffprobe are required. Install ffmpeg or set their paths under [tools] in the config file."
        );
    }

    Ok(())
}
