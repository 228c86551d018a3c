//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// A terminal voice recorder with real-time spectrum visualization and webhook delivery
#[derive(Parser)]
#[command(name = "voicedrop")]
#[command(version)]
#[command(about = "\n\n ▁▃▅▇▅▃▁  voicedrop")]
#[command(
    long_about = "\n\n ▁▃▅▇▅▃▁  voicedrop\n\nRecord voice notes with a live frequency-bar display and deliver them,\nalong with optional file attachments, to a single webhook endpoint.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n    Record options (--no-upload, -o) can be used without explicitly saying 'record'.\n\nEXAMPLES:\n    # Record and deliver to the configured webhook\n    $ voicedrop\n\n    # Record, keep the file locally, skip the webhook\n    $ voicedrop --no-upload\n\n    # Record and write the WAV to a specific path\n    $ voicedrop -o note.wav\n\n    # Upload an existing file (audio or photo)\n    $ voicedrop send holiday-party.jpg\n\n    # View your contribution history\n    $ voicedrop history\n\n    # Edit configuration file\n    $ voicedrop config"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/voicedrop/voicedrop.toml\n    Recordings:         ~/.local/share/voicedrop/recordings/\n    Logs:               ~/.local/state/voicedrop/voicedrop.log.*"
)]
struct Cli {
    /// Skip webhook delivery and keep the recording locally (record default command)
    #[arg(long, global = true)]
    no_upload: bool,

    /// Write the finished recording to this path (record default command)
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record audio with real-time visualization (default)
    ///
    /// Press Enter to finish and deliver, Escape/q to discard.
    /// The finished recording is always backed up locally before delivery.
    #[command(visible_alias = "r")]
    Record {
        /// Skip webhook delivery and keep the recording locally
        #[arg(long)]
        no_upload: bool,

        /// Write the finished recording to this path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Upload an existing audio or image file to the webhook
    ///
    /// The file category is inferred from the extension and can be
    /// overridden with --category.
    #[command(visible_alias = "s")]
    Send {
        /// Path to the file to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// File category: "audio" or "image" (inferred from extension by default)
        #[arg(short, long, value_name = "CATEGORY")]
        category: Option<String>,
    },

    /// View contribution history with delivery status
    #[command(visible_alias = "h")]
    History,

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio settings, webhook URL, and contributor details.
    /// Uses $EDITOR environment variable or falls back to nano/vim.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in voicedrop.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails (e.g., recording, delivery, history viewing)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "voicedrop", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Record { .. }) => {
            // Default command is record
            // Merge top-level options with explicit record command options
            let (no_upload, output) = match cli.command {
                Some(Commands::Record { no_upload, output }) => (no_upload, output),
                None => (cli.no_upload, cli.output),
                _ => unreachable!(),
            };
            commands::handle_record(no_upload, output).await?;
        }
        Some(Commands::Send { file, category }) => {
            commands::handle_send(file, category).await?;
        }
        Some(Commands::History) => {
            commands::handle_history()?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
