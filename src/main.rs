use chrono::Local;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use office_viewer::state::FOLDER_PLACEHOLDER;
use office_viewer::{App, AppError, AppPaths};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "officeviewer",
    version,
    about = "Decode .docx/.xlsx/.pptx files into readable folders and open them with your tools"
)]
struct Cli {
    /// Office document to decode and open with the default command
    file: Option<PathBuf>,
    /// Directory for decoded folders (overrides OFFICEVIEWER_CACHE_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    cache_dir: Option<PathBuf>,
    /// Directory for the settings database (overrides OFFICEVIEWER_DATA_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    action: Option<Action>,
}

impl Cli {
    /// The action to run: a bare file means `open`, nothing at all lists recent files
    fn action(&mut self) -> Result<Action, clap::Error> {
        match (self.action.take(), self.file.take()) {
            (Some(_), Some(file)) => Err(Cli::command().error(
                ErrorKind::ArgumentConflict,
                format!("{} cannot be combined with a subcommand", file.display()),
            )),
            (Some(action), None) => Ok(action),
            (None, Some(file)) => Ok(Action::Open { file }),
            (None, None) => Ok(Action::Recent(RecentAction::List)),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Decode a document and open it with the default command
    Open { file: PathBuf },
    /// Manage open commands
    #[command(subcommand)]
    Commands(CommandAction),
    /// Manage recently decoded files
    #[command(subcommand)]
    Recent(RecentAction),
}

#[derive(Debug, Subcommand)]
enum CommandAction {
    /// List commands (the default is marked with *)
    List,
    /// Add a command; use ${folder} where the decoded folder should go
    Add { name: String, template: String },
    /// Change a command's name and template
    Update {
        id: Uuid,
        name: String,
        template: String,
    },
    /// Delete a command
    Remove { id: Uuid },
    /// Make a command the default
    Default { id: Uuid },
}

#[derive(Debug, Subcommand)]
enum RecentAction {
    /// List recently decoded files, newest first
    List,
    /// Forget one entry
    Remove { id: Uuid },
    /// Forget all entries
    Clear,
    /// Forget entries whose decoded folder was deleted
    Prune,
    /// Open an entry again with the default command
    Reopen { id: Uuid },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("OFFICEVIEWER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = env::var("OFFICEVIEWER_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let mut cli = Cli::parse();
    let action = match cli.action() {
        Ok(action) => action,
        Err(e) => e.exit(),
    };

    let mut paths = AppPaths::from_env();
    if let Some(dir) = cli.cache_dir {
        paths.cache_dir = dir;
    }
    if let Some(dir) = cli.data_dir {
        paths.data_dir = dir;
    }

    let mut app = match App::open(&paths) {
        Ok(app) => app,
        Err(e) => {
            error!("❌ Failed to load settings: {}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("🎨 OfficeViewer ready, cache at {}", paths.cache_dir.display());

    match run(&mut app, action).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(app: &mut App, action: Action) -> Result<(), AppError> {
    match action {
        Action::Open { file } => {
            let opened = app.open_document_async(file).await?;
            println!("{}", opened.decode.decoded_folder.display());
            for warning in &opened.decode.warnings {
                warn!("⚠️  Left unformatted: {}", warning);
            }
            opened.launch.map(|command| {
                info!("✅ Opened with {}", command.name);
            })
        }
        Action::Commands(action) => run_command_action(app, action),
        Action::Recent(action) => run_recent_action(app, action).await,
    }
}

fn run_command_action(app: &mut App, action: CommandAction) -> Result<(), AppError> {
    match action {
        CommandAction::List => {
            let default_id = app.commands().resolve_default().map(|c| c.id);
            for command in app.commands().list() {
                let marker = if Some(command.id) == default_id { "*" } else { " " };
                println!("{} {}  {:<16} {}", marker, command.id, command.name, command.command_template);
            }
        }
        CommandAction::Add { name, template } => {
            if !template.contains(FOLDER_PLACEHOLDER) {
                warn!("⚠️  Template has no {} placeholder; the folder will not be passed", FOLDER_PLACEHOLDER);
            }
            let command = app.commands_mut().add(&name, &template)?;
            println!("{}", command.id);
        }
        CommandAction::Update { id, name, template } => {
            app.commands_mut().update(id, &name, &template)?;
        }
        CommandAction::Remove { id } => {
            app.commands_mut().remove(id)?;
        }
        CommandAction::Default { id } => {
            app.commands_mut().set_default(id)?;
        }
    }
    Ok(())
}

async fn run_recent_action(app: &mut App, action: RecentAction) -> Result<(), AppError> {
    match action {
        RecentAction::List => {
            for file in app.recent().list() {
                let opened_at = file.opened_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
                println!("{}  {}  {}", file.id, opened_at, file.file_name);
                println!(
                    "    source:  {}{}",
                    file.source_file_path,
                    if file.source_file_exists() { "" } else { "  (missing)" }
                );
                println!(
                    "    decoded: {}{}",
                    file.decoded_folder_path,
                    if file.decoded_folder_exists() { "" } else { "  (missing)" }
                );
            }
        }
        RecentAction::Remove { id } => {
            app.recent_mut().remove(id)?;
        }
        RecentAction::Clear => app.recent_mut().clear()?,
        RecentAction::Prune => {
            let removed = app.recent_mut().prune_missing()?;
            println!("Removed {} entries", removed);
        }
        RecentAction::Reopen { id } => {
            // The folder is printed even when the command then fails
            let reopened = app.reopen_async(id).await?;
            println!("{}", reopened.folder.display());
            for warning in &reopened.warnings {
                warn!("⚠️  Left unformatted: {}", warning);
            }
            let command = reopened.launch?;
            info!("✅ Opened with {}", command.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Action, clap::Error> {
        Cli::try_parse_from(args)?.action()
    }

    #[test]
    fn test_global_flags_before_subcommand() {
        let cli = Cli::try_parse_from(["officeviewer", "--cache-dir", "/tmp/c", "commands", "list"]).unwrap();
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
        assert!(matches!(cli.action, Some(Action::Commands(CommandAction::List))));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["officeviewer", "recent", "list", "--data-dir", "/tmp/d"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/d")));
        assert!(matches!(cli.action, Some(Action::Recent(RecentAction::List))));
    }

    #[test]
    fn test_bare_file_with_flags_opens_it() {
        let action = parse(&["officeviewer", "--cache-dir", "/tmp/c", "report.xlsx"]).unwrap();
        match action {
            Action::Open { file } => assert_eq!(file, PathBuf::from("report.xlsx")),
            other => panic!("expected open, got {:?}", other),
        }

        let action = parse(&["officeviewer", "report.xlsx", "--data-dir", "/tmp/d"]).unwrap();
        assert!(matches!(action, Action::Open { .. }));
    }

    #[test]
    fn test_no_arguments_lists_recent_files() {
        assert!(matches!(parse(&["officeviewer"]).unwrap(), Action::Recent(RecentAction::List)));
    }

    #[test]
    fn test_file_and_subcommand_are_rejected() {
        let mut cli = Cli::try_parse_from(["officeviewer", "commands", "list"]).unwrap();
        cli.file = Some(PathBuf::from("report.xlsx"));
        assert_eq!(cli.action().unwrap_err().kind(), ErrorKind::ArgumentConflict);

        assert!(parse(&["officeviewer", "report.xlsx", "commands", "list"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
