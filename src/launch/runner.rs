use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tokio::task;
use tracing::{info, warn};

use crate::error::RunError;
use crate::state::{resolve, OpenCommand};

/// Tool locations searched before the inherited PATH, in this order.
/// Processes started from a desktop launcher often get a minimal PATH that
/// misses tools installed by package managers.
pub const EXTRA_SEARCH_PATHS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin", "/bin"];

#[cfg(target_os = "macos")]
const DEFAULT_SHELL: &str = "/bin/zsh";

#[cfg(not(target_os = "macos"))]
const DEFAULT_SHELL: &str = "/bin/sh";

/// Runs resolved open commands through a shell (`<shell> -c <command>`), so
/// templates can use normal quoting and globbing.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    shell: PathBuf,
    extra_paths: Vec<PathBuf>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            extra_paths: EXTRA_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }

    /// Run `command` and wait for it to exit.
    ///
    /// Standard output is discarded. A spawn failure or a non-zero exit is
    /// reported with the command's trimmed stderr, or a generic message when
    /// stderr is empty.
    ///
    /// # Arguments
    /// * `command` - Fully resolved command line, passed to `<shell> -c`
    /// * `working_dir` - Directory to start in; inherits ours when `None`
    pub fn run(&self, command: &str, working_dir: Option<&Path>) -> Result<(), RunError> {
        let mut process = Command::new(&self.shell);
        process
            .arg("-c")
            .arg(command)
            .env("PATH", self.search_path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            process.current_dir(dir);
        }

        // Blocks until the child exits
        info!("🚀 Running: {}", command);
        let output = process.output().map_err(|e| {
            RunError::ExecutionFailed(format!("failed to spawn {}: {}", self.shell.display(), e))
        })?;

        if output.status.success() {
            return Ok(());
        }

        // Prefer what the tool said over the bare exit status
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            match output.status.code() {
                Some(code) => format!("command exited with status {}", code),
                None => "command was terminated by a signal".to_string(),
            }
        } else {
            stderr
        };

        warn!("❌ Command failed: {}", message);
        Err(RunError::ExecutionFailed(message))
    }

    /// Resolve `command`'s template against `folder` and run it
    pub fn launch(&self, command: &OpenCommand, folder: &Path) -> Result<(), RunError> {
        let resolved = resolve(&command.command_template, &folder.to_string_lossy());
        self.run(&resolved, None)
    }

    /// The extra tool locations followed by the inherited PATH
    fn search_path(&self) -> OsString {
        let inherited = env::var_os("PATH").unwrap_or_default();
        let paths = self
            .extra_paths
            .iter()
            .cloned()
            .chain(env::split_paths(&inherited).filter(|p| !p.as_os_str().is_empty()));

        env::join_paths(paths).unwrap_or(inherited)
    }
}

/// Run on the blocking thread pool; the external command may take a while to exit
pub async fn run_async(runner: CommandRunner, command: String) -> Result<(), RunError> {
    task::spawn_blocking(move || runner.run(&command, None))
        .await
        .map_err(|e| RunError::ExecutionFailed(format!("Task join error: {}", e)))?
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command() {
        let runner = CommandRunner::new().with_shell("/bin/sh");
        assert!(runner.run("true", None).is_ok());
    }

    #[test]
    fn test_failure_carries_trimmed_stderr() {
        let runner = CommandRunner::new().with_shell("/bin/sh");
        let err = runner.run("echo '  no such editor  ' >&2; exit 3", None).unwrap_err();

        let RunError::ExecutionFailed(message) = err;
        assert_eq!(message, "no such editor");
    }

    #[test]
    fn test_missing_tool_reports_shell_error() {
        let runner = CommandRunner::new().with_shell("/bin/sh");
        let err = runner
            .run("definitely-not-an-installed-tool-42 \"/tmp\"", None)
            .unwrap_err();

        let RunError::ExecutionFailed(message) = err;
        assert!(message.contains("definitely-not-an-installed-tool-42"));
    }

    #[test]
    fn test_silent_failure_gets_generic_message() {
        let runner = CommandRunner::new().with_shell("/bin/sh");
        let err = runner.run("exit 7", None).unwrap_err();

        let RunError::ExecutionFailed(message) = err;
        assert_eq!(message, "command exited with status 7");
    }

    #[test]
    fn test_unspawnable_shell() {
        let runner = CommandRunner::new().with_shell("/nonexistent/shell");
        assert!(matches!(
            runner.run("true", None),
            Err(RunError::ExecutionFailed(_))
        ));
    }

    #[test]
    fn test_extra_paths_come_first() {
        let runner = CommandRunner::new();
        let path = runner.search_path();
        let entries: Vec<PathBuf> = env::split_paths(&path).collect();

        let expected: Vec<PathBuf> = EXTRA_SEARCH_PATHS.iter().map(PathBuf::from).collect();
        assert_eq!(&entries[..expected.len()], &expected[..]);
    }

    #[test]
    fn test_launch_substitutes_folder_and_uses_working_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("decoded folder");
        std::fs::create_dir(&folder).unwrap();
        let command = OpenCommand::new("Touch", "touch \"${folder}/opened\"");

        let runner = CommandRunner::new().with_shell("/bin/sh");
        runner.launch(&command, &folder).unwrap();
        assert!(folder.join("opened").is_file());

        runner.run("touch here", Some(&folder)).unwrap();
        assert!(folder.join("here").is_file());
    }

    #[tokio::test]
    async fn test_run_async() {
        let runner = CommandRunner::new().with_shell("/bin/sh");
        assert!(run_async(runner, "exit 1".to_string()).await.is_err());
    }
}
