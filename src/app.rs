/// Application shell
///
/// `App` is built once at startup and owns every piece of mutable state (the
/// command store and the recent-files ledger). Front ends borrow it instead of
/// reaching for globals. Slow work (extraction, formatting, running the
/// external command) can be pushed to the blocking pool with the async
/// variants while ledger updates stay on the owner.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::AppPaths;
use crate::decode::{decode_async, DecodeResult, Decoder, FormatWarning};
use crate::error::{AppError, DecodeError, StoreError};
use crate::launch::{run_async, CommandRunner};
use crate::state::{
    resolve, CommandStore, OpenCommand, RecentFile, RecentFilesLedger, SharedSettings,
    SqliteSettings,
};

/// Result of opening a document: the decode always succeeded, the launch may not have
#[derive(Debug)]
pub struct Opened {
    pub decode: DecodeResult,
    pub recent: RecentFile,
    /// The command that was run, or why nothing was launched
    pub launch: Result<OpenCommand, AppError>,
}

/// Result of reopening a recent entry: a folder was found or rebuilt, the
/// launch may still have failed
#[derive(Debug)]
pub struct Reopened {
    pub folder: PathBuf,
    /// The new ledger entry, when the old folder was gone and the source
    /// was decoded again
    pub recorded: Option<RecentFile>,
    /// XML parts left unformatted by that second decode
    pub warnings: Vec<FormatWarning>,
    pub launch: Result<OpenCommand, AppError>,
}

pub struct App {
    decoder: Decoder,
    runner: CommandRunner,
    commands: CommandStore,
    recent: RecentFilesLedger,
}

impl App {
    /// Open the settings database under `paths` and load all state
    pub fn open(paths: &AppPaths) -> Result<Self, AppError> {
        let settings: SharedSettings = Arc::new(SqliteSettings::open(&paths.db_path())?);
        Self::with_settings(paths, settings)
    }

    pub fn with_settings(paths: &AppPaths, settings: SharedSettings) -> Result<Self, AppError> {
        let mut runner = CommandRunner::new();
        if let Some(shell) = &paths.shell {
            runner = runner.with_shell(shell);
        }

        Ok(Self {
            decoder: Decoder::new(&paths.cache_dir),
            runner,
            commands: CommandStore::load(settings.clone())?,
            recent: RecentFilesLedger::load(settings, paths.recent_limit)?,
        })
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn commands(&self) -> &CommandStore {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandStore {
        &mut self.commands
    }

    pub fn recent(&self) -> &RecentFilesLedger {
        &self.recent
    }

    pub fn recent_mut(&mut self) -> &mut RecentFilesLedger {
        &mut self.recent
    }

    /// Decode `source`, record it, then open the result with the default command.
    ///
    /// Fails only when decoding or recording fails. A missing or failing
    /// command is reported in [`Opened::launch`]; the decoded folder is kept.
    pub fn open_document(&mut self, source: &Path) -> Result<Opened, AppError> {
        let (decode, recent) = self.decode_and_record(source)?;
        let launch = self.launch_default(&decode.decoded_folder);
        Ok(Opened {
            decode,
            recent,
            launch,
        })
    }

    /// Same as [`App::open_document`], with decoding and the external command
    /// running on the blocking thread pool.
    pub async fn open_document_async(&mut self, source: PathBuf) -> Result<Opened, AppError> {
        let source = absolute(&source);
        let decode = decode_async(self.decoder.clone(), source.clone()).await?;
        let recent = self.record(&source, &decode.decoded_folder)?;
        let launch = self.launch_default_async(&decode.decoded_folder).await;

        Ok(Opened {
            decode,
            recent,
            launch,
        })
    }

    /// Open a recent entry again.
    ///
    /// Uses the existing decoded folder when it is still there, otherwise
    /// decodes the source document again (recording a new entry). Fails only
    /// when no folder can be produced; a failing command is reported in
    /// [`Reopened::launch`] so a freshly decoded folder is never lost.
    pub fn reopen(&mut self, id: Uuid) -> Result<Reopened, AppError> {
        let entry = self.recent_entry(id)?;

        // Reuse the old folder, else rebuild it from the source
        let (folder, redecoded) = if entry.decoded_folder_exists() {
            (PathBuf::from(&entry.decoded_folder_path), None)
        } else if entry.source_file_exists() {
            info!("🔁 Decoded folder is gone, decoding {} again", entry.file_name);
            let (decode, recent) = self.decode_and_record(Path::new(&entry.source_file_path))?;
            let folder = decode.decoded_folder.clone();
            (folder, Some((decode, recent)))
        } else {
            return Err(DecodeError::NotFound(PathBuf::from(&entry.source_file_path)).into());
        };

        // From here on the folder exists, so launch problems are not fatal
        let launch = self.launch_default(&folder);
        Ok(reopened(folder, redecoded, launch))
    }

    /// Same as [`App::reopen`], with decoding and the external command
    /// running on the blocking thread pool.
    pub async fn reopen_async(&mut self, id: Uuid) -> Result<Reopened, AppError> {
        let entry = self.recent_entry(id)?;

        let (folder, redecoded) = if entry.decoded_folder_exists() {
            (PathBuf::from(&entry.decoded_folder_path), None)
        } else if entry.source_file_exists() {
            info!("🔁 Decoded folder is gone, decoding {} again", entry.file_name);
            let source = PathBuf::from(&entry.source_file_path);
            let decode = decode_async(self.decoder.clone(), source.clone()).await?;
            let recent = self.record(&source, &decode.decoded_folder)?;
            let folder = decode.decoded_folder.clone();
            (folder, Some((decode, recent)))
        } else {
            return Err(DecodeError::NotFound(PathBuf::from(&entry.source_file_path)).into());
        };

        let launch = self.launch_default_async(&folder).await;
        Ok(reopened(folder, redecoded, launch))
    }

    fn recent_entry(&self, id: Uuid) -> Result<RecentFile, AppError> {
        Ok(self
            .recent
            .get(id)
            .cloned()
            .ok_or(StoreError::UnknownRecentFile(id))?)
    }

    fn decode_and_record(&mut self, source: &Path) -> Result<(DecodeResult, RecentFile), AppError> {
        let source = absolute(source);
        let decode = self.decoder.decode(&source)?;
        let recent = self.record(&source, &decode.decoded_folder)?;
        Ok((decode, recent))
    }

    fn record(&mut self, source: &Path, decoded_folder: &Path) -> Result<RecentFile, AppError> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.recent.record(source, decoded_folder, &file_name)?)
    }

    fn launch_default(&self, folder: &Path) -> Result<OpenCommand, AppError> {
        let command = self
            .commands
            .resolve_default()
            .cloned()
            .ok_or(AppError::NoDefaultCommand)?;

        info!("📂 Opening {} with {}", folder.display(), command.name);
        if let Err(e) = self.runner.launch(&command, folder) {
            error!("❌ {}", e);
            return Err(e.into());
        }
        Ok(command)
    }

    async fn launch_default_async(&self, folder: &Path) -> Result<OpenCommand, AppError> {
        let command = self
            .commands
            .resolve_default()
            .cloned()
            .ok_or(AppError::NoDefaultCommand)?;

        info!("📂 Opening {} with {}", folder.display(), command.name);
        let resolved = resolve(&command.command_template, &folder.to_string_lossy());
        if let Err(e) = run_async(self.runner.clone(), resolved).await {
            error!("❌ {}", e);
            return Err(e.into());
        }
        Ok(command)
    }
}

fn reopened(
    folder: PathBuf,
    redecoded: Option<(DecodeResult, RecentFile)>,
    launch: Result<OpenCommand, AppError>,
) -> Reopened {
    let (recorded, warnings) = match redecoded {
        Some((decode, recent)) => (Some(recent), decode.warnings),
        None => (None, Vec::new()),
    };
    Reopened {
        folder,
        recorded,
        warnings,
        launch,
    }
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("cache_root", &self.decoder.cache_root())
            .field("commands", &self.commands.list().len())
            .field("recent", &self.recent.list().len())
            .finish()
    }
}
