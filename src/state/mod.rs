/// State management module
///
/// This module handles all persisted application state:
/// - The key-value settings database (settings.rs)
/// - Shared data structures (data.rs)
/// - Open commands and the default command (commands.rs)
/// - Recent decode history (recent.rs)

pub mod commands;
pub mod data;
pub mod recent;
pub mod settings;

pub use commands::{resolve, CommandStore};
pub use data::{OpenCommand, RecentFile, FOLDER_PLACEHOLDER};
pub use recent::RecentFilesLedger;
pub use settings::{MemorySettings, SettingsStore, SharedSettings, SqliteSettings};
