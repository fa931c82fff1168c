/// Shared data structures for the application state
///
/// These structs are what the command store and the recent-files ledger
/// persist (as JSON) and hand out to the CLI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Token replaced by the decoded folder path in a command template
pub const FOLDER_PLACEHOLDER: &str = "${folder}";

/// A named shell command used to open a decoded folder
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OpenCommand {
    /// Stable identity; two commands are the same command iff their ids match
    pub id: Uuid,
    /// Display name (e.g., "VS Code")
    pub name: String,
    /// Shell command with zero or more `${folder}` tokens
    pub command_template: String,
}

impl PartialEq for OpenCommand {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OpenCommand {}

impl OpenCommand {
    pub fn new(name: impl Into<String>, command_template: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            command_template: command_template.into(),
        }
    }

    /// Whether the template mentions the decoded folder at all
    pub fn has_placeholder(&self) -> bool {
        self.command_template.contains(FOLDER_PLACEHOLDER)
    }

    /// Commands seeded on first launch: a code editor, then the platform file browser
    pub fn default_commands() -> Vec<OpenCommand> {
        vec![
            OpenCommand::new("VS Code", "code \"${folder}\""),
            OpenCommand::new(FILE_BROWSER.0, FILE_BROWSER.1),
        ]
    }
}

#[cfg(target_os = "macos")]
const FILE_BROWSER: (&str, &str) = ("Finder", "open \"${folder}\"");

#[cfg(target_os = "windows")]
const FILE_BROWSER: (&str, &str) = ("Explorer", "explorer \"${folder}\"");

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const FILE_BROWSER: (&str, &str) = ("File Manager", "xdg-open \"${folder}\"");

/// One past decode: where the document came from and where it was decoded to
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentFile {
    pub id: Uuid,
    /// Full path to the original document
    pub source_file_path: String,
    /// Folder in the cache directory holding the decoded parts
    pub decoded_folder_path: String,
    /// Filename only (e.g., "report.xlsx")
    pub file_name: String,
    pub opened_at: DateTime<Utc>,
}

impl RecentFile {
    pub fn new(
        source_file_path: impl Into<String>,
        decoded_folder_path: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_file_path: source_file_path.into(),
            decoded_folder_path: decoded_folder_path.into(),
            file_name: file_name.into(),
            opened_at: Utc::now(),
        }
    }

    /// Checked against the file system on every call
    pub fn source_file_exists(&self) -> bool {
        Path::new(&self.source_file_path).exists()
    }

    /// Checked against the file system on every call; must be a directory
    pub fn decoded_folder_exists(&self) -> bool {
        Path::new(&self.decoded_folder_path).is_dir()
    }

    /// Lower-cased extension of the source document ("docx", "xlsx", ...)
    pub fn file_extension(&self) -> String {
        Path::new(&self.source_file_path)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}
