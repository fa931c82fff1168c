use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::data::RecentFile;
use super::settings::SharedSettings;
use crate::error::StoreError;

const RECENT_FILES_KEY: &str = "recentFiles";

/// History of decoded documents, newest first.
///
/// Unbounded unless a limit is given, in which case recording past the limit
/// drops the oldest entries.
pub struct RecentFilesLedger {
    settings: SharedSettings,
    files: Vec<RecentFile>,
    limit: Option<usize>,
}

impl RecentFilesLedger {
    pub fn load(settings: SharedSettings, limit: Option<usize>) -> Result<Self, StoreError> {
        let files = match settings.load(RECENT_FILES_KEY)? {
            Some(bytes) => serde_json::from_slice::<Vec<RecentFile>>(&bytes).unwrap_or_else(|e| {
                warn!("⚠️  Recent files list is unreadable, starting empty: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let mut ledger = Self {
            settings,
            files,
            limit,
        };
        let mut files = ledger.files.clone();
        if truncate(&mut files, limit) > 0 {
            ledger.commit(files)?;
        }
        Ok(ledger)
    }

    /// Persist `files`, then make them the in-memory list. On a failed write
    /// the ledger keeps what it had, which is still what the store holds.
    fn commit(&mut self, files: Vec<RecentFile>) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&files)?;
        self.settings.save(RECENT_FILES_KEY, &json)?;
        self.files = files;
        Ok(())
    }

    /// Record a decode. The new entry goes to the front of the list.
    ///
    /// # Arguments
    /// * `source_file_path` - The document that was decoded
    /// * `decoded_folder_path` - Where its contents were written
    /// * `file_name` - Display name, normally the source's file name
    ///
    /// # Returns
    /// The new entry. Nothing is recorded when the list cannot be saved.
    pub fn record(
        &mut self,
        source_file_path: &Path,
        decoded_folder_path: &Path,
        file_name: &str,
    ) -> Result<RecentFile, StoreError> {
        let file = RecentFile::new(
            source_file_path.to_string_lossy(),
            decoded_folder_path.to_string_lossy(),
            file_name,
        );

        let mut files = Vec::with_capacity(self.files.len() + 1);
        files.push(file.clone());
        files.extend(self.files.iter().cloned());
        let evicted = truncate(&mut files, self.limit);
        self.commit(files)?;

        if evicted > 0 {
            debug!("🗑️  Evicted {} old recent files", evicted);
        }
        Ok(file)
    }

    /// Entries newest first. Existence checks on each entry hit the file system
    /// when called, so deletions made since recording are visible.
    pub fn list(&self) -> &[RecentFile] {
        &self.files
    }

    pub fn get(&self, id: Uuid) -> Option<&RecentFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<RecentFile, StoreError> {
        let index = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or(StoreError::UnknownRecentFile(id))?;

        let mut files = self.files.clone();
        let removed = files.remove(index);
        self.commit(files)?;
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.commit(Vec::new())
    }

    /// Drop entries whose decoded folder no longer exists.
    /// Returns how many entries were removed.
    pub fn prune_missing(&mut self) -> Result<usize, StoreError> {
        let kept: Vec<RecentFile> = self
            .files
            .iter()
            .filter(|f| f.decoded_folder_exists())
            .cloned()
            .collect();
        let removed = self.files.len() - kept.len();

        if removed > 0 {
            self.commit(kept)?;
            info!("⚠️  Removed {} recent files whose decoded folder is gone", removed);
        }
        Ok(removed)
    }
}

/// Cut `files` down to `limit` entries, returning how many were dropped
fn truncate(files: &mut Vec<RecentFile>, limit: Option<usize>) -> usize {
    match limit {
        Some(limit) if files.len() > limit => {
            let evicted = files.len() - limit;
            files.truncate(limit);
            evicted
        }
        _ => 0,
    }
}
