use chrono::{DateTime, Local};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{info, warn};

use super::archive;
use super::xml::{self, FormatWarning};
use crate::error::DecodeError;

/// Timestamp component of a decoded folder name (second granularity)
const FOLDER_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Outcome of a successful decode
#[derive(Debug, Clone)]
pub struct DecodeResult {
    /// Folder holding the extracted (and re-indented) document
    pub decoded_folder: PathBuf,
    /// XML files that could not be re-indented; the decode still succeeded
    pub warnings: Vec<FormatWarning>,
}

/// Turns Office documents into folders under a single cache root.
///
/// Each call gets its own folder named `<name>_<yyyyMMdd_HHmmss>`, with a
/// numeric suffix appended when a folder of that name already exists, so
/// decodes never overwrite each other.
#[derive(Debug, Clone)]
pub struct Decoder {
    cache_root: PathBuf,
}

impl Decoder {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Decode `source` into a fresh folder under the cache root.
    ///
    /// # Arguments
    /// * `source` - The .docx/.xlsx/.pptx file to decode
    ///
    /// # Returns
    /// The new folder and any XML parts that could not be re-indented.
    /// Nothing is created when `source` is not a regular file.
    pub fn decode(&self, source: &Path) -> Result<DecodeResult, DecodeError> {
        self.decode_at(source, Local::now())
    }

    pub(crate) fn decode_at(
        &self,
        source: &Path,
        now: DateTime<Local>,
    ) -> Result<DecodeResult, DecodeError> {
        if !source.is_file() {
            return Err(DecodeError::NotFound(source.to_path_buf()));
        }

        // Create the cache root on first use
        fs::create_dir_all(&self.cache_root).map_err(|e| DecodeError::DirectoryCreationFailed {
            path: self.cache_root.clone(),
            source: e,
        })?;

        // Claim a unique folder before writing anything into it
        let base = folder_base_name(source, now);
        let decoded_folder = self.claim_folder(&base)?;
        info!("📂 Decoding {} into {}", source.display(), decoded_folder.display());

        let files = archive::extract(source, &decoded_folder)?;

        // Formatting problems are reported, never fatal
        let warnings = xml::format_all(&decoded_folder);
        if !warnings.is_empty() {
            warn!("⚠️  {} XML files left unformatted", warnings.len());
        }

        info!("✅ Decoded {} files to {}", files, decoded_folder.display());
        Ok(DecodeResult {
            decoded_folder,
            warnings,
        })
    }

    /// Create a folder that did not exist before this call.
    ///
    /// `create_dir` fails atomically on an existing name, so concurrent
    /// decodes of the same file in the same second each get their own folder.
    fn claim_folder(&self, base: &str) -> Result<PathBuf, DecodeError> {
        let mut attempt: u32 = 1;
        loop {
            let name = if attempt == 1 {
                base.to_string()
            } else {
                format!("{}_{}", base, attempt)
            };
            let candidate = self.cache_root.join(name);

            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(DecodeError::DirectoryCreationFailed {
                        path: candidate,
                        source: e,
                    })
                }
            }
        }
    }
}

/// `report.xlsx` at 2024-03-05 14:07:09 → `report_xlsx_20240305_140709`
fn folder_base_name(source: &Path, now: DateTime<Local>) -> String {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().replace('.', "_"))
        .unwrap_or_else(|| "document".to_string());
    format!("{}_{}", file_name, now.format(FOLDER_TIMESTAMP_FORMAT))
}

/// Decode on the blocking thread pool so the caller's task stays responsive
pub async fn decode_async(decoder: Decoder, source: PathBuf) -> Result<DecodeResult, DecodeError> {
    task::spawn_blocking(move || decoder.decode(&source))
        .await
        .map_err(|e| DecodeError::ExtractionFailed(format!("Task join error: {}", e)))?
}
