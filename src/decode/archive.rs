use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::DecodeError;

/// Extract a zip-format document (.docx, .xlsx, .pptx, ...) into `destination`.
///
/// The destination and its parents are created if needed. Existing files are
/// overwritten, so extracting twice into the same folder does not fail.
/// Entries whose names would escape the destination (absolute paths, `..`)
/// are skipped.
///
/// # Arguments
/// * `source` - Path to the document; must be a regular file
/// * `destination` - Folder to extract into
///
/// # Returns
/// The number of files written
pub fn extract(source: &Path, destination: &Path) -> Result<usize, DecodeError> {
    // Directories and other non-files count as missing
    if !source.is_file() {
        return Err(DecodeError::NotFound(source.to_path_buf()));
    }

    fs::create_dir_all(destination).map_err(|e| DecodeError::DirectoryCreationFailed {
        path: destination.to_path_buf(),
        source: e,
    })?;

    let file = File::open(source)
        .map_err(|e| DecodeError::ExtractionFailed(format!("{}: {}", source.display(), e)))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| DecodeError::ExtractionFailed(format!("{}: {}", source.display(), e)))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| DecodeError::ExtractionFailed(format!("entry #{}: {}", i, e)))?;

        // Refuse anything that would land outside the destination
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            warn!("⚠️  Skipping unsafe archive entry: {}", entry.name());
            continue;
        };
        let out_path = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| extraction_io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| extraction_io(parent, e))?;
        }

        let mut out = File::create(&out_path).map_err(|e| extraction_io(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| extraction_io(&out_path, e))?;
        written += 1;
    }

    debug!("📦 Extracted {} files into {}", written, destination.display());
    Ok(written)
}

fn extraction_io(path: &Path, err: io::Error) -> DecodeError {
    DecodeError::ExtractionFailed(format!("{}: {}", path.display(), err))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a zip at `path` with the given (name, contents) members
    pub(crate) fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, contents) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extracts_full_member_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("deck.pptx");
        write_zip(
            &source,
            &[
                ("[Content_Types].xml", "<Types/>"),
                ("ppt/slides/slide1.xml", "<p:sld/>"),
                ("docProps/app.xml", "<Properties/>"),
            ],
        );

        let dest = tmp.path().join("out/nested");
        let count = extract(&source, &dest).unwrap();

        assert_eq!(count, 3);
        assert!(dest.join("[Content_Types].xml").is_file());
        assert!(dest.join("ppt/slides/slide1.xml").is_file());
        assert_eq!(
            fs::read_to_string(dest.join("docProps/app.xml")).unwrap(),
            "<Properties/>"
        );
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("out");
        let err = extract(&tmp.path().join("nope.docx"), &dest).unwrap_err();

        assert!(matches!(err, DecodeError::NotFound(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_directory_source_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("report.xlsx");
        fs::create_dir(&folder).unwrap();
        let dest = tmp.path().join("out");

        let err = extract(&folder, &dest).unwrap_err();

        assert!(matches!(err, DecodeError::NotFound(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_non_zip_content_fails_with_diagnostic() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("fake.docx");
        fs::write(&source, "this is not a zip archive").unwrap();

        let err = extract(&source, &tmp.path().join("out")).unwrap_err();
        match err {
            DecodeError::ExtractionFailed(msg) => assert!(msg.contains("fake.docx")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_second_extraction_into_same_folder_does_not_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("a.docx");
        write_zip(&source, &[("word/document.xml", "<w:document/>")]);
        let dest = tmp.path().join("out");

        extract(&source, &dest).unwrap();
        assert_eq!(extract(&source, &dest).unwrap(), 1);
    }
}
