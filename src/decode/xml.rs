/// XML pretty-printing for extracted Office parts
///
/// Office writers store every part on a single line, which makes the
/// decoded folder hard to read and diff. This pass re-indents each `.xml`
/// file in place. It is a readability aid only: a file that cannot be
/// parsed is left untouched and reported back as a warning.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Spaces per nesting level, same as `xmllint --format`
const INDENT_WIDTH: usize = 2;

/// A file the formatter had to skip
#[derive(Debug, Clone, PartialEq)]
pub struct FormatWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for FormatWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Re-indent every `*.xml` file (extension matched case-insensitively) under `root`.
///
/// Never fails: per-file problems are collected and returned.
pub fn format_all(root: &Path) -> Vec<FormatWarning> {
    let mut warnings = Vec::new();
    let mut formatted = 0;

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warnings.push(FormatWarning {
                    path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
                    message: e.to_string(),
                });
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !is_xml(path) {
            continue;
        }

        match format_file(path) {
            Ok(()) => formatted += 1,
            Err(message) => {
                warn!("⚠️  Could not format {}: {}", path.display(), message);
                warnings.push(FormatWarning {
                    path: path.to_path_buf(),
                    message,
                });
            }
        }
    }

    debug!("🧹 Formatted {} XML files under {}", formatted, root.display());
    warnings
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

/// Format a single file in place. The file is only rewritten when the whole
/// document parsed successfully.
fn format_file(path: &Path) -> Result<(), String> {
    let input = fs::read(path).map_err(|e| e.to_string())?;
    let output = format_xml(&input)?;
    if output != input {
        fs::write(path, output).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Pretty-print an XML document.
///
/// Attributes keep their order, text and CDATA are copied byte for byte.
/// Whitespace-only text between tags is dropped and replaced by indentation,
/// except when it is the only content of an element (`<w:t> </w:t>`).
/// Input without a root element (empty, blank, or only a prolog) is an error.
pub fn format_xml(input: &[u8]) -> Result<Vec<u8>, String> {
    let mut reader = Reader::from_reader(input);
    let mut writer = Writer::new_with_indent(Vec::with_capacity(input.len() * 2), b' ', INDENT_WIDTH);

    let mut depth: usize = 0;
    let mut saw_root = false;
    let mut after_start = false;
    let mut pending_blank: Option<Event<'static>> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("parse error at byte {}: {}", reader.buffer_position(), e))?;

        if matches!(event, Event::Eof) {
            break;
        }
        if is_blank(&event) {
            pending_blank = Some(event.into_owned());
            continue;
        }

        if let Some(blank) = pending_blank.take() {
            if after_start && matches!(event, Event::End(_)) {
                writer.write_event(blank).map_err(|e| e.to_string())?;
            }
        }

        match event {
            Event::Start(_) => {
                depth += 1;
                saw_root = true;
            }
            Event::Empty(_) => saw_root = true,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        after_start = matches!(event, Event::Start(_));

        writer.write_event(event).map_err(|e| e.to_string())?;
    }

    if !saw_root {
        return Err("document has no root element".to_string());
    }
    if depth != 0 {
        return Err(format!("unexpected end of document ({} unclosed elements)", depth));
    }

    let mut output = writer.into_inner();
    output.push(b'\n');
    Ok(output)
}

fn is_blank(event: &Event<'_>) -> bool {
    match event {
        Event::Text(text) => text.iter().all(|b| b.is_ascii_whitespace()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_str(input: &str) -> String {
        String::from_utf8(format_xml(input.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_indents_nested_elements() {
        let out = format_str(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook><sheets><sheet name="A" sheetId="1"/></sheets></workbook>"#,
        );

        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <workbook>\n  <sheets>\n    <sheet name=\"A\" sheetId=\"1\"/>\n  </sheets>\n</workbook>\n"
        );
    }

    #[test]
    fn test_text_and_attribute_order_preserved() {
        let out = format_str(r#"<r><t z="1" a="2">Hello &amp; bye</t></r>"#);
        assert!(out.contains(r#"<t z="1" a="2">Hello &amp; bye</t>"#));
    }

    #[test]
    fn test_sole_whitespace_content_is_kept() {
        let out = format_str(r#"<p><t xml:space="preserve"> </t></p>"#);
        assert!(out.contains(r#"<t xml:space="preserve"> </t>"#));
    }

    #[test]
    fn test_reformatting_is_stable() {
        let once = format_xml(b"<a><b><c>x</c></b><d/></a>").unwrap();
        let twice = format_xml(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_malformed_xml_is_rejected() {
        assert!(format_xml(b"<a><b></a>").is_err());
        assert!(format_xml(b"<a><b>").is_err());
    }

    #[test]
    fn test_document_without_root_is_rejected() {
        assert!(format_xml(b"").is_err());
        assert!(format_xml(b" \n\t ").is_err());
        assert!(format_xml(b"<?xml version=\"1.0\"?>").is_err());
        assert_eq!(format_str("<a/>"), "<a/>\n");
    }

    #[test]
    fn test_format_all_leaves_empty_file_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("customXml/item1.xml");
        fs::create_dir_all(empty.parent().unwrap()).unwrap();
        fs::write(&empty, "").unwrap();

        let warnings = format_all(tmp.path());

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, empty);
        assert_eq!(fs::metadata(&empty).unwrap().len(), 0);
    }

    #[test]
    fn test_format_all_continues_past_bad_files() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("xl/workbook.xml");
        let upper = tmp.path().join("docProps/CORE.XML");
        let bad = tmp.path().join("xl/broken.xml");
        let other = tmp.path().join("xl/media/image1.png");
        for p in [&good, &upper, &bad, &other] {
            fs::create_dir_all(p.parent().unwrap()).unwrap();
        }
        fs::write(&good, "<workbook><sheets/></workbook>").unwrap();
        fs::write(&upper, "<core><title>t</title></core>").unwrap();
        fs::write(&bad, "<workbook><sheets></workbook>").unwrap();
        fs::write(&other, "<not><xml>").unwrap();

        let warnings = format_all(tmp.path());

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, bad);
        assert_eq!(
            fs::read_to_string(&good).unwrap(),
            "<workbook>\n  <sheets/>\n</workbook>\n"
        );
        assert_eq!(
            fs::read_to_string(&upper).unwrap(),
            "<core>\n  <title>t</title>\n</core>\n"
        );
        assert_eq!(fs::read_to_string(&bad).unwrap(), "<workbook><sheets></workbook>");
        assert_eq!(fs::read_to_string(&other).unwrap(), "<not><xml>");
    }
}
