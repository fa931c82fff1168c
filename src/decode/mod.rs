/// Office document decoding module
///
/// This module handles:
/// - Extracting the zip container of .docx/.xlsx/.pptx files (archive.rs)
/// - Re-indenting the extracted XML parts (xml.rs)
/// - Naming and creating unique folders in the cache directory (decoder.rs)

pub mod archive;
pub mod decoder;
pub mod xml;

pub use decoder::{decode_async, DecodeResult, Decoder};
pub use xml::FormatWarning;
