//! OfficeViewer core
//!
//! Decodes Office Open XML documents (.docx, .xlsx, .pptx) into readable
//! folders under a cache directory, keeps a history of decoded files and
//! opens the result with a user-configured shell command.

pub mod app;
pub mod config;
pub mod decode;
pub mod error;
pub mod launch;
pub mod state;

pub use app::{App, Opened, Reopened};
pub use config::AppPaths;
pub use error::{AppError, DecodeError, RunError, StoreError};
