pub mod config;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod frontmatter;
pub mod hash;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod sync;
pub mod types;

pub use error::{ConversionError, FetchError, Result, SyncError};
