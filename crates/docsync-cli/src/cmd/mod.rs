pub mod config;
pub mod fetch;
pub mod init;
pub mod list;
pub mod sync;
