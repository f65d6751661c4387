pub mod catalog;
pub mod config;
pub mod history;
pub mod identity;
pub mod ingest;
pub mod playlist;
pub mod rating;
pub mod sequence;
pub mod shell;
pub mod sort;
pub mod track;

/// Application name for XDG paths
pub const APP_NAME: &str = "playwise";
