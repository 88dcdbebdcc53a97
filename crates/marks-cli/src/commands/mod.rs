pub mod bookmark;
pub mod config;
pub mod history;
pub mod status;
