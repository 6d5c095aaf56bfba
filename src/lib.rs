pub mod backup;
pub mod cli;
pub mod config;
pub mod db;
pub mod export;
pub mod legacy;
pub mod live;
pub mod logging;
pub mod models;
pub mod notebook;
pub mod sections;

pub use db::Database;
pub use notebook::Notebook;
