pub mod cli;
pub mod config;
pub mod models;
pub mod prefs;
pub mod timeline;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use models::Message;
pub use prefs::{PreferenceStore, Selection, SelectionPrefs};
