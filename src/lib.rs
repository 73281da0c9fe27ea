pub mod backend;
pub mod common;
pub mod error;
pub mod graph;
pub mod importer;
pub mod io;
pub mod loader;
pub mod settings;
