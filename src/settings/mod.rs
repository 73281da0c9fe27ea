use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "holoscene")]
#[command(version)]
#[command(about = "Loads glTF 2.0 documents into renderer-ready scene graphs")]
pub struct CliArgs {
    #[command(subcommand)]
    pub operation_mode: OperationMode,
}

#[derive(Subcommand, Debug)]
pub enum OperationMode {
    /// Parses the document and prints what it declares, without fetching or
    /// constructing anything.
    Inspect {
        file: PathBuf,
    },
    /// Loads a scene end to end against the null backend and prints the
    /// construction statistics.
    Load {
        file: PathBuf,
        /// Scene index to load; defaults to the document's default scene.
        #[arg(long, env = "HOLOSCENE_SCENE")]
        scene: Option<usize>,
    },
}
