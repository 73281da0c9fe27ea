use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use gltf_document::reader::DocumentReader;
use holoscene::backend::null::NullBackend;
use holoscene::io::fs::loader::FileSource;
use holoscene::loader::session::LoaderSession;
use holoscene::settings::{CliArgs, OperationMode};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args = CliArgs::parse();
    log::trace!("Starting with args: {:?}", args);

    match args.operation_mode {
        OperationMode::Inspect { file } => inspect(&file),
        OperationMode::Load { file, scene } => load(&file, scene).await,
    }
}

fn inspect(file: &Path) -> Result<(), anyhow::Error> {
    let bytes = std::fs::read(file)?;
    let parsed = DocumentReader::parse(&bytes)?;
    let document = &parsed.document;

    println!(
        "glTF {} ({})",
        document.asset.version,
        document.asset.generator.as_deref().unwrap_or("unknown generator")
    );
    println!(
        "  {} scenes, {} nodes, {} meshes, {} materials, {} textures",
        document.scenes.len(),
        document.nodes.len(),
        document.meshes.len(),
        document.materials.len(),
        document.textures.len()
    );
    println!(
        "  {} buffers, {} accessors, {} skins, {} cameras, {} animations",
        document.buffers.len(),
        document.accessors.len(),
        document.skins.len(),
        document.cameras.len(),
        document.animations.len()
    );
    if !document.extensions_used.is_empty() {
        println!("  extensions: {}", document.extensions_used.join(", "));
    }
    if let Some(binary) = &parsed.binary {
        println!("  GLB BIN chunk: {} bytes", binary.len());
    }
    Ok(())
}

async fn load(file: &Path, scene: Option<usize>) -> Result<(), anyhow::Error> {
    let bytes = std::fs::read(file)?;
    let parsed = DocumentReader::parse(&bytes)?;

    let base_dir = file.parent().unwrap_or(Path::new("."));
    let source = Arc::new(FileSource::new(base_dir));
    let session = LoaderSession::new(parsed, Arc::new(NullBackend::new()), source)?;

    let loaded = session.load_scene(scene).await?;
    let stats = &loaded.stats;
    println!(
        "Loaded {} nodes ({} roots): {} vertex buffers, {} textures, {} materials, {} meshes",
        stats.nodes,
        loaded.roots.len(),
        stats.vertex_buffers,
        stats.textures,
        stats.materials,
        stats.meshes
    );
    println!(
        "  {} skeletons, {} animation groups, {} cameras, {} lights",
        stats.skeletons, stats.animation_groups, stats.cameras, stats.lights
    );

    let disposed = loaded.dispose();
    log::debug!("Released {} resources again", disposed);
    Ok(())
}
