/// Contrasting to the importers, that convert already fetched bytes into our
/// engine-neutral IR, the loaders here are a lot more high level: they walk
/// the document's reference graph, pull bytes through the session's byte
/// source, pipe them into the importers and hand the result to the backend,
/// memoizing every derivation through [`crate::graph::resolver::Resolver`] so
/// fan-in never duplicates work.
pub mod animation_loader;
pub mod buffer_loader;
pub mod material_loader;
pub mod mesh_loader;
pub mod node_loader;
pub mod scene_loader;
pub mod session;
pub mod texture_loader;
