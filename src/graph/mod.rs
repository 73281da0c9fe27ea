//! This module contains the object graph that is built from a parsed glTF
//! document to keep track of cross-entity dependencies and to provide
//! deduplication of resolutions and GPU resource lifetimes.
//!
//! To achieve deduplication, the graph mostly consists of [`std::sync::Arc`]s
//! behind single-assignment cells: whoever requests a given derivation of a
//! given entity first runs the generator and stores the in-flight operation,
//! and every later (or concurrent) requester awaits that same operation
//! instead of starting its own. A branch that races and loses must discard
//! its would-be duplicate work and adopt the stored result, otherwise
//! deduplication will NOT function properly, see [`resolver::Resolver`].
//!
//! The derivation *key* matters as much as the entity: "accessor 7 as a
//! position buffer" and "accessor 7 as a normal buffer" are independent
//! derivations, as are "texture 3 as color data" and "texture 3 as non-color
//! data", and "material 2 with vertex colors" versus "material 2 without".
//! Keys therefore pair the entity index with the discriminator that makes the
//! constructed GPU object unique.
//!
//! Handles returned by the backend behave like refcounted GPU memory: the
//! [`nodes::HandleRegistry`] records each one exactly once at construction
//! time, so aborting a half-finished load can release everything that was
//! already built, and disposing a [`nodes::LoadedDocument`] releases each
//! handle exactly once unless it was marked externally owned.

pub mod nodes;
pub mod resolver;
