/// This module handles converting raw buffer bytes and schema records into the
/// intermediate representation the backend consumes. The abstraction is made to
/// be a) render backend agnostic and b) allow the decoded representation to be
/// derived multiple times (the same accessor consumed as different vertex
/// attribute kinds), without working directly in the complexity of interleaved,
/// strided, sparse-patched buffer layouts.
pub mod accessor_importer;
pub mod sampler_importer;
