//! Converts a game-engine avatar rig description into an FBX ASCII scene
//! document.
//!
//! The pipeline is synchronous and runs per conversion: the flat JSON rig
//! description is parsed into a node graph ([`rig`]), referenced mesh and
//! texture assets are fetched through an [`asset::AssetSource`], the rig's
//! pairwise motor constraints are reconstructed into a rooted bone tree
//! ([`skeleton`]) and the result is serialized by the streaming document
//! builder ([`fbx`]). Concurrent conversions share no mutable state.

pub mod asset;
pub mod export;
pub mod fbx;
pub mod mesh;
pub mod rig;
pub mod skeleton;
pub mod transform;

pub use export::{ExportOptions, ExportOutput, ExportReport, export_rig};
