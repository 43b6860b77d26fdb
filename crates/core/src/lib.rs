//! bcprov-core
//!
//! Core library for recovering the original source files of a natively
//! compiled binary whose build embedded per-translation-unit LLVM bitcode.
//!
//! The pipeline has three stages, each consuming the previous stage's
//! on-disk output:
//! - build capture: drive an external build under the `wllvm` compiler
//!   wrapper so every translation unit's bitcode is embedded;
//! - manifest extraction: classify the built artifact, pull out the combined
//!   bitcode, and publish the per-unit manifest under a well-known name;
//! - source resolution: map every manifest unit back to the absolute path of
//!   the source file that produced it.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends (CLI, scripting, etc.).

pub mod error;
pub mod model;
pub mod services;

pub use error::PipelineError;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
