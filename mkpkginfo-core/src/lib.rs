// mkpkginfo-core/src/lib.rs

// Declare the top-level modules within the library crate
pub mod backend;
pub mod classify;
pub mod container;
pub mod descriptor;
pub mod fingerprint;
pub mod inspect;
pub mod mode;
pub mod plists;
pub mod synth;
pub mod vendor;
pub mod version;

#[cfg(test)]
mod testutil;

// Re-export key types for the CLI crate
pub use backend::Backend;
pub use fingerprint::FingerprintOptions;
pub use mode::validate_symbolic_mode;
pub use synth::{synthesize, ScriptPaths, SynthesisRequest};
