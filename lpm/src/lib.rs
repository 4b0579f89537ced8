//! Layer provenance metadata (lpm) for container images.
//!
//! Given a Dockerfile and the manifest of the image it built, [`analyze`]
//! works out which layers the Dockerfile produced and which came from the
//! base image, and returns a reference manifest that records this as
//! annotations on empty placeholder descriptors. The artifact can be staged
//! into a [`store::ContentStore`] and pushed with a [`publish::Publisher`];
//! [`emit()`] does both after writing the manifest out locally.

pub mod annotations;
pub mod assemble;
pub mod config;
pub mod config_annotate;
pub mod correlate;
pub mod cursor;
pub mod dockerfile;
pub mod emit;
pub mod error;
pub mod publish;
pub mod reference;
pub mod store;

pub use annotations::Ownership;
pub use assemble::{ReferenceManifest, analyze, analyze_files, assemble};
pub use correlate::correlate;
pub use dockerfile::Instruction;
pub use emit::emit;
pub use error::{LpmError, Result};
