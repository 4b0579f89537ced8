pub mod client;
pub mod digest;
pub mod image_reference;
pub mod models;

// Re-export main client types for convenience
pub use client::{Client, ClientError, ClientSession, Credentials};
pub use digest::OciDigest;
pub use image_reference::{ImageReference, Reference};
pub use models::{Annotations, Descriptor, ImageManifest};
