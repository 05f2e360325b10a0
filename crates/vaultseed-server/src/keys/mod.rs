//! Credential signing keys

mod registry;

pub use registry::KeyRegistry;
