// Type definitions for the signature processing engine

pub mod document;
pub mod signer;

pub use document::*;
pub use signer::*;
