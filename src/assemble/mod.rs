//! Output assembly: per-signer packet files and tracking tables.

pub mod packets;
pub mod tracking;

pub use packets::{assemble_signer_packets, PacketRecord};
pub use tracking::write_tables;
