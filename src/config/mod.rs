//! Configuration Module
//!
//! Parses the INI-like wireproxy configuration grammar into a typed device
//! configuration. The grammar is custom, not standard INI: backticks, double
//! quotes, and spaces are stripped from every line before interpretation.

pub mod builder;
pub mod fields;
pub mod tokenizer;
pub mod types;

pub use builder::socks5_bind_addr;
pub use tokenizer::{SectionKind, Sections};
pub use types::{DeviceConfig, PeerConfig};
