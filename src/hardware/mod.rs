//! Raw TCP links to hardware controllers

pub mod link;
pub mod slots;
pub mod tokens;

pub use link::serve_hardware;
pub use tokens::TokenMap;

/// Byte sent to a controller once it has been given a slot
pub const DEFAULT_START_BYTE: u8 = b'S';

/// Per-deployment controller settings
#[derive(Debug, Clone)]
pub struct HardwareSettings {
    pub tokens: TokenMap,
    pub start_byte: u8,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            tokens: TokenMap::default(),
            start_byte: DEFAULT_START_BYTE,
        }
    }
}
