//! Turning an uploaded image into a member payload.

pub mod decoder;
mod payload;

pub use decoder::DecoderChain;
pub use payload::parse_qr_text;
