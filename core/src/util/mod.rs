mod ring_bytes;
pub mod template;

pub use ring_bytes::RingBytes;
pub use template::expand_placeholders;
