pub use self::decoder::StreamDecoder;
pub use self::encoder::StreamEncoder;
pub use self::frame::Frame;

mod decoder;
mod encoder;
mod frame;

pub mod error {
    pub use super::decoder::DecoderError;
}
