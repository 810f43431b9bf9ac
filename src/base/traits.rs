use crate::base::error::Result;
use crate::base::message::Message;
use std::io;

/// Splits an inbound byte stream into complete response frames.
pub trait ProtocolDecoder {
    /// Attempts to decode a `Message` from the provided buffer.
    ///
    /// Returns the number of bytes consumed and `Some(Message)` once a whole frame
    /// has been assembled. Partial frames are kept in the decoder between calls.
    fn decode(&mut self, buf: &[u8]) -> Result<(usize, Option<Message>)>;

    /// Drops any partially assembled frame.
    fn reset_decoder(&mut self);
}

/// Turns outbound `Message`s into wire bytes.
pub trait ProtocolEncoder {
    /// Encodes a `Message` into `bytes`, returning the number of bytes written.
    fn encode(&mut self, msg: &Message, bytes: &mut [u8]) -> Result<usize>;

    /// Upper bound of the encoded size of `msg`.
    fn estimate_encoded_size(&mut self, msg: &Message) -> Result<usize>;

    /// Encodes a `Message` and writes it directly to a `Write` target (e.g., a serial port).
    ///
    /// Returns the number of bytes successfully written to the destination.
    fn write_to(&mut self, msg: &Message, dest: &mut impl io::Write) -> Result<usize>;

    /// Resets the internal state of the encoder.
    fn reset_encoder(&mut self);
}
