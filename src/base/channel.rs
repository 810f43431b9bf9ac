use crate::base::error::{Error, Result};
use crate::base::message::Message;
use crate::base::ring_byte_buffer::RingByteBuffer;
use crate::base::traits::{ProtocolDecoder, ProtocolEncoder};
use log::{error, trace, warn};
use std::io;
use std::time::{Duration, Instant};

const DEFAULT_CHANNEL_READ_BUFFER_SIZE: usize = 256;

/// Channel encode and decode message with protocol, and send and receive bytes via stream
///
/// The stream is expected to have a short read timeout (a few milliseconds) so that
/// [`read_until`](Channel::read_until) can poll against its own deadline.
///
/// # Examples
/// ```ignore
/// let mut channel = Channel::new(FlowBenchHostProtocol::new(), serial_port);
/// channel.write(&Message::new(b'F'))?;
/// ```
#[derive(Debug)]
pub struct Channel<P, T: ?Sized> {
    protocol: P,
    stream: Box<T>,
    read_buffer: RingByteBuffer,
}

impl<P, T: ?Sized> Channel<P, T>
where
    P: ProtocolDecoder + ProtocolEncoder,
    T: io::Read + io::Write,
{
    /// Create a new `Channel` to read and write messages
    pub fn new(protocol: P, stream: Box<T>) -> Channel<P, T> {
        Channel::with_read_buffer_size(protocol, stream, DEFAULT_CHANNEL_READ_BUFFER_SIZE)
    }

    /// Create a new `Channel` with non-default ring buffer capacity
    pub fn with_read_buffer_size(
        protocol: P,
        stream: Box<T>,
        read_buffer_size: usize,
    ) -> Channel<P, T> {
        trace!("Creating new Channel with buffer size {}", read_buffer_size);
        let mut chn = Channel {
            protocol,
            stream,
            read_buffer: RingByteBuffer::with_capacity(read_buffer_size),
        };

        chn.reset();
        chn
    }

    /// The underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    /// Reset the channel status
    ///
    /// Resets the encoder and decoder and drops buffered bytes, so the next read
    /// starts at a frame boundary. Call it after a communication error.
    pub fn reset(&mut self) {
        trace!("Resetting Channel protocol encoder, decoder and read buffer");
        self.protocol.reset_encoder();
        self.protocol.reset_decoder();
        self.read_buffer.clear();
    }

    /// Feeds buffered bytes to the decoder until a frame comes out or the buffer runs dry.
    fn decode_buffered(&mut self) -> Result<Option<Message>> {
        while !self.read_buffer.is_empty() {
            let buffer_slice = self.read_buffer.current_read_slice();
            trace!("Attempting to decode buffer ({} bytes)", buffer_slice.len());

            match self.protocol.decode(buffer_slice) {
                Ok((decoded_bytes, msg_option)) => {
                    self.read_buffer.skip_bytes(decoded_bytes);
                    if let Some(msg) = msg_option {
                        trace!(
                            "Decoded message: cmd={:02X}, data_len={}",
                            msg.cmd,
                            msg.data.len()
                        );
                        return Ok(Some(msg));
                    }
                    if decoded_bytes == 0 {
                        warn!(
                            "Protocol decode consumed 0 bytes with {} bytes buffered",
                            self.read_buffer.len()
                        );
                        return Err(Error::ProtocolError {
                            description: "decoder stalled".to_owned(),
                        });
                    }
                }
                Err(e) => {
                    error!("Protocol decode error: {:?}", e);
                    self.protocol.reset_decoder();
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    fn fill_buffer(&mut self) -> Result<usize> {
        match self.read_buffer.read_from(&mut self.stream) {
            Ok(bytes_read) => {
                trace!(
                    "Read {} bytes from stream (buffer len: {})",
                    bytes_read,
                    self.read_buffer.len()
                );
                Ok(bytes_read)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => {
                error!("IO error reading from stream: {}", e);
                Err(e.into())
            }
        }
    }

    /// Read message from channel
    ///
    /// Performs one read from the stream and returns `Ok(None)` when no complete
    /// frame is available yet.
    pub fn read(&mut self) -> Result<Option<Message>> {
        if let Some(msg) = self.decode_buffered()? {
            return Ok(Some(msg));
        }
        self.fill_buffer()?;
        self.decode_buffered()
    }

    /// Read message until timeout
    ///
    /// Fails with [`Error::OperationTimeout`] when no complete frame arrives in time.
    pub fn read_until(&mut self, timeout: Duration) -> Result<Message> {
        trace!("Channel read_until called with timeout {:?}", timeout);
        let start = Instant::now();

        loop {
            if let Some(msg) = self.decode_buffered()? {
                return Ok(msg);
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                trace!("Overall timeout reached ({:?})", elapsed);
                return Err(Error::OperationTimeout);
            }

            self.fill_buffer()?;
        }
    }

    /// Write message to channel
    pub fn write(&mut self, msg: &Message) -> Result<usize> {
        trace!("Channel write called: cmd={:02X}", msg.cmd);
        let written = self.protocol.write_to(msg, &mut self.stream)?;
        self.stream.flush()?;
        Ok(written)
    }

    /// Send a request to channel and wait for response
    pub fn invoke(&mut self, request: &Message, timeout: Duration) -> Result<Message> {
        trace!(
            "Channel invoke called: cmd={:02X}, timeout={:?}",
            request.cmd,
            timeout
        );
        if let Err(e) = self.write(request) {
            error!("Invoke: failed to write request: {:?}", e);
            return Err(e);
        }
        let result = self.read_until(timeout);
        match &result {
            Ok(resp) => trace!(
                "Invoke: received response: cmd={:02X}, data_len={}",
                resp.cmd,
                resp.data.len()
            ),
            Err(e) => error!("Invoke: error waiting for response: {:?}", e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::append_checksum;
    use crate::protocol::FlowBenchHostProtocol;
    use std::io::{Read, Write};

    /// Replays canned bytes on read and records everything written.
    struct ScriptedStream {
        incoming: io::Cursor<Vec<u8>>,
        outgoing: Vec<u8>,
    }

    impl ScriptedStream {
        fn new(incoming: Vec<u8>) -> ScriptedStream {
            ScriptedStream {
                incoming: io::Cursor::new(incoming),
                outgoing: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.incoming.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outgoing.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn invoke_writes_request_and_returns_frame() {
        let reply = append_checksum(&[0x46, 0x21]);
        let stream = Box::new(ScriptedStream::new(reply.clone()));
        let mut channel = Channel::new(FlowBenchHostProtocol::new(), stream);

        let msg = channel
            .invoke(&Message::new(b'F'), Duration::from_millis(50))
            .unwrap();
        assert_eq!(msg.data, reply);
        assert_eq!(channel.stream.outgoing, b"F");
    }

    #[test]
    fn read_until_times_out_on_partial_frame() {
        let stream = Box::new(ScriptedStream::new(vec![0x56, 0x01]));
        let mut channel = Channel::new(FlowBenchHostProtocol::new(), stream);
        assert!(matches!(
            channel.read_until(Duration::from_millis(5)),
            Err(Error::OperationTimeout)
        ));
    }

    #[test]
    fn read_returns_buffered_frames_in_order() {
        let mut bytes = append_checksum(&[0x52, 0x05]);
        bytes.extend(append_checksum(&[0x42, 0x06]));
        let stream = Box::new(ScriptedStream::new(bytes));
        let mut channel = Channel::with_read_buffer_size(FlowBenchHostProtocol::new(), stream, 16);

        assert_eq!(channel.read().unwrap().unwrap().cmd, b'R');
        assert_eq!(channel.read().unwrap().unwrap().cmd, b'B');
        assert!(channel.read().unwrap().is_none());
    }

    #[test]
    fn reset_discards_buffered_bytes() {
        let stream = Box::new(ScriptedStream::new(vec![0x56, 0x01]));
        let mut channel = Channel::new(FlowBenchHostProtocol::new(), stream);
        assert!(channel.read().unwrap().is_none());
        channel.reset();
        assert!(channel.read_buffer.is_empty());
    }
}
