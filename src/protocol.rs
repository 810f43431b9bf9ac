use crate::answers::layout_for;
use crate::base::{Error, Message, ProtocolDecoder, ProtocolEncoder, Result};
use crate::cmds::{FLOWBENCH_RESP_FAILURE_BIT, FLOWBENCH_RESP_IDENTIFIER_MASK};
use log::{error, trace};
use std::cmp::min;
use std::io::Write;

/// Encoded size of every command: the identifier byte alone.
const FLOWBENCH_CMD_SIZE: usize = 1;

#[derive(Debug, Clone, PartialEq)]
enum DecodeStatus {
    WaitHeader,
    ReceiveFrame,
}

/// Host side of the flow bench serial protocol.
///
/// Commands go out as their identifier byte. Incoming bytes are split into frames
/// using the header: a header with the failure bit set, or with an identifier that
/// has no known layout, is a frame on its own; any other header starts a frame of
/// the fixed length its layout declares.
///
/// A success header with a multi-byte layout is never a frame by itself: the decoder
/// keeps waiting for the rest, so a controller that answers `F` with a bare `0x46`
/// surfaces as [`Error::OperationTimeout`] from [`Channel::read_until`].
///
/// [`Channel::read_until`]: crate::Channel::read_until
#[derive(Debug, Clone, PartialEq)]
pub struct FlowBenchHostProtocol {
    status: DecodeStatus,
    frame_size: usize,
    decoding_msg: Message,
}

impl FlowBenchHostProtocol {
    pub fn new() -> FlowBenchHostProtocol {
        trace!("Creating new FlowBenchHostProtocol");
        FlowBenchHostProtocol {
            status: DecodeStatus::WaitHeader,
            frame_size: 0,
            decoding_msg: Message::new(0),
        }
    }

    fn start_wait_header(&mut self) {
        trace!("Decoder state -> WaitHeader");
        self.status = DecodeStatus::WaitHeader;
        self.frame_size = 0;
        self.decoding_msg.data.clear();
    }

    fn start_receive_frame(&mut self, header: u8, frame_size: usize) {
        trace!(
            "Decoder state -> ReceiveFrame (header: {:02X}, size: {})",
            header,
            frame_size
        );
        self.status = DecodeStatus::ReceiveFrame;
        self.frame_size = frame_size;
        self.decoding_msg.cmd = header;
        self.decoding_msg.data.clear();
        self.decoding_msg.data.reserve(frame_size);
        self.decoding_msg.data.push(header);
    }

    /// Consumes one header byte. Returns a message when the header is a whole frame.
    fn decode_header(&mut self, header: u8) -> Option<Message> {
        if header & FLOWBENCH_RESP_FAILURE_BIT == FLOWBENCH_RESP_FAILURE_BIT {
            trace!("Failure bit set in header {:02X}, frame complete", header);
            return Some(Message::with_data(header, &[header]));
        }

        match layout_for(header & FLOWBENCH_RESP_IDENTIFIER_MASK) {
            Some(layout) if layout.length > 1 => {
                self.start_receive_frame(header, layout.length);
                None
            }
            _ => {
                trace!("No multi-byte layout for header {:02X}, frame complete", header);
                Some(Message::with_data(header, &[header]))
            }
        }
    }

    fn decode_frame(&mut self, buf: &[u8]) -> (usize, Option<Message>) {
        let bytes_to_read = self.frame_size - self.decoding_msg.data.len();
        let bytes_actual_read = min(bytes_to_read, buf.len());
        trace!(
            "Need {} frame bytes, received {}, reading {}",
            bytes_to_read,
            buf.len(),
            bytes_actual_read
        );
        self.decoding_msg
            .data
            .extend_from_slice(&buf[..bytes_actual_read]);

        if self.decoding_msg.data.len() == self.frame_size {
            trace!("Full frame received: {:02X?}", self.decoding_msg.data);
            let msg = self.decoding_msg.clone();
            self.reset_decoder();
            (bytes_actual_read, Some(msg))
        } else {
            trace!("Frame incomplete, need more data");
            (bytes_actual_read, None)
        }
    }
}

impl Default for FlowBenchHostProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolDecoder for FlowBenchHostProtocol {
    fn decode(&mut self, buf: &[u8]) -> Result<(usize, Option<Message>)> {
        trace!(
            "decode called with {} bytes, current state: {:?}",
            buf.len(),
            self.status
        );

        let mut i = 0;
        while i < buf.len() {
            match self.status {
                DecodeStatus::WaitHeader => {
                    let header = buf[i];
                    i += 1;
                    if let Some(msg) = self.decode_header(header) {
                        return Ok((i, Some(msg)));
                    }
                }
                DecodeStatus::ReceiveFrame => {
                    let (consumed, msg) = self.decode_frame(&buf[i..]);
                    i += consumed;
                    if msg.is_some() {
                        return Ok((i, msg));
                    }
                }
            }
        }

        trace!("decode consumed {} bytes without a complete frame", i);
        Ok((i, None))
    }

    fn reset_decoder(&mut self) {
        trace!("Resetting decoder state");
        self.start_wait_header();
    }
}

impl ProtocolEncoder for FlowBenchHostProtocol {
    fn encode(&mut self, msg: &Message, bytes: &mut [u8]) -> Result<usize> {
        let size = self.estimate_encoded_size(msg)?;
        if bytes.len() < size {
            error!("Buffer too small: required {}, available {}", size, bytes.len());
            return Err(Error::BufferTooSmall);
        }
        bytes[0] = msg.cmd;
        trace!("Encoded command {:02X}", msg.cmd);
        Ok(size)
    }

    fn estimate_encoded_size(&mut self, msg: &Message) -> Result<usize> {
        if !msg.data.is_empty() {
            return Err(Error::ProtocolError {
                description: format!(
                    "command {:02X} carries {} payload bytes, commands have none",
                    msg.cmd,
                    msg.data.len()
                ),
            });
        }
        Ok(FLOWBENCH_CMD_SIZE)
    }

    fn write_to(&mut self, msg: &Message, dest: &mut impl Write) -> Result<usize> {
        let mut buf = [0; FLOWBENCH_CMD_SIZE];
        let encoded_size = self.encode(msg, &mut buf)?;
        trace!("Writing {} bytes to destination stream...", encoded_size);
        match dest.write_all(&buf[..encoded_size]) {
            Ok(()) => Ok(encoded_size),
            Err(err) => {
                error!("IO error during write_all: {}", err);
                Err(err.into())
            }
        }
    }

    fn reset_encoder(&mut self) {
        // Commands are stateless single bytes.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::append_checksum;

    fn encode<T: ProtocolEncoder>(protocol: &mut T, msg: &Message) -> Result<Vec<u8>> {
        let size = protocol.estimate_encoded_size(msg)?;
        let mut buf = vec![0; size];
        let written = protocol.encode(msg, &mut buf)?;
        buf.truncate(written);
        Ok(buf)
    }

    #[test]
    fn protocol_encode() {
        let mut protocol = FlowBenchHostProtocol::new();
        assert_eq!(encode(&mut protocol, &Message::new(b'F')).unwrap(), vec![0x46]);
        assert!(matches!(
            encode(&mut protocol, &Message::with_data(b'F', &[1])),
            Err(Error::ProtocolError { .. })
        ));
        assert!(matches!(
            protocol.encode(&Message::new(b'V'), &mut []),
            Err(Error::BufferTooSmall)
        ));
    }

    #[test]
    fn write_to_sends_identifier_byte() {
        let mut protocol = FlowBenchHostProtocol::new();
        let mut sink = Vec::new();
        assert_eq!(protocol.write_to(&Message::new(b'B'), &mut sink).unwrap(), 1);
        assert_eq!(sink, b"B");
    }

    #[test]
    fn decodes_whole_version_frame() {
        let mut protocol = FlowBenchHostProtocol::new();
        let frame = append_checksum(&[0x56, 1, 2, 3]);
        let (consumed, msg) = protocol.decode(&frame).unwrap();
        assert_eq!(consumed, 5);
        let msg = msg.unwrap();
        assert_eq!(msg.cmd, 0x56);
        assert_eq!(msg.data, frame);
    }

    #[test]
    fn decodes_frame_split_across_reads() {
        let mut protocol = FlowBenchHostProtocol::new();
        let frame = append_checksum(&[0x46, 0x10]);

        assert_eq!(protocol.decode(&frame[..1]).unwrap(), (1, None));
        assert_eq!(protocol.decode(&frame[1..2]).unwrap(), (1, None));
        let (consumed, msg) = protocol.decode(&frame[2..]).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(msg.unwrap().data, frame);
    }

    #[test]
    fn stops_after_first_frame() {
        let mut protocol = FlowBenchHostProtocol::new();
        let mut stream = append_checksum(&[0x54, 0x16]);
        stream.extend(append_checksum(&[0x48, 0x30]));

        let (consumed, msg) = protocol.decode(&stream).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(msg.unwrap().cmd, b'T');

        let (consumed, msg) = protocol.decode(&stream[3..]).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(msg.unwrap().cmd, b'H');
    }

    #[test]
    fn failure_header_is_a_frame_of_its_own() {
        let mut protocol = FlowBenchHostProtocol::new();
        let (consumed, msg) = protocol.decode(&[0xC6, 0x46]).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(msg.unwrap().data, vec![0xC6]);
    }

    #[test]
    fn unknown_header_is_a_frame_of_its_own() {
        let mut protocol = FlowBenchHostProtocol::new();
        let (consumed, msg) = protocol.decode(&[0x7E]).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(msg.unwrap(), Message::with_data(0x7E, &[0x7E]));
    }

    #[test]
    fn success_header_alone_is_incomplete() {
        let mut protocol = FlowBenchHostProtocol::new();
        assert_eq!(protocol.decode(&[0x46]).unwrap(), (1, None));
        let (consumed, msg) = protocol.decode(&[0x05, 0x4B]).unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(msg.unwrap().data, vec![0x46, 0x05, 0x4B]);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut protocol = FlowBenchHostProtocol::new();
        protocol.decode(&[0x56, 1]).unwrap();
        protocol.reset_decoder();

        let frame = append_checksum(&[0x42, 0x64]);
        let (_, msg) = protocol.decode(&frame).unwrap();
        assert_eq!(msg.unwrap().data, frame);
    }
}
