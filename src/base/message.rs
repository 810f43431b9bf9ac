/// A frame exchanged with the flow bench controller.
///
/// Outbound, `cmd` is the command identifier and `data` is empty. Inbound, `cmd`
/// is the raw header byte (identifier plus failure bit) and `data` holds the
/// whole frame, header and checksum trailer included, ready for response validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The command identifier or response header byte.
    pub cmd: u8,

    /// Frame bytes associated with the message.
    pub data: Vec<u8>,
}

impl Message {
    /// Creates a new message with a command identifier and no data.
    pub fn new(cmd: u8) -> Message {
        Message::with_data(cmd, &[])
    }

    /// Creates a new message with a header byte and frame data.
    ///
    /// # Arguments
    ///
    /// * `cmd` - The identifier or header byte.
    /// * `data` - A slice containing the frame bytes.
    #[inline]
    pub fn with_data(cmd: u8, data: &[u8]) -> Message {
        Message {
            cmd,
            data: data.to_vec(),
        }
    }
}
