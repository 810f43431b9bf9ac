// Reading commands. Each is answered by a fixed-layout response carrying the same identifier.

/// Command identifier to request the controller firmware version.
pub const FLOWBENCH_CMD_GET_VERSION: u8 = b'V';

/// Command identifier to request the measured flow (raw units, scaled to CFM by the caller).
pub const FLOWBENCH_CMD_GET_FLOW: u8 = b'F';

/// Command identifier to request the measured temperature.
pub const FLOWBENCH_CMD_GET_TEMPERATURE: u8 = b'T';

/// Command identifier to request the measured relative humidity.
pub const FLOWBENCH_CMD_GET_HUMIDITY: u8 = b'H';

/// Command identifier to request the reference pressure.
pub const FLOWBENCH_CMD_GET_REFERENCE_PRESSURE: u8 = b'R';

/// Command identifier to request the barometric pressure.
pub const FLOWBENCH_CMD_GET_BAROMETRIC_PRESSURE: u8 = b'B';

/// Identifiers accepted by [`Command::new`](crate::Command::new), in protocol order.
pub const SUPPORTED_IDENTIFIERS: [u8; 6] = [
    FLOWBENCH_CMD_GET_VERSION,
    FLOWBENCH_CMD_GET_FLOW,
    FLOWBENCH_CMD_GET_TEMPERATURE,
    FLOWBENCH_CMD_GET_HUMIDITY,
    FLOWBENCH_CMD_GET_REFERENCE_PRESSURE,
    FLOWBENCH_CMD_GET_BAROMETRIC_PRESSURE,
];

/// Lowest printable identifier (`!`).
pub const FLOWBENCH_IDENTIFIER_MIN: u8 = 0x21;

/// Highest printable identifier (`~`).
pub const FLOWBENCH_IDENTIFIER_MAX: u8 = 0x7E;

/// Bit 7 of a response header, set when the controller could not execute the command.
pub const FLOWBENCH_RESP_FAILURE_BIT: u8 = 0x80;

/// Mask extracting the identifier from a response header.
pub const FLOWBENCH_RESP_IDENTIFIER_MASK: u8 = 0x7F;
