use crate::base::{Error, Result};
use crate::cmds::*;
use crate::response::{
    FixedLayout, GetBarometricPressureResponse, GetFlowResponse, GetHumidityResponse,
    GetReferencePressureResponse, GetTemperatureResponse, GetVersionResponse,
};
use log::{trace, warn};
use std::fmt;

/// An outbound request to the flow bench controller.
///
/// A command is identified by a single printable ASCII byte. On the wire it is
/// sent as exactly that byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    identifier: u8,
}

impl Command {
    /// Creates a command for one of the [`SUPPORTED_IDENTIFIERS`].
    ///
    /// Fails with [`Error::UnsupportedIdentifier`] for any other byte.
    pub fn new(identifier: u8) -> Result<Command> {
        Command::with_allow_list(identifier, &SUPPORTED_IDENTIFIERS)
    }

    /// Creates a command checked against a caller-supplied allow-list.
    ///
    /// The identifier must still be printable (`0x21..=0x7E`) whatever the list says.
    pub fn with_allow_list(identifier: u8, allow_list: &[u8]) -> Result<Command> {
        if !(FLOWBENCH_IDENTIFIER_MIN..=FLOWBENCH_IDENTIFIER_MAX).contains(&identifier)
            || !allow_list.contains(&identifier)
        {
            warn!("Rejecting unsupported command identifier {:02X}", identifier);
            return Err(Error::UnsupportedIdentifier(identifier));
        }
        trace!("Created command '{}'", identifier as char);
        Ok(Command { identifier })
    }

    /// The identifier byte sent to the controller.
    #[inline]
    pub fn identifier(&self) -> u8 {
        self.identifier
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier as char)
    }
}

/// A command with a fixed identifier, bound to the response variant that answers it.
pub trait TypedCommand: Copy + Into<Command> {
    /// Identifier of every instance of this command.
    const IDENTIFIER: u8;

    /// The response variant the controller replies with.
    type Response: FixedLayout<Command = Self>;
}

macro_rules! typed_command {
    ($(#[$meta:meta])* $name:ident, $id:expr, $resp:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name;

        impl TypedCommand for $name {
            const IDENTIFIER: u8 = $id;
            type Response = $resp;
        }

        impl From<$name> for Command {
            fn from(_: $name) -> Command {
                Command { identifier: $id }
            }
        }
    };
}

typed_command!(
    /// Requests the controller firmware version.
    GetVersionCommand,
    FLOWBENCH_CMD_GET_VERSION,
    GetVersionResponse
);

typed_command!(
    /// Requests the current flow reading.
    GetFlowCommand,
    FLOWBENCH_CMD_GET_FLOW,
    GetFlowResponse
);

typed_command!(
    /// Requests the current temperature reading.
    GetTemperatureCommand,
    FLOWBENCH_CMD_GET_TEMPERATURE,
    GetTemperatureResponse
);

typed_command!(
    /// Requests the current relative humidity reading.
    GetHumidityCommand,
    FLOWBENCH_CMD_GET_HUMIDITY,
    GetHumidityResponse
);

typed_command!(
    /// Requests the current reference pressure reading.
    GetReferencePressureCommand,
    FLOWBENCH_CMD_GET_REFERENCE_PRESSURE,
    GetReferencePressureResponse
);

typed_command!(
    /// Requests the current barometric pressure reading.
    GetBarometricPressureCommand,
    FLOWBENCH_CMD_GET_BAROMETRIC_PRESSURE,
    GetBarometricPressureResponse
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_identifiers_are_kept() {
        for id in SUPPORTED_IDENTIFIERS {
            assert_eq!(Command::new(id).unwrap().identifier(), id);
        }
    }

    #[test]
    fn space_is_rejected() {
        assert!(matches!(
            Command::new(b' '),
            Err(Error::UnsupportedIdentifier(0x20))
        ));
    }

    #[test]
    fn printable_but_unlisted_is_rejected() {
        assert!(matches!(
            Command::new(b'Z'),
            Err(Error::UnsupportedIdentifier(b'Z'))
        ));
    }

    #[test]
    fn allow_list_extends_command_set_within_printable_range() {
        assert_eq!(
            Command::with_allow_list(b'~', &[b'~']).unwrap().identifier(),
            b'~'
        );
        assert!(matches!(
            Command::with_allow_list(0x7F, &[0x7F]),
            Err(Error::UnsupportedIdentifier(0x7F))
        ));
        assert!(Command::with_allow_list(b'V', &[]).is_err());
    }

    #[test]
    fn typed_commands_carry_their_identifier() {
        assert_eq!(Command::from(GetVersionCommand).identifier(), b'V');
        assert_eq!(Command::from(GetFlowCommand).identifier(), b'F');
        assert_eq!(Command::from(GetTemperatureCommand).identifier(), b'T');
        assert_eq!(Command::from(GetHumidityCommand).identifier(), b'H');
        assert_eq!(Command::from(GetReferencePressureCommand).identifier(), b'R');
        assert_eq!(Command::from(GetBarometricPressureCommand).identifier(), b'B');
        assert_eq!(GetBarometricPressureCommand::IDENTIFIER, b'B');
    }

    #[test]
    fn display_prints_identifier_character() {
        assert_eq!(Command::from(GetTemperatureCommand).to_string(), "T");
    }
}
