use crate::answers::*;
use crate::base::{Error, Result};
use crate::checksum::{compute_checksum, validate_checksum};
use crate::cmds::*;
use crate::command::{
    Command, GetBarometricPressureCommand, GetFlowCommand, GetHumidityCommand,
    GetReferencePressureCommand, GetTemperatureCommand, GetVersionCommand,
};
use byteorder::{ByteOrder, LittleEndian};
use log::{error, trace, warn};
use std::fmt;

/// A structurally valid reply from the controller.
///
/// A `Response` only exists once the whole frame has been checked: it is non-empty,
/// the failure bit is clear, the identifier matches the command, and the checksum
/// trailer (present whenever the frame is longer than one byte) is correct.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    command: Command,
    data: Vec<u8>,
}

impl Response {
    /// Validates `data` as the reply to `command`.
    pub fn new(command: Command, data: Vec<u8>) -> Result<Response> {
        Response::from_parts(Some(command), Some(data))
    }

    /// Validates a reply whose command or data may be missing, e.g. when a transport
    /// hands over whatever it has after a read.
    pub fn from_parts(command: Option<Command>, data: Option<Vec<u8>>) -> Result<Response> {
        let command = command.ok_or(Error::NullCommand)?;
        let data = data.ok_or(Error::NullData)?;
        trace!(
            "Validating response to '{}' ({} bytes): {:02X?}",
            command,
            data.len(),
            data
        );

        let header = match data.first() {
            Some(&header) => header,
            None => return Err(Error::EmptyData),
        };

        if header & FLOWBENCH_RESP_FAILURE_BIT == FLOWBENCH_RESP_FAILURE_BIT {
            warn!("Controller reported failure for command '{}'", command);
            return Err(Error::CommandFailed { command });
        }

        if header != command.identifier() {
            error!(
                "Response identifier {:02X} does not answer command '{}'",
                header, command
            );
            return Err(Error::IdentifierMismatch {
                expected: command.identifier(),
                actual: header,
            });
        }

        if data.len() > 1 && !validate_checksum(&data) {
            let trailer = data.len() - 1;
            let expected = compute_checksum(&data[..trailer]);
            let actual = data[trailer];
            error!(
                "Checksum mismatch for '{}': expected {:02X}, got {:02X}",
                command, expected, actual
            );
            return Err(Error::InvalidChecksum { expected, actual });
        }

        Ok(Response { command, data })
    }

    /// The command this response answers.
    #[inline]
    pub fn command(&self) -> Command {
        self.command
    }

    /// Whether the controller executed the command.
    ///
    /// Construction rejects frames with the failure bit set, so this is always `true`
    /// on a `Response` that exists.
    #[inline]
    pub fn success(&self) -> bool {
        self.data[0] & FLOWBENCH_RESP_FAILURE_BIT == 0
    }

    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A [`Response`] whose frame matches a fixed [`ResponseLayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct FixedLayoutResponse {
    response: Response,
    layout: &'static ResponseLayout,
}

impl FixedLayoutResponse {
    /// Validates `data` as the reply to `command`, then checks it has the exact
    /// length `layout` requires.
    pub fn with_layout(
        command: Command,
        data: Vec<u8>,
        layout: &'static ResponseLayout,
    ) -> Result<FixedLayoutResponse> {
        let response = Response::new(command, data)?;

        if command.identifier() != layout.identifier {
            error!(
                "Command '{}' cannot be answered by a {}",
                command, layout.name
            );
            return Err(Error::IdentifierMismatch {
                expected: layout.identifier,
                actual: command.identifier(),
            });
        }

        let actual = response.data().len();
        if actual != layout.length {
            error!(
                "The {} must contain {} bytes, got {}",
                layout.name, layout.length, actual
            );
            return Err(Error::InvalidLength {
                expected: layout.length,
                actual,
            });
        }

        trace!("Parsed {} from {} bytes", layout.name, actual);
        Ok(FixedLayoutResponse { response, layout })
    }

    #[inline]
    pub fn layout(&self) -> &'static ResponseLayout {
        self.layout
    }

    #[inline]
    pub fn response(&self) -> &Response {
        &self.response
    }

    #[inline]
    pub fn command(&self) -> Command {
        self.response.command()
    }

    /// Reads `field` from the frame.
    ///
    /// Returns `None` unless `field` is 1 to 4 bytes wide and lies between the
    /// header and the checksum trailer.
    pub fn read(&self, field: &FieldDescriptor) -> Option<u32> {
        let data = self.response.data();
        let end = field.offset.checked_add(field.width)?;
        if field.offset == 0 || field.width == 0 || field.width > 4 || end >= data.len() {
            warn!(
                "Field '{}' ({}+{}) does not fit the {}",
                field.name, field.offset, field.width, self.layout.name
            );
            return None;
        }
        Some(LittleEndian::read_uint(&data[field.offset..end], field.width) as u32)
    }

    /// Reads the layout field called `name`, if there is one.
    pub fn field(&self, name: &str) -> Option<u32> {
        self.layout.field(name).and_then(|field| self.read(field))
    }
}

/// A response variant backed by a [`FixedLayoutResponse`].
pub trait FixedLayout: Sized {
    /// Frame layout of the variant.
    const LAYOUT: &'static ResponseLayout;

    /// The command this variant answers.
    type Command: Into<Command>;

    /// Wraps `inner` as this variant. Fails unless `inner` was validated against
    /// [`LAYOUT`](FixedLayout::LAYOUT).
    fn from_layout_response(inner: FixedLayoutResponse) -> Result<Self>;

    fn layout_response(&self) -> &FixedLayoutResponse;

    /// Validates `data` as this variant's reply to `command`.
    fn parse(command: Self::Command, data: Vec<u8>) -> Result<Self> {
        FixedLayoutResponse::with_layout(command.into(), data, Self::LAYOUT)
            .and_then(Self::from_layout_response)
    }
}

/// Checks that `inner` carries `layout`, so its fields are in range.
fn check_layout(inner: &FixedLayoutResponse, layout: &'static ResponseLayout) -> Result<()> {
    if inner.layout.identifier != layout.identifier {
        error!("A {} cannot hold a {}", layout.name, inner.layout.name);
        return Err(Error::IdentifierMismatch {
            expected: layout.identifier,
            actual: inner.layout.identifier,
        });
    }
    let actual = inner.response.data().len();
    if inner.layout != layout || actual != layout.length {
        error!(
            "The {} must contain {} bytes, got {}",
            layout.name, layout.length, actual
        );
        return Err(Error::InvalidLength {
            expected: layout.length,
            actual,
        });
    }
    Ok(())
}

macro_rules! fixed_layout_response {
    (
        $(#[$meta:meta])*
        $name:ident, $cmd:ty, $layout:expr,
        { $($(#[$fmeta:meta])* $accessor:ident => $field:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(FixedLayoutResponse);

        impl $name {
            pub fn new(command: $cmd, data: Vec<u8>) -> Result<$name> {
                <$name as FixedLayout>::parse(command, data)
            }

            #[inline]
            pub fn command(&self) -> Command {
                self.0.command()
            }

            #[inline]
            pub fn success(&self) -> bool {
                self.0.response().success()
            }

            $(
                $(#[$fmeta])*
                #[inline]
                pub fn $accessor(&self) -> u32 {
                    // Construction checked the frame against LAYOUT, which holds this field.
                    self.0.read(&$field).unwrap_or_default()
                }
            )+
        }

        impl FixedLayout for $name {
            const LAYOUT: &'static ResponseLayout = &$layout;
            type Command = $cmd;

            fn from_layout_response(inner: FixedLayoutResponse) -> Result<Self> {
                check_layout(&inner, Self::LAYOUT)?;
                Ok($name(inner))
            }

            fn layout_response(&self) -> &FixedLayoutResponse {
                &self.0
            }
        }
    };
}

fixed_layout_response!(
    /// The reply to a [`GetVersionCommand`].
    GetVersionResponse, GetVersionCommand, FLOWBENCH_LAYOUT_VERSION,
    {
        major => FLOWBENCH_FIELD_MAJOR,
        minor => FLOWBENCH_FIELD_MINOR,
        revision => FLOWBENCH_FIELD_REVISION,
    }
);

impl fmt::Display for GetVersionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.revision())
    }
}

fixed_layout_response!(
    /// The reply to a [`GetFlowCommand`].
    GetFlowResponse, GetFlowCommand, FLOWBENCH_LAYOUT_FLOW,
    {
        /// Raw flow reading, 0-255. Conversion to CFM is up to the caller.
        flow => FLOWBENCH_FIELD_FLOW,
    }
);

fixed_layout_response!(
    /// The reply to a [`GetTemperatureCommand`].
    GetTemperatureResponse, GetTemperatureCommand, FLOWBENCH_LAYOUT_TEMPERATURE,
    {
        temperature => FLOWBENCH_FIELD_TEMPERATURE,
    }
);

fixed_layout_response!(
    /// The reply to a [`GetHumidityCommand`].
    GetHumidityResponse, GetHumidityCommand, FLOWBENCH_LAYOUT_HUMIDITY,
    {
        humidity => FLOWBENCH_FIELD_HUMIDITY,
    }
);

fixed_layout_response!(
    /// The reply to a [`GetReferencePressureCommand`].
    GetReferencePressureResponse, GetReferencePressureCommand, FLOWBENCH_LAYOUT_REFERENCE_PRESSURE,
    {
        reference_pressure => FLOWBENCH_FIELD_REFERENCE_PRESSURE,
    }
);

fixed_layout_response!(
    /// The reply to a [`GetBarometricPressureCommand`].
    GetBarometricPressureResponse, GetBarometricPressureCommand, FLOWBENCH_LAYOUT_BAROMETRIC_PRESSURE,
    {
        barometric_pressure => FLOWBENCH_FIELD_BAROMETRIC_PRESSURE,
    }
);

/// Any response variant, as returned by [`build_response`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypedResponse {
    Version(GetVersionResponse),
    Flow(GetFlowResponse),
    Temperature(GetTemperatureResponse),
    Humidity(GetHumidityResponse),
    ReferencePressure(GetReferencePressureResponse),
    BarometricPressure(GetBarometricPressureResponse),
}

impl TypedResponse {
    fn inner(&self) -> &FixedLayoutResponse {
        match self {
            TypedResponse::Version(r) => r.layout_response(),
            TypedResponse::Flow(r) => r.layout_response(),
            TypedResponse::Temperature(r) => r.layout_response(),
            TypedResponse::Humidity(r) => r.layout_response(),
            TypedResponse::ReferencePressure(r) => r.layout_response(),
            TypedResponse::BarometricPressure(r) => r.layout_response(),
        }
    }

    pub fn command(&self) -> Command {
        self.inner().command()
    }

    /// Identifier of the variant, equal to the answered command's identifier.
    pub fn identifier(&self) -> u8 {
        self.inner().layout().identifier
    }

    pub fn layout(&self) -> &'static ResponseLayout {
        self.inner().layout()
    }

    /// Reads a field by its layout name, e.g. `"flow"` or `"minor"`.
    pub fn field(&self, name: &str) -> Option<u32> {
        self.inner().field(name)
    }
}

fn build<R: FixedLayout>(command: Command, data: Vec<u8>) -> Result<R> {
    FixedLayoutResponse::with_layout(command, data, R::LAYOUT).and_then(R::from_layout_response)
}

/// Builds the response variant selected by the identifier in `data[0]`.
///
/// The failure bit is masked off for dispatch, so a failed reply still reaches the
/// variant's validation and comes back as [`Error::CommandFailed`].
pub fn build_response(command: Command, data: Vec<u8>) -> Result<TypedResponse> {
    let header = match data.first() {
        Some(&header) => header,
        None => return Err(Error::EmptyData),
    };
    let identifier = header & FLOWBENCH_RESP_IDENTIFIER_MASK;
    trace!(
        "Dispatching response with identifier '{}' for command '{}'",
        identifier as char,
        command
    );

    match identifier {
        FLOWBENCH_CMD_GET_VERSION => build(command, data).map(TypedResponse::Version),
        FLOWBENCH_CMD_GET_FLOW => build(command, data).map(TypedResponse::Flow),
        FLOWBENCH_CMD_GET_TEMPERATURE => build(command, data).map(TypedResponse::Temperature),
        FLOWBENCH_CMD_GET_HUMIDITY => build(command, data).map(TypedResponse::Humidity),
        FLOWBENCH_CMD_GET_REFERENCE_PRESSURE => {
            build(command, data).map(TypedResponse::ReferencePressure)
        }
        FLOWBENCH_CMD_GET_BAROMETRIC_PRESSURE => {
            build(command, data).map(TypedResponse::BarometricPressure)
        }
        _ => {
            warn!("No response variant for identifier {:02X}", identifier);
            Err(Error::UnsupportedIdentifier(identifier))
        }
    }
}
