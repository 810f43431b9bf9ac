//! # Flow Bench API
//!
//! `flowbench` is the host-side binding for the DIY flow bench controller. It covers the
//! command/response protocol: single-byte command identifiers going out, and replies
//! framed as `[header][payload...][checksum]` coming back, where the header echoes the
//! command identifier (bit 7 set on failure) and the checksum is the sum of all
//! preceding bytes modulo 256.
//!
//! The protocol types ([`Command`], [`Response`], [`build_response`] and the typed
//! variants) are pure values with no I/O. [`FlowBench`] drives them over any
//! `Read + Write` stream such as a serial port.

extern crate byteorder;
extern crate log;

mod answers;
pub mod base;
mod checksum;
mod cmds;
mod command;
mod internals;
mod protocol;
mod response;

pub use crate::answers::{layout_for, FieldDescriptor, ResponseLayout};
pub use crate::base::{Channel, Error, Message, Result};
pub use crate::checksum::{append_checksum, compute_checksum, validate_checksum, Checksum};
pub use crate::cmds::{
    FLOWBENCH_CMD_GET_BAROMETRIC_PRESSURE, FLOWBENCH_CMD_GET_FLOW, FLOWBENCH_CMD_GET_HUMIDITY,
    FLOWBENCH_CMD_GET_REFERENCE_PRESSURE, FLOWBENCH_CMD_GET_TEMPERATURE,
    FLOWBENCH_CMD_GET_VERSION, SUPPORTED_IDENTIFIERS,
};
pub use crate::command::{
    Command, GetBarometricPressureCommand, GetFlowCommand, GetHumidityCommand,
    GetReferencePressureCommand, GetTemperatureCommand, GetVersionCommand, TypedCommand,
};
pub use crate::internals::FLOWBENCH_DEFAULT_TIMEOUT;
pub use crate::protocol::FlowBenchHostProtocol;
pub use crate::response::{
    build_response, FixedLayout, FixedLayoutResponse, GetBarometricPressureResponse,
    GetFlowResponse, GetHumidityResponse, GetReferencePressureResponse, GetTemperatureResponse,
    GetVersionResponse, Response, TypedResponse,
};

use log::{error, trace, warn};
use std::io::{Read, Write};
use std::time::Duration;

/// A connection to a flow bench controller.
///
/// Each request writes one command identifier and waits for the matching frame,
/// which is validated into a typed response. Protocol errors reset the channel so
/// the next request starts on a frame boundary.
#[derive(Debug)]
pub struct FlowBench<T: ?Sized> {
    channel: Channel<FlowBenchHostProtocol, T>,
    timeout: Duration,
}

impl<T: ?Sized> FlowBench<T>
where
    T: Read + Write,
{
    /// Constructs a new `FlowBench` using an existing `Channel`.
    ///
    /// # Example
    /// ```ignore
    /// let serial_port = serialport::new("/dev/ttyUSB0", 115200)
    ///     .timeout(Duration::from_millis(5))
    ///     .open()?;
    /// let channel = Channel::new(FlowBenchHostProtocol::new(), serial_port);
    /// let mut bench = FlowBench::new(channel);
    /// println!("firmware {}", bench.get_version()?);
    /// ```
    pub fn new(channel: Channel<FlowBenchHostProtocol, T>) -> FlowBench<T> {
        trace!("Creating new FlowBench");
        FlowBench {
            channel,
            timeout: FLOWBENCH_DEFAULT_TIMEOUT,
        }
    }

    /// Constructs a new `FlowBench` directly from a communication stream (e.g., a serial port).
    pub fn with_stream(stream: Box<T>) -> FlowBench<T> {
        FlowBench::new(Channel::new(FlowBenchHostProtocol::new(), stream))
    }

    /// Replaces the response timeout used by the request methods.
    pub fn with_timeout(mut self, timeout: Duration) -> FlowBench<T> {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `command` and waits up to `timeout` for the raw reply frame.
    fn exchange(&mut self, command: Command, timeout: Duration) -> Result<Vec<u8>> {
        trace!("Invoking command '{}' with timeout {:?}", command, timeout);
        match self.channel.invoke(&Message::new(command.identifier()), timeout) {
            Ok(msg) => Ok(msg.data),
            Err(e) => {
                error!("Error invoking command '{}': {:?}", command, e);
                self.channel.reset();
                Err(e)
            }
        }
    }

    /// A failed command is a well-formed frame; anything else leaves the stream in doubt.
    fn checked<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            if !matches!(e, Error::CommandFailed { .. }) {
                warn!("Invalid response ({}), resetting channel", e);
                self.channel.reset();
            }
        }
        result
    }

    /// Sends a typed command and returns its typed response.
    pub fn request<C: TypedCommand>(&mut self, command: C) -> Result<C::Response> {
        self.request_with_timeout(command, self.timeout)
    }

    /// Sends a typed command with a specified timeout.
    pub fn request_with_timeout<C: TypedCommand>(
        &mut self,
        command: C,
        timeout: Duration,
    ) -> Result<C::Response> {
        let data = self.exchange(command.into(), timeout)?;
        let result = <C::Response as FixedLayout>::parse(command, data);
        self.checked(result)
    }

    /// Sends any command and returns whichever variant its reply decodes to.
    pub fn invoke(&mut self, command: Command) -> Result<TypedResponse> {
        let data = self.exchange(command, self.timeout)?;
        let result = build_response(command, data);
        self.checked(result)
    }

    /// Gets the controller firmware version.
    pub fn get_version(&mut self) -> Result<GetVersionResponse> {
        self.request(GetVersionCommand)
    }

    /// Gets the raw flow reading.
    pub fn get_flow(&mut self) -> Result<GetFlowResponse> {
        self.request(GetFlowCommand)
    }

    pub fn get_temperature(&mut self) -> Result<GetTemperatureResponse> {
        self.request(GetTemperatureCommand)
    }

    pub fn get_humidity(&mut self) -> Result<GetHumidityResponse> {
        self.request(GetHumidityCommand)
    }

    pub fn get_reference_pressure(&mut self) -> Result<GetReferencePressureResponse> {
        self.request(GetReferencePressureCommand)
    }

    pub fn get_barometric_pressure(&mut self) -> Result<GetBarometricPressureResponse> {
        self.request(GetBarometricPressureCommand)
    }
}
