use crate::cmds::*;

/// A named value at a fixed position inside a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Accessor name of the field.
    pub name: &'static str,
    /// Byte offset from the start of the frame (the header is offset 0).
    pub offset: usize,
    /// Width in bytes, 1, 2 or 4. Multi-byte fields are little-endian.
    pub width: usize,
}

/// Fixed shape of the response to one command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLayout {
    /// Identifier of the header byte, failure bit clear.
    pub identifier: u8,
    /// Human readable variant name, used in logs.
    pub name: &'static str,
    /// Exact frame length: header, payload and checksum trailer.
    pub length: usize,
    /// Payload fields.
    pub fields: &'static [FieldDescriptor],
}

impl ResponseLayout {
    /// Looks a field up by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Frame length of a single-value reading: header, value, checksum.
pub const FLOWBENCH_RESP_READING_LEN: usize = 3;

/// Frame length of the version reply: header, major, minor, revision, checksum.
pub const FLOWBENCH_RESP_VERSION_LEN: usize = 5;

pub const FLOWBENCH_FIELD_MAJOR: FieldDescriptor = FieldDescriptor {
    name: "major",
    offset: 1,
    width: 1,
};

pub const FLOWBENCH_FIELD_MINOR: FieldDescriptor = FieldDescriptor {
    name: "minor",
    offset: 2,
    width: 1,
};

pub const FLOWBENCH_FIELD_REVISION: FieldDescriptor = FieldDescriptor {
    name: "revision",
    offset: 3,
    width: 1,
};

pub const FLOWBENCH_FIELD_FLOW: FieldDescriptor = FieldDescriptor {
    name: "flow",
    offset: 1,
    width: 1,
};

pub const FLOWBENCH_FIELD_TEMPERATURE: FieldDescriptor = FieldDescriptor {
    name: "temperature",
    offset: 1,
    width: 1,
};

pub const FLOWBENCH_FIELD_HUMIDITY: FieldDescriptor = FieldDescriptor {
    name: "humidity",
    offset: 1,
    width: 1,
};

pub const FLOWBENCH_FIELD_REFERENCE_PRESSURE: FieldDescriptor = FieldDescriptor {
    name: "reference_pressure",
    offset: 1,
    width: 1,
};

pub const FLOWBENCH_FIELD_BAROMETRIC_PRESSURE: FieldDescriptor = FieldDescriptor {
    name: "barometric_pressure",
    offset: 1,
    width: 1,
};

pub const FLOWBENCH_LAYOUT_VERSION: ResponseLayout = ResponseLayout {
    identifier: FLOWBENCH_CMD_GET_VERSION,
    name: "GetVersionResponse",
    length: FLOWBENCH_RESP_VERSION_LEN,
    fields: &[
        FLOWBENCH_FIELD_MAJOR,
        FLOWBENCH_FIELD_MINOR,
        FLOWBENCH_FIELD_REVISION,
    ],
};

pub const FLOWBENCH_LAYOUT_FLOW: ResponseLayout = ResponseLayout {
    identifier: FLOWBENCH_CMD_GET_FLOW,
    name: "GetFlowResponse",
    length: FLOWBENCH_RESP_READING_LEN,
    fields: &[FLOWBENCH_FIELD_FLOW],
};

pub const FLOWBENCH_LAYOUT_TEMPERATURE: ResponseLayout = ResponseLayout {
    identifier: FLOWBENCH_CMD_GET_TEMPERATURE,
    name: "GetTemperatureResponse",
    length: FLOWBENCH_RESP_READING_LEN,
    fields: &[FLOWBENCH_FIELD_TEMPERATURE],
};

pub const FLOWBENCH_LAYOUT_HUMIDITY: ResponseLayout = ResponseLayout {
    identifier: FLOWBENCH_CMD_GET_HUMIDITY,
    name: "GetHumidityResponse",
    length: FLOWBENCH_RESP_READING_LEN,
    fields: &[FLOWBENCH_FIELD_HUMIDITY],
};

pub const FLOWBENCH_LAYOUT_REFERENCE_PRESSURE: ResponseLayout = ResponseLayout {
    identifier: FLOWBENCH_CMD_GET_REFERENCE_PRESSURE,
    name: "GetReferencePressureResponse",
    length: FLOWBENCH_RESP_READING_LEN,
    fields: &[FLOWBENCH_FIELD_REFERENCE_PRESSURE],
};

pub const FLOWBENCH_LAYOUT_BAROMETRIC_PRESSURE: ResponseLayout = ResponseLayout {
    identifier: FLOWBENCH_CMD_GET_BAROMETRIC_PRESSURE,
    name: "GetBarometricPressureResponse",
    length: FLOWBENCH_RESP_READING_LEN,
    fields: &[FLOWBENCH_FIELD_BAROMETRIC_PRESSURE],
};

/// All known layouts, in the order of [`SUPPORTED_IDENTIFIERS`].
pub static FLOWBENCH_RESPONSE_LAYOUTS: [&ResponseLayout; 6] = [
    &FLOWBENCH_LAYOUT_VERSION,
    &FLOWBENCH_LAYOUT_FLOW,
    &FLOWBENCH_LAYOUT_TEMPERATURE,
    &FLOWBENCH_LAYOUT_HUMIDITY,
    &FLOWBENCH_LAYOUT_REFERENCE_PRESSURE,
    &FLOWBENCH_LAYOUT_BAROMETRIC_PRESSURE,
];

/// Layout of the response carrying `identifier` (failure bit already masked off).
pub fn layout_for(identifier: u8) -> Option<&'static ResponseLayout> {
    FLOWBENCH_RESPONSE_LAYOUTS
        .iter()
        .copied()
        .find(|layout| layout.identifier == identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_identifier_has_a_layout() {
        for id in SUPPORTED_IDENTIFIERS {
            let layout = layout_for(id).unwrap();
            assert_eq!(layout.identifier, id);
        }
        assert!(layout_for(b'~').is_none());
    }

    #[test]
    fn fields_fit_between_header_and_trailer() {
        for layout in FLOWBENCH_RESPONSE_LAYOUTS {
            for field in layout.fields {
                assert!(field.offset >= 1);
                assert!(field.offset + field.width < layout.length, "{}", layout.name);
            }
        }
    }

    #[test]
    fn field_lookup_by_name() {
        let minor = FLOWBENCH_LAYOUT_VERSION.field("minor").unwrap();
        assert_eq!(minor.offset, 2);
        assert!(FLOWBENCH_LAYOUT_FLOW.field("minor").is_none());
    }
}
