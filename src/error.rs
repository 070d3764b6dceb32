use crate::framing::Vcid;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("Not enough bytes; got {actual}, need at least {minimum}")]
    NotEnoughData { actual: usize, minimum: usize },

    /// The transfer frame version number does not match the frame type.
    #[error("invalid transfer frame version; expected {expected}, got {actual}")]
    Version { expected: u8, actual: u8 },

    /// TC frame length field does not agree with the number of bytes provided.
    #[error("frame length field mismatch; header declares {declared} bytes, got {actual}")]
    FrameLength { declared: usize, actual: usize },

    /// Frame error control field did not match the computed CRC. Only produced when strict
    /// checking is configured.
    #[error("FECF mismatch; frame has {expected:#06x}, computed {computed:#06x}")]
    Fecf { expected: u16, computed: u16 },

    /// AOS frame header error control did not match. Only produced when strict checking is
    /// configured.
    #[error("FHEC mismatch")]
    Fhec,

    #[error("{name} pointer {value} outside of zone with length {zone_length}")]
    Pointer {
        name: &'static str,
        value: usize,
        zone_length: usize,
    },

    /// A builder setter received a value that does not fit the field.
    #[error("{field} value {value} out of range; max is {max}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("invalid length for {field}; expected {expected}, got {actual}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A builder was asked to build while user data space remains.
    #[error("frame not full; {free} bytes of user data remaining")]
    NotFull { free: usize },

    #[error("{0} declared present but never set")]
    FieldUnset(&'static str),

    /// An operation was attempted that is not supported by the frame's configured or
    /// encoded user data type.
    #[error("operation not supported by user data type: {0}")]
    UserDataType(String),

    #[error("cannot extract units from an idle frame")]
    IdleFrame,

    #[error("cannot extract bitstream data from a frame with the synchronization flag set")]
    SyncFlag,

    #[error("frame for vcid {actual} provided to virtual channel {expected}")]
    VcidMismatch { expected: Vcid, actual: Vcid },

    #[error("access mode {0} not supported for this frame type")]
    AccessMode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
