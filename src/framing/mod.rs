//! CCSDS Transfer Frame encoding and decoding.
//!
//! Supports the TM (132.0-B), AOS (732.0-B) and TC (232.0-B) Space Data Link Protocol frame
//! formats. Each frame type is decoded from bytes along with the out-of-band configuration
//! that cannot be recovered from the bytes alone, e.g., whether a FECF is present. Frames may
//! be built from their fields using the corresponding builder.
//!
//! References:
//! * [TM Space Data Link Protocol](https://public.ccsds.org/Pubs/132x0b3.pdf)
//! * [AOS Space Data Link Protocol](https://public.ccsds.org/Pubs/732x0b4.pdf)
//! * [TC Space Data Link Protocol](https://public.ccsds.org/Pubs/232x0b4e1c1.pdf)
pub mod aos;
mod integrity;
mod ocf;
pub mod tc;
pub mod tm;

pub use aos::{AosConfig, AosFrame, AosFrameBuilder, AosHeader, UserDataType};
pub use integrity::*;
pub use ocf::{Clcw, OCF_LEN};
pub use tc::{
    ControlCommand, SegmentHeader, SequenceFlag, TcConfig, TcFrame, TcFrameBuilder, TcFrameType,
    TcHeader,
};
pub use tm::{TmConfig, TmFrame, TmFrameBuilder, TmHeader};

pub(crate) use ocf::check_range;

use crate::{Error, Result};

pub type Scid = u16;
pub type Vcid = u16;

/// Calculate the number of missing frame counts between the `expected` and `received` counts
/// for a counter that wraps at `modulus`.
///
/// This is the forward distance from `expected` to `received`, so a counter that appears to go
/// backwards is treated as having wrapped.
#[must_use]
pub fn missing_frames(expected: u32, received: u32, modulus: u32) -> u32 {
    let expected = expected % modulus;
    let received = received % modulus;
    if received >= expected {
        received - expected
    } else {
        modulus - expected + received
    }
}

/// A decoded transfer frame of any supported type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFrame {
    Tm(TmFrame),
    Aos(AosFrame),
    Tc(TcFrame),
}

impl TransferFrame {
    #[must_use]
    pub fn scid(&self) -> Scid {
        match self {
            Self::Tm(f) => f.header().scid,
            Self::Aos(f) => f.header().scid,
            Self::Tc(f) => f.header().scid,
        }
    }

    #[must_use]
    pub fn vcid(&self) -> Vcid {
        match self {
            Self::Tm(f) => f.header().vcid,
            Self::Aos(f) => f.header().vcid,
            Self::Tc(f) => f.header().vcid,
        }
    }

    #[must_use]
    pub fn vc_frame_count(&self) -> u32 {
        match self {
            Self::Tm(f) => f.header().vc_frame_count.into(),
            Self::Aos(f) => f.header().vc_frame_count,
            Self::Tc(f) => f.header().frame_seq_num.into(),
        }
    }

    /// All frame bytes, including headers and trailers.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Tm(f) => f.data(),
            Self::Aos(f) => f.data(),
            Self::Tc(f) => f.data(),
        }
    }

    #[must_use]
    pub fn data_field(&self) -> &[u8] {
        match self {
            Self::Tm(f) => f.data_field(),
            Self::Aos(f) => f.data_field(),
            Self::Tc(f) => f.data_field(),
        }
    }

    /// Operational control field, if present. TC frames never have one.
    #[must_use]
    pub fn ocf(&self) -> Option<&[u8]> {
        match self {
            Self::Tm(f) => f.ocf(),
            Self::Aos(f) => f.ocf(),
            Self::Tc(_) => None,
        }
    }

    /// See the frame type specific `is_valid`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Tm(f) => f.is_valid(),
            Self::Aos(f) => f.is_valid(),
            Self::Tc(f) => f.is_valid(),
        }
    }

    /// True if the frame carries no user data. TC control command frames count as idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        match self {
            Self::Tm(f) => f.is_idle(),
            Self::Aos(f) => f.is_idle(),
            Self::Tc(f) => f.frame_type() == TcFrameType::Bc,
        }
    }
}

impl From<TmFrame> for TransferFrame {
    fn from(frame: TmFrame) -> Self {
        Self::Tm(frame)
    }
}

impl From<AosFrame> for TransferFrame {
    fn from(frame: AosFrame) -> Self {
        Self::Aos(frame)
    }
}

impl From<TcFrame> for TransferFrame {
    fn from(frame: TcFrame) -> Self {
        Self::Tc(frame)
    }
}

/// Byte offsets of the variable position fields common to all frame types.
///
/// Frames are laid out as: primary header and type specific header fields, security header,
/// data field, security trailer, OCF, FECF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Zones {
    pub security_header_start: usize,
    pub data_field_start: usize,
    pub data_field_end: usize,
    pub security_trailer_end: usize,
    pub ocf_start: Option<usize>,
    pub fecf_present: bool,
}

impl Zones {
    /// Compute zones for a frame of `len` bytes whose type specific header fields end at
    /// `header_end`.
    pub fn compute(
        len: usize,
        header_end: usize,
        security_header_length: usize,
        security_trailer_length: usize,
        ocf_present: bool,
        fecf_present: bool,
    ) -> Result<Self> {
        let ocf_len = if ocf_present { OCF_LEN } else { 0 };
        let fecf_len = if fecf_present { FECF_LEN } else { 0 };
        let data_field_start = header_end + security_header_length;
        let trailer_len = security_trailer_length + ocf_len + fecf_len;
        if len < data_field_start + trailer_len {
            return Err(Error::NotEnoughData {
                actual: len,
                minimum: data_field_start + trailer_len,
            });
        }
        let data_field_end = len - trailer_len;
        Ok(Zones {
            security_header_start: header_end,
            data_field_start,
            data_field_end,
            security_trailer_end: data_field_end + security_trailer_length,
            ocf_start: ocf_present.then_some(data_field_end + security_trailer_length),
            fecf_present,
        })
    }

    pub fn data_field<'a>(&self, dat: &'a [u8]) -> &'a [u8] {
        &dat[self.data_field_start..self.data_field_end]
    }

    pub fn security_header<'a>(&self, dat: &'a [u8]) -> &'a [u8] {
        &dat[self.security_header_start..self.data_field_start]
    }

    pub fn security_trailer<'a>(&self, dat: &'a [u8]) -> &'a [u8] {
        &dat[self.data_field_end..self.security_trailer_end]
    }

    pub fn ocf<'a>(&self, dat: &'a [u8]) -> Option<&'a [u8]> {
        self.ocf_start.map(|start| &dat[start..start + OCF_LEN])
    }

    pub fn fecf(&self, dat: &[u8]) -> Option<u16> {
        if self.fecf_present {
            let n = dat.len();
            Some(u16::from_be_bytes([dat[n - 2], dat[n - 1]]))
        } else {
            None
        }
    }

    /// Check the FECF, if present. Frames without a FECF are always valid.
    ///
    /// # Errors
    /// [Error::Fecf] if `strict` and the FECF does not match.
    pub fn check_fecf(&self, dat: &[u8], strict: bool) -> Result<bool> {
        let Some(expected) = self.fecf(dat) else {
            return Ok(true);
        };
        let computed = crc16(&dat[..dat.len() - FECF_LEN]);
        if expected != computed && strict {
            return Err(Error::Fecf { expected, computed });
        }
        Ok(expected == computed)
    }
}

/// Shared state for building the user data portion of a frame.
///
/// Tracks the free user data length, which is consumed as data is added, and the optional
/// fields that were declared present and must be set before a frame can be built.
#[derive(Debug, Clone)]
pub(crate) struct FrameStaging {
    pub buf: Vec<u8>,
    pub zones: Zones,
    // first byte available for user data; after any pointer fields
    user_data_start: usize,
    written: usize,
    ocf_set: bool,
    security_header_set: bool,
    security_trailer_set: bool,
}

impl FrameStaging {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        len: usize,
        header_end: usize,
        security_header_length: usize,
        security_trailer_length: usize,
        ocf_present: bool,
        fecf_present: bool,
        pointer_len: usize,
    ) -> Result<Self> {
        let zones = Zones::compute(
            len,
            header_end,
            security_header_length,
            security_trailer_length,
            ocf_present,
            fecf_present,
        )?;
        let user_data_start = zones.data_field_start + pointer_len;
        if user_data_start > zones.data_field_end {
            return Err(Error::NotEnoughData {
                actual: len,
                minimum: len + user_data_start - zones.data_field_end,
            });
        }
        Ok(FrameStaging {
            buf: vec![0u8; len],
            zones,
            user_data_start,
            written: 0,
            ocf_set: !ocf_present,
            security_header_set: security_header_length == 0,
            security_trailer_set: security_trailer_length == 0,
        })
    }

    pub fn free_user_data_length(&self) -> usize {
        self.zones.data_field_end - self.user_data_start - self.written
    }

    /// Copy as much of `dat` as fits, returning the number of bytes that did not fit.
    pub fn add_data(&mut self, dat: &[u8]) -> usize {
        let num = self.free_user_data_length().min(dat.len());
        let start = self.user_data_start + self.written;
        self.buf[start..start + num].copy_from_slice(&dat[..num]);
        self.written += num;
        dat.len() - num
    }

    pub fn set_security_header(&mut self, dat: &[u8]) -> Result<()> {
        let expected = self.zones.data_field_start - self.zones.security_header_start;
        check_field_len("security header", expected, dat.len())?;
        self.buf[self.zones.security_header_start..self.zones.data_field_start].copy_from_slice(dat);
        self.security_header_set = true;
        Ok(())
    }

    pub fn set_security_trailer(&mut self, dat: &[u8]) -> Result<()> {
        let (start, end) = (self.zones.data_field_end, self.zones.security_trailer_end);
        check_field_len("security trailer", end - start, dat.len())?;
        self.buf[start..end].copy_from_slice(dat);
        self.security_trailer_set = true;
        Ok(())
    }

    pub fn set_ocf(&mut self, dat: &[u8]) -> Result<()> {
        let Some(start) = self.zones.ocf_start else {
            return Err(Error::FieldLength {
                field: "ocf",
                expected: 0,
                actual: dat.len(),
            });
        };
        check_field_len("ocf", OCF_LEN, dat.len())?;
        self.buf[start..start + OCF_LEN].copy_from_slice(dat);
        self.ocf_set = true;
        Ok(())
    }

    /// Verify the user data is full and that all declared optional fields were set.
    pub fn check_complete(&self) -> Result<()> {
        let free = self.free_user_data_length();
        if free != 0 {
            return Err(Error::NotFull { free });
        }
        if !self.security_header_set {
            return Err(Error::FieldUnset("security header"));
        }
        if !self.security_trailer_set {
            return Err(Error::FieldUnset("security trailer"));
        }
        if !self.ocf_set {
            return Err(Error::FieldUnset("ocf"));
        }
        Ok(())
    }

    /// Compute the FECF, if present, over the fully populated frame and return the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.zones.fecf_present {
            let n = self.buf.len();
            let crc = crc16(&self.buf[..n - FECF_LEN]);
            self.buf[n - FECF_LEN..].copy_from_slice(&crc.to_be_bytes());
        }
        self.buf
    }
}

pub(crate) fn check_field_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::FieldLength {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Check the version number in the first 2 bits of a frame, which must be done before any
/// other fields are read.
pub(crate) fn check_version(dat: &[u8], expected: u8, minimum: usize) -> Result<()> {
    let Some(first) = dat.first() else {
        return Err(Error::NotEnoughData { actual: 0, minimum });
    };
    let actual = first >> 6;
    if actual != expected {
        return Err(Error::Version { expected, actual });
    }
    if dat.len() < minimum {
        return Err(Error::NotEnoughData {
            actual: dat.len(),
            minimum,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_frames() {
        assert_eq!(missing_frames(5, 5, 256), 0);
        assert_eq!(missing_frames(2, 3, 256), 1);
        assert_eq!(missing_frames(255, 0, 256), 1);
        assert_eq!(missing_frames(0, 255, 256), 255);
        assert_eq!(missing_frames(0xff_fffe, 1, 0x100_0000), 3);
    }

    #[test]
    fn test_zones() {
        let zones = Zones::compute(20, 6, 2, 1, true, true).unwrap();
        assert_eq!(zones.security_header_start, 6);
        assert_eq!(zones.data_field_start, 8);
        assert_eq!(zones.data_field_end, 13);
        assert_eq!(zones.security_trailer_end, 14);
        assert_eq!(zones.ocf_start, Some(14));
    }

    #[test]
    fn test_zones_too_short() {
        let zult = Zones::compute(10, 6, 0, 0, true, true);
        assert_eq!(
            zult,
            Err(Error::NotEnoughData {
                actual: 10,
                minimum: 12
            })
        );
    }

    #[test]
    fn test_check_version_first() {
        // version checked even when there are not enough bytes for anything else
        assert_eq!(
            check_version(&[0x40], 0, 6),
            Err(Error::Version {
                expected: 0,
                actual: 1
            })
        );
        assert_eq!(
            check_version(&[0x00], 0, 6),
            Err(Error::NotEnoughData {
                actual: 1,
                minimum: 6
            })
        );
    }
}
