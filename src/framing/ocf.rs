#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Vcid;
use crate::{Error, Result};

/// Length of the Operational Control Field in bytes.
pub const OCF_LEN: usize = 4;

/// Communications Link Control Word carried in the Operational Control Field of TM and AOS
/// frames as a type-1 report.
///
/// See CCSDS 232.0-B, section 4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Clcw {
    pub version: u8,
    pub status_field: u8,
    pub cop_in_effect: u8,
    pub vcid: Vcid,
    pub no_rf_available: bool,
    pub no_bit_lock: bool,
    pub lockout: bool,
    pub wait: bool,
    pub retransmit: bool,
    pub farm_b_counter: u8,
    pub report_type: bool,
    pub report_value: u8,
}

impl Clcw {
    /// Decode from an OCF. Returns `None` if there are not enough bytes or if the control word
    /// type bit indicates a type-2 report, which is not a CLCW.
    #[must_use]
    pub fn decode(ocf: &[u8]) -> Option<Self> {
        if ocf.len() < OCF_LEN || ocf[0] & 0x80 != 0 {
            return None;
        }
        Some(Clcw {
            version: (ocf[0] >> 5) & 0x3,
            status_field: (ocf[0] >> 2) & 0x7,
            cop_in_effect: ocf[0] & 0x3,
            vcid: Vcid::from(ocf[1] >> 2),
            no_rf_available: ocf[2] & 0x80 != 0,
            no_bit_lock: ocf[2] & 0x40 != 0,
            lockout: ocf[2] & 0x20 != 0,
            wait: ocf[2] & 0x10 != 0,
            retransmit: ocf[2] & 0x08 != 0,
            farm_b_counter: (ocf[2] >> 1) & 0x3,
            report_type: ocf[2] & 0x01 != 0,
            report_value: ocf[3],
        })
    }

    /// Encode into OCF bytes.
    ///
    /// # Errors
    /// [Error::OutOfRange] if any field does not fit in its bit width.
    pub fn encode(&self) -> Result<[u8; OCF_LEN]> {
        check_range("clcw version", self.version.into(), 0x3)?;
        check_range("clcw status field", self.status_field.into(), 0x7)?;
        check_range("clcw cop in effect", self.cop_in_effect.into(), 0x3)?;
        check_range("clcw vcid", self.vcid.into(), 0x3f)?;
        check_range("clcw farm-b counter", self.farm_b_counter.into(), 0x3)?;

        let flags = (u8::from(self.no_rf_available) << 7)
            | (u8::from(self.no_bit_lock) << 6)
            | (u8::from(self.lockout) << 5)
            | (u8::from(self.wait) << 4)
            | (u8::from(self.retransmit) << 3)
            | (self.farm_b_counter << 1)
            | u8::from(self.report_type);
        #[allow(clippy::cast_possible_truncation)]
        let vcid = self.vcid as u8;
        Ok([
            (self.version << 5) | (self.status_field << 2) | self.cop_in_effect,
            vcid << 2,
            flags,
            self.report_value,
        ])
    }
}

pub(crate) fn check_range(field: &'static str, value: usize, max: usize) -> Result<()> {
    if value > max {
        return Err(Error::OutOfRange { field, value, max });
    }
    Ok(())
}
