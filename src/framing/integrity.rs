//! Frame checksum algorithms.
use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16/CCITT-FALSE used for the Frame Error Control Field of all frame types.
pub const FECF_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Length of the Frame Error Control Field in bytes.
pub const FECF_LEN: usize = 2;
/// Length of the AOS Frame Header Error Control field in bytes.
pub const FHEC_LEN: usize = 2;

/// Compute the FECF CRC over `dat`.
#[must_use]
pub fn crc16(dat: &[u8]) -> u16 {
    FECF_CRC.checksum(dat)
}

/// Return true if the last [FECF_LEN] bytes of `frame` hold the CRC of the bytes preceding them.
#[must_use]
pub fn fecf_valid(frame: &[u8]) -> bool {
    if frame.len() < FECF_LEN {
        return false;
    }
    let (dat, fecf) = frame.split_at(frame.len() - FECF_LEN);
    crc16(dat) == u16::from_be_bytes([fecf[0], fecf[1]])
}

// GF(16) with field polynomial x^4 + x + 1, alpha = 2.
const GF16_EXP: [u8; 15] = [1, 2, 4, 8, 3, 6, 12, 11, 5, 10, 7, 14, 15, 13, 9];
const GF16_LOG: [u8; 16] = [0, 0, 1, 4, 2, 8, 5, 10, 3, 14, 9, 7, 6, 13, 11, 12];

/// Generator coefficients below the leading term, highest degree first, of
/// g(x) = (x + a^6)(x + a^7)(x + a^8)(x + a^9) = x^4 + a^3 x^3 + a x^2 + a^3 x + 1.
const FHEC_GENERATOR: [u8; 4] = [8, 2, 8, 1];

fn gf16_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let idx = (GF16_LOG[a as usize] as usize + GF16_LOG[b as usize] as usize) % 15;
    GF16_EXP[idx]
}

/// Compute the 2-byte AOS Frame Header Error Control using RS(10,6) over GF(16).
///
/// The information symbols are the six nibbles of the master channel id, virtual channel id
/// and signaling field, i.e., header bytes 0, 1 and 5. The frame count is not protected.
///
/// ## Panics
/// If `header` is shorter than the 6 byte AOS primary header.
#[must_use]
pub fn fhec(header: &[u8]) -> [u8; FHEC_LEN] {
    assert!(header.len() >= 6, "aos primary header too short");
    let symbols = [
        header[0] >> 4,
        header[0] & 0xf,
        header[1] >> 4,
        header[1] & 0xf,
        header[5] >> 4,
        header[5] & 0xf,
    ];

    // Systematic encoding: remainder of m(x) * x^4 mod g(x) using an LFSR
    let mut parity = [0u8; 4];
    for sym in symbols {
        let feedback = sym ^ parity[0];
        parity.rotate_left(1);
        parity[3] = 0;
        for (p, g) in parity.iter_mut().zip(FHEC_GENERATOR) {
            *p ^= gf16_mul(feedback, g);
        }
    }

    [(parity[0] << 4) | parity[1], (parity[2] << 4) | parity[3]]
}

/// Return true if `check` matches the FHEC computed for `header`.
#[must_use]
pub fn fhec_valid(header: &[u8], check: &[u8]) -> bool {
    check.len() == FHEC_LEN && fhec(header)[..] == check[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_check_value() {
        assert_eq!(crc16(b"123456789"), 0x29b1);
    }

    #[test]
    fn test_fecf_valid() {
        let mut dat = b"123456789".to_vec();
        dat.extend_from_slice(&[0x29, 0xb1]);
        assert!(fecf_valid(&dat));

        dat[0] = b'0';
        assert!(!fecf_valid(&dat));
        assert!(!fecf_valid(&[0x29]));
    }

    #[test]
    fn test_gf16_tables() {
        for (i, e) in GF16_EXP.iter().enumerate() {
            assert_eq!(GF16_LOG[*e as usize] as usize, i);
        }
        // a^14 * a = a^15 = 1
        assert_eq!(gf16_mul(9, 2), 1);
    }

    #[test]
    fn test_fhec() {
        let header = [0x55, 0x61, 0x01, 0xe2, 0x40, 0x05];
        assert_eq!(fhec(&header), [0xac, 0xce]);

        let header = [0x40, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(fhec(&header), [0x1c, 0xc1]);
    }

    #[test]
    fn test_fhec_ignores_frame_count() {
        let a = [0x55, 0x61, 0x01, 0xe2, 0x40, 0x05];
        let b = [0x55, 0x61, 0xff, 0x00, 0x12, 0x05];
        assert_eq!(fhec(&a), fhec(&b));
        assert!(fhec_valid(&b, &[0xac, 0xce]));
        assert!(!fhec_valid(&b, &[0xac, 0xcf]));
    }
}
