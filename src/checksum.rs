/// Additive checksum used as the trailer of multi-byte controller responses.
///
/// Every byte is added with wrap-around, so the result is the sum modulo 256.
pub struct Checksum {
    current: u8,
}

impl Checksum {
    /// Creates a new `Checksum` instance, initialized to 0.
    #[inline]
    pub fn new() -> Checksum {
        Checksum { current: 0 }
    }

    /// Adds one byte to the running sum.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.current = self.current.wrapping_add(byte);
    }

    /// Adds a slice of bytes to the running sum.
    #[inline]
    pub fn push_slice(&mut self, data: &[u8]) {
        for &d in data {
            self.push(d);
        }
    }

    /// Returns the calculated checksum value.
    #[inline]
    pub fn checksum(&self) -> u8 {
        self.current
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum of all bytes modulo 256. The checksum of an empty slice is 0.
pub fn compute_checksum(bytes: &[u8]) -> u8 {
    let mut checksum = Checksum::new();
    checksum.push_slice(bytes);
    checksum.checksum()
}

/// Returns a copy of `bytes` with its checksum appended.
pub fn append_checksum(bytes: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(bytes.len() + 1);
    framed.extend_from_slice(bytes);
    framed.push(compute_checksum(bytes));
    framed
}

/// Checks that the last byte of `bytes` is the checksum of everything before it.
///
/// An empty slice has no trailer and never validates.
pub fn validate_checksum(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        Some((&trailer, body)) => compute_checksum(body) == trailer,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_prefix_sums_to_zero() {
        assert_eq!(compute_checksum(&[]), 0);
    }

    #[test]
    fn sum_wraps_at_256() {
        assert_eq!(compute_checksum(&[0x56, 0x01, 0x02, 0x03]), 0x5C);
        assert_eq!(compute_checksum(&[0xFF, 0x01]), 0x00);
        assert_eq!(compute_checksum(&[0xFF, 0xFF]), 0xFE);
    }

    #[test]
    fn append_keeps_input_and_adds_trailer() {
        assert_eq!(append_checksum(&[0x46, 0x01]), vec![0x46, 0x01, 0x47]);
    }

    #[test]
    fn validate_detects_corruption() {
        assert!(validate_checksum(&[0x46, 0x01, 0x47]));
        assert!(!validate_checksum(&[0x46, 0x02, 0x47]));
        assert!(!validate_checksum(&[]));
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut checksum = Checksum::default();
        checksum.push(0x42);
        checksum.push_slice(&[0xC8, 0x10]);
        assert_eq!(checksum.checksum(), compute_checksum(&[0x42, 0xC8, 0x10]));
    }

    proptest! {
        #[test]
        fn appended_checksum_always_validates(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
            prop_assert!(validate_checksum(&append_checksum(&bytes)));
        }
    }
}
