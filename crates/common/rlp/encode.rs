use bytes::Bytes;
use ethereum_types::{Address, Bloom, H256, U256};

use super::constants::RLP_NULL;

/// Encode a value to a fresh RLP buffer.
/// For encoding into an existing buffer, use [`RLPEncode::encode`].
pub fn encode<T: RLPEncode>(value: T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

pub trait RLPEncode {
    fn encode(&self, buf: &mut Vec<u8>);

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// Writes the length prefix of an RLP list with the given payload length.
pub fn encode_length(payload_len: usize, buf: &mut Vec<u8>) {
    if payload_len < 56 {
        buf.push(0xc0 + payload_len as u8);
    } else {
        let be_len = payload_len.to_be_bytes();
        let start = be_len.iter().position(|&b| b != 0).unwrap_or(0);
        buf.push(0xf7 + (be_len.len() - start) as u8);
        buf.extend_from_slice(&be_len[start..]);
    }
}

fn encode_integer_be(value_be: &[u8], buf: &mut Vec<u8>) {
    let start = value_be.iter().position(|&b| b != 0);
    match start {
        // zero encodes as the empty string
        None => buf.push(RLP_NULL),
        Some(i) => {
            let significant = &value_be[i..];
            if significant.len() == 1 && significant[0] <= 0x7f {
                buf.push(significant[0]);
            } else {
                buf.push(RLP_NULL + significant.len() as u8);
                buf.extend_from_slice(significant);
            }
        }
    }
}

impl RLPEncode for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(if *self { 0x01 } else { RLP_NULL });
    }
}

impl RLPEncode for u8 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_integer_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for u16 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_integer_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for u32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_integer_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for u64 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_integer_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for usize {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_integer_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for u128 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_integer_be(&self.to_be_bytes(), buf);
    }
}

impl RLPEncode for [u8] {
    fn encode(&self, buf: &mut Vec<u8>) {
        if self.len() == 1 && self[0] < RLP_NULL {
            buf.push(self[0]);
        } else if self.len() < 56 {
            buf.push(RLP_NULL + self.len() as u8);
            buf.extend_from_slice(self);
        } else {
            let be_len = self.len().to_be_bytes();
            let start = be_len.iter().position(|&b| b != 0).unwrap_or(0);
            buf.push(0xb7 + (be_len.len() - start) as u8);
            buf.extend_from_slice(&be_len[start..]);
            buf.extend_from_slice(self);
        }
    }
}

impl<const N: usize> RLPEncode for [u8; N] {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_slice().encode(buf);
    }
}

impl RLPEncode for Bytes {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_ref().encode(buf);
    }
}

impl RLPEncode for str {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_bytes().encode(buf);
    }
}

impl RLPEncode for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_bytes().encode(buf);
    }
}

impl RLPEncode for U256 {
    fn encode(&self, buf: &mut Vec<u8>) {
        let be: [u8; 32] = self.to_big_endian();
        encode_integer_be(&be, buf);
    }
}

impl RLPEncode for H256 {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_bytes().encode(buf);
    }
}

impl RLPEncode for Address {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_bytes().encode(buf);
    }
}

impl RLPEncode for Bloom {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_bytes().encode(buf);
    }
}

// A Vec<T> encodes as a list of its elements. Byte strings must go through
// the `Bytes` / `[u8]` impls (or `Encoder::encode_bytes`) instead, since a
// `Vec<u8>` would otherwise encode as a list of integers.
impl<T: RLPEncode> RLPEncode for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        let mut payload = Vec::new();
        for item in self {
            item.encode(&mut payload);
        }
        encode_length(payload.len(), buf);
        buf.extend_from_slice(&payload);
    }
}

impl<T1: RLPEncode, T2: RLPEncode> RLPEncode for (T1, T2) {
    fn encode(&self, buf: &mut Vec<u8>) {
        let mut payload = Vec::new();
        self.0.encode(&mut payload);
        self.1.encode(&mut payload);
        encode_length(payload.len(), buf);
        buf.extend_from_slice(&payload);
    }
}

impl<T1: RLPEncode, T2: RLPEncode, T3: RLPEncode> RLPEncode for (T1, T2, T3) {
    fn encode(&self, buf: &mut Vec<u8>) {
        let mut payload = Vec::new();
        self.0.encode(&mut payload);
        self.1.encode(&mut payload);
        self.2.encode(&mut payload);
        encode_length(payload.len(), buf);
        buf.extend_from_slice(&payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_integers() {
        assert_eq!(0u64.encode_to_vec(), vec![0x80]);
        assert_eq!(1u64.encode_to_vec(), vec![0x01]);
        assert_eq!(0x7fu64.encode_to_vec(), vec![0x7f]);
        assert_eq!(0x80u64.encode_to_vec(), vec![0x81, 0x80]);
        assert_eq!(1024u64.encode_to_vec(), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn encode_strings() {
        assert_eq!(b"".as_slice().encode_to_vec(), vec![0x80]);
        assert_eq!(
            b"dog".as_slice().encode_to_vec(),
            vec![0x83, b'd', b'o', b'g']
        );
        let long = [0xaa_u8; 60];
        let encoded = long.as_slice().encode_to_vec();
        assert_eq!(encoded[0], 0xb8);
        assert_eq!(encoded[1], 60);
        assert_eq!(&encoded[2..], &long[..]);
    }

    #[test]
    fn encode_u256_matches_minimal_big_endian() {
        assert_eq!(U256::zero().encode_to_vec(), vec![0x80]);
        assert_eq!(
            U256::from(0x0102u64).encode_to_vec(),
            vec![0x82, 0x01, 0x02]
        );
    }
}
