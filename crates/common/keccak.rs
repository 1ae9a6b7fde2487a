use ethereum_types::H256;
use sha3::{Digest, Keccak256};

/// Keccak-256 of the input, as used for trie keys, code hashes, block and
/// transaction hashes and the SHA3 opcode.
pub fn keccak<T: AsRef<[u8]>>(data: T) -> H256 {
    H256::from_slice(Keccak256::digest(data.as_ref()).as_slice())
}
