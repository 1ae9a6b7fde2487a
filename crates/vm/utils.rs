use ethereum_types::{Address, H256, U256};
use hearth_rlp::structs::Encoder;
use sha3::{Digest, Keccak256};

use crate::errors::ExceptionalHalt;

pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

pub fn word_to_address(word: U256) -> Address {
    let be: [u8; 32] = word.to_big_endian();
    Address::from_slice(&be[12..])
}

/// Converts a stack word to a usize offset/size. Values past the usize
/// range address memory no gas budget could ever pay for.
pub fn u256_to_usize(value: U256) -> Result<usize, ExceptionalHalt> {
    if value > U256::from(usize::MAX) {
        return Err(ExceptionalHalt::OutOfGas);
    }
    Ok(value.as_usize())
}

/// `keccak256(rlp([sender, nonce]))[12..]`
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let mut buf = Vec::new();
    Encoder::new(&mut buf)
        .encode_field(&sender)
        .encode_field(&nonce)
        .finish();
    let hash = Keccak256::digest(&buf);
    Address::from_slice(&hash[12..])
}

/// `keccak256(0xff || sender || salt || keccak256(initcode))[12..]`
pub fn calculate_create2_address(sender: Address, salt: H256, initcode: &[u8]) -> Address {
    let initcode_hash = Keccak256::digest(initcode);
    let hash = Keccak256::new()
        .chain_update([0xff])
        .chain_update(sender.as_bytes())
        .chain_update(salt.as_bytes())
        .chain_update(initcode_hash)
        .finalize();
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_address_known_vector() {
        // keccak(rlp([0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0, 0]))[12..]
        // = 0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d, the canonical example.
        let sender = Address::from_slice(
            &hex::decode("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap(),
        );
        assert_eq!(
            calculate_create_address(sender, 0),
            Address::from_slice(&hex::decode("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap())
        );
        assert_eq!(
            calculate_create_address(sender, 1),
            Address::from_slice(&hex::decode("343c43a37d37dff08ae8c4a11544c718abb4fcf8").unwrap())
        );
    }

    #[test]
    fn create2_address_known_vector() {
        // EIP-1014 example 1: sender 0x0, salt 0x0, initcode 0x00.
        let address = calculate_create2_address(Address::zero(), H256::zero(), &[0x00]);
        assert_eq!(
            address,
            Address::from_slice(&hex::decode("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38").unwrap())
        );
    }

    #[test]
    fn word_address_roundtrip() {
        let address = Address::repeat_byte(0xcd);
        assert_eq!(word_to_address(address_to_word(address)), address);
    }
}
