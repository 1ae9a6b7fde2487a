use bytes::Bytes;
use ethereum_types::{H256, U256};
use hearth_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

use crate::constants::EMPTY_CODE_HASH;

/// The account record stored as a world-trie leaf: the canonical
/// four-field encoding committed to by the state root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

impl AccountState {
    pub fn new(storage_root: H256) -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            storage_root,
            code_hash: *EMPTY_CODE_HASH,
        }
    }

    pub fn has_code(&self) -> bool {
        self.code_hash != *EMPTY_CODE_HASH
    }

    /// True when the account would not exist in the trie: no balance, no
    /// nonce, no code. Such accounts are removed rather than stored.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && !self.has_code()
    }
}

impl RLPEncode for AccountState {
    fn encode(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.balance)
            .encode_field(&self.storage_root)
            .encode_field(&self.code_hash)
            .finish();
    }
}

impl RLPDecode for AccountState {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (balance, decoder) = decoder.decode_field("balance")?;
        let (storage_root, decoder) = decoder.decode_field("storage_root")?;
        let (code_hash, decoder) = decoder.decode_field("code_hash")?;
        Ok((
            Self {
                nonce,
                balance,
                storage_root,
                code_hash,
            },
            decoder.finish()?,
        ))
    }
}

/// Account fields without the storage commitment; what the VM needs to
/// know about an account besides individual storage slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: H256,
}

impl AccountInfo {
    pub fn has_code(&self) -> bool {
        self.code_hash != *EMPTY_CODE_HASH && !self.code_hash.is_zero()
    }
}

impl From<&AccountState> for AccountInfo {
    fn from(state: &AccountState) -> Self {
        Self {
            nonce: state.nonce,
            balance: state.balance,
            code_hash: state.code_hash,
        }
    }
}

/// An account as materialised for execution: info plus the resolved code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub info: AccountInfo,
    pub code: Bytes,
}

impl Account {
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// Empty per the state lifecycle rules: removable from the trie.
    pub fn is_empty(&self) -> bool {
        self.info.nonce == 0 && self.info.balance.is_zero() && self.code.is_empty()
    }
}
