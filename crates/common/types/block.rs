use ethereum_types::{Bloom, H256};
use hearth_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

use super::{Receipt, Transaction};
use crate::keccak::keccak;

pub type BlockNumber = u64;
pub type BlockHash = H256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: BlockNumber,
    pub parent_hash: BlockHash,
    pub timestamp: u64,
    /// World-state root after applying every transaction in the block.
    pub state_root: H256,
    pub logs_bloom: Bloom,
    pub gas_used: u64,
}

impl BlockHeader {
    pub fn compute_block_hash(&self) -> BlockHash {
        keccak(self.encode_to_vec())
    }
}

impl RLPEncode for BlockHeader {
    fn encode(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.number)
            .encode_field(&self.parent_hash)
            .encode_field(&self.timestamp)
            .encode_field(&self.state_root)
            .encode_field(&self.logs_bloom)
            .encode_field(&self.gas_used)
            .finish();
    }
}

impl RLPDecode for BlockHeader {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (number, decoder) = decoder.decode_field("number")?;
        let (parent_hash, decoder) = decoder.decode_field("parent_hash")?;
        let (timestamp, decoder) = decoder.decode_field("timestamp")?;
        let (state_root, decoder) = decoder.decode_field("state_root")?;
        let (logs_bloom, decoder) = decoder.decode_field("logs_bloom")?;
        let (gas_used, decoder) = decoder.decode_field("gas_used")?;
        Ok((
            Self {
                number,
                parent_hash,
                timestamp,
                state_root,
                logs_bloom,
                gas_used,
            },
            decoder.finish()?,
        ))
    }
}

/// A block: executed transactions together with their receipts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub receipts: Vec<Receipt>,
}

impl Block {
    pub fn hash(&self) -> BlockHash {
        self.header.compute_block_hash()
    }
}

impl RLPEncode for Block {
    fn encode(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.header)
            .encode_field(&self.transactions)
            .encode_field(&self.receipts)
            .finish();
    }
}

impl RLPDecode for Block {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (header, decoder) = decoder.decode_field("header")?;
        let (transactions, decoder) = decoder.decode_field("transactions")?;
        let (receipts, decoder) = decoder.decode_field("receipts")?;
        Ok((
            Self {
                header,
                transactions,
                receipts,
            },
            decoder.finish()?,
        ))
    }
}
