use bytes::Bytes;
use ethereum_types::{Address, Bloom, BloomInput, H256};
use hearth_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

pub type Index = u64;

/// An event emitted by a contract: address, up to four indexed topics and
/// an opaque data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl RLPEncode for Log {
    fn encode(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.topics)
            .encode_bytes(&self.data)
            .finish();
    }
}

impl RLPDecode for Log {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (topics, decoder) = decoder.decode_field("topics")?;
        let (data, decoder) = decoder.decode_field("data")?;
        Ok((
            Self {
                address,
                topics,
                data,
            },
            decoder.finish()?,
        ))
    }
}

/// Result of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: H256,
    pub block_number: u64,
    pub tx_index: Index,
    pub from: Address,
    pub to: Option<Address>,
    /// Address of the deployed contract, for creations.
    pub contract_address: Option<Address>,
    pub succeeded: bool,
    pub gas_used: u64,
    /// Gas used by this and all previous transactions in the block.
    pub cumulative_gas_used: u64,
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn bloom(&self) -> Bloom {
        bloom_from_logs(&self.logs)
    }
}

pub fn bloom_from_logs(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_bytes()));
        for topic in log.topics.iter() {
            bloom.accrue(BloomInput::Raw(topic.as_bytes()));
        }
    }
    bloom
}

// Absent addresses encode as the empty byte string so the two optional
// fields stay positionally unambiguous.
fn encode_opt_address<'a>(encoder: Encoder<'a>, value: &Option<Address>) -> Encoder<'a> {
    match value {
        Some(address) => encoder.encode_field(address),
        None => encoder.encode_bytes(&[]),
    }
}

fn decode_opt_address(bytes: &Bytes) -> Result<Option<Address>, RLPDecodeError> {
    match bytes.len() {
        0 => Ok(None),
        20 => Ok(Some(Address::from_slice(bytes))),
        _ => Err(RLPDecodeError::InvalidLength),
    }
}

impl RLPEncode for Receipt {
    fn encode(&self, buf: &mut Vec<u8>) {
        let encoder = Encoder::new(buf)
            .encode_field(&self.tx_hash)
            .encode_field(&self.block_number)
            .encode_field(&self.tx_index)
            .encode_field(&self.from);
        let encoder = encode_opt_address(encoder, &self.to);
        let encoder = encode_opt_address(encoder, &self.contract_address);
        encoder
            .encode_field(&self.succeeded)
            .encode_field(&self.gas_used)
            .encode_field(&self.cumulative_gas_used)
            .encode_field(&self.logs)
            .finish();
    }
}

impl RLPDecode for Receipt {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (tx_hash, decoder) = decoder.decode_field("tx_hash")?;
        let (block_number, decoder) = decoder.decode_field("block_number")?;
        let (tx_index, decoder) = decoder.decode_field("tx_index")?;
        let (from, decoder) = decoder.decode_field("from")?;
        let (to_bytes, decoder): (Bytes, _) = decoder.decode_field("to")?;
        let (contract_bytes, decoder): (Bytes, _) = decoder.decode_field("contract_address")?;
        let (succeeded, decoder) = decoder.decode_field("succeeded")?;
        let (gas_used, decoder) = decoder.decode_field("gas_used")?;
        let (cumulative_gas_used, decoder) = decoder.decode_field("cumulative_gas_used")?;
        let (logs, decoder) = decoder.decode_field("logs")?;
        Ok((
            Self {
                tx_hash,
                block_number,
                tx_index,
                from,
                to: decode_opt_address(&to_bytes)?,
                contract_address: decode_opt_address(&contract_bytes)?,
                succeeded,
                gas_used,
                cumulative_gas_used,
                logs,
            },
            decoder.finish()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> Log {
        Log {
            address: Address::repeat_byte(0x33),
            topics: vec![H256::repeat_byte(1), H256::repeat_byte(2)],
            data: Bytes::from_static(b"payload"),
        }
    }

    #[test]
    fn receipt_rlp_roundtrip() {
        let receipt = Receipt {
            tx_hash: H256::repeat_byte(0xab),
            block_number: 3,
            tx_index: 0,
            from: Address::repeat_byte(0x11),
            to: None,
            contract_address: Some(Address::repeat_byte(0x22)),
            succeeded: true,
            gas_used: 53_000,
            cumulative_gas_used: 53_000,
            logs: vec![sample_log()],
        };
        let encoded = receipt.encode_to_vec();
        assert_eq!(Receipt::decode(&encoded).unwrap(), receipt);
    }

    #[test]
    fn bloom_covers_address_and_topics() {
        let log = sample_log();
        let bloom = bloom_from_logs(std::slice::from_ref(&log));
        assert!(bloom.contains_input(BloomInput::Raw(log.address.as_bytes())));
        assert!(bloom.contains_input(BloomInput::Raw(log.topics[0].as_bytes())));
        assert!(!bloom.contains_input(BloomInput::Raw(H256::repeat_byte(9).as_bytes())));
    }
}
