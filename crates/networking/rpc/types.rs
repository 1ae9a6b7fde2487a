//! Wire shapes of the JSON-RPC boundary. Quantities serialize as minimal
//! hex (`"0x0"` for zero), byte strings as 0x-prefixed lowercase hex.

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::Deserialize;
use serde_json::{Value, json};

use hearth_blockchain::{BlockLog, LogFilter, TopicFilter};
use hearth_common::{serde_utils, types::Receipt};

use crate::rpc_types::RpcErr;

/// A transaction or call request object, as found in the params of
/// `eth_sendTransaction` and `eth_call`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcTransactionRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    #[serde(default, with = "serde_utils::u64::hex_str_opt")]
    pub gas: Option<u64>,
    #[serde(
        default,
        rename = "gasPrice",
        with = "serde_utils::u64::hex_str_opt"
    )]
    pub gas_price: Option<u64>,
    #[serde(default, deserialize_with = "deser_opt_u256")]
    pub value: Option<U256>,
    #[serde(default, alias = "input", with = "serde_utils::bytes::opt")]
    pub data: Option<Bytes>,
    #[serde(default, with = "serde_utils::u64::hex_str_opt")]
    pub nonce: Option<u64>,
    #[serde(default, with = "serde_utils::bytes::opt")]
    pub signature: Option<Bytes>,
}

fn deser_opt_u256<'de, D>(d: D) -> Result<Option<U256>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = Option::<String>::deserialize(d)?;
    match value {
        Some(s) => {
            let trimmed = s
                .strip_prefix("0x")
                .ok_or_else(|| D::Error::custom("quantity is missing the 0x prefix"))?;
            U256::from_str_radix(trimmed, 16)
                .map(Some)
                .map_err(|e| D::Error::custom(e.to_string()))
        }
        None => Ok(None),
    }
}

impl RpcTransactionRequest {
    pub fn into_transaction(self, default_gas_price: u64) -> hearth_common::types::Transaction {
        hearth_common::types::Transaction {
            from: self.from,
            to: self.to.into(),
            nonce: self.nonce,
            gas: self.gas.unwrap_or(90_000),
            gas_price: self.gas_price.unwrap_or(default_gas_price),
            value: self.value.unwrap_or_default(),
            data: self.data.unwrap_or_default(),
            signature: self.signature,
        }
    }
}

/// A block selector: a number, or one of the `latest`/`earliest`/
/// `pending` tags. The in-process chain treats pending as latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIdentifier {
    Number(u64),
    Latest,
    Earliest,
}

impl BlockIdentifier {
    pub fn parse(value: &Value) -> Result<Self, RpcErr> {
        match value {
            Value::String(tag) => match tag.as_str() {
                "latest" | "pending" | "safe" | "finalized" => Ok(BlockIdentifier::Latest),
                "earliest" => Ok(BlockIdentifier::Earliest),
                quantity => {
                    let trimmed = quantity
                        .strip_prefix("0x")
                        .ok_or_else(|| RpcErr::WrongParam("block".to_string()))?;
                    u64::from_str_radix(trimmed, 16)
                        .map(BlockIdentifier::Number)
                        .map_err(|_| RpcErr::WrongParam("block".to_string()))
                }
            },
            Value::Number(n) => n
                .as_u64()
                .map(BlockIdentifier::Number)
                .ok_or_else(|| RpcErr::WrongParam("block".to_string())),
            _ => Err(RpcErr::WrongParam("block".to_string())),
        }
    }

    pub fn resolve(&self, latest: u64) -> u64 {
        match self {
            BlockIdentifier::Number(number) => *number,
            BlockIdentifier::Latest => latest,
            BlockIdentifier::Earliest => 0,
        }
    }
}

// --- response shaping ----------------------------------------------------

pub fn quantity(value: u64) -> Value {
    json!(format!("{value:#x}"))
}

pub fn quantity_u256(value: U256) -> Value {
    json!(format!("{value:#x}"))
}

pub fn data_bytes(bytes: &[u8]) -> Value {
    json!(format!("0x{}", hex::encode(bytes)))
}

pub fn opt_address(address: &Option<Address>) -> Value {
    match address {
        Some(address) => json!(format!("{address:#x}")),
        None => Value::Null,
    }
}

/// `eth_getTransactionReceipt` response object.
pub struct RpcReceipt;

impl RpcReceipt {
    pub fn build(receipt: &Receipt, block_hash: H256) -> Value {
        json!({
            "transactionHash": format!("{:#x}", receipt.tx_hash),
            "transactionIndex": format!("{:#x}", receipt.tx_index),
            "blockNumber": format!("{:#x}", receipt.block_number),
            "blockHash": format!("{block_hash:#x}"),
            "from": format!("{:#x}", receipt.from),
            "to": opt_address(&receipt.to),
            "contractAddress": opt_address(&receipt.contract_address),
            "status": if receipt.succeeded { "0x1" } else { "0x0" },
            "gasUsed": format!("{:#x}", receipt.gas_used),
            "cumulativeGasUsed": format!("{:#x}", receipt.cumulative_gas_used),
            "logsBloom": format!("0x{}", hex::encode(receipt.bloom().as_bytes())),
            "logs": receipt
                .logs
                .iter()
                .enumerate()
                .map(|(i, log)| RpcLog::build_from_receipt(receipt, block_hash, i as u64, log))
                .collect::<Vec<_>>(),
        })
    }
}

/// `eth_getLogs` response entry.
pub struct RpcLog;

impl RpcLog {
    pub fn build(block_log: &BlockLog) -> Value {
        json!({
            "address": format!("{:#x}", block_log.log.address),
            "topics": block_log
                .log
                .topics
                .iter()
                .map(|topic| format!("{topic:#x}"))
                .collect::<Vec<_>>(),
            "data": format!("0x{}", hex::encode(&block_log.log.data)),
            "blockNumber": format!("{:#x}", block_log.block_number),
            "blockHash": format!("{:#x}", block_log.block_hash),
            "transactionHash": format!("{:#x}", block_log.tx_hash),
            "transactionIndex": format!("{:#x}", block_log.tx_index),
            "logIndex": format!("{:#x}", block_log.log_index),
            "removed": false,
        })
    }

    fn build_from_receipt(
        receipt: &Receipt,
        block_hash: H256,
        log_index: u64,
        log: &hearth_common::types::Log,
    ) -> Value {
        json!({
            "address": format!("{:#x}", log.address),
            "topics": log
                .topics
                .iter()
                .map(|topic| format!("{topic:#x}"))
                .collect::<Vec<_>>(),
            "data": format!("0x{}", hex::encode(&log.data)),
            "blockNumber": format!("{:#x}", receipt.block_number),
            "blockHash": format!("{block_hash:#x}"),
            "transactionHash": format!("{:#x}", receipt.tx_hash),
            "transactionIndex": format!("{:#x}", receipt.tx_index),
            "logIndex": format!("{log_index:#x}"),
            "removed": false,
        })
    }
}

/// `eth_getLogs` filter object.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilterRequest {
    pub from_block: Option<Value>,
    pub to_block: Option<Value>,
    pub address: Option<Address>,
    pub topics: Option<Vec<Value>>,
}

impl LogFilterRequest {
    pub fn to_filter(&self, latest: u64) -> Result<LogFilter, RpcErr> {
        let from_block = match &self.from_block {
            Some(value) => BlockIdentifier::parse(value)?.resolve(latest),
            None => 0,
        };
        let to_block = match &self.to_block {
            Some(value) => BlockIdentifier::parse(value)?.resolve(latest),
            None => latest,
        };
        let mut topics = Vec::new();
        for slot in self.topics.as_deref().unwrap_or_default() {
            topics.push(parse_topic_slot(slot)?);
        }
        Ok(LogFilter {
            from_block,
            to_block,
            address: self.address,
            topics,
        })
    }
}

// A topic slot is null (wildcard), a hash, or a set of hashes.
fn parse_topic_slot(value: &Value) -> Result<TopicFilter, RpcErr> {
    match value {
        Value::Null => Ok(TopicFilter::Any),
        Value::String(_) => {
            let topic: H256 = serde_json::from_value(value.clone())
                .map_err(|_| RpcErr::WrongParam("topics".to_string()))?;
            Ok(TopicFilter::Exact(topic))
        }
        Value::Array(values) => {
            let mut topics = Vec::with_capacity(values.len());
            for value in values {
                topics.push(
                    serde_json::from_value(value.clone())
                        .map_err(|_| RpcErr::WrongParam("topics".to_string()))?,
                );
            }
            Ok(TopicFilter::OneOf(topics))
        }
        _ => Err(RpcErr::WrongParam("topics".to_string())),
    }
}
