use ethereum_types::{Address, H256};

use hearth_common::types::{Block, BlockHash, Log};

use crate::{Blockchain, error::ChainError};

/// One topic slot of a log filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicFilter {
    /// Wildcard: any value (or no topic at all) matches.
    #[default]
    Any,
    Exact(H256),
    OneOf(Vec<H256>),
}

impl TopicFilter {
    fn matches(&self, topic: Option<&H256>) -> bool {
        match self {
            TopicFilter::Any => true,
            TopicFilter::Exact(expected) => topic == Some(expected),
            TopicFilter::OneOf(expected) => {
                topic.is_some_and(|topic| expected.contains(topic))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub from_block: u64,
    pub to_block: u64,
    pub address: Option<Address>,
    /// Positional topic constraints, at most four.
    pub topics: Vec<TopicFilter>,
}

impl LogFilter {
    fn matches(&self, log: &Log) -> bool {
        if let Some(address) = self.address {
            if log.address != address {
                return false;
            }
        }
        self.topics
            .iter()
            .enumerate()
            .all(|(i, topic_filter)| topic_filter.matches(log.topics.get(i)))
    }
}

/// A log joined with its position in the chain, the shape `eth_getLogs`
/// responses are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLog {
    pub log: Log,
    pub block_number: u64,
    pub block_hash: BlockHash,
    pub tx_hash: H256,
    pub tx_index: u64,
    /// Position of the log within its block.
    pub log_index: u64,
}

impl Blockchain {
    /// Evaluates a log filter: with an address, the candidate set comes
    /// from intersecting the posting lists of each constrained dimension;
    /// without one, the block range is scanned. Candidates are then
    /// materialised and re-checked, and returned in block order then
    /// log-index order.
    pub fn get_logs(&self, filter: &LogFilter) -> Result<Vec<BlockLog>, ChainError> {
        if filter.from_block > filter.to_block {
            return Err(ChainError::BadFilter(format!(
                "fromBlock {} is past toBlock {}",
                filter.from_block, filter.to_block
            )));
        }
        if filter.topics.len() > 4 {
            return Err(ChainError::BadFilter(
                "a filter carries at most 4 topic slots".to_string(),
            ));
        }

        let candidates = match filter.address {
            Some(address) => self.indexed_candidates(address, filter)?,
            None => self.scanned_candidates(filter)?,
        };

        let mut result = Vec::new();
        for (block_number, log_index) in candidates {
            let block = self
                .store()
                .get_block_by_number(block_number)?
                .ok_or(ChainError::UnknownBlock(block_number))?;
            if let Some(block_log) = locate_log(&block, log_index) {
                if filter.matches(&block_log.log) {
                    result.push(block_log);
                }
            }
        }
        Ok(result)
    }

    // Posting-list intersection: the address list, narrowed by each
    // non-wildcard topic slot (a OneOf slot contributes the union of its
    // values' lists).
    fn indexed_candidates(
        &self,
        address: Address,
        filter: &LogFilter,
    ) -> Result<Vec<(u64, u64)>, ChainError> {
        let mut candidates = self.store().get_address_postings(&address)?;
        for (slot, topic_filter) in filter.topics.iter().enumerate() {
            let values: Vec<H256> = match topic_filter {
                TopicFilter::Any => continue,
                TopicFilter::Exact(value) => vec![*value],
                TopicFilter::OneOf(values) => values.clone(),
            };
            let mut slot_postings: Vec<(u64, u64)> = Vec::new();
            for value in values {
                slot_postings.extend(self.store().get_log_postings(
                    &address,
                    slot as u8,
                    &value,
                )?);
            }
            slot_postings.sort_unstable();
            candidates.retain(|posting| slot_postings.binary_search(posting).is_ok());
        }
        candidates.retain(|(block_number, _)| {
            *block_number >= filter.from_block && *block_number <= filter.to_block
        });
        candidates.sort_unstable();
        candidates.dedup();
        Ok(candidates)
    }

    // Address-less filters materialise the whole range.
    fn scanned_candidates(&self, filter: &LogFilter) -> Result<Vec<(u64, u64)>, ChainError> {
        let latest = self
            .store()
            .get_latest_block_number()?
            .unwrap_or_default();
        let to_block = filter.to_block.min(latest);
        let mut candidates = Vec::new();
        for block_number in filter.from_block..=to_block {
            let Some(block) = self.store().get_block_by_number(block_number)? else {
                continue;
            };
            let log_count: u64 = block
                .receipts
                .iter()
                .map(|receipt| receipt.logs.len() as u64)
                .sum();
            for log_index in 0..log_count {
                candidates.push((block_number, log_index));
            }
        }
        Ok(candidates)
    }
}

// Resolves a block-wide log index back to its receipt and log.
fn locate_log(block: &Block, log_index: u64) -> Option<BlockLog> {
    let mut seen: u64 = 0;
    for receipt in &block.receipts {
        let here = receipt.logs.len() as u64;
        if log_index < seen + here {
            let log = receipt.logs.get((log_index - seen) as usize)?;
            return Some(BlockLog {
                log: log.clone(),
                block_number: block.header.number,
                block_hash: block.hash(),
                tx_hash: receipt.tx_hash,
                tx_index: receipt.tx_index,
                log_index,
            });
        }
        seen += here;
    }
    None
}
