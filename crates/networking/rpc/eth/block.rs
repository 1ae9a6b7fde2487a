use serde_json::{Value, json};

use crate::{
    rpc::{RpcApiContext, RpcHandler},
    rpc_types::RpcErr,
    types::{BlockIdentifier, data_bytes, opt_address, quantity, quantity_u256},
};

/// `eth_getBlockByNumber`. The second parameter selects full transaction
/// objects over hashes.
#[derive(Debug, Clone)]
pub struct GetBlockByNumber {
    pub block: BlockIdentifier,
    pub full_transactions: bool,
}

impl RpcHandler for GetBlockByNumber {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let params = params
            .as_ref()
            .ok_or(RpcErr::MissingParam("block".to_string()))?;
        let block_value = params
            .first()
            .ok_or(RpcErr::MissingParam("block".to_string()))?;
        let block = BlockIdentifier::parse(block_value)?;
        let full_transactions = params
            .get(1)
            .and_then(Value::as_bool)
            .unwrap_or_default();
        Ok(Self {
            block,
            full_transactions,
        })
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let latest = context
            .blockchain
            .store()
            .get_latest_block_number()?
            .unwrap_or_default();
        let number = self.block.resolve(latest);
        let Some(block) = context.blockchain.store().get_block_by_number(number)? else {
            return Ok(Value::Null);
        };

        let transactions: Vec<Value> = block
            .transactions
            .iter()
            .map(|transaction| {
                let hash = transaction.compute_hash();
                if self.full_transactions {
                    json!({
                        "hash": format!("{hash:#x}"),
                        "from": opt_address(&transaction.from),
                        "to": opt_address(&transaction.to.to()),
                        "nonce": quantity(transaction.nonce.unwrap_or_default()),
                        "gas": quantity(transaction.gas),
                        "gasPrice": quantity(transaction.gas_price),
                        "value": quantity_u256(transaction.value),
                        "input": data_bytes(&transaction.data),
                        "blockNumber": quantity(block.header.number),
                    })
                } else {
                    Value::String(format!("{hash:#x}"))
                }
            })
            .collect();

        Ok(json!({
            "number": quantity(block.header.number),
            "hash": format!("{:#x}", block.hash()),
            "parentHash": format!("{:#x}", block.header.parent_hash),
            "timestamp": quantity(block.header.timestamp),
            "stateRoot": format!("{:#x}", block.header.state_root),
            "gasUsed": quantity(block.header.gas_used),
            "logsBloom": format!("0x{}", hex::encode(block.header.logs_bloom.as_bytes())),
            "transactions": transactions,
        }))
    }
}
