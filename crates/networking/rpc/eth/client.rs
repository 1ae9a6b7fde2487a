use serde_json::Value;

use crate::{
    rpc::{RpcApiContext, RpcHandler},
    rpc_types::RpcErr,
    types::quantity,
};

/// `eth_chainId`
#[derive(Debug, Clone)]
pub struct ChainId;

impl RpcHandler for ChainId {
    fn parse(_: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        Ok(ChainId {})
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        Ok(quantity(context.blockchain.config().chain_id))
    }
}

/// `eth_blockNumber`
#[derive(Debug, Clone)]
pub struct BlockNumber;

impl RpcHandler for BlockNumber {
    fn parse(_: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        Ok(BlockNumber {})
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let latest = context
            .blockchain
            .store()
            .get_latest_block_number()?
            .unwrap_or_default();
        Ok(quantity(latest))
    }
}
