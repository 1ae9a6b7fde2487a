use serde_json::Value;

use crate::{
    rpc::{RpcApiContext, RpcHandler},
    rpc_types::RpcErr,
    types::quantity,
};

/// `eth_gasPrice`: the chain quotes one fixed price.
#[derive(Debug, Clone)]
pub struct GasPrice;

impl RpcHandler for GasPrice {
    fn parse(_: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        Ok(GasPrice {})
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        Ok(quantity(context.blockchain.config().gas_price))
    }
}
