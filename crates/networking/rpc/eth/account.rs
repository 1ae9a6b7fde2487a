use ethereum_types::Address;
use serde_json::Value;

use crate::{
    rpc::{RpcApiContext, RpcHandler},
    rpc_types::RpcErr,
    types::{BlockIdentifier, data_bytes, quantity, quantity_u256},
};

fn parse_address_and_block(
    params: &Option<Vec<Value>>,
) -> Result<(Address, BlockIdentifier), RpcErr> {
    let params = params
        .as_ref()
        .ok_or(RpcErr::MissingParam("address".to_string()))?;
    let address_value = params
        .first()
        .ok_or(RpcErr::MissingParam("address".to_string()))?;
    let address: Address = serde_json::from_value(address_value.clone())
        .map_err(|_| RpcErr::WrongParam("address".to_string()))?;
    let block = match params.get(1) {
        Some(value) => BlockIdentifier::parse(value)?,
        None => BlockIdentifier::Latest,
    };
    Ok((address, block))
}

fn resolve_state_root(
    context: &RpcApiContext,
    block: BlockIdentifier,
) -> Result<ethereum_types::H256, RpcErr> {
    let latest = context
        .blockchain
        .store()
        .get_latest_block_number()?
        .unwrap_or_default();
    let number = block.resolve(latest);
    Ok(context.blockchain.state_root_at(number)?)
}

/// `eth_getCode`
#[derive(Debug, Clone)]
pub struct GetCode {
    pub address: Address,
    pub block: BlockIdentifier,
}

impl RpcHandler for GetCode {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let (address, block) = parse_address_and_block(params)?;
        Ok(Self { address, block })
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let state_root = resolve_state_root(&context, self.block)?;
        let code = context.blockchain.store().get_code(state_root, self.address)?;
        Ok(data_bytes(&code))
    }
}

/// `eth_getBalance`
#[derive(Debug, Clone)]
pub struct GetBalance {
    pub address: Address,
    pub block: BlockIdentifier,
}

impl RpcHandler for GetBalance {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let (address, block) = parse_address_and_block(params)?;
        Ok(Self { address, block })
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let state_root = resolve_state_root(&context, self.block)?;
        let balance = context
            .blockchain
            .store()
            .get_account_state(state_root, self.address)?
            .map(|account| account.balance)
            .unwrap_or_default();
        Ok(quantity_u256(balance))
    }
}

/// `eth_getTransactionCount`
#[derive(Debug, Clone)]
pub struct GetTransactionCount {
    pub address: Address,
    pub block: BlockIdentifier,
}

impl RpcHandler for GetTransactionCount {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let (address, block) = parse_address_and_block(params)?;
        Ok(Self { address, block })
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let state_root = resolve_state_root(&context, self.block)?;
        let nonce = context
            .blockchain
            .store()
            .get_account_state(state_root, self.address)?
            .map(|account| account.nonce)
            .unwrap_or_default();
        Ok(quantity(nonce))
    }
}
