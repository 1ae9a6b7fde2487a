use serde_json::Value;

use ethereum_types::H256;

use crate::{
    rpc::{RpcApiContext, RpcHandler},
    rpc_types::RpcErr,
    types::{BlockIdentifier, RpcReceipt, RpcTransactionRequest, data_bytes},
};

/// `eth_sendTransaction`: executes immediately; the block and receipt are
/// available once the hash is returned.
#[derive(Debug, Clone)]
pub struct SendTransaction {
    pub request: RpcTransactionRequest,
}

impl RpcHandler for SendTransaction {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let params = params
            .as_ref()
            .ok_or(RpcErr::MissingParam("transaction".to_string()))?;
        let request_value = params
            .first()
            .ok_or(RpcErr::MissingParam("transaction".to_string()))?;
        let request: RpcTransactionRequest = serde_json::from_value(request_value.clone())?;
        Ok(Self { request })
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let default_gas_price = context.blockchain.config().gas_price;
        let transaction = self.request.clone().into_transaction(default_gas_price);
        let tx_hash = context.blockchain.send_transaction(&transaction)?;
        Ok(Value::String(format!("{tx_hash:#x}")))
    }
}

/// `eth_call`: read-only execution, the return data is the result.
#[derive(Debug, Clone)]
pub struct Call {
    pub request: RpcTransactionRequest,
    pub block: BlockIdentifier,
}

impl RpcHandler for Call {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let params = params
            .as_ref()
            .ok_or(RpcErr::MissingParam("call".to_string()))?;
        let request_value = params
            .first()
            .ok_or(RpcErr::MissingParam("call".to_string()))?;
        let request: RpcTransactionRequest = serde_json::from_value(request_value.clone())?;
        let block = match params.get(1) {
            Some(value) => BlockIdentifier::parse(value)?,
            None => BlockIdentifier::Latest,
        };
        Ok(Self { request, block })
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let latest = context
            .blockchain
            .store()
            .get_latest_block_number()?
            .unwrap_or_default();
        let block_number = self.block.resolve(latest);
        let report = context.blockchain.call(
            self.request.from,
            self.request.to,
            self.request.data.clone().unwrap_or_default(),
            self.request.value.unwrap_or_default(),
            self.request.gas,
            block_number,
        )?;
        match report.result {
            hearth_vm::TxResult::Success => Ok(data_bytes(&report.output)),
            hearth_vm::TxResult::Revert(data) => Err(RpcErr::Revert {
                data: format!("0x{}", hex::encode(data)),
            }),
        }
    }
}

/// `eth_getTransactionReceipt`: the receipt object, or null for an
/// unknown hash.
#[derive(Debug, Clone)]
pub struct GetTransactionReceipt {
    pub tx_hash: H256,
}

impl RpcHandler for GetTransactionReceipt {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let params = params
            .as_ref()
            .ok_or(RpcErr::MissingParam("transaction hash".to_string()))?;
        let hash_value = params
            .first()
            .ok_or(RpcErr::MissingParam("transaction hash".to_string()))?;
        let tx_hash: H256 = serde_json::from_value(hash_value.clone())
            .map_err(|_| RpcErr::WrongParam("transaction hash".to_string()))?;
        Ok(Self { tx_hash })
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let Some(receipt) = context.blockchain.get_transaction_receipt(self.tx_hash)? else {
            return Ok(Value::Null);
        };
        let block_hash = context
            .blockchain
            .store()
            .get_block_by_number(receipt.block_number)?
            .map(|block| block.hash())
            .unwrap_or_default();
        Ok(RpcReceipt::build(&receipt, block_hash))
    }
}
