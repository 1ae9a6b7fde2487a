use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use hearth_blockchain::Blockchain;

use crate::{
    eth,
    rpc_types::{
        RpcErr, RpcErrorMetadata, RpcErrorResponse, RpcRequest, RpcRequestId, RpcSuccessResponse,
    },
};

/// Everything a handler needs: the chain (which owns the store).
#[derive(Clone)]
pub struct RpcApiContext {
    pub blockchain: Arc<Blockchain>,
}

/// One implementor per RPC method: `parse` validates the raw params into
/// a typed request, `handle` executes it.
pub trait RpcHandler: Sized {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr>;

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr>;

    fn call(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
        let request = Self::parse(&req.params)?;
        request.handle(context)
    }
}

/// The `eth` namespace method table.
pub fn map_eth_requests(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
    match req.method.as_str() {
        "eth_chainId" => eth::client::ChainId::call(req, context),
        "eth_blockNumber" => eth::client::BlockNumber::call(req, context),
        "eth_gasPrice" => eth::gas_price::GasPrice::call(req, context),
        "eth_sendTransaction" => eth::transaction::SendTransaction::call(req, context),
        "eth_call" => eth::transaction::Call::call(req, context),
        "eth_getTransactionReceipt" => eth::transaction::GetTransactionReceipt::call(req, context),
        "eth_getTransactionCount" => eth::account::GetTransactionCount::call(req, context),
        "eth_getBalance" => eth::account::GetBalance::call(req, context),
        "eth_getCode" => eth::account::GetCode::call(req, context),
        "eth_getLogs" => eth::logs::GetLogs::call(req, context),
        "eth_getBlockByNumber" => eth::block::GetBlockByNumber::call(req, context),
        unknown_method => Err(RpcErr::MethodNotFound(unknown_method.to_owned())),
    }
}

/// Entry point of the dispatcher: routes a request by namespace and wraps
/// the outcome in a JSON-RPC 2.0 envelope.
pub fn handle_request(req: &RpcRequest, context: RpcApiContext) -> Value {
    debug!(method = %req.method, "rpc request");
    let result = match req.method.split('_').next() {
        Some("eth") => map_eth_requests(req, context),
        _ => Err(RpcErr::MethodNotFound(req.method.clone())),
    };
    rpc_response(req.id.clone(), result)
}

pub fn rpc_response(id: RpcRequestId, result: Result<Value, RpcErr>) -> Value {
    match result {
        Ok(result) => serde_json::to_value(RpcSuccessResponse {
            id,
            jsonrpc: "2.0".to_string(),
            result,
        }),
        Err(error) => serde_json::to_value(RpcErrorResponse {
            id,
            jsonrpc: "2.0".to_string(),
            error: RpcErrorMetadata::from(error),
        }),
    }
    .unwrap_or(Value::Null)
}
