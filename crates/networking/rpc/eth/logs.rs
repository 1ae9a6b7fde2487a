use serde_json::Value;

use crate::{
    rpc::{RpcApiContext, RpcHandler},
    rpc_types::RpcErr,
    types::{LogFilterRequest, RpcLog},
};

/// `eth_getLogs`
#[derive(Debug)]
pub struct GetLogs {
    pub request: LogFilterRequest,
}

impl RpcHandler for GetLogs {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let params = params
            .as_ref()
            .ok_or(RpcErr::MissingParam("filter".to_string()))?;
        let filter_value = params
            .first()
            .ok_or(RpcErr::MissingParam("filter".to_string()))?;
        let request: LogFilterRequest = serde_json::from_value(filter_value.clone())?;
        Ok(Self { request })
    }

    fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let latest = context
            .blockchain
            .store()
            .get_latest_block_number()?
            .unwrap_or_default();
        let filter = self.request.to_filter(latest)?;
        let logs = context.blockchain.get_logs(&filter)?;
        Ok(Value::Array(logs.iter().map(RpcLog::build).collect()))
    }
}
