use serde::{Deserialize, Serialize};
use serde_json::Value;

use hearth_blockchain::error::{ChainError, InvalidTransactionError};
use hearth_storage::error::StoreError;
use hearth_vm::VMError;

// ========== Error Types ==========

#[derive(Debug)]
pub enum RpcErr {
    MethodNotFound(String),
    WrongParam(String),
    BadParams(String),
    MissingParam(String),
    InvalidTransaction(String),
    Internal(String),
    Vm(String),
    Revert { data: String },
    UnknownBlock(String),
    UnknownTransaction(String),
    BadFilter(String),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcErrorMetadata {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub message: String,
}

impl From<RpcErr> for RpcErrorMetadata {
    fn from(value: RpcErr) -> Self {
        match value {
            RpcErr::MethodNotFound(bad_method) => RpcErrorMetadata {
                code: -32601,
                data: None,
                message: format!("Method not found: {bad_method}"),
            },
            RpcErr::WrongParam(field) => RpcErrorMetadata {
                code: -32602,
                data: None,
                message: format!("Field '{field}' is incorrect or has an unknown format"),
            },
            RpcErr::BadParams(context) => RpcErrorMetadata {
                code: -32602,
                data: None,
                message: format!("Invalid params: {context}"),
            },
            RpcErr::MissingParam(parameter_name) => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: format!("Expected parameter: {parameter_name} is missing"),
            },
            RpcErr::InvalidTransaction(context) => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: format!("Invalid transaction: {context}"),
            },
            RpcErr::Internal(context) => RpcErrorMetadata {
                code: -32603,
                data: None,
                message: format!("Internal Error: {context}"),
            },
            RpcErr::Vm(context) => RpcErrorMetadata {
                code: -32015,
                data: None,
                message: format!("Vm execution error: {context}"),
            },
            RpcErr::Revert { data } => RpcErrorMetadata {
                // Matches the de-facto code clients expect for reverts.
                code: 3,
                data: Some(data.clone()),
                message: "execution reverted".to_string(),
            },
            RpcErr::UnknownBlock(context) => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: format!("Unknown block: {context}"),
            },
            RpcErr::UnknownTransaction(context) => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: format!("Unknown transaction: {context}"),
            },
            RpcErr::BadFilter(context) => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: format!("Bad filter: {context}"),
            },
        }
    }
}

impl From<serde_json::Error> for RpcErr {
    fn from(error: serde_json::Error) -> Self {
        Self::BadParams(error.to_string())
    }
}

/// Failure to read from the store is always an internal error.
impl From<StoreError> for RpcErr {
    fn from(value: StoreError) -> Self {
        RpcErr::Internal(value.to_string())
    }
}

impl From<VMError> for RpcErr {
    fn from(value: VMError) -> Self {
        RpcErr::Vm(value.to_string())
    }
}

impl From<ChainError> for RpcErr {
    fn from(value: ChainError) -> Self {
        match value {
            ChainError::InvalidTransaction(err) => match err {
                InvalidTransactionError::NonceMismatch { .. } => {
                    RpcErr::InvalidTransaction(err.to_string())
                }
                other => RpcErr::InvalidTransaction(other.to_string()),
            },
            ChainError::UnknownBlock(number) => RpcErr::UnknownBlock(number.to_string()),
            ChainError::UnknownTransaction(hash) => {
                RpcErr::UnknownTransaction(format!("{hash:#x}"))
            }
            ChainError::BadFilter(context) => RpcErr::BadFilter(context),
            ChainError::Reverted { data, .. } => RpcErr::Revert {
                data: format!("0x{}", hex::encode(data)),
            },
            ChainError::Vm(err) => RpcErr::Vm(err.to_string()),
            ChainError::Store(err) => RpcErr::Internal(err.to_string()),
            ChainError::Custom(context) => RpcErr::Internal(context),
        }
    }
}

// ========== RPC Request/Response Types ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcRequestId {
    Number(u64),
    String(String),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcRequest {
    pub id: RpcRequestId,
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Vec<Value>>,
}

impl Default for RpcRequest {
    fn default() -> Self {
        RpcRequest {
            id: RpcRequestId::Number(1),
            jsonrpc: "2.0".to_string(),
            method: String::new(),
            params: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcSuccessResponse {
    pub id: RpcRequestId,
    pub jsonrpc: String,
    pub result: Value,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcErrorResponse {
    pub id: RpcRequestId,
    pub jsonrpc: String,
    pub error: RpcErrorMetadata,
}
