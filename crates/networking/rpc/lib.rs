mod eth;
mod rpc;
mod rpc_types;
mod types;

pub use rpc::{RpcApiContext, RpcHandler, handle_request, map_eth_requests, rpc_response};
pub use rpc_types::{RpcErr, RpcErrorMetadata, RpcRequest, RpcRequestId};
pub use types::{BlockIdentifier, RpcLog, RpcReceipt, RpcTransactionRequest};
