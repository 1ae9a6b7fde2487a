pub mod config;
pub mod constants;
pub mod keccak;
pub mod serde_utils;
pub mod types;

pub use bytes::Bytes;
pub use ethereum_types::{Address, Bloom, H160, H256, U256};
