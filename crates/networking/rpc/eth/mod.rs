pub mod account;
pub mod block;
pub mod client;
pub mod gas_price;
pub mod logs;
pub mod transaction;
