mod account;
mod account_update;
mod block;
mod genesis;
mod receipt;
mod transaction;

pub use account::{Account, AccountInfo, AccountState};
pub use account_update::AccountUpdate;
pub use block::{Block, BlockHash, BlockHeader, BlockNumber};
pub use genesis::{Genesis, GenesisAccount};
pub use receipt::{Index, Log, Receipt, bloom_from_logs};
pub use transaction::{SignatureError, Transaction, TxKind};
