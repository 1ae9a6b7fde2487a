pub mod error;
mod filters;
mod vm_database;

pub use filters::{BlockLog, LogFilter, TopicFilter};
pub use vm_database::StoreVmDatabase;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tracing::{debug, info};

use hearth_common::{
    config::ChainConfig,
    types::{Block, BlockHeader, Genesis, Receipt, Transaction, bloom_from_logs},
};
use hearth_storage::Store;
use hearth_vm::{Environment, ExecutionReport, Overlay, VM, intrinsic_gas};

use error::{ChainError, InvalidTransactionError};

/// The in-process chain: executes transactions against the persisted
/// world state, appending one block per accepted transaction.
pub struct Blockchain {
    store: Store,
    config: ChainConfig,
}

impl Blockchain {
    pub fn new(store: Store, config: ChainConfig) -> Self {
        Self { store, config }
    }

    /// A chain over in-memory storage, initialised from the genesis.
    pub fn in_memory(genesis: &Genesis) -> Result<Self, ChainError> {
        let store = Store::in_memory();
        store.init_genesis(genesis)?;
        info!(chain_id = genesis.config.chain_id, "in-process chain ready");
        Ok(Self::new(store, genesis.config.clone()))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn latest_block(&self) -> Result<Block, ChainError> {
        let number = self
            .store
            .get_latest_block_number()?
            .ok_or(ChainError::UnknownBlock(0))?;
        self.store
            .get_block_by_number(number)?
            .ok_or(ChainError::UnknownBlock(number))
    }

    /// Drives one transaction through validation, execution and block
    /// assembly. Returns the transaction hash; the block and receipt are
    /// queryable once this returns.
    ///
    /// A transaction whose execution reverts still appends a block and
    /// advances the sender nonce; only pre-flight failures leave the
    /// chain untouched.
    pub fn send_transaction(&self, transaction: &Transaction) -> Result<H256, ChainError> {
        let parent = self.latest_block()?;
        let state_root = parent.header.state_root;

        // -- sender resolution and pre-flight validation
        let sender = transaction
            .recover_sender()
            .map_err(InvalidTransactionError::from)?;
        let account = self
            .store
            .get_account_state(state_root, sender)?
            .unwrap_or_else(|| hearth_common::types::AccountState::new(H256::zero()));

        let nonce = match transaction.nonce {
            Some(nonce) if nonce != account.nonce => {
                return Err(InvalidTransactionError::NonceMismatch {
                    expected: account.nonce,
                    got: nonce,
                }
                .into());
            }
            Some(nonce) => nonce,
            None => account.nonce,
        };

        let gas_price = U256::from(transaction.gas_price);
        let max_fee = gas_price * U256::from(transaction.gas);
        let required = max_fee + transaction.value;
        if account.balance < required {
            return Err(InvalidTransactionError::InsufficientFunds {
                balance: account.balance.to_string(),
                required: required.to_string(),
            }
            .into());
        }

        let intrinsic = intrinsic_gas(transaction.to.is_create(), &transaction.data);
        if transaction.gas < intrinsic {
            return Err(InvalidTransactionError::IntrinsicGasTooLow(transaction.gas, intrinsic).into());
        }
        if transaction.gas > self.config.block_gas_limit {
            return Err(InvalidTransactionError::ExceedsBlockGasLimit(
                transaction.gas,
                self.config.block_gas_limit,
            )
            .into());
        }

        let filled = Transaction {
            from: Some(sender),
            nonce: Some(nonce),
            ..transaction.clone()
        };
        let tx_hash = filled.compute_hash();

        // -- execution against an overlay on the parent state
        let block_number = parent.header.number + 1;
        let timestamp = parent.header.timestamp + 1;
        let env = Environment {
            origin: sender,
            gas_limit: filled.gas,
            gas_price: filled.gas_price,
            block_number,
            timestamp,
            coinbase: self.config.coinbase,
            chain_id: self.config.chain_id,
            block_gas_limit: self.config.block_gas_limit,
            block_hashes: self.recent_block_hashes(parent.header.number)?,
            value: filled.value,
        };

        let vm_db = StoreVmDatabase::new(self.store.clone(), state_root);
        let mut overlay = Overlay::new(&vm_db);

        // Fee escrow and nonce bump settle on the base layer: they stick
        // even when execution reverts.
        let mut sender_info = overlay
            .get_account_info(sender)
            .map_err(hearth_vm::VMError::from)?;
        sender_info.balance -= max_fee;
        sender_info.nonce += 1;
        overlay.set_account_info(sender, sender_info);

        let report = {
            let mut vm = VM::new(env, &mut overlay, filled.to.to(), filled.data.clone())?;
            vm.execute()?
        };

        // -- fee settlement
        let gas_used = report.gas_used;
        let refund = (U256::from(filled.gas) - U256::from(gas_used)) * gas_price;
        let mut sender_info = overlay
            .get_account_info(sender)
            .map_err(hearth_vm::VMError::from)?;
        sender_info.balance += refund;
        overlay.set_account_info(sender, sender_info);
        let mut coinbase_info = overlay
            .get_account_info(self.config.coinbase)
            .map_err(hearth_vm::VMError::from)?;
        coinbase_info.balance += U256::from(gas_used) * gas_price;
        overlay.set_account_info(self.config.coinbase, coinbase_info);

        // -- receipt and block assembly
        let updates = overlay.into_account_updates();
        let new_root = self.store.apply_account_updates(state_root, &updates)?;

        let receipt = Receipt {
            tx_hash,
            block_number,
            tx_index: 0,
            from: sender,
            to: filled.to.to(),
            contract_address: report.contract_address,
            succeeded: report.is_success(),
            gas_used,
            cumulative_gas_used: gas_used,
            logs: report.logs.clone(),
        };
        let block = Block {
            header: BlockHeader {
                number: block_number,
                parent_hash: parent.hash(),
                timestamp,
                state_root: new_root,
                logs_bloom: bloom_from_logs(&receipt.logs),
                gas_used,
            },
            transactions: vec![filled],
            receipts: vec![receipt],
        };
        self.store.add_block(&block)?;
        debug!(
            number = block_number,
            tx = %tx_hash,
            succeeded = report.is_success(),
            gas_used,
            "transaction executed"
        );
        Ok(tx_hash)
    }

    /// Executes a read-only call against the given block's state. Nothing
    /// is committed and no fees move; the report carries the return data.
    pub fn call(
        &self,
        from: Option<Address>,
        to: Option<Address>,
        data: Bytes,
        value: U256,
        gas: Option<u64>,
        block_number: u64,
    ) -> Result<ExecutionReport, ChainError> {
        let block = self
            .store
            .get_block_by_number(block_number)?
            .ok_or(ChainError::UnknownBlock(block_number))?;
        let state_root = block.header.state_root;
        let gas_limit = gas.unwrap_or(self.config.block_gas_limit);

        let env = Environment {
            origin: from.unwrap_or_default(),
            gas_limit,
            gas_price: self.config.gas_price,
            block_number: block.header.number,
            timestamp: block.header.timestamp,
            coinbase: self.config.coinbase,
            chain_id: self.config.chain_id,
            block_gas_limit: self.config.block_gas_limit,
            block_hashes: self.recent_block_hashes(block.header.number.saturating_sub(1))?,
            value,
        };

        let vm_db = StoreVmDatabase::new(self.store.clone(), state_root);
        let mut overlay = Overlay::new(&vm_db);
        let report = {
            let mut vm = VM::new(env, &mut overlay, to, data)?;
            vm.execute()?
        };
        Ok(report)
    }

    pub fn get_transaction_receipt(&self, tx_hash: H256) -> Result<Option<Receipt>, ChainError> {
        Ok(self.store.get_receipt(tx_hash)?)
    }

    /// State root as of the given block number.
    pub fn state_root_at(&self, block_number: u64) -> Result<H256, ChainError> {
        let block = self
            .store
            .get_block_by_number(block_number)?
            .ok_or(ChainError::UnknownBlock(block_number))?;
        Ok(block.header.state_root)
    }

    // Hashes of up to the 256 most recent ancestors, for BLOCKHASH.
    fn recent_block_hashes(
        &self,
        newest: u64,
    ) -> Result<std::collections::BTreeMap<u64, H256>, ChainError> {
        let mut hashes = std::collections::BTreeMap::new();
        let oldest = newest.saturating_sub(255);
        for number in oldest..=newest {
            if let Some(block) = self.store.get_block_by_number(number)? {
                hashes.insert(number, block.hash());
            }
        }
        Ok(hashes)
    }
}
