use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

use hearth_blockchain::{Blockchain, LogFilter, TopicFilter};
use hearth_common::{
    config::ChainConfig,
    types::{Genesis, GenesisAccount, Transaction, TxKind},
};
use hearth_vm::{
    operations::{Operation, assemble},
    utils::calculate_create_address,
};

const FUNDS: u64 = 10_000_000_000_000_000;
const GAS_PRICE: u64 = 50_000;

fn account_a() -> Address {
    Address::repeat_byte(0xa1)
}

fn account_b() -> Address {
    Address::repeat_byte(0xb2)
}

fn test_chain() -> Blockchain {
    let genesis = Genesis {
        config: ChainConfig::default(),
        timestamp: 0,
        alloc: [account_a(), account_b()]
            .into_iter()
            .map(|address| {
                (
                    address,
                    GenesisAccount {
                        balance: U256::from(FUNDS) * U256::from(GAS_PRICE),
                        ..Default::default()
                    },
                )
            })
            .collect(),
    };
    Blockchain::in_memory(&genesis).unwrap()
}

fn transfer_tx(from: Address, to: Address, value: u64) -> Transaction {
    Transaction {
        from: Some(from),
        to: TxKind::Call(to),
        gas: 100_000,
        gas_price: GAS_PRICE,
        value: U256::from(value),
        ..Default::default()
    }
}

/// Wraps runtime code in initcode that deploys it via CODECOPY.
fn deploy_initcode(runtime: &[u8]) -> Bytes {
    let build = |offset: u8| {
        let header = assemble(&[
            Operation::Push((1, U256::from(runtime.len()))),
            Operation::Push((1, U256::from(offset))),
            Operation::Push((1, U256::zero())),
            Operation::CodeCopy,
            Operation::Push((1, U256::from(runtime.len()))),
            Operation::Push((1, U256::zero())),
            Operation::Return,
        ]);
        let mut code = header.to_vec();
        code.extend_from_slice(runtime);
        code
    };
    // Two passes: the runtime offset equals the header length.
    let header_len = build(0).len() - runtime.len();
    Bytes::from(build(header_len as u8))
}

fn balance_of(chain: &Blockchain, address: Address) -> U256 {
    let root = chain.latest_block().unwrap().header.state_root;
    chain
        .store()
        .get_account_state(root, address)
        .unwrap()
        .map(|account| account.balance)
        .unwrap_or_default()
}

fn nonce_of(chain: &Blockchain, address: Address) -> u64 {
    let root = chain.latest_block().unwrap().header.state_root;
    chain
        .store()
        .get_account_state(root, address)
        .unwrap()
        .map(|account| account.nonce)
        .unwrap_or_default()
}

#[test]
fn plain_transfer_moves_value_and_pays_the_coinbase() {
    let chain = test_chain();
    let a_before = balance_of(&chain, account_a());
    let b_before = balance_of(&chain, account_b());

    let tx_hash = chain
        .send_transaction(&transfer_tx(account_a(), account_b(), 12_345))
        .unwrap();
    let receipt = chain.get_transaction_receipt(tx_hash).unwrap().unwrap();
    assert!(receipt.succeeded);
    assert_eq!(receipt.gas_used, 21_000);
    assert_eq!(receipt.block_number, 1);

    let fee = U256::from(21_000u64) * U256::from(GAS_PRICE);
    assert_eq!(
        balance_of(&chain, account_a()),
        a_before - U256::from(12_345) - fee
    );
    assert_eq!(balance_of(&chain, account_b()), b_before + U256::from(12_345));
    // The fee lands on the coinbase, conserving the total supply.
    assert_eq!(balance_of(&chain, Address::zero()), fee);
    assert_eq!(
        balance_of(&chain, account_a())
            + balance_of(&chain, account_b())
            + balance_of(&chain, Address::zero()),
        a_before + b_before
    );
    assert_eq!(nonce_of(&chain, account_a()), 1);
}

#[test]
fn nonce_mismatch_is_rejected_without_side_effects() {
    let chain = test_chain();
    let a_before = balance_of(&chain, account_a());

    let mut tx = transfer_tx(account_a(), account_b(), 1);
    tx.nonce = Some(1); // current is 0
    let result = chain.send_transaction(&tx);
    assert!(matches!(
        result,
        Err(hearth_blockchain::error::ChainError::InvalidTransaction(_))
    ));

    // No block appended, no balance or nonce movement.
    assert_eq!(chain.latest_block().unwrap().header.number, 0);
    assert_eq!(balance_of(&chain, account_a()), a_before);
    assert_eq!(nonce_of(&chain, account_a()), 0);
}

#[test]
fn insufficient_funds_are_rejected_preflight() {
    let chain = test_chain();
    let poor = Address::repeat_byte(0x99);
    let result = chain.send_transaction(&transfer_tx(poor, account_b(), 1));
    assert!(matches!(
        result,
        Err(hearth_blockchain::error::ChainError::InvalidTransaction(_))
    ));
    assert_eq!(chain.latest_block().unwrap().header.number, 0);
}

#[test]
fn deploy_stores_runtime_code_at_the_derived_address() {
    let chain = test_chain();
    // Runtime that returns the constant 42.
    let runtime = assemble(&[
        Operation::Push((1, U256::from(42))),
        Operation::Push((1, U256::zero())),
        Operation::MStore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ]);

    let tx = Transaction {
        from: Some(account_a()),
        to: TxKind::Create,
        gas: 1_000_000,
        gas_price: GAS_PRICE,
        data: deploy_initcode(&runtime),
        ..Default::default()
    };
    let tx_hash = chain.send_transaction(&tx).unwrap();
    let receipt = chain.get_transaction_receipt(tx_hash).unwrap().unwrap();
    assert!(receipt.succeeded);

    let expected = calculate_create_address(account_a(), 0);
    assert_eq!(receipt.contract_address, Some(expected));

    let root = chain.latest_block().unwrap().header.state_root;
    assert_eq!(
        chain.store().get_code(root, expected).unwrap(),
        runtime
    );

    // And the deployed contract answers calls.
    let report = chain
        .call(None, Some(expected), Bytes::new(), U256::zero(), None, 1)
        .unwrap();
    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(42));
}

#[test]
fn create_collision_burns_gas_but_advances_the_nonce() {
    // Seed code at the address the first create from A would target.
    let occupied = calculate_create_address(account_a(), 0);
    let mut genesis = Genesis {
        config: ChainConfig::default(),
        timestamp: 0,
        alloc: [(
            account_a(),
            GenesisAccount {
                balance: U256::from(FUNDS) * U256::from(GAS_PRICE),
                ..Default::default()
            },
        )]
        .into(),
    };
    genesis.alloc.insert(
        occupied,
        GenesisAccount {
            code: Bytes::from_static(&[0x00]),
            nonce: 1,
            ..Default::default()
        },
    );
    let chain = Blockchain::in_memory(&genesis).unwrap();

    let tx = Transaction {
        from: Some(account_a()),
        to: TxKind::Create,
        gas: 100_000,
        gas_price: GAS_PRICE,
        data: Bytes::from_static(&[0x00]),
        ..Default::default()
    };
    let tx_hash = chain.send_transaction(&tx).unwrap();
    let receipt = chain.get_transaction_receipt(tx_hash).unwrap().unwrap();

    assert!(!receipt.succeeded);
    assert_eq!(receipt.contract_address, None);
    // All gas consumed, nonce advanced, block appended.
    assert_eq!(receipt.gas_used, 100_000);
    assert_eq!(nonce_of(&chain, account_a()), 1);
    assert_eq!(chain.latest_block().unwrap().header.number, 1);
}

#[test]
fn reverting_transaction_still_appends_a_block() {
    let chain = test_chain();
    // Runtime that always reverts with a 32-byte payload.
    let runtime = assemble(&[
        Operation::Push((1, U256::from(0xaa))),
        Operation::Push((1, U256::zero())),
        Operation::MStore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Revert,
    ]);
    let deploy = Transaction {
        from: Some(account_a()),
        to: TxKind::Create,
        gas: 1_000_000,
        gas_price: GAS_PRICE,
        data: deploy_initcode(&runtime),
        ..Default::default()
    };
    let deploy_hash = chain.send_transaction(&deploy).unwrap();
    let deploy_receipt = chain.get_transaction_receipt(deploy_hash).unwrap().unwrap();
    let contract = deploy_receipt.contract_address.unwrap();

    // eth_call surfaces the revert payload untouched.
    let report = chain
        .call(None, Some(contract), Bytes::new(), U256::zero(), None, 1)
        .unwrap();
    match report.result {
        hearth_vm::TxResult::Revert(data) => {
            assert_eq!(U256::from_big_endian(&data), U256::from(0xaa));
        }
        hearth_vm::TxResult::Success => panic!("expected revert"),
    }

    // A transaction doing the same gets a failed receipt, no logs, an
    // advanced nonce and a new block.
    let call_tx = Transaction {
        from: Some(account_a()),
        to: TxKind::Call(contract),
        gas: 200_000,
        gas_price: GAS_PRICE,
        ..Default::default()
    };
    let tx_hash = chain.send_transaction(&call_tx).unwrap();
    let receipt = chain.get_transaction_receipt(tx_hash).unwrap().unwrap();
    assert!(!receipt.succeeded);
    assert!(receipt.logs.is_empty());
    assert_eq!(nonce_of(&chain, account_a()), 2);
    assert_eq!(chain.latest_block().unwrap().header.number, 2);
}

#[test]
fn blocks_link_by_parent_hash_from_genesis() {
    let chain = test_chain();
    for _ in 0..3 {
        chain
            .send_transaction(&transfer_tx(account_a(), account_b(), 1))
            .unwrap();
    }
    let mut previous_hash = None;
    for number in 0..=3 {
        let block = chain.store().get_block_by_number(number).unwrap().unwrap();
        assert_eq!(block.header.number, number);
        if let Some(previous_hash) = previous_hash {
            assert_eq!(block.header.parent_hash, previous_hash);
        }
        previous_hash = Some(block.hash());
    }
    assert_eq!(chain.store().get_latest_block_number().unwrap(), Some(3));
}

#[test]
fn identical_histories_produce_identical_roots() {
    let run = || {
        let chain = test_chain();
        chain
            .send_transaction(&transfer_tx(account_a(), account_b(), 777))
            .unwrap();
        chain
            .send_transaction(&transfer_tx(account_b(), account_a(), 333))
            .unwrap();
        let block = chain.latest_block().unwrap();
        (block.header.state_root, block.hash())
    };
    assert_eq!(run(), run());
}

#[test]
fn state_roots_commit_to_the_world_after_each_block() {
    let chain = test_chain();
    chain
        .send_transaction(&transfer_tx(account_a(), account_b(), 500))
        .unwrap();
    let root_1 = chain.latest_block().unwrap().header.state_root;
    chain
        .send_transaction(&transfer_tx(account_a(), account_b(), 500))
        .unwrap();
    let root_2 = chain.latest_block().unwrap().header.state_root;
    assert_ne!(root_1, root_2);

    // Both historical roots resolve, with their respective balances.
    let b_at_1 = chain
        .store()
        .get_account_state(root_1, account_b())
        .unwrap()
        .unwrap()
        .balance;
    let b_at_2 = chain
        .store()
        .get_account_state(root_2, account_b())
        .unwrap()
        .unwrap()
        .balance;
    assert_eq!(b_at_2 - b_at_1, U256::from(500));
}

#[test]
fn log_filter_by_topic_set_returns_block_ordered_matches() {
    let chain = test_chain();
    // Runtime emitting LOG2(sig, calldata[0..32]) with empty data.
    let sig = H256::repeat_byte(0x77);
    let runtime = assemble(&[
        Operation::Push((1, U256::zero())),
        Operation::CallDataLoad, // topic2
        Operation::Push((32, U256::from_big_endian(sig.as_bytes()))),
        Operation::Push((1, U256::zero())), // size
        Operation::Push((1, U256::zero())), // offset
        Operation::Log(2),
        Operation::Stop,
    ]);
    let deploy = Transaction {
        from: Some(account_a()),
        to: TxKind::Create,
        gas: 1_000_000,
        gas_price: GAS_PRICE,
        data: deploy_initcode(&runtime),
        ..Default::default()
    };
    let deploy_hash = chain.send_transaction(&deploy).unwrap();
    let contract = chain
        .get_transaction_receipt(deploy_hash)
        .unwrap()
        .unwrap()
        .contract_address
        .unwrap();

    let topic_x = H256::repeat_byte(0x01);
    let topic_y = H256::repeat_byte(0x02);
    let topic_z = H256::repeat_byte(0x03);
    for topic in [topic_x, topic_y, topic_z] {
        let tx = Transaction {
            from: Some(account_a()),
            to: TxKind::Call(contract),
            gas: 200_000,
            gas_price: GAS_PRICE,
            data: Bytes::from(topic.as_bytes().to_vec()),
            ..Default::default()
        };
        chain.send_transaction(&tx).unwrap();
    }

    let filter = LogFilter {
        from_block: 0,
        to_block: chain.latest_block().unwrap().header.number,
        address: Some(contract),
        topics: vec![
            TopicFilter::Exact(sig),
            TopicFilter::OneOf(vec![topic_x, topic_z]),
        ],
    };
    let logs = chain.get_logs(&filter).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].log.topics[1], topic_x);
    assert_eq!(logs[1].log.topics[1], topic_z);
    assert!(logs[0].block_number < logs[1].block_number);

    // Address-less filters scan instead of using the index.
    let scan = chain
        .get_logs(&LogFilter {
            from_block: 0,
            to_block: chain.latest_block().unwrap().header.number,
            address: None,
            topics: vec![TopicFilter::Exact(sig)],
        })
        .unwrap();
    assert_eq!(scan.len(), 3);
}

#[test]
fn backwards_block_range_is_a_bad_filter() {
    let chain = test_chain();
    let result = chain.get_logs(&LogFilter {
        from_block: 5,
        to_block: 1,
        address: None,
        topics: Vec::new(),
    });
    assert!(matches!(
        result,
        Err(hearth_blockchain::error::ChainError::BadFilter(_))
    ));
}

#[test]
fn unknown_receipt_is_none() {
    let chain = test_chain();
    assert!(chain
        .get_transaction_receipt(H256::repeat_byte(0x12))
        .unwrap()
        .is_none());
}
