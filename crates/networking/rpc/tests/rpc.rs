use std::sync::Arc;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde_json::{Value, json};

use hearth_blockchain::Blockchain;
use hearth_common::{
    config::ChainConfig,
    types::{Genesis, GenesisAccount},
};
use hearth_rpc::{RpcApiContext, RpcRequest, handle_request};
use hearth_vm::operations::{Operation, assemble};

const GAS_PRICE: u64 = 50_000;

fn account_a() -> Address {
    Address::repeat_byte(0xa1)
}

fn account_b() -> Address {
    Address::repeat_byte(0xb2)
}

fn setup() -> RpcApiContext {
    let genesis = Genesis {
        config: ChainConfig::default(),
        timestamp: 0,
        alloc: [account_a(), account_b()]
            .into_iter()
            .map(|address| {
                (
                    address,
                    GenesisAccount {
                        balance: U256::from(u128::MAX),
                        ..Default::default()
                    },
                )
            })
            .collect(),
    };
    RpcApiContext {
        blockchain: Arc::new(Blockchain::in_memory(&genesis).unwrap()),
    }
}

fn request(context: &RpcApiContext, method: &str, params: Value) -> Value {
    let req: RpcRequest = serde_json::from_value(json!({
        "id": 1,
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    }))
    .unwrap();
    handle_request(&req, context.clone())
}

fn result(response: &Value) -> &Value {
    response
        .get("result")
        .unwrap_or_else(|| panic!("expected a result, got {response}"))
}

fn error(response: &Value) -> &Value {
    response
        .get("error")
        .unwrap_or_else(|| panic!("expected an error, got {response}"))
}

// keccak("Transfer(address,address,uint256)"), no 0x5b byte inside.
fn transfer_sig() -> H256 {
    H256(hearth_common::keccak::keccak(b"Transfer(address,address,uint256)").0)
}

fn set_owner_sig() -> H256 {
    H256(hearth_common::keccak::keccak(b"LogSetOwner(address)").0)
}

/// A minimal token-like contract, branch included:
/// - called with data: stores calldata[0..32] in slot 0 and emits
///   LOG2(Transfer_sig, calldata[32..64]) with the amount as data;
/// - called without data: returns slot 0.
fn token_runtime() -> Vec<u8> {
    let build = |dest: u8| {
        assemble(&[
            Operation::CallDataSize,
            Operation::IsZero,
            Operation::Push((1, U256::from(dest))),
            Operation::JumpI,
            // write path
            Operation::Push((1, U256::zero())),
            Operation::CallDataLoad,
            Operation::Push((1, U256::zero())),
            Operation::SStore,
            Operation::Push((1, U256::zero())),
            Operation::CallDataLoad,
            Operation::Push((1, U256::zero())),
            Operation::MStore,
            Operation::Push((1, U256::from(32))),
            Operation::CallDataLoad, // second topic
            Operation::Push((32, U256::from_big_endian(transfer_sig().as_bytes()))),
            Operation::Push((1, U256::from(32))), // size
            Operation::Push((1, U256::zero())),   // offset
            Operation::Log(2),
            Operation::Stop,
            // read path
            Operation::JumpDest,
            Operation::Push((1, U256::zero())),
            Operation::SLoad,
            Operation::Push((1, U256::zero())),
            Operation::MStore,
            Operation::Push((1, U256::from(32))),
            Operation::Push((1, U256::zero())),
            Operation::Return,
        ])
        .to_vec()
    };
    let probe = build(0);
    let dest = probe
        .iter()
        .rposition(|byte| *byte == 0x5b)
        .unwrap() as u8;
    build(dest)
}

/// Initcode: emit LogSetOwner(caller), then deploy `runtime` via CODECOPY.
fn constructor_initcode(runtime: &[u8]) -> Vec<u8> {
    let build = |offset: u8| {
        let header = assemble(&[
            // LOG1(SetOwner_sig) with the deployer address as data
            Operation::Caller,
            Operation::Push((1, U256::zero())),
            Operation::MStore,
            Operation::Push((32, U256::from_big_endian(set_owner_sig().as_bytes()))),
            Operation::Push((1, U256::from(32))),
            Operation::Push((1, U256::zero())),
            Operation::Log(1),
            // deploy
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
    let header_len = build(0).len() - runtime.len();
    build(header_len as u8)
}

fn hex_word(value: U256) -> String {
    format!("0x{}", hex::encode(value.to_big_endian()))
}

fn send_tx(context: &RpcApiContext, tx: Value) -> String {
    let response = request(context, "eth_sendTransaction", json!([tx]));
    result(&response).as_str().unwrap().to_string()
}

fn deploy_token(context: &RpcApiContext) -> String {
    let initcode = constructor_initcode(&token_runtime());
    let tx_hash = send_tx(
        context,
        json!({
            "from": format!("{:#x}", account_a()),
            "gas": "0xf4240",
            "data": format!("0x{}", hex::encode(&initcode)),
        }),
    );
    let receipt = request(context, "eth_getTransactionReceipt", json!([tx_hash]));
    let receipt = result(&receipt);
    assert_eq!(receipt["status"], "0x1");
    // The constructor emitted LogSetOwner with the deployer as data.
    let logs = receipt["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(
        logs[0]["topics"][0],
        format!("{:#x}", set_owner_sig())
    );
    let owner_word = logs[0]["data"].as_str().unwrap();
    assert!(owner_word.ends_with(&hex::encode(account_a().as_bytes())));
    receipt["contractAddress"].as_str().unwrap().to_string()
}

#[test]
fn gas_price_is_the_fixed_quote() {
    let context = setup();
    let response = request(&context, "eth_gasPrice", json!([]));
    assert_eq!(result(&response), "0xc350");
}

#[test]
fn chain_id_and_block_number_report_chain_state() {
    let context = setup();
    assert_eq!(result(&request(&context, "eth_chainId", json!([]))), "0x539");
    assert_eq!(
        result(&request(&context, "eth_blockNumber", json!([]))),
        "0x0"
    );
}

#[test]
fn unknown_method_is_rejected_with_32601() {
    let context = setup();
    let response = request(&context, "eth_subscribe", json!([]));
    assert_eq!(error(&response)["code"], -32601);
}

#[test]
fn missing_params_name_the_parameter() {
    let context = setup();
    let response = request(&context, "eth_sendTransaction", json!([]));
    let error = error(&response);
    assert_eq!(error["code"], -32000);
    assert!(
        error["message"]
            .as_str()
            .unwrap()
            .contains("Expected parameter: transaction is missing")
    );
}

#[test]
fn transfer_roundtrip_through_the_rpc_surface() {
    let context = setup();
    let tx_hash = send_tx(
        &context,
        json!({
            "from": format!("{:#x}", account_a()),
            "to": format!("{:#x}", account_b()),
            "value": "0x3039",
            "gas": "0x186a0",
        }),
    );
    assert!(tx_hash.starts_with("0x") && tx_hash.len() == 66);

    let receipt = request(&context, "eth_getTransactionReceipt", json!([tx_hash]));
    let receipt = result(&receipt);
    assert_eq!(receipt["status"], "0x1");
    assert_eq!(receipt["blockNumber"], "0x1");
    assert_eq!(receipt["gasUsed"], "0x5208");
    assert_eq!(receipt["to"], format!("{:#x}", account_b()));
    assert_eq!(receipt["contractAddress"], Value::Null);

    // The block is queryable and links to genesis.
    let block = request(&context, "eth_getBlockByNumber", json!(["0x1", true]));
    let block = result(&block);
    assert_eq!(block["number"], "0x1");
    assert_eq!(block["transactions"][0]["hash"], tx_hash.as_str());

    // Receipt of an unknown transaction is null.
    let missing = request(
        &context,
        "eth_getTransactionReceipt",
        json!([format!("{:#x}", H256::repeat_byte(9))]),
    );
    assert_eq!(result(&missing), &Value::Null);
}

#[test]
fn nonce_mismatch_is_an_invalid_transaction_error() {
    let context = setup();
    let response = request(
        &context,
        "eth_sendTransaction",
        json!([{
            "from": format!("{:#x}", account_a()),
            "to": format!("{:#x}", account_b()),
            "gas": "0x186a0",
            "nonce": "0x1",
        }]),
    );
    let error = error(&response);
    assert_eq!(error["code"], -32000);
    assert!(error["message"].as_str().unwrap().contains("Nonce mismatch"));
    // Nothing was appended.
    assert_eq!(
        result(&request(&context, "eth_blockNumber", json!([]))),
        "0x0"
    );
}

#[test]
fn token_deploy_write_query_and_event_history() {
    let context = setup();
    let token = deploy_token(&context);

    let wad_600 = U256::from(600u64) * U256::from(10u64).pow(U256::from(18));
    let wad_400 = U256::from(400u64) * U256::from(10u64).pow(U256::from(18));
    let mut recipient = H256::zero();
    recipient.0[12..].copy_from_slice(account_b().as_bytes());

    for wad in [wad_600, wad_400] {
        let mut data = wad.to_big_endian().to_vec();
        data.extend_from_slice(recipient.as_bytes());
        send_tx(
            &context,
            json!({
                "from": format!("{:#x}", account_a()),
                "to": token,
                "gas": "0x30d40",
                "data": format!("0x{}", hex::encode(&data)),
            }),
        );
    }

    // balanceOf-style read: empty calldata returns the stored word.
    let call = request(
        &context,
        "eth_call",
        json!([{ "to": token }, "latest"]),
    );
    assert_eq!(result(&call), &hex_word(wad_400));

    // getPastEvents from block 0: exactly the two writes, in block order.
    let logs = request(
        &context,
        "eth_getLogs",
        json!([{
            "fromBlock": "0x0",
            "address": token,
            "topics": [format!("{:#x}", transfer_sig())],
        }]),
    );
    let logs = result(&logs).as_array().unwrap().clone();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["data"], hex_word(wad_600));
    assert_eq!(logs[1]["data"], hex_word(wad_400));
    assert_eq!(logs[0]["topics"][1], format!("{recipient:#x}"));
    assert!(logs[0]["blockNumber"].as_str().unwrap() < logs[1]["blockNumber"].as_str().unwrap());

    // eth_getCode returns the deployed runtime.
    let code = request(&context, "eth_getCode", json!([token, "latest"]));
    assert_eq!(
        result(&code),
        &format!("0x{}", hex::encode(token_runtime()))
    );
}

#[test]
fn topic_sets_intersect_with_the_address_index() {
    let context = setup();
    let token = deploy_token(&context);

    let topics: Vec<H256> = (1u8..=3).map(H256::repeat_byte).collect();
    for topic in &topics {
        let mut data = U256::one().to_big_endian().to_vec();
        data.extend_from_slice(topic.as_bytes());
        send_tx(
            &context,
            json!({
                "from": format!("{:#x}", account_a()),
                "to": token,
                "gas": "0x30d40",
                "data": format!("0x{}", hex::encode(&data)),
            }),
        );
    }

    let logs = request(
        &context,
        "eth_getLogs",
        json!([{
            "fromBlock": "0x0",
            "address": token,
            "topics": [
                format!("{:#x}", transfer_sig()),
                [format!("{:#x}", topics[0]), format!("{:#x}", topics[2])],
            ],
        }]),
    );
    let logs = result(&logs).as_array().unwrap().clone();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["topics"][1], format!("{:#x}", topics[0]));
    assert_eq!(logs[1]["topics"][1], format!("{:#x}", topics[2]));
}

#[test]
fn backwards_ranges_are_bad_filters() {
    let context = setup();
    let response = request(
        &context,
        "eth_getLogs",
        json!([{ "fromBlock": "0x5", "toBlock": "0x1" }]),
    );
    let error = error(&response);
    assert_eq!(error["code"], -32000);
    assert!(error["message"].as_str().unwrap().contains("Bad filter"));
}

#[test]
fn eth_call_surfaces_reverts_with_their_payload() {
    let context = setup();
    // Deploy a contract that reverts with a 32-byte payload.
    let runtime = assemble(&[
        Operation::Push((1, U256::from(0xab))),
        Operation::Push((1, U256::zero())),
        Operation::MStore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Revert,
    ]);
    let initcode = constructor_initcode(&runtime);
    let tx_hash = send_tx(
        &context,
        json!({
            "from": format!("{:#x}", account_a()),
            "gas": "0xf4240",
            "data": format!("0x{}", hex::encode(&initcode)),
        }),
    );
    let receipt = request(&context, "eth_getTransactionReceipt", json!([tx_hash]));
    let contract = result(&receipt)["contractAddress"]
        .as_str()
        .unwrap()
        .to_string();

    let response = request(&context, "eth_call", json!([{ "to": contract }, "latest"]));
    let error = error(&response);
    assert_eq!(error["code"], 3);
    assert_eq!(error["data"], hex_word(U256::from(0xab)));
}

#[test]
fn balances_and_nonces_read_back_in_wire_format() {
    let context = setup();
    let response = request(
        &context,
        "eth_getBalance",
        json!([format!("{:#x}", Address::repeat_byte(0x77)), "latest"]),
    );
    // Zero encodes as the minimal quantity.
    assert_eq!(result(&response), "0x0");

    let response = request(
        &context,
        "eth_getTransactionCount",
        json!([format!("{:#x}", account_a()), "latest"]),
    );
    assert_eq!(result(&response), "0x0");
}
