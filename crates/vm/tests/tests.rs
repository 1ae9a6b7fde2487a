use bytes::Bytes;
use ethereum_types::{H256, U256};

use hearth_vm::{
    Environment, Overlay, TX_BASE_COST, TxResult, VM,
    operations::{Operation, assemble},
    testing::{TestDb, contract_address, db_with_contract, test_env},
    utils::calculate_create_address,
};

const GAS: u64 = 1_000_000;

fn run_contract(db: &TestDb, env: Environment, calldata: Bytes) -> hearth_vm::ExecutionReport {
    let mut overlay = Overlay::new(db);
    let mut vm = VM::new(env, &mut overlay, Some(contract_address()), calldata).unwrap();
    vm.execute().unwrap()
}

fn run_ops(operations: &[Operation]) -> hearth_vm::ExecutionReport {
    let db = db_with_contract(assemble(operations));
    run_contract(&db, test_env(GAS), Bytes::new())
}

// Returns one 32-byte word from memory.
fn return_top_of_stack() -> Vec<Operation> {
    vec![
        Operation::Push((1, U256::zero())),
        Operation::MStore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ]
}

fn returned_word(report: &hearth_vm::ExecutionReport) -> U256 {
    assert!(report.is_success(), "execution failed: {:?}", report.result);
    U256::from_big_endian(&report.output)
}

#[test]
fn add_returns_sum() {
    let mut operations = vec![
        Operation::Push((1, U256::from(11))),
        Operation::Push((1, U256::from(31))),
        Operation::Add,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    assert_eq!(returned_word(&report), U256::from(42));
}

#[test]
fn arithmetic_wraps_around() {
    let mut operations = vec![
        Operation::Push((1, U256::one())),
        Operation::Push((32, U256::MAX)),
        Operation::Add,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    assert_eq!(returned_word(&report), U256::zero());
}

#[test]
fn sdiv_handles_negative_operands() {
    // -6 / 2 == -3
    let minus_six = U256::zero().overflowing_sub(U256::from(6)).0;
    let mut operations = vec![
        Operation::Push((1, U256::from(2))),
        Operation::Push((32, minus_six)),
        Operation::SDiv,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    let minus_three = U256::zero().overflowing_sub(U256::from(3)).0;
    assert_eq!(returned_word(&report), minus_three);
}

#[test]
fn division_by_zero_is_zero() {
    let mut operations = vec![
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::from(7))),
        Operation::Div,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    assert_eq!(returned_word(&report), U256::zero());
}

#[test]
fn signed_comparison_orders_negatives_first() {
    let minus_one = U256::MAX;
    let mut operations = vec![
        Operation::Push((1, U256::one())),
        Operation::Push((32, minus_one)),
        Operation::Slt,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    assert_eq!(returned_word(&report), U256::one());
}

#[test]
fn sar_extends_the_sign_bit() {
    let mut operations = vec![
        Operation::Push((32, U256::MAX)),
        Operation::Push((1, U256::from(4))),
        Operation::Sar,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    assert_eq!(returned_word(&report), U256::MAX);
}

#[test]
fn keccak_of_empty_input_is_the_known_constant() {
    let mut operations = vec![
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Keccak256,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    assert_eq!(
        returned_word(&report),
        U256::from_big_endian(hearth_common::constants::EMPTY_CODE_HASH.as_bytes())
    );
}

#[test]
fn exact_gas_for_simple_program() {
    // PUSH1 + PUSH1 + ADD + POP = 3 + 3 + 3 + 2 on top of the base cost.
    let report = run_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::one())),
        Operation::Add,
        Operation::Pop,
        Operation::Stop,
    ]);
    assert!(report.is_success());
    assert_eq!(report.gas_used, TX_BASE_COST + 11);
}

#[test]
fn memory_expansion_cost_is_charged_per_word() {
    let base = run_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::zero())),
        Operation::MStore,
        Operation::Stop,
    ]);
    let expanded = run_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Push((2, U256::from(32 * 9))),
        Operation::MStore,
        Operation::Stop,
    ]);
    // Ten words instead of one: 3 * 9 extra linear words (the quadratic
    // term stays zero this small).
    assert_eq!(expanded.gas_used - base.gas_used, 27);
}

#[test]
fn stack_depth_1024_tolerates_dup_pop() {
    let mut operations = vec![Operation::Push((1, U256::one())); 1023];
    operations.push(Operation::Dup(1)); // hits exactly 1024
    operations.push(Operation::Pop);
    operations.push(Operation::Stop);
    let report = run_ops(&operations);
    assert!(report.is_success());
}

#[test]
fn stack_overflow_at_1025_consumes_all_gas() {
    let mut operations = vec![Operation::Push((1, U256::one())); 1024];
    operations.push(Operation::Dup(1));
    operations.push(Operation::Stop);
    let report = run_ops(&operations);
    assert!(!report.is_success());
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn invalid_jump_consumes_all_gas() {
    // Target 1 lands inside the PUSH immediate.
    let report = run_ops(&[
        Operation::Push((1, U256::one())),
        Operation::Jump,
        Operation::Stop,
    ]);
    assert!(!report.is_success());
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn jumpi_follows_the_taken_branch() {
    // Layout: PUSH1(0..2) PUSH1(2..4) JUMPI(4) PUSH1(5..7) STOP(7)
    // JUMPDEST(8) PUSH1 9 ... — the taken branch lands on byte 8.
    let mut taken_branch = vec![
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::from(8))),
        Operation::JumpI,
        Operation::Push((1, U256::from(7))),
        Operation::Stop,
        Operation::JumpDest,
        Operation::Push((1, U256::from(9))),
    ];
    taken_branch.extend(return_top_of_stack());
    let report = run_ops(&taken_branch);
    assert_eq!(returned_word(&report), U256::from(9));
}

#[test]
fn invalid_opcode_consumes_all_gas() {
    let report = run_ops(&[Operation::Invalid]);
    assert!(!report.is_success());
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn revert_returns_data_and_refunds_gas() {
    let report = run_ops(&[
        Operation::Push((1, U256::from(0xab))),
        Operation::Push((1, U256::zero())),
        Operation::MStore,
        Operation::Push((1, U256::from(32))),
        Operation::Push((1, U256::zero())),
        Operation::Revert,
    ]);
    match &report.result {
        TxResult::Revert(data) => {
            assert_eq!(U256::from_big_endian(data), U256::from(0xab));
        }
        TxResult::Success => panic!("expected revert"),
    }
    // Only what ran was charged, the rest returns to the caller.
    assert!(report.gas_used < GAS / 2);
}

#[test]
fn sstore_then_sload_reads_back_within_the_frame() {
    let mut operations = vec![
        Operation::Push((1, U256::from(77))),
        Operation::Push((1, U256::from(5))),
        Operation::SStore,
        Operation::Push((1, U256::from(5))),
        Operation::SLoad,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    assert_eq!(returned_word(&report), U256::from(77));
}

#[test]
fn sstore_commits_to_overlay_on_success() {
    let db = db_with_contract(assemble(&[
        Operation::Push((1, U256::from(99))),
        Operation::Push((1, U256::zero())),
        Operation::SStore,
        Operation::Stop,
    ]));
    let mut overlay = Overlay::new(&db);
    {
        let mut vm = VM::new(
            test_env(GAS),
            &mut overlay,
            Some(contract_address()),
            Bytes::new(),
        )
        .unwrap();
        assert!(vm.execute().unwrap().is_success());
    }
    assert_eq!(
        overlay
            .get_storage(contract_address(), H256::zero())
            .unwrap(),
        U256::from(99)
    );
}

#[test]
fn reverted_frame_leaves_no_storage_behind() {
    let db = db_with_contract(assemble(&[
        Operation::Push((1, U256::from(99))),
        Operation::Push((1, U256::zero())),
        Operation::SStore,
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Revert,
    ]));
    let mut overlay = Overlay::new(&db);
    {
        let mut vm = VM::new(
            test_env(GAS),
            &mut overlay,
            Some(contract_address()),
            Bytes::new(),
        )
        .unwrap();
        assert!(!vm.execute().unwrap().is_success());
    }
    assert_eq!(
        overlay
            .get_storage(contract_address(), H256::zero())
            .unwrap(),
        U256::zero()
    );
}

#[test]
fn sstore_clear_grants_a_refund() {
    let mut db = db_with_contract(assemble(&[
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::SStore,
        Operation::Stop,
    ]));
    db.set_storage(contract_address(), H256::zero(), U256::from(5));
    let report = run_contract(&db, test_env(GAS), Bytes::new());
    assert!(report.is_success());
    // The 15000 clear refund hits the gas_used/2 cap:
    // 21000 + 3 + 3 + 5000 = 26006 spent, so 13003 comes back.
    assert_eq!(report.gas_refunded, 13_003);
    assert_eq!(report.gas_used, 13_003);
}

#[test]
fn calldata_flows_into_execution() {
    let mut operations = vec![
        Operation::Push((1, U256::zero())),
        Operation::CallDataLoad,
    ];
    operations.extend(return_top_of_stack());
    let db = db_with_contract(assemble(&operations));
    let word = U256::from(0xdeadbeefu64);
    let calldata = Bytes::from(word.to_big_endian().to_vec());
    let report = run_contract(&db, test_env(GAS), calldata);
    assert_eq!(returned_word(&report), word);
}

#[test]
fn log_records_topics_and_data() {
    let report = run_ops(&[
        Operation::Push((1, U256::from(0x51))),
        Operation::Push((1, U256::zero())),
        Operation::MStore,
        // LOG1 pops offset, size, then the topic.
        Operation::Push((32, U256::from(7))), // topic
        Operation::Push((1, U256::from(32))), // size
        Operation::Push((1, U256::zero())),   // offset
        Operation::Log(1),
        Operation::Stop,
    ]);
    assert!(report.is_success());
    assert_eq!(report.logs.len(), 1);
    let log = &report.logs[0];
    assert_eq!(log.address, contract_address());
    assert_eq!(log.topics, vec![H256::from_low_u64_be(7)]);
    assert_eq!(U256::from_big_endian(&log.data), U256::from(0x51));
}

#[test]
fn create_deploys_returned_runtime() {
    // initcode: MSTORE8 the byte 0x2a at 0, RETURN 1 byte.
    // Deployer contract runs CREATE with that initcode from memory.
    // initcode bytes:
    let initcode: Vec<u8> = assemble(&[
        Operation::Push((1, U256::from(0x2a))),
        Operation::Push((1, U256::zero())),
        Operation::MStore8,
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::zero())),
        Operation::Return,
    ])
    .to_vec();
    let initcode_len = initcode.len();
    let initcode_word = {
        let mut padded = [0u8; 32];
        padded[..initcode_len].copy_from_slice(&initcode);
        U256::from_big_endian(&padded)
    };

    let mut operations = vec![
        // memory[0..32] = initcode (left-aligned)
        Operation::Push((32, initcode_word)),
        Operation::Push((1, U256::zero())),
        Operation::MStore,
        // CREATE(value=0, offset=0, size=len)
        Operation::Push((1, U256::from(initcode_len))),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Create,
    ];
    operations.extend(return_top_of_stack());
    let report = run_ops(&operations);
    let created = returned_word(&report);
    // The deployer's nonce was 1, so the child address derives from it.
    let expected = calculate_create_address(contract_address(), 1);
    assert_eq!(created, hearth_vm::utils::address_to_word(expected));
}

#[test]
fn call_out_of_gas_in_callee_leaves_caller_running() {
    // Callee spins until its gas runs out.
    let callee_address = ethereum_types::Address::repeat_byte(0xee);
    let callee = assemble(&[
        Operation::JumpDest,
        Operation::Push((1, U256::zero())),
        Operation::Jump,
    ]);

    // Caller forwards a small fixed amount of gas, stores the status word
    // and returns it.
    let mut operations = vec![
        Operation::Push((1, U256::zero())),  // ret_size
        Operation::Push((1, U256::zero())),  // ret_offset
        Operation::Push((1, U256::zero())),  // args_size
        Operation::Push((1, U256::zero())),  // args_offset
        Operation::Push((1, U256::zero())),  // value
        Operation::Push((20, hearth_vm::utils::address_to_word(callee_address))),
        Operation::Push((2, U256::from(5_000))), // gas for the callee
        Operation::Call,
    ];
    operations.extend(return_top_of_stack());

    let mut db = db_with_contract(assemble(&operations));
    db.set_code(callee_address, callee);
    db.set_nonce(callee_address, 1);

    let report = run_contract(&db, test_env(GAS), Bytes::new());
    // Caller succeeded, callee's failure shows up as a zero status word.
    assert_eq!(returned_word(&report), U256::zero());
    // The forwarded gas is gone.
    assert!(report.gas_used > 5_000);
}

#[test]
fn static_call_blocks_writes() {
    let callee_address = ethereum_types::Address::repeat_byte(0xee);
    let callee = assemble(&[
        Operation::Push((1, U256::one())),
        Operation::Push((1, U256::zero())),
        Operation::SStore,
        Operation::Stop,
    ]);

    let mut operations = vec![
        Operation::Push((1, U256::zero())), // ret_size
        Operation::Push((1, U256::zero())), // ret_offset
        Operation::Push((1, U256::zero())), // args_size
        Operation::Push((1, U256::zero())), // args_offset
        Operation::Push((20, hearth_vm::utils::address_to_word(callee_address))),
        Operation::Push((2, U256::from(50_000))),
        Operation::StaticCall,
    ];
    operations.extend(return_top_of_stack());

    let mut db = db_with_contract(assemble(&operations));
    db.set_code(callee_address, callee);
    db.set_nonce(callee_address, 1);

    let report = run_contract(&db, test_env(GAS), Bytes::new());
    assert_eq!(returned_word(&report), U256::zero());
}

#[test]
fn call_at_depth_limit_fails_cleanly() {
    // Calling a codeless account succeeds in general, but not one frame
    // past the depth limit.
    let target = ethereum_types::Address::repeat_byte(0xdd);
    let mut operations = vec![
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((1, U256::zero())),
        Operation::Push((20, hearth_vm::utils::address_to_word(target))),
        Operation::Push((2, U256::from(10_000))),
        Operation::Call,
    ];
    operations.extend(return_top_of_stack());
    let db = db_with_contract(assemble(&operations));

    let run_at_depth = |depth: usize| {
        let mut overlay = Overlay::new(&db);
        let mut vm = VM::new(
            test_env(GAS),
            &mut overlay,
            Some(contract_address()),
            Bytes::new(),
        )
        .unwrap();
        vm.current_call_frame.depth = depth;
        vm.execute().unwrap()
    };

    // At depth 1023 the child (depth 1024) is allowed, and the codeless
    // callee hands its gas straight back.
    let report_ok = run_at_depth(1023);
    assert_eq!(returned_word(&report_ok), U256::one());

    // At depth 1024 the child would be frame 1025: the call fails and the
    // 10_000 gas that would have been forwarded is consumed anyway.
    let report_at_limit = run_at_depth(1024);
    assert_eq!(returned_word(&report_at_limit), U256::zero());
    assert_eq!(report_at_limit.gas_used, report_ok.gas_used + 10_000);
}

#[test]
fn stack_underflow_is_frame_local() {
    let report = run_ops(&[Operation::Pop]);
    assert!(!report.is_success());
    assert_eq!(report.gas_used, GAS);
}
