//! Static and dynamic gas schedule.
//!
//! Static costs follow the Istanbul-era table, without the warm/cold
//! access-list dimension added later; every state access costs the same
//! whether or not the account was touched before. Dynamic formulas
//! (memory expansion, copies, hashing, logs, storage, calls, creates)
//! follow the canonical schedules.

use ethereum_types::U256;

use crate::{
    constants::{CALL_STIPEND, WORD_SIZE},
    errors::ExceptionalHalt,
};

// Base costs by family
pub const STOP: u64 = 0;
pub const ADD: u64 = 3;
pub const MUL: u64 = 5;
pub const SUB: u64 = 3;
pub const DIV: u64 = 5;
pub const SDIV: u64 = 5;
pub const MOD: u64 = 5;
pub const SMOD: u64 = 5;
pub const ADDMOD: u64 = 8;
pub const MULMOD: u64 = 8;
pub const EXP_STATIC: u64 = 10;
pub const EXP_DYNAMIC_BASE: u64 = 50;
pub const SIGNEXTEND: u64 = 5;
pub const COMPARISON: u64 = 3;
pub const BITWISE: u64 = 3;
pub const SHIFT: u64 = 3;
pub const KECCAK_STATIC: u64 = 30;
pub const KECCAK_DYNAMIC_BASE: u64 = 6;
pub const CONTEXT_CHEAP: u64 = 2;
pub const CALLDATALOAD: u64 = 3;
pub const COPY_STATIC: u64 = 3;
pub const COPY_DYNAMIC_BASE: u64 = 3;
pub const BALANCE: u64 = 700;
pub const EXTCODESIZE: u64 = 700;
pub const EXTCODECOPY_STATIC: u64 = 700;
pub const EXTCODEHASH: u64 = 700;
pub const BLOCKHASH: u64 = 20;
pub const SELFBALANCE: u64 = 5;
pub const POP: u64 = 2;
pub const MLOAD_STATIC: u64 = 3;
pub const MSTORE_STATIC: u64 = 3;
pub const MSTORE8_STATIC: u64 = 3;
pub const SLOAD: u64 = 800;
pub const JUMP: u64 = 8;
pub const JUMPI: u64 = 10;
pub const PC: u64 = 2;
pub const MSIZE: u64 = 2;
pub const GAS: u64 = 2;
pub const JUMPDEST: u64 = 1;
pub const PUSHN: u64 = 3;
pub const DUPN: u64 = 3;
pub const SWAPN: u64 = 3;
pub const LOGN_STATIC: u64 = 375;
pub const LOGN_DYNAMIC_TOPIC_BASE: u64 = 375;
pub const LOGN_DYNAMIC_BYTE_BASE: u64 = 8;
pub const CALL_STATIC: u64 = 700;
pub const CALL_VALUE_TRANSFER: u64 = 9000;
pub const CALL_NEW_ACCOUNT: u64 = 25000;
pub const CREATE_STATIC: u64 = 32000;
pub const CODE_DEPOSIT_BYTE: u64 = 200;
pub const SELFDESTRUCT_STATIC: u64 = 5000;
pub const SELFDESTRUCT_NEW_ACCOUNT: u64 = 25000;

// Storage (net gas metering, keyed on original/current/new values)
pub const SSTORE_NOOP: u64 = 800;
pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 5000;
pub const SSTORE_CLEARS_REFUND: u64 = 15000;
/// SSTORE is rejected outright below this much remaining gas.
pub const SSTORE_SENTRY: u64 = 2300;

/// Total cost of holding `words` 32-byte words of memory.
fn memory_cost(words: u64) -> Result<u64, ExceptionalHalt> {
    let linear = words.checked_mul(3).ok_or(ExceptionalHalt::OutOfGas)?;
    let quadratic = words
        .checked_mul(words)
        .ok_or(ExceptionalHalt::OutOfGas)?
        / 512;
    linear.checked_add(quadratic).ok_or(ExceptionalHalt::OutOfGas)
}

/// Cost of growing memory from `current_len` bytes to cover `new_end`.
pub fn memory_expansion_cost(current_len: usize, new_end: usize) -> Result<u64, ExceptionalHalt> {
    let current_words = (current_len as u64).div_ceil(WORD_SIZE as u64);
    let new_words = (new_end as u64).div_ceil(WORD_SIZE as u64);
    if new_words <= current_words {
        return Ok(0);
    }
    Ok(memory_cost(new_words)? - memory_cost(current_words)?)
}

/// Per-word cost component for KECCAK256 and the *COPY family.
pub fn words_cost(base_per_word: u64, size: usize) -> Result<u64, ExceptionalHalt> {
    let words = (size as u64).div_ceil(WORD_SIZE as u64);
    base_per_word
        .checked_mul(words)
        .ok_or(ExceptionalHalt::OutOfGas)
}

pub fn exp_cost(exponent: U256) -> u64 {
    let exponent_byte_size = (exponent.bits() as u64).div_ceil(8);
    EXP_STATIC + EXP_DYNAMIC_BASE * exponent_byte_size
}

pub fn log_cost(topic_count: usize, size: usize) -> Result<u64, ExceptionalHalt> {
    LOGN_STATIC
        .checked_add(LOGN_DYNAMIC_TOPIC_BASE * topic_count as u64)
        .and_then(|cost| cost.checked_add(LOGN_DYNAMIC_BYTE_BASE.checked_mul(size as u64)?))
        .ok_or(ExceptionalHalt::OutOfGas)
}

/// Storage write cost and refund delta, per net gas metering: the cost
/// depends on the slot's original (pre-transaction) value, its current
/// value and the value being written.
pub fn sstore_cost(original: U256, current: U256, new: U256) -> (u64, i64) {
    if current == new {
        return (SSTORE_NOOP, 0);
    }
    if original == current {
        if original.is_zero() {
            return (SSTORE_SET, 0);
        }
        let refund = if new.is_zero() {
            SSTORE_CLEARS_REFUND as i64
        } else {
            0
        };
        return (SSTORE_RESET, refund);
    }
    // Dirty slot: charge the no-op rate, adjust the refund counter.
    let mut refund: i64 = 0;
    if !original.is_zero() {
        if current.is_zero() {
            refund -= SSTORE_CLEARS_REFUND as i64;
        }
        if new.is_zero() {
            refund += SSTORE_CLEARS_REFUND as i64;
        }
    }
    if new == original {
        if original.is_zero() {
            refund += (SSTORE_SET - SSTORE_NOOP) as i64;
        } else {
            refund += (SSTORE_RESET - SSTORE_NOOP) as i64;
        }
    }
    (SSTORE_NOOP, refund)
}

/// Extra charges on top of CALL_STATIC for a value-bearing call, and the
/// stipend granted to the callee.
pub fn call_value_cost(value: U256, callee_is_empty: bool) -> (u64, u64) {
    if value.is_zero() {
        return (0, 0);
    }
    let mut cost = CALL_VALUE_TRANSFER;
    if callee_is_empty {
        cost += CALL_NEW_ACCOUNT;
    }
    (cost, CALL_STIPEND)
}
