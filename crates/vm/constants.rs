/// Maximum word-stack depth per frame.
pub const STACK_LIMIT: usize = 1024;

/// Maximum call/create nesting depth.
pub const CALL_DEPTH_LIMIT: usize = 1024;

/// Maximum size of deployed contract code, in bytes.
pub const MAX_CODE_SIZE: usize = 24576;

/// Gas kept back from a sub-call: a frame may forward at most
/// all-but-one-64th of its remaining gas.
pub const GAS_RETAIN_DIVISOR: u64 = 64;

/// Gas stipend granted to the callee of a value-bearing call.
pub const CALL_STIPEND: u64 = 2300;

pub const WORD_SIZE: usize = 32;
