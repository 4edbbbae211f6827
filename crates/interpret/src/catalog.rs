//! The opcodes that are decoded, and the names given to the stack items they consume.
//!
//! Operand names are listed top of the stack first.

/// How the stack items of an opcode are bound and what is derived from them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeFamily {
    /// Operands bound in declared order, nothing derived.
    Plain,
    /// Operands bound in declared order, boolean result derived.
    Comparison(Comparison),
    /// Transfer of control to another account. Input payload is read from memory.
    Call { has_value: bool },
    /// Revert payload is read from memory.
    Revert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Lt,
    Eq,
    IsZero,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeSpec {
    pub mnemonic: &'static str,
    pub operands: &'static [&'static str],
    pub family: OpcodeFamily,
}

impl OpcodeSpec {
    /// Gets the spec for an opcode. None if the opcode is not decoded.
    pub fn lookup(mnemonic: &str) -> Option<&'static OpcodeSpec> {
        CATALOG.iter().find(|spec| spec.mnemonic == mnemonic)
    }

    pub fn is_call(&self) -> bool {
        matches!(self.family, OpcodeFamily::Call { .. })
    }
}

/// True for CALL, CALLCODE, DELEGATECALL and STATICCALL.
pub fn is_call_family<T: AsRef<str>>(mnemonic: T) -> bool {
    OpcodeSpec::lookup(mnemonic.as_ref()).is_some_and(OpcodeSpec::is_call)
}

const BINARY: &[&str] = &["a", "b"];
const CALL_WITH_VALUE: &[&str] = &[
    "gas",
    "to",
    "value",
    "in_offset",
    "in_size",
    "ret_offset",
    "ret_size",
];
const CALL_WITHOUT_VALUE: &[&str] = &["gas", "to", "in_offset", "in_size", "ret_offset", "ret_size"];
const MEMORY_RANGE: &[&str] = &["offset", "size"];

macro_rules! spec {
    ($mnemonic:literal, $operands:expr, $family:expr) => {
        OpcodeSpec {
            mnemonic: $mnemonic,
            operands: $operands,
            family: $family,
        }
    };
}

const PLAIN: OpcodeFamily = OpcodeFamily::Plain;
const GT: OpcodeFamily = OpcodeFamily::Comparison(Comparison::Gt);
const LT: OpcodeFamily = OpcodeFamily::Comparison(Comparison::Lt);
const EQ: OpcodeFamily = OpcodeFamily::Comparison(Comparison::Eq);
const ISZERO: OpcodeFamily = OpcodeFamily::Comparison(Comparison::IsZero);
const VALUE_CALL: OpcodeFamily = OpcodeFamily::Call { has_value: true };
const PLAIN_CALL: OpcodeFamily = OpcodeFamily::Call { has_value: false };

static CATALOG: &[OpcodeSpec] = &[
    spec!("ADD", BINARY, PLAIN),
    spec!("MUL", BINARY, PLAIN),
    spec!("SUB", BINARY, PLAIN),
    spec!("DIV", BINARY, PLAIN),
    spec!("MOD", BINARY, PLAIN),
    spec!("LT", BINARY, LT),
    spec!("GT", BINARY, GT),
    spec!("SLT", BINARY, PLAIN),
    spec!("SGT", BINARY, PLAIN),
    spec!("EQ", BINARY, EQ),
    spec!("ISZERO", &["a"], ISZERO),
    spec!("JUMP", &["destination"], PLAIN),
    spec!("JUMPI", &["counter", "condition"], PLAIN),
    spec!("CALLDATALOAD", &["offset"], PLAIN),
    spec!("CALLDATASIZE", &[], PLAIN),
    spec!("SLOAD", &["key"], PLAIN),
    spec!("SSTORE", &["key", "value"], PLAIN),
    spec!("CALL", CALL_WITH_VALUE, VALUE_CALL),
    spec!("CALLCODE", CALL_WITH_VALUE, VALUE_CALL),
    spec!("DELEGATECALL", CALL_WITHOUT_VALUE, PLAIN_CALL),
    spec!("STATICCALL", CALL_WITHOUT_VALUE, PLAIN_CALL),
    spec!("REVERT", MEMORY_RANGE, OpcodeFamily::Revert),
    spec!("RETURN", MEMORY_RANGE, PLAIN),
];
