//! For the processed representation of a single instruction/opcode.
//!
//! Stack items consumed by the opcode are bound to names from the catalog. Some
//! opcodes carry extra facts: comparisons have their result, calls have the input
//! they send and reverts have their payload.

use std::fmt::Display;

use alloy_primitives::U256;
use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::{Comparison, OpcodeFamily, OpcodeSpec},
    memory::read_bytes,
    opcode::{RawStep, TxEnvelope},
    utils::{decode_text, decode_uint, decode_usize, word_to_address, UtilsError},
};

#[derive(Debug, Error, PartialEq)]
pub enum ProcessedError {
    #[error("Malformed step {op} (pc {pc}, depth {depth}): needs {required} stack items, has {length}")]
    MalformedStep {
        pc: u64,
        op: String,
        depth: u64,
        required: usize,
        length: usize,
    },
    #[error("Malformed word in step {op} (pc {pc}, depth {depth}): {source}")]
    MalformedWord {
        pc: u64,
        op: String,
        depth: u64,
        source: UtilsError,
    },
}

/// Stack items by name, in the order they were bound.
pub type Operands = IndexMap<String, String>;

/// An opcode from the trace with its stack items named.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DecodedStep {
    pub op: String,
    pub pc: u64,
    pub depth: u64,
    pub gas: u64,
    #[serde(rename = "gasCost")]
    pub gas_cost: u64,
    pub args: Operands,
    /// Outcome of GT, LT, EQ and ISZERO.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    /// REVERT payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_hex: Option<String>,
    /// REVERT payload as text, empty if it is not UTF-8.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_code: Option<String>,
}

impl DecodedStep {
    /// Decodes a step from the trace. Opcodes absent from the catalog are skipped (None).
    pub fn decode(raw: &RawStep) -> Result<Option<Self>, ProcessedError> {
        let Some(spec) = OpcodeSpec::lookup(&raw.op) else {
            trace!("Skipping {} (pc {}, depth {})", raw.op, raw.pc, raw.depth);
            return Ok(None);
        };
        Self::decode_with(raw, spec).map(Some)
    }

    /// Decodes a step using a known opcode spec.
    pub fn decode_with(raw: &RawStep, spec: &OpcodeSpec) -> Result<Self, ProcessedError> {
        let required = spec.operands.len();
        if raw.stack.len() < required {
            return Err(ProcessedError::MalformedStep {
                pc: raw.pc,
                op: raw.op.clone(),
                depth: raw.depth,
                required,
                length: raw.stack.len(),
            });
        }

        let mut args = Operands::with_capacity(required + 1);
        for (index, name) in spec.operands.iter().enumerate() {
            let word = raw.stack_nth(index).unwrap_or_default();
            let word = match *name {
                "to" if spec.is_call() => word_to_address(word),
                _ => word.to_string(),
            };
            args.insert(name.to_string(), word);
        }

        let mut step = DecodedStep {
            op: raw.op.clone(),
            pc: raw.pc,
            depth: raw.depth,
            gas: raw.gas,
            gas_cost: raw.gas_cost,
            args,
            ..Default::default()
        };

        match spec.family {
            OpcodeFamily::Plain => {}
            OpcodeFamily::Comparison(comparison) => {
                let result = step
                    .compare(comparison)
                    .map_err(|e| malformed_word(raw, e))?;
                step.result = Some(result);
            }
            OpcodeFamily::Call { .. } => {
                let input = step
                    .read_memory(raw, "in_offset", "in_size")
                    .map_err(|e| malformed_word(raw, e))?;
                step.args.insert("input_data".to_string(), input);
            }
            OpcodeFamily::Revert => {
                let payload = step
                    .read_memory(raw, "offset", "size")
                    .map_err(|e| malformed_word(raw, e))?;
                step.message = Some(decode_text(&payload));
                step.message_hex = Some(payload);
            }
        }
        Ok(step)
    }

    /// The outermost call, made by the transaction itself rather than an opcode.
    pub fn from_envelope(envelope: &TxEnvelope) -> Self {
        let mut args = Operands::with_capacity(4);
        args.insert("from".to_string(), envelope.from.clone());
        args.insert("to".to_string(), envelope.to.clone().unwrap_or_default());
        args.insert("value".to_string(), envelope.value.clone());
        args.insert("input".to_string(), envelope.input.clone());
        DecodedStep {
            op: "CALL".to_string(),
            args,
            ..Default::default()
        }
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    /// True for CALL, CALLCODE, DELEGATECALL and STATICCALL.
    pub fn is_call(&self) -> bool {
        OpcodeSpec::lookup(&self.op).is_some_and(OpcodeSpec::is_call)
    }

    pub fn is_revert(&self) -> bool {
        self.op == "REVERT"
    }

    /// Address a call transfers control to.
    pub fn target(&self) -> Option<&str> {
        match self.is_call() {
            true => self.arg("to"),
            false => None,
        }
    }

    /// Value sent by a call. Absent for DELEGATECALL and STATICCALL.
    pub fn value(&self) -> Option<&str> {
        match OpcodeSpec::lookup(&self.op)?.family {
            OpcodeFamily::Call { has_value: true } => self.arg("value"),
            _ => None,
        }
    }

    /// Payload sent by a call.
    pub fn input_data(&self) -> Option<&str> {
        match self.is_call() {
            true => self.arg("input_data").or_else(|| self.arg("input")),
            false => None,
        }
    }

    fn compare(&self, comparison: Comparison) -> Result<bool, UtilsError> {
        let a = decode_uint(self.arg("a").unwrap_or_default())?;
        if comparison == Comparison::IsZero {
            return Ok(a == U256::ZERO);
        }
        let b = decode_uint(self.arg("b").unwrap_or_default())?;
        Ok(match comparison {
            Comparison::Gt => a > b,
            Comparison::Lt => a < b,
            Comparison::Eq => a == b,
            Comparison::IsZero => a == U256::ZERO,
        })
    }

    fn read_memory(&self, raw: &RawStep, offset: &str, size: &str) -> Result<String, UtilsError> {
        let offset = decode_usize(self.arg(offset).unwrap_or_default())?;
        let size = decode_usize(self.arg(size).unwrap_or_default())?;
        Ok(read_bytes(&raw.memory, offset, size))
    }
}

fn malformed_word(raw: &RawStep, source: UtilsError) -> ProcessedError {
    ProcessedError::MalformedWord {
        pc: raw.pc,
        op: raw.op.clone(),
        depth: raw.depth,
        source,
    }
}

impl Display for DecodedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (pc {}, depth {})", self.op, self.pc, self.depth)?;
        if let Some(to) = self.target() {
            write!(f, " to {to}")?;
        }
        if let Some(result) = self.result {
            write!(f, " -> {result}")?;
        }
        match self.message.as_deref() {
            Some("") => write!(f, " with payload {}", self.message_hex.as_deref().unwrap_or("0x")),
            Some(message) => write!(f, " with message \"{message}\""),
            None => Ok(()),
        }
    }
}
