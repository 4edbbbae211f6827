//! For single EVM instruction/opcode representations from a transaction trace.
//!
//! Shapes follow the geth struct logger, as returned by debug_traceTransaction and
//! debug_traceCall with memory enabled.

use serde::{Deserialize, Deserializer, Serialize};

/// One executed instruction. The stack has the top item last.
///
/// A line in a trace is pre-application of the opcode. E.g., the opcode will
/// use the values in the stack on the same line.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    pub pc: u64,
    pub op: String,
    pub gas: u64,
    pub gas_cost: u64,
    pub depth: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stack: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub memory: Vec<String>,
}

/// Some clients write `null` for an empty stack or memory.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawStep {
    /// Gets item from the stack by index. Index 0 is the top of the stack.
    pub fn stack_nth(&self, index: usize) -> Option<&str> {
        let position = self.stack.len().checked_sub(index + 1)?;
        self.stack.get(position).map(String::as_str)
    }
}

/// Result of a struct logger trace.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLogs {
    #[serde(default)]
    pub gas: u64,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub return_value: String,
    pub struct_logs: Vec<RawStep>,
}

/// JSON-RPC response wrapping a struct logger trace.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TraceResponse {
    pub result: StructLogs,
}

/// The transaction that produced a trace. Becomes the outermost call.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TxEnvelope {
    pub from: String,
    /// Absent for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "zero_value")]
    pub value: String,
    #[serde(default)]
    pub input: String,
}

fn zero_value() -> String {
    "0x0".to_string()
}
