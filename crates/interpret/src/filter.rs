//! Processes a struct logger trace into decoded steps.
//!
//! A trace can be read from a JSON-RPC response, from the bare trace object or
//! as new-line delineated JSON with one step per line (e.g., from
//! `jq '.["result"]["structLogs"][]' -c`).

use std::io::BufRead;

use log::{debug, trace};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    opcode::{RawStep, StructLogs, TraceResponse, TxEnvelope},
    processed::{DecodedStep, ProcessedError},
};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("IO error {0}")]
    IoError(#[from] std::io::Error),
    #[error("Processed error {0}")]
    ProcessedError(#[from] ProcessedError),
    #[error("serde_json error {0}")]
    SerdeJson(#[from] serde_json::Error),
}

/// Decodes steps in order. Opcodes that are not of interest are left out.
///
/// Stops at the first step that cannot be decoded.
pub fn decode_steps(raw: &[RawStep]) -> Result<Vec<DecodedStep>, FilterError> {
    let mut decoded = Vec::with_capacity(raw.len());
    for step in raw {
        if let Some(processed) = DecodedStep::decode(step)? {
            decoded.push(processed);
        }
    }
    debug!("Decoded {} of {} trace steps", decoded.len(), raw.len());
    Ok(decoded)
}

/// Decodes steps of a whole transaction.
///
/// The transaction itself is added as the first step, a CALL at depth 0, so that
/// the top level call has the same shape as a nested one.
pub fn decode_transaction(
    raw: &[RawStep],
    envelope: &TxEnvelope,
) -> Result<Vec<DecodedStep>, FilterError> {
    let mut decoded = Vec::with_capacity(raw.len() + 1);
    decoded.push(DecodedStep::from_envelope(envelope));
    decoded.extend(decode_steps(raw)?);
    Ok(decoded)
}

/// Reads the steps from a trace as returned by a node.
///
/// Accepts either the JSON-RPC response or its `result` member.
pub fn parse_struct_logs(json: &str) -> Result<StructLogs, FilterError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Input {
        Response(TraceResponse),
        Logs(StructLogs),
    }
    Ok(match serde_json::from_str::<Input>(json)? {
        Input::Response(response) => response.result,
        Input::Logs(logs) => logs,
    })
}

/// Reads one step per line. Lines without an `op` member (e.g., output summary)
/// are skipped. A line with an `op` that is not a valid step is an error.
pub fn read_ndjson_steps<R: BufRead>(reader: R) -> Result<Vec<RawStep>, FilterError> {
    let mut steps = vec![];
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                trace!("Skipping line that is not JSON: {e}");
                continue;
            }
        };
        if value.get("op").is_none() {
            trace!("Skipping line that is not a step");
            continue;
        }
        steps.push(serde_json::from_value(value)?);
    }
    Ok(steps)
}

#[cfg(test)]
mod test {
    use super::*;

    fn step(op: &str, pc: u64, stack: &[&str]) -> RawStep {
        RawStep {
            pc,
            op: op.to_string(),
            gas: 100,
            gas_cost: 3,
            depth: 1,
            stack: stack.iter().map(|s| s.to_string()).collect(),
            memory: vec![],
        }
    }

    #[test]
    fn test_order_preserved() {
        let raw = vec![
            step("PUSH1", 0, &[]),
            step("ADD", 2, &["0x1", "0x2"]),
            step("DUP1", 3, &["0x3"]),
            step("ISZERO", 4, &["0x3"]),
            step("POP", 5, &["0x0"]),
            step("JUMP", 6, &["0x10"]),
        ];
        let decoded = decode_steps(&raw).unwrap();
        let pcs: Vec<u64> = decoded.iter().map(|s| s.pc).collect();
        assert_eq!(pcs, [2, 4, 6]);
    }

    #[test]
    fn test_malformed_aborts() {
        let raw = vec![step("ADD", 2, &["0x1", "0x2"]), step("ADD", 3, &["0x1"])];
        let err = decode_steps(&raw).unwrap_err();
        assert!(matches!(
            err,
            FilterError::ProcessedError(ProcessedError::MalformedStep { pc: 3, .. })
        ));
    }

    #[test]
    fn test_transaction_prepends_call() {
        let raw = vec![step("ADD", 2, &["0x1", "0x2"])];
        let envelope = TxEnvelope {
            from: "0x01".to_string(),
            to: Some("0x02".to_string()),
            value: "0x0".to_string(),
            input: "0x".to_string(),
        };
        let decoded = decode_transaction(&raw, &envelope).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].op, "CALL");
        assert_eq!(decoded[0].depth, 0);
        assert_eq!(decoded[0].gas, 0);
        assert_eq!(decoded[1].op, "ADD");
    }

    #[test]
    fn test_parse_struct_logs() {
        let bare = r#"{"gas":21000,"failed":true,"returnValue":"","structLogs":[{"pc":0,"op":"PUSH1","gas":100,"gasCost":3,"depth":1,"stack":[]}]}"#;
        let logs = parse_struct_logs(bare).unwrap();
        assert!(logs.failed);
        assert_eq!(logs.struct_logs.len(), 1);

        let response = format!(r#"{{"jsonrpc":"2.0","id":1,"result":{bare}}}"#);
        let logs = parse_struct_logs(&response).unwrap();
        assert_eq!(logs.struct_logs[0].op, "PUSH1");

        assert!(parse_struct_logs("{}").is_err());
    }

    #[test]
    fn test_read_ndjson() {
        let input = concat!(
            r#"{"pc":0,"op":"PUSH1","gas":100,"gasCost":3,"depth":1,"stack":[]}"#,
            "\n\n",
            r#"{"output":"0x","gasUsed":"0x5208"}"#,
            "\n",
            r#"{"pc":2,"op":"STOP","gas":97,"gasCost":0,"depth":1,"stack":["0x1"]}"#,
            "\n"
        );
        let steps = read_ndjson_steps(input.as_bytes()).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].op, "STOP");
    }

    #[test]
    fn test_read_ndjson_bad_step_is_error() {
        let input = concat!(
            r#"{"pc":0,"op":"PUSH1","gas":100,"gasCost":3,"depth":1,"stack":[]}"#,
            "\n",
            r#"{"pc":"oops","op":"REVERT","gas":90,"gasCost":0,"depth":1}"#,
            "\n"
        );
        let err = read_ndjson_steps(input.as_bytes()).unwrap_err();
        assert!(matches!(err, FilterError::SerdeJson(_)));
    }

    #[test]
    fn test_read_ndjson_null_memory_kept() {
        let input = r#"{"pc":9,"op":"REVERT","gas":90,"gasCost":0,"depth":2,"stack":["0x0","0x0"],"memory":null}"#;
        let steps = read_ndjson_steps(input.as_bytes()).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].op, "REVERT");
    }
}
