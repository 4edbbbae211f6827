use anyhow::Result;
use culprit_interpret::{
    analyze, decode_transaction, locate_revert, parse_struct_logs,
    source::SourceEntry,
    window, AnalysisConfig, RevertLookup, RevertPolicy, SourceMapCache, SparseSourceMap,
    TxEnvelope, WindowPolicy,
};
use serde::Deserialize;

/// A vault contract (0xaa..aa) forwards `transfer(0x01, 100)` to a token (0xbe..be).
/// The token reverts with "insufficient balance", then the vault reverts without a message.
static TRACE: &str = include_str!("data/transfer_revert.json");
static TRANSACTION: &str = include_str!("data/transfer_tx.json");
static SOURCE_MAP: &str = include_str!("data/vault_source_map.json");

const VAULT: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const TOKEN: &str = "0xbebebebebebebebebebebebebebebebebebebebe";

#[derive(Deserialize)]
struct TransactionResponse {
    result: TxEnvelope,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    json_source_map: Vec<SourceEntry>,
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn envelope() -> Result<TxEnvelope> {
    Ok(serde_json::from_str::<TransactionResponse>(TRANSACTION)?.result)
}

fn vault_source_map() -> Result<SparseSourceMap> {
    let response: VerifyResponse = serde_json::from_str(SOURCE_MAP)?;
    Ok(SparseSourceMap::from_entries(response.json_source_map))
}

#[test]
fn test_decode_transaction_trace() -> Result<()> {
    init_logger();
    let logs = parse_struct_logs(TRACE)?;
    assert!(logs.failed);
    assert_eq!(logs.struct_logs.len(), 15);

    let trace = decode_transaction(&logs.struct_logs, &envelope()?)?;
    let ops: Vec<&str> = trace.iter().map(|s| s.op.as_str()).collect();
    assert_eq!(
        ops,
        [
            "CALL",
            "CALLDATALOAD",
            "EQ",
            "JUMPI",
            "CALL",
            "CALLDATASIZE",
            "LT",
            "SLOAD",
            "GT",
            "REVERT",
            "ISZERO",
            "REVERT"
        ]
    );

    assert_eq!(trace[0].target(), Some(VAULT));
    assert_eq!(trace[2].result, Some(true));
    assert_eq!(trace[3].arg("counter"), Some("0x40"));
    assert_eq!(trace[3].arg("condition"), Some("0x1"));

    let call = &trace[4];
    assert_eq!(call.target(), Some(TOKEN));
    assert_eq!(call.arg("in_offset"), Some("0x1c"));
    assert_eq!(call.arg("in_size"), Some("0x44"));
    let expected_input = format!("0xa9059cbb{:0>64}{:0>64}", "1", "64");
    assert_eq!(call.input_data(), Some(expected_input.as_str()));
    assert_eq!(trace[0].input_data(), Some(&expected_input[..]));

    assert_eq!(trace[6].result, Some(true));
    assert_eq!(trace[8].result, Some(false));
    assert_eq!(trace[9].message.as_deref(), Some("insufficient balance"));
    assert_eq!(trace[11].message_hex.as_deref(), Some("0x"));
    Ok(())
}

#[test]
fn test_policies_pick_different_reverts() -> Result<()> {
    init_logger();
    let logs = parse_struct_logs(TRACE)?;
    let trace = decode_transaction(&logs.struct_logs, &envelope()?)?;

    let first = locate_revert(&trace, RevertPolicy::FirstMatch);
    let pair = first.pair().expect("token revert has a caller");
    assert_eq!((pair.call_index, pair.revert_index), (4, 9));
    assert_eq!(pair.call.target(), Some(TOKEN));

    let last = locate_revert(&trace, RevertPolicy::LastMatch);
    let pair = last.pair().expect("vault revert has a caller");
    assert_eq!((pair.call_index, pair.revert_index), (0, 11));
    assert_eq!(pair.call.depth, 0);

    for lookup in [first, last] {
        if let RevertLookup::Found(pair) = lookup {
            assert_eq!(pair.call.depth + 1, pair.revert.depth);
            let slice = window(&trace, &lookup, WindowPolicy::CausalSlice).unwrap();
            assert!(slice.len() >= 2);
            let fixed = window(&trace, &lookup, WindowPolicy::FixedRadius { radius: 3 }).unwrap();
            assert!(fixed.len() <= 7);
        }
    }
    Ok(())
}

#[test]
fn test_analyze_first_revert() -> Result<()> {
    init_logger();
    let logs = parse_struct_logs(TRACE)?;
    let source = vault_source_map()?;
    let provider = |address: &str| (address == VAULT).then(|| source.clone());
    let config = AnalysisConfig::from_json_str(
        r#"{"revertPolicy":"firstMatch","windowPolicy":"causalSlice","sourceCacheCapacity":8}"#,
    )?;
    let mut cache = SourceMapCache::new(config.source_cache_capacity);

    let report = analyze(&logs.struct_logs, Some(&envelope()?), &config, &provider, &mut cache)?
        .expect("trace reverts");

    let call = report.call.as_ref().expect("causal call");
    assert_eq!(call.to, TOKEN);
    assert_eq!(call.value.as_deref(), Some("0x0"));
    assert_eq!(report.revert.message.as_deref(), Some("insufficient balance"));
    assert_eq!(report.steps.len(), 6);
    assert_eq!(
        report.steps[0].source_code.as_deref(),
        Some("token.transfer(to, amount)")
    );
    assert!(report.steps.iter().all(|s| s.context_code.is_some()));
    assert!(cache.contains(VAULT));
    Ok(())
}

#[test]
fn test_analyze_last_revert_fixed_window() -> Result<()> {
    init_logger();
    let logs = parse_struct_logs(TRACE)?;
    let source = vault_source_map()?;
    let provider = |address: &str| (address == VAULT).then(|| source.clone());
    let config = AnalysisConfig::new(RevertPolicy::LastMatch, WindowPolicy::fixed_default());
    let mut cache = SourceMapCache::new(config.source_cache_capacity);

    let report = analyze(&logs.struct_logs, Some(&envelope()?), &config, &provider, &mut cache)?
        .expect("trace reverts");

    assert_eq!(report.call.as_ref().map(|c| c.to.as_str()), Some(VAULT));
    assert_eq!(report.revert.pc, 120);
    assert_eq!(report.revert.source_code.as_deref(), Some("require(ok)"));
    // Index 11 with radius 10 keeps indices 1..=11.
    assert_eq!(report.steps.len(), 11);
    assert_eq!(report.steps[0].op, "CALLDATALOAD");

    let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
    assert_eq!(json["steps"][0]["gasCost"], 3);
    assert_eq!(json["steps"][0]["args"]["offset"], "0x0");
    Ok(())
}

#[test]
fn test_analyze_call_simulation_without_revert() -> Result<()> {
    init_logger();
    let logs = parse_struct_logs(TRACE)?;
    // The first five steps stop before the token is called.
    let head = &logs.struct_logs[..5];
    let config = AnalysisConfig::new(RevertPolicy::LastMatch, WindowPolicy::CausalSlice);
    let mut cache = SourceMapCache::default();
    let provider = |_: &str| -> Option<SparseSourceMap> { None };
    assert!(analyze(head, None, &config, &provider, &mut cache)?.is_none());
    Ok(())
}
