//! For the explanation of a revert: the call that caused it and the steps that led there.
//!
//! This is what is handed to whatever writes the human readable report.

use std::fmt::Display;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{AnalysisConfig, ConfigError},
    filter::{decode_steps, decode_transaction, FilterError},
    locate::locate_revert,
    opcode::{RawStep, TxEnvelope},
    processed::DecodedStep,
    source::{annotate, source_target, SourceMapCache, SourceMapProvider},
    window::window,
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Config error {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Filter error {0}")]
    FilterError(#[from] FilterError),
    #[error("serde_json error {0}")]
    SerdeJson(#[from] serde_json::Error),
}

/// The call that entered the context that reverted.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSummary {
    pub op: String,
    pub pc: u64,
    pub depth: u64,
    pub to: String,
    pub input: String,
    /// Absent for DELEGATECALL and STATICCALL.
    pub value: Option<String>,
    pub gas: u64,
    pub gas_cost: u64,
}

impl From<&DecodedStep> for CallSummary {
    fn from(step: &DecodedStep) -> Self {
        CallSummary {
            op: step.op.clone(),
            pc: step.pc,
            depth: step.depth,
            to: step.target().unwrap_or_default().to_string(),
            input: step.input_data().unwrap_or_default().to_string(),
            value: step.value().map(str::to_string),
            gas: step.gas,
            gas_cost: step.gas_cost,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertReport {
    /// None if no call one level above the REVERT was found.
    pub call: Option<CallSummary>,
    pub revert: DecodedStep,
    /// Steps selected by the window policy, with source code attached.
    pub steps: Vec<DecodedStep>,
}

impl RevertReport {
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Decodes a trace and explains its revert. None if the trace did not revert.
///
/// With an envelope the trace is treated as a whole transaction, otherwise as a
/// simulated call.
pub fn analyze<P: SourceMapProvider + ?Sized>(
    raw: &[RawStep],
    envelope: Option<&TxEnvelope>,
    config: &AnalysisConfig,
    provider: &P,
    cache: &mut SourceMapCache,
) -> Result<Option<RevertReport>, ReportError> {
    config.validate()?;
    let trace = match envelope {
        Some(envelope) => decode_transaction(raw, envelope)?,
        None => decode_steps(raw)?,
    };
    Ok(explain(&trace, config, provider, cache))
}

/// Explains the revert of an already decoded trace. None if the trace did not revert.
pub fn explain<P: SourceMapProvider + ?Sized>(
    trace: &[DecodedStep],
    config: &AnalysisConfig,
    provider: &P,
    cache: &mut SourceMapCache,
) -> Option<RevertReport> {
    let lookup = locate_revert(trace, config.revert_policy);
    let Some(revert) = lookup.revert() else {
        debug!("No REVERT in {} decoded steps", trace.len());
        return None;
    };
    match lookup.pair() {
        Some(pair) => debug!("{} reverted, entered by {}", pair.revert, pair.call),
        None => debug!("{revert} reverted, no call found one level above it"),
    }

    let mut steps = window(trace, &lookup, config.window_policy)?.to_vec();
    let mut revert = revert.clone();
    debug!("Window of {} steps", steps.len());

    let map = match source_target(trace) {
        Some(address) => cache.get_or_fetch(address, provider),
        None => Default::default(),
    };
    annotate(&mut steps, &map);
    annotate(std::slice::from_mut(&mut revert), &map);

    Some(RevertReport {
        call: lookup.pair().map(|pair| CallSummary::from(pair.call)),
        revert,
        steps,
    })
}

impl Display for RevertReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.call {
            Some(call) => writeln!(
                f,
                "{} to {} (pc {}, depth {}) with input {}",
                call.op, call.to, call.pc, call.depth, call.input
            )?,
            None => writeln!(f, "Calling context unknown")?,
        }
        writeln!(f, "{}", self.revert)?;
        for step in &self.steps {
            for _ in 0..step.depth {
                write!(f, "\t")?;
            }
            writeln!(f, "{step}")?;
        }
        Ok(())
    }
}
