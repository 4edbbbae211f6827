//! Finds a REVERT in a decoded trace and the call that entered the reverting context.

use serde::{Deserialize, Serialize};

use crate::processed::DecodedStep;

/// Which REVERT to explain when a trace holds several.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RevertPolicy {
    /// The earliest REVERT. Usually the innermost origin of a cascade.
    FirstMatch,
    /// The latest REVERT. Usually the one that ended the transaction.
    LastMatch,
}

/// A call and the REVERT executed in the context the call created.
///
/// The call is one level shallower than the REVERT and comes before it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CausalPair<'a> {
    pub call_index: usize,
    pub call: &'a DecodedStep,
    pub revert_index: usize,
    pub revert: &'a DecodedStep,
}

/// Outcome of looking for a REVERT. None of these are errors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RevertLookup<'a> {
    /// The trace did not revert.
    NoRevert,
    /// A REVERT exists, but no call one level above it precedes it.
    NoCausalCall {
        revert_index: usize,
        revert: &'a DecodedStep,
    },
    Found(CausalPair<'a>),
}

impl<'a> RevertLookup<'a> {
    pub fn revert_index(&self) -> Option<usize> {
        match self {
            RevertLookup::NoRevert => None,
            RevertLookup::NoCausalCall { revert_index, .. } => Some(*revert_index),
            RevertLookup::Found(pair) => Some(pair.revert_index),
        }
    }

    pub fn revert(&self) -> Option<&'a DecodedStep> {
        match self {
            RevertLookup::NoRevert => None,
            RevertLookup::NoCausalCall { revert, .. } => Some(*revert),
            RevertLookup::Found(pair) => Some(pair.revert),
        }
    }

    pub fn pair(&self) -> Option<&CausalPair<'a>> {
        match self {
            RevertLookup::Found(pair) => Some(pair),
            _ => None,
        }
    }
}

/// Finds the REVERT selected by the policy and the call that caused it.
pub fn locate_revert(trace: &[DecodedStep], policy: RevertPolicy) -> RevertLookup<'_> {
    let position = match policy {
        RevertPolicy::FirstMatch => trace.iter().position(DecodedStep::is_revert),
        RevertPolicy::LastMatch => trace.iter().rposition(DecodedStep::is_revert),
    };
    let Some(revert_index) = position else {
        return RevertLookup::NoRevert;
    };
    let revert = &trace[revert_index];

    match find_causal_call(trace, revert_index) {
        Some(call_index) => RevertLookup::Found(CausalPair {
            call_index,
            call: &trace[call_index],
            revert_index,
            revert,
        }),
        None => RevertLookup::NoCausalCall {
            revert_index,
            revert,
        },
    }
}

/// Nearest call before the step at `index` that is exactly one level shallower.
pub fn find_causal_call(trace: &[DecodedStep], index: usize) -> Option<usize> {
    let target_depth = trace.get(index)?.depth.checked_sub(1)?;
    trace[..index]
        .iter()
        .rposition(|step| step.is_call() && step.depth == target_depth)
}
