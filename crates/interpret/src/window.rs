//! Reduces a decoded trace to the steps around a REVERT.

use serde::{Deserialize, Serialize};

use crate::{locate::RevertLookup, processed::DecodedStep};

/// Steps kept on each side of the REVERT when a fixed window is used.
pub const DEFAULT_WINDOW_RADIUS: usize = 10;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowPolicy {
    /// From the causal call through the REVERT. From the start of the trace
    /// if there is no causal call.
    CausalSlice,
    /// The REVERT and up to `radius` steps either side of it.
    ///
    /// Bounds the amount of work done on a trace, says nothing about causality.
    FixedRadius { radius: usize },
}

impl WindowPolicy {
    pub fn fixed_default() -> Self {
        WindowPolicy::FixedRadius {
            radius: DEFAULT_WINDOW_RADIUS,
        }
    }
}

/// Gets the steps selected by the policy. None if the trace did not revert.
pub fn window<'a>(
    trace: &'a [DecodedStep],
    lookup: &RevertLookup<'_>,
    policy: WindowPolicy,
) -> Option<&'a [DecodedStep]> {
    let revert_index = lookup.revert_index()?;
    if revert_index >= trace.len() {
        return None;
    }
    let range = match policy {
        WindowPolicy::CausalSlice => {
            let start = lookup.pair().map(|pair| pair.call_index).unwrap_or(0);
            start..revert_index + 1
        }
        WindowPolicy::FixedRadius { radius } => {
            let start = revert_index.saturating_sub(radius);
            let end = revert_index.saturating_add(radius).min(trace.len() - 1);
            start..end + 1
        }
    };
    trace.get(range)
}
