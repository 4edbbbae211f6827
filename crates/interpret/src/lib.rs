//! Decodes an EVM struct logger trace (debug_traceTransaction, debug_traceCall) into
//! typed steps and finds the call that led to a REVERT.
pub mod catalog;
pub mod config;
pub mod filter;
pub mod locate;
pub mod memory;
pub mod opcode;
pub mod processed;
pub mod report;
pub mod source;
pub mod utils;
pub mod window;

pub use config::AnalysisConfig;
pub use filter::{decode_steps, decode_transaction, parse_struct_logs, read_ndjson_steps};
pub use locate::{locate_revert, CausalPair, RevertLookup, RevertPolicy};
pub use opcode::{RawStep, TxEnvelope};
pub use processed::DecodedStep;
pub use report::{analyze, explain, RevertReport};
pub use source::{annotate, DenseSourceMap, SourceMapCache, SourceMapProvider, SparseSourceMap};
pub use window::{window, WindowPolicy};
