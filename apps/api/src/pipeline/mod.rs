// Analysis pipeline: fingerprint → cache → fan-out to analyzers → aggregate → rank.
// The orchestrator is the only entry point; handlers expose it over HTTP.

pub mod aggregator;
pub mod fingerprint;
pub mod handlers;
pub mod orchestrator;
pub mod ranker;
