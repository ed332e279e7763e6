//! Instrument identifiers.

/// Opaque identifier of a tradable asset, as stored by the sink.
pub type InstrumentId = i64;
