pub mod repo;
pub mod trade_source;
