//! Shared data model and collaborator contracts of the trade tracker.

pub mod model;
pub mod traits;

pub use model::instrument::InstrumentId;
pub use model::position::Position;
pub use model::trade::Trade;
pub use traits::repo::{PositionRepo, RepoError, TradeRepo, TradeStream};
pub use traits::trade_source::{SourceError, TradeSource};
