pub mod error;
pub mod gate;
pub mod remote;

pub use error::MarketDataError;
pub use gate::{BarSource, MarketDataGate};
