pub mod bar;
pub mod decision;
pub mod interval;
pub mod order;
pub mod signal;

pub use bar::Bar;
pub use decision::{AggregatedDecision, Rationale};
pub use interval::Interval;
pub use order::{OrderRequest, OrderResult, OrderSide, OrderStatus};
pub use signal::{Direction, StrategySignal};
