//! Request arbitration: what to produce next under scarce resources

pub mod arbitrator;
pub mod pool;
pub mod request;
pub mod resolve;
pub mod tech;

pub use arbitrator::{ArbitrationReport, RequestArbitrator, RequestReport, Verdict};
pub use pool::{Cost, Pool, ResourcePool};
pub use request::{DropReason, Expense, Outcome, Request, RequestKind};
pub use resolve::{resolve, Busy};
pub use tech::{TechTree, TechTreeBuilder, UnitSpec, UpgradeSpec};
