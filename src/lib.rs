//! amz-offers - Amazon offer aggregation and optimal price resolution
//!
//! Reads a product's buy-box and its all-offers panel, collapses the offers
//! into a unique New-condition set, and picks a representative "optimal"
//! price from a tolerance band around the third cheapest offer.

pub mod amazon;
pub mod commands;
pub mod config;
pub mod format;
pub mod pricing;
pub mod resolver;
pub mod session;

pub use amazon::details::{DetailMode, ProductDetails};
pub use amazon::models::{BuyBoxSnapshot, Condition, Offer, OptimalPrice, ProductResult, Status};
pub use amazon::regions::Region;
pub use config::Config;
pub use pricing::BandMultipliers;
pub use resolver::Resolver;
