//! Amazon-specific modules for regions, page markers, parsing, and data models.

pub mod details;
pub mod images;
pub mod markers;
pub mod models;
pub mod parser;
pub mod regions;
pub mod selectors;

pub use details::{DetailMode, ProductDetails};
pub use markers::Markers;
pub use models::{BuyBoxSnapshot, Condition, Offer, OptimalPrice, ProductResult};
pub use parser::Parser;
pub use regions::Region;
