pub mod config;
pub mod error;
pub mod io;
pub mod moments;
pub mod pearson;
pub mod upper;

pub use config::CorrConfig;
pub use error::CorrError;
pub use moments::{moments, Moments};
pub use pearson::{correlation_upper_triangle, pearson_upper_triangle};
pub use upper::UpperTriangle;
