pub mod config;
pub mod result;

pub use config::AnalysisConfig;
pub use result::{FailureProb, Observation, ResultSet, Table, TableError};
