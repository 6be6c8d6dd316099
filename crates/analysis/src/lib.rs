pub mod charts;
pub mod loader;
pub mod metrics;
pub mod report;
pub mod series;
