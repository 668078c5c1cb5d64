pub mod analyze;
pub mod clean;
pub mod instrument;
pub mod serve;
