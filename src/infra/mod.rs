pub mod db;
pub mod error;
pub mod fetch;
pub mod queue;
pub mod storage;
pub mod telemetry;
