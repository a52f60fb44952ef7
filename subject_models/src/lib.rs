pub mod cli;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod evaluation;
pub mod functions;
pub mod net;
pub mod persistence;
pub mod pipeline;
pub mod training;

pub use config::RunConfig;
pub use error::{Result, SubjectErr};
pub use pipeline::{RunReport, run};
