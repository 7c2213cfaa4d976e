pub mod consumer;
pub mod error;
pub mod lane;
pub mod merge;
pub mod pipeline;
pub mod producer;
pub mod record;
pub mod sink;
pub mod source;
pub mod state;
pub mod transform;


pub use error::{PipelineError, Result};
pub use pipeline::{run, run_numbers, run_path, PipelineConfig, PipelineReport, WaiterType};
