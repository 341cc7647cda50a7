pub mod config;
pub mod pointers;
pub mod project;
pub mod record;
pub mod registry;
pub mod task;

pub use config::*;
pub use pointers::*;
pub use project::*;
pub use record::*;
pub use registry::*;
pub use task::*;
