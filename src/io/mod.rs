pub mod config_io;
pub mod image_dir;
pub mod lock;
pub mod source;
pub mod workspace_io;
