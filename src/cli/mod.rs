mod args;

pub use args::{default_output_path, Args};
