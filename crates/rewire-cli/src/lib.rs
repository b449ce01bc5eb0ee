//! Library side of the `rewire` binary: PHP file discovery and parallel batch
//! migration. Argument parsing and output formatting live in `main.rs`.

pub mod batch;
pub mod files;
