pub mod execution;
pub mod extract;
pub mod generation;
pub mod merge;
pub mod workbench;

#[cfg(test)]
mod test_support;

pub use execution::{ExecutionClient, PollOptions};
pub use generation::GenerationClient;
pub use merge::{Buffer, Transcript};
pub use workbench::Workbench;
