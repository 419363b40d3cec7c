pub mod behavior;
pub mod context;
pub mod events;
pub mod scheduler;
pub mod tree;
pub mod types;

#[cfg(test)]
mod tests;

pub use behavior::*;
pub use context::*;
pub use events::*;
pub use tree::*;
pub use types::*;
