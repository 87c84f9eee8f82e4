//! Database repositories for each table.

pub mod state;

pub use state::StateRepo;
