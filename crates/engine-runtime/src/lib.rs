pub mod batch;
pub mod delete;
pub mod keyenc;
pub mod sheet;
pub mod sql;
pub mod warehouse;

pub use batch::{run_batch, EngineClients};
