pub mod error;
pub mod task;

pub use error::{Result, TxError};
pub use task::{TaskId, TaskLocal};
