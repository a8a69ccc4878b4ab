// concurrency/mod.rs

pub mod bulk;
pub mod dispatcher;
pub mod options;
pub mod pool;
pub mod runner;
pub mod streaming;

pub use dispatcher::{Dispatcher, ExceptionHandler, Outcome, UnitHandle};
pub use options::{ImapOptions, MapOptions};
pub use pool::{Pool, PoolSlot};
pub use runner::Runner;
pub use streaming::ResponseStream;
