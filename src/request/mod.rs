// request/mod.rs

pub mod executor;
pub mod options;
pub mod response;
pub mod task;

pub use options::{RequestBody, RequestOptions};
pub use response::Response;
pub use task::{ResponseHook, Task};
