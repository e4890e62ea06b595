pub mod fd;
pub mod tcp;

pub use fd::{request_pipe_capacity, set_nonblocking, wait_ready, Readiness};
pub use tcp::connect_input;
