//! SOCKS5 request stage
//!
//! Parses the client request and writes the single reply that follows it.

mod parser;
mod reply;

pub use parser::read_request;
pub use reply::{send_failure, send_reply, send_success};
