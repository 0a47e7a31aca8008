//! Line-protocol TCP front end

pub mod dispatch;
pub mod handler;
pub mod listener;
pub mod protocol;

pub use handler::close_all;
pub use listener::serve;
