pub mod board_state;
pub mod cache;
mod dispatch;
pub mod pins;
pub mod write;

pub use dispatch::dispatch;
