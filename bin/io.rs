use async_trait::async_trait;
use std::io;

mod pipe;

pub use pipe::*;

/// Trait for types that exchange line-oriented messages with participants.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Io {
    /// Receive a message.
    async fn recv(&mut self) -> io::Result<String>;

    /// Send a message.
    async fn send(&mut self, msg: &str) -> io::Result<()>;

    /// Flush the internal buffers.
    async fn flush(&mut self) -> io::Result<()>;
}
