mod client;
mod connection;
mod envelope;
mod error;
mod framing;
mod server;

pub use client::SupervisorClient;
pub use connection::Connection;
pub use envelope::{new_message_id, Envelope};
pub use error::{IpcError, IpcResult};
pub use framing::{
    frame_message, parse_frame_length, read_frame, read_message, write_frame, write_message,
};
pub use server::SocketServer;

#[cfg(all(test, unix))]
mod tests;
