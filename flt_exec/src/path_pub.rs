//! # Path debug publisher
//!
//! Re-publishes the simplified waypoint list of every ingested plan for inspection.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::plan::SparsePath,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct PathPublisher {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum PathPublisherError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the path: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the path: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathPublisher {
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, PathPublisherError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            socket_options,
            &params.path_debug_endpoint,
        )
        .map_err(PathPublisherError::SocketError)?;

        Ok(Self { socket })
    }

    /// Publish a path. Nothing is sent if nobody is listening.
    pub fn publish(&self, path: &SparsePath) -> Result<(), PathPublisherError> {
        if !self.socket.connected() {
            return Ok(());
        }

        let path_str = serde_json::to_string(path).map_err(PathPublisherError::SerializationError)?;

        self.socket
            .send(&path_str, 0)
            .map_err(PathPublisherError::SendError)
    }
}
