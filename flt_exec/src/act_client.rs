//! # Actuation Client
//!
//! This module provides networking abstractions to send actuation commands to the vehicle link.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::act::ActCmd,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

use crate::cmd_pub::ActTransport;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ActClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ActClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the command: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActClient {
    /// Create a new instance of the actuation client.
    ///
    /// The client binds a publisher, so it does not wait for the vehicle link to connect. Other
    /// subscribers (loggers, viewers) may come and go on the same socket.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, ActClientError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            send_timeout: 10,
            send_hwm: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.act_endpoint)
            .map_err(ActClientError::SocketError)?;

        Ok(Self { socket })
    }
}

impl ActTransport for ActClient {
    type Error = ActClientError;

    /// Send a command. With no subscriber attached the publisher drops it.
    fn send(&mut self, cmd: &ActCmd) -> Result<(), ActClientError> {
        let cmd_str = serde_json::to_string(cmd).map_err(ActClientError::SerializationError)?;

        self.socket
            .send(&cmd_str, 0)
            .map_err(ActClientError::SendError)
    }
}
