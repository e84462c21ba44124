//! # Input Client
//!
//! Subscribes to the estimator, planner and vehicle status streams, and bridges them onto the
//! input channels on a background thread.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use comms_if::{
    eqpt::InputMsg,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{error, info, warn};

use crate::input_router::{InputRouter, RouteOutcome};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct InputClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum InputClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not recieve a message: {0}")]
    RecvError(zmq::Error),

    #[error("Recieved a message which was not valid UTF-8")]
    NonUtf8Message,

    #[error("Could not deserialize the message: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputClient {
    /// Create a new instance of the input client.
    ///
    /// This function will not block until the publishers connect.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, InputClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 100,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.input_endpoint)
            .map_err(InputClientError::SocketError)?;

        Ok(Self { socket })
    }

    /// Recieve a single message.
    ///
    /// Returns `Ok(None)` if no message arrived within the receive timeout.
    pub fn recv(&self) -> Result<Option<InputMsg>, InputClientError> {
        let msg_str = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(InputClientError::NonUtf8Message),
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(InputClientError::RecvError(e)),
        };

        InputMsg::from_json(&msg_str)
            .map(Some)
            .map_err(InputClientError::DeserializeError)
    }

    /// Move the client onto a background thread forwarding every message to the router.
    ///
    /// The thread stops when `stop` is raised, when the estimate loop has gone, or on a socket
    /// error. The router is dropped with it, closing every input channel.
    pub fn spawn_bridge(
        self,
        router: InputRouter,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("input_bridge".into())
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let msg = match self.recv() {
                        Ok(Some(m)) => m,
                        Ok(None) => continue,
                        Err(e @ InputClientError::NonUtf8Message)
                        | Err(e @ InputClientError::DeserializeError(_)) => {
                            warn!("Dropping input message: {}", e);
                            continue;
                        }
                        Err(e) => {
                            error!("Input bridge stopped: {}", e);
                            break;
                        }
                    };

                    match router.route(msg) {
                        RouteOutcome::Routed | RouteOutcome::InactiveSource => (),
                        RouteOutcome::HandlerGone(stream) => {
                            warn!("The {} handler has stopped, message dropped", stream)
                        }
                        RouteOutcome::EstimateLoopGone => break,
                    }
                }

                info!("Input bridge closed");
            })
    }
}
