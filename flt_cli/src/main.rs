//! Command line for the flight executive.
//!
//! Sends goals and yaw requests over the telecommand socket. With a command on the command line
//! it is sent once, otherwise an interactive prompt is started.

use color_eyre::{eyre::WrapErr, Report};
use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    tc::{Tc, TcResponse},
};
use rustyline::{error::ReadlineError, DefaultEditor};
use structopt::StructOpt;

const PROMPT: &str = "flt $ ";
const HISTORY_PATH: &str = "data/history.txt";

#[derive(Debug, StructOpt)]
#[structopt(name = "flt_cli", about = "Sends goals and yaw requests to the flight executive")]
struct Opts {
    /// Telecommand endpoint of the flight executive
    #[structopt(short, long, default_value = "tcp://localhost:5010")]
    endpoint: String,

    /// Command to send once, omit for an interactive prompt
    #[structopt(subcommand)]
    tc: Option<Tc>,
}

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    let ctx = zmq::Context::new();
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::REQ,
        SocketOptions {
            block_on_first_connect: false,
            linger: 1,
            recv_timeout: 1000,
            send_timeout: 1000,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        },
        &opts.endpoint,
    )
    .wrap_err("Could not connect to the flight executive")?;

    if let Some(tc) = opts.tc {
        let response = send(&socket, &tc)?;
        println!("{:?}", response);
        return Ok(());
    }

    let mut rl = DefaultEditor::new().wrap_err("Could not start the prompt")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str()).ok();

                match parse(&line) {
                    Ok(tc) => match send(&socket, &tc) {
                        Ok(r) => println!("{:?}", r),
                        Err(e) => println!("{:?}", e),
                    },
                    Err(e) => println!("{}", e.message),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Unhandled Error: {:?}", err);
                break;
            }
        }
    }

    println!("Exiting...");
    rl.save_history(HISTORY_PATH).ok();

    Ok(())
}

/// Parse a prompt line into a telecommand.
fn parse(line: &str) -> Result<Tc, structopt::clap::Error> {
    Tc::from_iter_safe(std::iter::once("flt").chain(line.split_whitespace()))
}

/// Send a telecommand and wait for the executive's response.
fn send(socket: &MonitoredSocket, tc: &Tc) -> Result<TcResponse, Report> {
    let tc_str = serde_json::to_string(tc)?;

    socket
        .send(&tc_str, 0)
        .wrap_err("Could not send the command")?;

    let response_str = match socket.recv_string(0) {
        Ok(Ok(s)) => s,
        Ok(Err(_)) => return Err(color_eyre::eyre::eyre!("Response was not valid UTF-8")),
        Err(e) => return Err(e).wrap_err("No response from the flight executive"),
    };

    serde_json::from_str(&response_str).wrap_err("Could not parse the response")
}
