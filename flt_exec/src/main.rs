//! Main flight executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise session, logging and parameters
//!     - Initialise the blackboard and the modules around it
//!     - Initialise network
//!     - Start one handler thread per non-estimate input stream
//!     - Estimate loop, until the input bridge stops:
//!         - Discontinuity filtering
//!         - Flight phase and mode dispatch
//!         - Trajectory control
//!         - Command publishing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// Internal
use comms_if::net::{zmq, NetParams};
use flt_lib::{
    act_client::ActClient,
    blackboard::Blackboard,
    cmd_pub::CmdPublisher,
    est::DiscontinuityFilter,
    handlers::{self, Handlers},
    input_client::InputClient,
    input_router::input_channels,
    mode_disp::ModeDispatcher,
    params::FltExecParams,
    path_ingest::PathIngestor,
    path_pub::PathPublisher,
    pipeline::EstPipeline,
    tc_client::TcClient,
    traj_ctrl::PosCtrl,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("flt_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Flight Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: FltExecParams =
        util::params::load("flt_exec.toml").wrap_err("Could not load exec params")?;
    params.validate().wrap_err("Invalid exec params")?;

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded, flying on {:?}", params.est_source);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let board = Arc::new(Blackboard::new());

    let traj_ctrl = PosCtrl::init("traj_ctrl.toml").wrap_err("Failed to initialise TrajCtrl")?;
    info!("TrajCtrl init complete");

    let ingestor = PathIngestor::new(params.desired_global_z_m, params.min_waypoint_spacing_m);
    let dispatcher = ModeDispatcher::new(traj_ctrl, params.dispatch_params());
    let filter = DiscontinuityFilter::new(params.est_source, params.discontinuity_threshold_m);

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let act_client =
        ActClient::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise ActClient")?;
    info!("ActClient initialised");

    let tc_client = TcClient::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise TcClient")?;
    info!("TcClient initialised");

    let path_pub = if params.republish_sparse_path {
        let p = PathPublisher::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise PathPublisher")?;
        info!("PathPublisher initialised");
        Some(p)
    } else {
        None
    };

    let input_client =
        InputClient::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise InputClient")?;
    info!("InputClient initialised");

    info!("Network initialisation complete");

    // ---- START HANDLERS ----

    let stop = Arc::new(AtomicBool::new(false));
    let (router, chans) = input_channels(params.est_source);

    let mut handlers = Handlers::new();
    handlers.push(
        "plan",
        handlers::spawn_plan_handler(chans.plan_rx, ingestor, board.clone(), path_pub)
            .wrap_err("Failed to start the plan handler")?,
    );
    handlers.push(
        "edge",
        handlers::spawn_edge_handler(chans.edge_rx, board.clone())
            .wrap_err("Failed to start the edge handler")?,
    );
    handlers.push(
        "node",
        handlers::spawn_node_handler(chans.node_rx, board.clone())
            .wrap_err("Failed to start the node handler")?,
    );
    handlers.push(
        "hex",
        handlers::spawn_hex_handler(chans.hex_rx, board.clone())
            .wrap_err("Failed to start the hex handler")?,
    );
    handlers.push(
        "tc",
        handlers::spawn_tc_handler(tc_client, board.clone(), stop.clone())
            .wrap_err("Failed to start the TC handler")?,
    );

    let bridge = input_client
        .spawn_bridge(router, stop.clone())
        .wrap_err("Failed to start the input bridge")?;

    info!("Handlers started");

    // ---- ESTIMATE LOOP ----

    info!("Begining estimate loop\n");

    let mut pipeline = EstPipeline::new(
        params.est_source,
        filter,
        dispatcher,
        CmdPublisher::new(act_client),
        board,
    );
    pipeline.run(chans.est_rx);

    // ---- SHUTDOWN ----

    info!("Estimate stream closed, shutting down");

    let num_failures = pipeline.publisher().num_consec_failures();
    if num_failures > 0 {
        log::warn!("The last {} commands could not be sent", num_failures);
    }

    stop.store(true, Ordering::Relaxed);
    if bridge.join().is_err() {
        log::warn!("The input bridge panicked");
    }
    handlers.join();

    session.exit();

    Ok(())
}
