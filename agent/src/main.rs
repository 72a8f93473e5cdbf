// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_crate_level_docs)]

mod args;

use crate::args::{CmdArgs, Parser};

use agent::apply::platform_mappings;
use agent::{AgentParamsBuilder, SwSwitch};
use color_eyre::eyre::WrapErr;
use config::SwitchConfig;
use dsf::{DsfParams, InProcessTransport, StateTransport};
use state::StateContext;
use std::sync::Arc;
use tracectl::{get_trace_ctl, trace_target};
use tracing::{error, info, level_filters::LevelFilter};

trace_target!("agent-main", LevelFilter::DEBUG, &[]);
fn init_logging() {
    let tctl = get_trace_ctl();
    tctl.set_default_level(LevelFilter::INFO);
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    /* parse cmd line args */
    let args = CmdArgs::parse();
    if let Some(tracing) = args.tracing()
        && let Err(e) = get_trace_ctl().setup_from_string(tracing)
    {
        error!("Invalid tracing configuration: {e}");
        panic!("Invalid tracing configuration: {e}");
    }
    if args.show_tracing_tags() {
        get_trace_ctl().dump_targets_by_tag();
        std::process::exit(0);
    }
    if args.show_tracing_targets() {
        get_trace_ctl().dump();
        std::process::exit(0);
    }

    /* initialize logging */
    init_logging();
    info!("Starting switch agent...");

    let config = SwitchConfig::load(args.config()).wrap_err("Failed to load configuration")?;
    config.validate().wrap_err("Invalid configuration")?;
    info!("{config}");

    let (stop_tx, stop_rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        if stop_tx.send(()).is_err() {
            error!("Error sending SIGINT signal");
        }
    })
    .wrap_err("failed to set SIGINT handler")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("agent-rt")
        .enable_all()
        .build()
        .wrap_err("Failed to build async runtime")?;

    /* agent parameters */
    let dsf = DsfParams {
        local_node_name: args
            .node_name()
            .unwrap_or(&config.settings.hostname)
            .to_owned(),
        sessions_per_node: args.dsf_sessions(),
        service_port: args.dsf_port(),
        ..DsfParams::default()
    };
    let Ok(params) = AgentParamsBuilder::default()
        .name(config.settings.hostname.as_str())
        .context(StateContext::new(config.settings.neighbor_tables))
        .dsf(dsf)
        .platforms(platform_mappings(&config)?)
        .build()
    else {
        error!("Bad agent parameters");
        panic!("Bad agent parameters");
    };

    /* only VOQ switches exchange state with the other nodes */
    let transport = config.is_voq().then(|| {
        Arc::new(InProcessTransport::new(runtime.handle().clone())) as Arc<dyn StateTransport>
    });

    let mut agent = SwSwitch::start(params, transport, runtime.handle().clone())?;
    if runtime.block_on(agent.ctl().apply_config(config))? {
        info!("Configuration applied");
    }

    stop_rx.recv().wrap_err("failed to receive stop signal")?;
    info!("Shutting down switch agent");
    agent.stop()?;
    Ok(())
}
