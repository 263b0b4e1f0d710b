//! Application entry point.
//!
//! Orchestrates one animation run:
//! validate inputs → connect → stream audio / collect video → (relay)

use crate::config::Config;
use crate::error::{A2f2dError, Result};
use crate::input::{self, MaterializedInputs};
use crate::proto::AnimateConfig;
use crate::relay::{self, RelayServer, RelaySink};
use crate::session::{
    AudioUploadPump, FileSink, ResponseDemultiplexer, SessionController, SessionReport,
};
use crate::session::handshake;
use crate::transport::{AnimateTransport, ChannelSecurity, GrpcTransport};
use std::net::{Ipv4Addr, SocketAddr};

/// Everything a run needs, checked before any network activity.
#[derive(Debug)]
pub struct PreparedRun {
    pub config: Config,
    pub inputs: MaterializedInputs,
    pub security: ChannelSecurity,
    pub animate_config: AnimateConfig,
}

/// Validate configuration, load every input and credential, and build the
/// animate config. Nothing here touches the network.
pub fn prepare(config: Config) -> Result<PreparedRun> {
    config.validate()?;
    let inputs = input::materialize(&config.inputs, config.animation.head_pose)?;
    let security = ChannelSecurity::from_config(&config.connection)?;
    let animate_config = handshake::build_config(&config.animation, &inputs)?;

    Ok(PreparedRun {
        config,
        inputs,
        security,
        animate_config,
    })
}

/// Run the whole flow against the configured service.
///
/// With the browser relay enabled, a successful run keeps serving until
/// Ctrl+C.
pub async fn run(config: Config) -> Result<SessionReport> {
    let prepared = prepare(config)?;

    let (server, relay_sink) = if prepared.config.relay.enabled {
        let (sink, feed) = relay::channel();
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, prepared.config.relay.port));
        (Some(RelayServer::start(addr, feed).await?), Some(sink))
    } else {
        (None, None)
    };

    let transport =
        GrpcTransport::connect(&prepared.config.connection.target, &prepared.security).await?;
    let report = execute(prepared, transport, relay_sink).await?;

    if let Some(server) = server {
        tracing::info!(
            "Browser stream finished at http://localhost:{}. Press Ctrl+C to stop",
            server.local_addr().port()
        );
        tokio::signal::ctrl_c().await?;
        server.shutdown().await;
    }

    Ok(report)
}

/// Run one session over `transport`, writing to the output file and, when
/// given, the relay.
pub async fn execute<T: AnimateTransport>(
    prepared: PreparedRun,
    transport: T,
    relay: Option<RelaySink>,
) -> Result<SessionReport> {
    let PreparedRun {
        config,
        inputs,
        animate_config,
        ..
    } = prepared;

    let pump = AudioUploadPump::open(&inputs.audio, config.streaming.chunk_size).await?;
    let output = FileSink::create(&config.inputs.output).await?;

    let mut demux = ResponseDemultiplexer::new(Box::new(output));
    if let Some(relay) = relay {
        demux = demux.with_sink(Box::new(relay));
    }

    let report = SessionController::new(transport)
        .with_outbound_buffer(config.streaming.outbound_buffer)
        .run(animate_config, pump, demux)
        .await?;

    if report.video_chunks == 0 {
        tracing::warn!("Server sent no video");
    }
    tracing::info!(output = %config.inputs.output.display(), "Output written");
    Ok(report)
}

/// Describe a failure for the final status line.
pub fn describe_failure(err: &A2f2dError) -> String {
    format!("{} ({} failure)", err, err.category())
}
