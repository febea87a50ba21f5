//! amode-stream - record frames from an A-mode ultrasound device

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use amode_stream::{
    DataMode, FrameSink, NullSink, ReadPolicy, SessionEnd, StreamSettings, StreamingSession,
    TcpTransport, sink_for,
};

/// Stream and record frames from an A-mode ultrasound device
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Device IP address
    #[arg(long)]
    ip: Option<String>,

    /// Device TCP port
    #[arg(long)]
    port: Option<u16>,

    /// Directory for recorded frames
    #[arg(short, long = "outputdir")]
    output_dir: Option<PathBuf>,

    /// Data mode: 0 = raw samples, 1 = depth values
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=1))]
    mode: Option<u8>,

    /// Samples per probe (overrides the mode preset)
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Number of probes (overrides the mode preset)
    #[arg(short, long)]
    probes: Option<usize>,

    /// Receive frames without writing them to disk
    #[arg(long)]
    no_record: bool,

    /// Skip the device index instead of keeping it in frames
    #[arg(long)]
    no_index: bool,

    /// Reassemble frames split across reads instead of dropping them
    #[arg(long)]
    exact_reads: bool,

    /// Fail the session when a read stalls this long
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// YAML settings file; command line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn settings(&self) -> Result<StreamSettings> {
        let mut settings = match &self.config {
            Some(path) => StreamSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => StreamSettings::default(),
        };

        if let Some(ip) = &self.ip {
            settings.address = ip.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(mode) = self.mode {
            settings.mode = DataMode::try_from(mode)?;
        }
        if self.samples.is_some() {
            settings.samples = self.samples;
        }
        if self.probes.is_some() {
            settings.probes = self.probes;
        }
        if self.no_record {
            settings.record = false;
        }
        if self.no_index {
            settings.use_data_index = false;
        }
        if self.exact_reads {
            settings.read_policy = ReadPolicy::Exact;
        }
        if self.read_timeout_ms.is_some() {
            settings.read_timeout_ms = self.read_timeout_ms;
        }
        Ok(settings)
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// The transport watches the same token, so a stalled read is interrupted too.
fn install_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Stopping session");
                cancel.cancel();
            }
            Err(e) => warn!("Ctrl-C handler unavailable: {}", e),
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let settings = cli.settings()?;
    let config = settings.session_config().context("Invalid session configuration")?;

    let cancel = CancellationToken::new();

    let address = settings.device_address();
    let transport = TcpTransport::connect(&address)
        .await
        .with_context(|| format!("Could not reach A-mode device at {}", address))?
        .with_read_timeout(settings.read_timeout())
        .with_cancellation(cancel.clone());

    let sink: Box<dyn FrameSink> = if config.record() {
        sink_for(&config, &settings.output_dir)?
    } else {
        info!("Recording disabled");
        Box::new(NullSink)
    };

    install_ctrl_c(cancel.clone());

    let report = StreamingSession::new(transport, config, sink, cancel).run().await;

    let stats = &report.stats;
    println!("Elapsed time: {:.3} s", stats.elapsed().as_secs_f64());
    println!("Frames received: {}", stats.accepted_frames());
    if let Some(interval) = stats.mean_frame_interval() {
        println!("Mean time per frame: {:.3} ms", interval.as_secs_f64() * 1000.0);
    }
    if stats.rejected_frames() > 0 {
        println!("Frames dropped: {}", stats.rejected_frames());
    }
    if stats.index_gaps() > 0 {
        println!("Index gaps: {}", stats.index_gaps());
    }

    if let SessionEnd::TransportFailure(e) = &report.end {
        for suggestion in e.recovery_suggestions() {
            eprintln!("  - {}", suggestion);
        }
    }
    report.into_result().context("Session ended with a transport failure")?;
    Ok(())
}
