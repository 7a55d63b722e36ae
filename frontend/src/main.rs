// Headless operator console for the launcher.
//
// Mounts the panel against a device, draws the RPM window as a sparkline on
// stdout and takes operator commands as lines on stdin:
//   reset | turn | fire | angle <value> | focus | blur | status | reconnect | quit

use std::time::Duration;

use clap::Parser;
use katapult_panel::panel::config::DEFAULT_BASE_URL;
use katapult_panel::{ConnectionStatus, Panel, PanelConfig, ReconnectPolicy, SparklineChart};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "katapult-panel", about = "Control panel for the katapult launcher")]
struct Args {
    /// Device base URL (http, https, ws, wss or bare host:port).
    #[arg(long, env = "KATAPULT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Do not reconnect when the channel drops.
    #[arg(long, env = "KATAPULT_NO_RECONNECT")]
    no_reconnect: bool,

    /// Give up after this many failed reconnect attempts (default: never).
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Number of RPM samples kept on screen.
    #[arg(long, default_value_t = 10)]
    window: usize,

    /// Only draw settled chart rows.
    #[arg(long)]
    no_slide: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = PanelConfig {
        base_url: args.base_url,
        auto_reconnect: !args.no_reconnect,
        reconnect: ReconnectPolicy {
            max_attempts: args.max_attempts,
            ..ReconnectPolicy::default()
        },
        window_capacity: args.window,
        ..PanelConfig::default()
    };

    let chart = SparklineChart::new(std::io::stdout(), "RPM");
    let chart = if args.no_slide { chart.settled_only() } else { chart };

    let mut panel = Panel::mount(&config, Some(Box::new(chart)))?;

    let status = panel.status();
    let status_sub = status.subscribe(|s| match s {
        ConnectionStatus::Open => info!("connected ({s})"),
        ConnectionStatus::Connecting => info!("connecting... ({s})"),
        _ => warn!("no connection to device ({s})"),
    });
    let initiated = panel.initiated();
    let initiated_sub = initiated.subscribe(|armed| {
        if *armed {
            info!("shot armed, waiting for release");
        } else {
            info!("shot idle");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let mut parts = line.trim().splitn(2, char::is_whitespace);
        match (parts.next().unwrap_or(""), parts.next()) {
            ("", _) => {}
            ("reset", _) => panel.reset(),
            ("turn", _) => panel.turn_servo(),
            ("fire", _) => {
                info!("initiating shot at {}", panel.angle().display());
                panel.initiate_shot();
            }
            ("focus", _) => {
                panel.angle_mut().on_focus();
                println!("angle: {}", panel.angle().display());
            }
            ("blur", _) => {
                panel.angle_mut().on_blur();
                println!("angle: {}", panel.angle().display());
            }
            ("angle", value) => {
                panel.angle_mut().set_raw(value.unwrap_or(""));
                println!("angle: {}", panel.angle().display());
            }
            ("status", _) => println!(
                "{} | armed={} | ceiling={:.0} | angle={}",
                status.get(),
                initiated.get(),
                panel.display_ceiling(),
                panel.angle().display()
            ),
            ("reconnect", _) => panel.reconnect(),
            ("quit", _) | ("exit", _) => break,
            (other, _) => warn!("unknown command {other:?}"),
        }
    }

    status.unsubscribe(status_sub);
    initiated.unsubscribe(initiated_sub);

    // Leave in-flight commands a moment to go out before the runtime stops.
    tokio::time::sleep(Duration::from_millis(100)).await;
    panel.unmount().await;
    Ok(())
}
