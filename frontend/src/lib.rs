pub mod panel;

pub use panel::Panel;
pub use panel::angle_input::{ClampedFormattedValue, DisplayMode};
pub use panel::chart::SparklineChart;
pub use panel::commands::{Command, CommandClient, CommandError};
pub use panel::config::{PanelConfig, ReconnectPolicy};
pub use panel::connection::{ConnectOptions, ConnectionManager, ConnectionStatus};
pub use panel::dispatch::{Dispatched, MessageDispatcher, ParseError};
pub use panel::observable::{Observable, SubscriptionId};
pub use panel::telemetry_window::{
    TelemetrySample, TelemetryWindow, WindowFrame, WindowPhase, WindowRenderer,
};
