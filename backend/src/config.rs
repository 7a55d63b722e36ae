use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "katapult-device", about = "Katapult launcher device simulator")]
pub struct DeviceConfig {
    /// Address the HTTP/WebSocket server listens on.
    #[arg(long, env = "KATAPULT_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Simulated rotor speed; 0 leaves the hall sensor silent.
    #[arg(long, default_value_t = 120.0)]
    pub rpm: f64,

    /// Relative per-revolution jitter of the simulated sensor.
    #[arg(long, default_value_t = 0.03)]
    pub jitter: f64,

    /// Directory with the built panel UI.
    #[arg(long, env = "KATAPULT_STATIC_DIR", default_value = "./frontend/dist/public")]
    pub static_dir: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            rpm: 120.0,
            jitter: 0.03,
            static_dir: PathBuf::from("./frontend/dist/public"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_default() {
        let cfg = DeviceConfig::try_parse_from(["katapult-device"]).expect("parse");
        let def = DeviceConfig::default();
        assert_eq!(cfg.bind, def.bind);
        assert_eq!(cfg.rpm, def.rpm);
        assert_eq!(cfg.static_dir, def.static_dir);
    }

    #[test]
    fn overrides() {
        let cfg = DeviceConfig::try_parse_from([
            "katapult-device",
            "--bind",
            "127.0.0.1:8080",
            "--rpm",
            "0",
        ])
        .expect("parse");
        assert_eq!(cfg.bind.port(), 8080);
        assert_eq!(cfg.rpm, 0.0);
    }
}
