//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::logger::LogFormat;

/// Read data from an Ouman device and publish it to Home Assistant over MQTT.
#[derive(Debug, Clone, Parser)]
#[command(name = "ouman-bridge", version, about)]
pub struct Args {
    /// Serial device to use, e.g. /dev/ttyUSB0
    #[arg(long)]
    pub serial: PathBuf,

    /// Ouman device model, e.g. EH203
    #[arg(long)]
    pub ouman: String,

    /// Activate debug logging
    #[arg(long)]
    pub debug: bool,

    /// Configuration file [default: $OUMAN_BRIDGE_CONFIG or ./ouman-collector.ini]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Console log format: compact, pretty or json
    #[arg(long, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_required_flags() {
        assert!(Args::try_parse_from(["ouman-bridge", "--serial", "/dev/ttyUSB0"]).is_err());
        assert!(Args::try_parse_from(["ouman-bridge", "--ouman", "EH203"]).is_err());
    }

    #[test]
    fn test_parse_all_flags() {
        let args = Args::try_parse_from([
            "ouman-bridge",
            "--serial",
            "/dev/ttyUSB0",
            "--ouman",
            "EH203",
            "--debug",
            "--config",
            "/etc/ouman.ini",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.serial, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(args.ouman, "EH203");
        assert!(args.debug);
        assert_eq!(args.config, Some(PathBuf::from("/etc/ouman.ini")));
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_defaults() {
        let args =
            Args::try_parse_from(["ouman-bridge", "--serial", "/dev/ttyS0", "--ouman", "EH201"])
                .unwrap();
        assert!(!args.debug);
        assert_eq!(args.config, None);
        assert_eq!(args.log_format, LogFormat::Compact);
    }
}
