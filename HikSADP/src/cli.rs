//! Définition de la ligne de commande `sadp`.

use clap::{Args, Parser, Subcommand};
use hiksadp::DEFAULT_NEW_MASK;
use std::time::Duration;

const AFTER_HELP: &str = "\
Environment Variables:
  DISCOVERY_WORKERS   Number of concurrent workers (default: 100)
  DISCOVERY_TIMEOUT   Per-host timeout (default: 1s)
  SADP_TIMEOUT        SADP protocol timeout (default: 5s)
  DEBUG               Enable debug output (default: false)

Examples:
  sadp discover:sadp
  sadp discover:sadp --xml --output devices.xml
  sadp scan 192.168.1.0/24
  sadp send 192.168.1.64 inquiry
  sadp reset --serial ABC123 --date 20231215";

#[derive(Parser, Debug)]
#[command(
    name = "sadp",
    version,
    about = "SADP - Hikvision Device Discovery Tool",
    after_help = AFTER_HELP
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover Hikvision devices via ARP (requires subnet)
    Discover(ArpArgs),

    /// Discover devices via SADP protocol (multicast)
    #[command(name = "discover:sadp")]
    DiscoverSadp(SadpArgs),

    /// Discover devices using both ARP and SADP
    Scan(ArpArgs),

    /// Check device info and status
    Probe(ProbeArgs),

    /// Send SADP XML command to a device
    Send(SendArgs),

    /// Generate password reset code (firmware < 5.3.0)
    Reset(ResetArgs),
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    hikconfig::parse_duration(s).map_err(|e| e.to_string())
}

#[derive(Args, Debug)]
pub struct ArpArgs {
    /// Network to scan, e.g. 192.168.1.0/24 (prefixes wider than /8 are rejected)
    pub cidr: String,

    /// Number of concurrent workers for scanning
    #[arg(long)]
    pub workers: Option<usize>,

    /// Timeout for each host probe (e.g. 500ms, 1s)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args, Debug)]
pub struct SadpArgs {
    /// Discovery timeout (e.g. 3s)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Output file path (default: stdout)
    #[arg(long)]
    pub output: Option<String>,

    /// Output in XML format (SADP compatible)
    #[arg(long, conflicts_with = "csv")]
    pub xml: bool,

    /// Output in CSV format
    #[arg(long)]
    pub csv: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Device IP address
    pub ip: String,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sadp send 192.168.1.64 inquiry
  sadp send 192.168.1.64 exchangecode --mac 4C:BD:8F:61:CC:5C
  sadp send 0.0.0.0 exchangecode --mac 4C:BD:8F:61:CC:5C  (uses broadcast)")]
pub struct SendArgs {
    /// Target IP (0.0.0.0 broadcasts and filters replies by --mac)
    #[arg(required_unless_present = "list")]
    pub target: Option<String>,

    /// SADP command name
    #[arg(default_value = "inquiry")]
    pub command: String,

    /// List available commands
    #[arg(long)]
    pub list: bool,

    /// Target device MAC address (required for most commands)
    #[arg(long)]
    pub mac: Option<String>,

    /// Device password
    #[arg(long)]
    pub password: Option<String>,

    /// Security/reset code
    #[arg(long)]
    pub code: Option<String>,

    /// New IP address (for update command)
    #[arg(long = "ip")]
    pub new_ip: Option<String>,

    /// New subnet mask (for update command)
    #[arg(long = "mask", default_value = DEFAULT_NEW_MASK)]
    pub new_mask: String,

    /// New gateway (for update command)
    #[arg(long = "gateway")]
    pub new_gateway: Option<String>,

    /// New SDK port (for update command)
    #[arg(long = "port", default_value_t = hiksadp::DEFAULT_NEW_PORT)]
    pub new_port: u16,

    /// Enable DHCP (for update command)
    #[arg(long)]
    pub dhcp: bool,

    /// Email address (for setmailbox command)
    #[arg(long)]
    pub email: Option<String>,

    /// Command timeout (e.g. 5s)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args, Debug)]
#[command(after_help = "\
IMPORTANT:
  - Serial number is CASE-SENSITIVE
  - Remove the model prefix from the serial number
    Example: DS-7616NI-I20123456789 -> 0123456789
  - Date must match the device's internal clock, NOT today's date
  - Check the 'Start Time' or 'Boot Time' in SADP to find device date

Note: This only works on firmware versions < 5.3.0")]
pub struct ResetArgs {
    /// Device serial number (case-sensitive, without model prefix)
    #[arg(long)]
    pub serial: Option<String>,

    /// Device date in YYYYMMDD format (from device's internal clock)
    #[arg(long)]
    pub date: Option<String>,

    /// Device IP to auto-fetch serial and date
    #[arg(long)]
    pub ip: Option<String>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sadp").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_arguments() {
        assert!(parse(&[]).command.is_none());
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["sadp", "explode"]).is_err());
    }

    #[test]
    fn test_discover_sadp_flags() {
        match parse(&["discover:sadp", "--xml", "--timeout", "750ms", "--output", "out.xml"]).command {
            Some(Commands::DiscoverSadp(args)) => {
                assert!(args.xml && !args.csv);
                assert_eq!(args.timeout, Some(Duration::from_millis(750)));
                assert_eq!(args.output.as_deref(), Some("out.xml"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(Cli::try_parse_from(["sadp", "discover:sadp", "--xml", "--csv"]).is_err());
    }

    #[test]
    fn test_send_flags_after_positionals() {
        match parse(&["send", "0.0.0.0", "exchangecode", "--mac", "4c-bd-8f-61-cc-5c"]).command {
            Some(Commands::Send(args)) => {
                assert_eq!(args.target.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.command, "exchangecode");
                assert_eq!(args.mac.as_deref(), Some("4c-bd-8f-61-cc-5c"));
                assert_eq!(args.new_mask, "255.255.255.0");
                assert_eq!(args.new_port, 8000);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_send_defaults_and_list() {
        match parse(&["send", "192.168.1.64"]).command {
            Some(Commands::Send(args)) => assert_eq!(args.command, "inquiry"),
            other => panic!("unexpected: {other:?}"),
        }
        match parse(&["send", "--list"]).command {
            Some(Commands::Send(args)) => assert!(args.list && args.target.is_none()),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(Cli::try_parse_from(["sadp", "send"]).is_err());
    }

    #[test]
    fn test_scan_workers_and_timeout() {
        match parse(&["scan", "--workers", "50", "10.0.0.0/24", "--timeout", "2"]).command {
            Some(Commands::Scan(args)) => {
                assert_eq!(args.cidr, "10.0.0.0/24");
                assert_eq!(args.workers, Some(50));
                assert_eq!(args.timeout, Some(Duration::from_secs(2)));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(Cli::try_parse_from(["sadp", "scan", "10.0.0.0/24", "--timeout", "soon"]).is_err());
    }

    #[test]
    fn test_overflowing_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["sadp", "discover:sadp", "--timeout", "1e300s"]).is_err());
        assert!(Cli::try_parse_from(["sadp", "send", "10.0.0.2", "--timeout", "1e30"]).is_err());
    }
}
