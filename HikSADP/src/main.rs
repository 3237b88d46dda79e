mod arp_discovery;
mod cli;
mod logs;
mod output;
mod probe;
mod reset;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use hikconfig::get_config;
use hiksadp::{MULTICAST_ADDR, SADP_PORT, SadpScanner, SendOptions, to_csv, to_xml};
use hikutils::{expand_cidr, normalize_mac};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::arp_discovery::discover_devices;
use crate::cli::{ArpArgs, Cli, Commands, SadpArgs, SendArgs};
use crate::logs::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Discover(args) => run_discover(args).await,
        Commands::DiscoverSadp(args) => run_discover_sadp(args).await,
        Commands::Scan(args) => run_scan(args).await,
        Commands::Probe(args) => {
            init_logging(args.debug);
            probe::probe_device(&args.ip).await
        }
        Commands::Send(args) => run_send(args).await,
        Commands::Reset(args) => {
            init_logging(args.debug);
            reset::run(args).await
        }
    }
}

async fn arp_scan(args: &ArpArgs) -> Result<Vec<arp_discovery::ArpDevice>> {
    let config = get_config();
    let workers = args.workers.unwrap_or_else(|| config.discovery_workers());
    let timeout = args.timeout.unwrap_or_else(|| config.discovery_timeout());

    let ips = expand_cidr(&args.cidr).context("invalid CIDR")?;
    Ok(discover_devices(&ips, workers, timeout).await)
}

async fn run_discover(args: ArpArgs) -> Result<()> {
    init_logging(args.debug);

    println!("Discovering Hikvision devices in {}...", args.cidr);
    let devices = arp_scan(&args).await?;

    println!("\nFound {} Hikvision device(s):", devices.len());
    print!("{}", output::format_arp_devices(&devices));
    Ok(())
}

async fn run_discover_sadp(args: SadpArgs) -> Result<()> {
    init_logging(args.debug);
    let timeout = args.timeout.unwrap_or_else(|| get_config().sadp_timeout());

    println!("Discovering Hikvision devices via SADP protocol...");
    println!("Sending multicast probes to {}:{}", MULTICAST_ADDR, SADP_PORT);

    let devices = SadpScanner::new(timeout).discover().await?;
    println!("\nDiscovered {} device(s)", devices.len());

    let rendered = if args.xml {
        Some(to_xml(&devices).context("error generating XML")?)
    } else if args.csv {
        Some(to_csv(&devices))
    } else {
        print!("{}", output::format_device_table(&devices));
        if args.output.is_some() {
            Some(to_xml(&devices).context("error generating XML")?)
        } else {
            None
        }
    };

    match (args.output.as_deref(), rendered) {
        (Some(path), Some(content)) => {
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("error writing file {}", path))?;
            println!("Output written to: {}", path);
        }
        (None, Some(content)) => println!("{}", content),
        _ => {}
    }

    Ok(())
}

async fn run_scan(args: ArpArgs) -> Result<()> {
    init_logging(args.debug);

    println!("Scanning {} for Hikvision devices...", args.cidr);

    println!("\n[1/2] ARP Discovery...");
    let arp_devices = arp_scan(&args).await?;
    println!("      Found {} device(s) via ARP", arp_devices.len());

    println!("\n[2/2] SADP Discovery...");
    let sadp_devices = match SadpScanner::new(get_config().sadp_timeout()).discover().await {
        Ok(devices) => devices,
        Err(e) => {
            warn!(error = %e, "SADP discovery failed");
            Vec::new()
        }
    };
    println!("      Found {} device(s) via SADP", sadp_devices.len());

    let unique: HashSet<String> = arp_devices
        .iter()
        .map(|d| d.mac.to_uppercase())
        .chain(sadp_devices.iter().map(|d| d.mac.to_uppercase()))
        .collect();

    let rule = "=".repeat(51);
    println!("\n{}", rule);
    println!("                   SCAN RESULTS                    ");
    println!("{}", rule);
    println!("Total unique devices: {}\n", unique.len());

    if !arp_devices.is_empty() {
        println!("Devices found via ARP:");
        println!("{}", "-".repeat(51));
        println!("{}", output::format_arp_devices(&arp_devices));
    }

    if !sadp_devices.is_empty() {
        println!("Devices found via SADP:");
        print!("{}", output::format_device_table(&sadp_devices));
    }

    Ok(())
}

fn send_options(args: &SendArgs) -> SendOptions {
    SendOptions {
        target_ip: args.target.clone(),
        target_mac: args.mac.as_deref().map(normalize_mac),
        password: args.password.clone(),
        code: args.code.clone(),
        new_ip: args.new_ip.clone(),
        new_mask: Some(args.new_mask.clone()),
        new_gateway: args.new_gateway.clone(),
        new_port: Some(args.new_port),
        dhcp: args.dhcp,
        email: args.email.clone(),
        timeout: Some(args.timeout.unwrap_or_else(|| get_config().sadp_timeout())),
    }
}

async fn run_send(args: SendArgs) -> Result<()> {
    if args.list {
        print!("{}", output::format_command_list());
        return Ok(());
    }

    init_logging(args.debug);
    let opts = send_options(&args);
    let timeout = opts.timeout.unwrap_or(hiksadp::DEFAULT_TIMEOUT);

    info!(
        command = %args.command,
        ip = ?opts.target_ip(),
        mac = ?opts.target_mac(),
        "Sending SADP command"
    );
    println!(
        "Sending '{}' command to {}...",
        args.command,
        opts.target_ip().unwrap_or("0.0.0.0")
    );

    let response = SadpScanner::new(timeout)
        .send_command(&args.command, &opts)
        .await?;

    println!("\nResponse:");
    println!("---");
    println!("{}", response);
    println!("---");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_options_normalize_mac() {
        let cli = Cli::try_parse_from([
            "sadp", "send", "0.0.0.0", "activate", "--mac", "4c-bd-8f-61-cc-5c", "--password", "Abc12345",
            "--timeout", "2s",
        ])
        .unwrap();
        let Some(Commands::Send(args)) = cli.command else {
            panic!("expected send");
        };

        let opts = send_options(&args);
        assert_eq!(opts.target_mac(), Some("4C:BD:8F:61:CC:5C"));
        assert_eq!(opts.target_ip(), Some("0.0.0.0"));
        assert_eq!(opts.timeout, Some(std::time::Duration::from_secs(2)));
        assert_eq!(opts.new_port, Some(8000));
        assert!(hiksadp::build_command_xml(&args.command, &opts).is_ok());
    }
}
