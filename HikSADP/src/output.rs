//! Mise en forme des résultats pour le terminal.

use crate::arp_discovery::ArpDevice;
use hiksadp::{Device, list_commands, truncate};
use std::fmt::Write;

/// Tableau à largeur fixe des équipements SADP
pub fn format_device_table(devices: &[Device]) -> String {
    if devices.is_empty() {
        return "No devices found.\n".to_string();
    }

    let mut out = String::from("\n");
    let _ = writeln!(
        out,
        "{:<3} {:<15} {:<17} {:<20} {:<8} {:<6} {:<15} {}",
        "#", "IPv4 Address", "MAC Address", "Device Type", "Status", "Port", "Serial Number", "Software Version"
    );
    out.push_str(&"-".repeat(120));
    out.push('\n');

    for (i, dev) in devices.iter().enumerate() {
        let status = if dev.is_activated() { "Active" } else { "Inactive" };
        let _ = writeln!(
            out,
            "{:<3} {:<15} {:<17} {:<20} {:<8} {:<6} {:<15} {}",
            i + 1,
            dev.ipv4_address,
            dev.mac,
            truncate(&dev.device_type, 20),
            status,
            dev.command_port,
            truncate(&dev.device_sn, 15),
            dev.software_version,
        );
    }
    out.push('\n');
    out
}

pub fn format_arp_devices(devices: &[ArpDevice]) -> String {
    let mut out = String::new();
    for dev in devices {
        let _ = writeln!(out, "  IP: {:<15}  MAC: {}", dev.ip, dev.mac);
    }
    out
}

/// Catalogue des commandes : nom, MAC requise, mot de passe requis, description
pub fn format_command_list() -> String {
    let yes_no = |b: bool| if b { "Yes" } else { "No" };

    let mut out = String::from("Available SADP Commands:\n\n");
    let _ = writeln!(
        out,
        "{:<20} {:<12} {:<12} {}",
        "Command", "Needs MAC", "Needs Pass", "Description"
    );
    out.push_str(&"-".repeat(80));
    out.push('\n');

    for cmd in list_commands() {
        let _ = writeln!(
            out,
            "{:<20} {:<12} {:<12} {}",
            cmd.name,
            yes_no(cmd.needs_mac()),
            yes_no(cmd.needs_pass()),
            cmd.description
        );
    }
    out
}
