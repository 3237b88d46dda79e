//! Découverte par balayage de liveness puis corrélation avec la table ARP.

use hikutils::arp::{ArpTable, read_arp_table};
use hikutils::{is_hikvision_mac, sweep_alive};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hôte actif dont la MAC (table ARP) appartient à Hikvision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpDevice {
    pub ip: String,
    pub mac: String,
}

pub async fn discover_devices(ips: &[String], workers: usize, timeout: Duration) -> Vec<ArpDevice> {
    info!(count = ips.len(), workers, "Scanning IP addresses");

    let alive = sweep_alive(ips, workers, timeout).await;
    debug!(alive = alive.len(), "Liveness sweep finished");

    let arp_table = match read_arp_table().await {
        Ok(table) => table,
        Err(e) => {
            warn!(error = %e, "Failed to read ARP table");
            return Vec::new();
        }
    };

    filter_hikvision(&alive, &arp_table)
}

/// Garde les hôtes actifs présents dans la table ARP avec une MAC Hikvision
pub fn filter_hikvision(alive: &[String], arp_table: &ArpTable) -> Vec<ArpDevice> {
    alive
        .iter()
        .filter_map(|ip| {
            let mac = arp_table.get(ip)?;
            is_hikvision_mac(mac).then(|| ArpDevice {
                ip: ip.clone(),
                mac: mac.clone(),
            })
        })
        .collect()
}
