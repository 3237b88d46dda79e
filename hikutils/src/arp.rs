//! Lecture de la table ARP du système.
//!
//! La table est obtenue via la commande `arp` de la plateforme puis analysée
//! ligne par ligne. Deux formats sont reconnus :
//!
//! - BSD/macOS : `? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]`
//! - Linux/Windows : colonnes, l'IP en premier champ, la MAC dans un champ suivant

use crate::errors::NetError;
use crate::mac::is_valid_mac;
use std::collections::HashMap;
use std::net::IpAddr;
use tokio::process::Command;
use tracing::debug;

/// IP -> MAC (minuscules, séparateur `:`)
pub type ArpTable = HashMap<String, String>;

fn arp_command() -> Option<Command> {
    let args: &[&str] = if cfg!(target_os = "macos") {
        &["-an"]
    } else if cfg!(target_os = "linux") {
        &["-n"]
    } else if cfg!(target_os = "windows") {
        &["-a"]
    } else {
        return None;
    };

    let mut cmd = Command::new("arp");
    cmd.args(args);
    Some(cmd)
}

/// Lit la table ARP courante.
///
/// Sur une plateforme non supportée, retourne une table vide.
pub async fn read_arp_table() -> Result<ArpTable, NetError> {
    let Some(mut cmd) = arp_command() else {
        return Ok(ArpTable::new());
    };

    let output = cmd.output().await.map_err(NetError::Arp)?;
    if !output.status.success() {
        return Err(NetError::Arp(std::io::Error::other(format!(
            "arp exited with {}",
            output.status
        ))));
    }

    let table = parse_arp_output(&String::from_utf8_lossy(&output.stdout));
    debug!(entries = table.len(), "ARP table loaded");
    Ok(table)
}

/// Analyse la sortie complète de la commande `arp`.
pub fn parse_arp_output(output: &str) -> ArpTable {
    output.lines().filter_map(parse_arp_line).collect()
}

/// Analyse une ligne de sortie `arp`, retourne `(ip, mac)` si les deux sont présents.
pub fn parse_arp_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(at_idx) = line.find(") at ") {
        let start = line.find('(')?;
        let end = line.find(')')?;
        if end <= start {
            return None;
        }
        let ip = &line[start + 1..end];
        let mac = line[at_idx + 5..].split_whitespace().next()?;
        if !mac.contains(':') {
            return None;
        }
        return Some((ip.to_string(), mac.to_ascii_lowercase()));
    }

    let mut fields = line.split_whitespace();
    let ip = fields.next()?;
    ip.parse::<IpAddr>().ok()?;

    fields
        .map(|f| f.replace('-', ":"))
        .find(|f| is_valid_mac(f))
        .map(|mac| (ip.to_string(), mac.to_ascii_lowercase()))
}
