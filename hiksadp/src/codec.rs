//! Décodage des réponses SADP et export des équipements (XML, CSV).

use crate::device::Device;
use crate::errors::SadpError;
use hikutils::normalize_mac;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::debug;

/// Version de l'enveloppe `SADPDeviceList`
pub const DEVICE_LIST_VERSION: &str = "2.0";

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// En-tête CSV (15 colonnes)
pub const CSV_HEADER: &str = "ID,DeviceType,Activated,IPv4Address,Port,HttpPort,SoftwareVersion,IPv4Gateway,SerialNumber,IPv4SubnetMask,MAC,ChannelNum,DSPVersion,BootTime,DHCP";

#[derive(Serialize)]
#[serde(rename = "SADPDeviceList")]
struct DeviceListRef<'a> {
    #[serde(rename = "@version")]
    version: &'static str,
    #[serde(rename = "Device")]
    devices: &'a [Device],
}

#[derive(Deserialize)]
struct DeviceList {
    #[serde(rename = "Device", default)]
    devices: Vec<Device>,
}

/// Décode un datagramme SADP en [`Device`].
///
/// Les charges sans élément `ProbeMatch` sont ignorées sans analyse XML. Un
/// document invalide est journalisé et ignoré. L'adresse MAC est normalisée
/// (majuscules, séparateur `:`).
pub fn parse_response(data: &str) -> Option<Device> {
    if !data.contains("<ProbeMatch") && !data.contains("ProbeMatch>") {
        return None;
    }

    match quick_xml::de::from_str::<Device>(data) {
        Ok(mut device) => {
            device.mac = normalize_mac(&device.mac);
            Some(device)
        }
        Err(e) => {
            debug!("Failed to parse SADP response: {}", e);
            None
        }
    }
}

/// Sérialise les équipements dans l'enveloppe `SADPDeviceList version="2.0"`.
pub fn to_xml(devices: &[Device]) -> Result<String, SadpError> {
    let list = DeviceListRef {
        version: DEVICE_LIST_VERSION,
        devices,
    };

    let mut body = String::new();
    let mut ser = quick_xml::se::Serializer::new(&mut body);
    ser.indent(' ', 2);
    list.serialize(ser)?;

    Ok(format!("{}{}", XML_HEADER, body))
}

/// Relit un document produit par [`to_xml`]
pub fn from_xml(xml: &str) -> Result<Vec<Device>, quick_xml::de::DeError> {
    let list: DeviceList = quick_xml::de::from_str(xml)?;
    Ok(list.devices)
}

/// Export CSV, une ligne par équipement dans l'ordre reçu.
///
/// Les valeurs ne sont ni citées ni échappées.
pub fn to_csv(devices: &[Device]) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');

    for (i, dev) in devices.iter().enumerate() {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            i + 1,
            dev.device_type,
            dev.activated,
            dev.ipv4_address,
            dev.command_port,
            dev.http_port,
            dev.software_version,
            dev.ipv4_gateway,
            dev.device_sn,
            dev.ipv4_subnet_mask,
            dev.mac,
            dev.channel_num(),
            dev.dsp_version,
            dev.boot_time,
            dev.dhcp,
        );
    }

    out
}

/// Tronque `s` à `max_len` caractères, points de suspension compris.
///
/// Si `max_len <= 3`, le résultat est exactement `max_len` points.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }
    let mut out: String = s.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}
