//! # hiksadp - Client SADP
//!
//! Implémentation du protocole SADP (Search Active Devices Protocol) utilisé
//! par les équipements vidéo Hikvision : découverte multicast sur toutes les
//! interfaces, catalogue de commandes et échange requête/réponse.
//!
//! ## Fonctionnalités
//!
//! - ✅ Sondes `inquiry` / `inquiry_v32` en multicast et broadcast
//! - ✅ Déduplication par MAC (la première réponse gagne)
//! - ✅ Commandes unicast ou diffusées avec filtrage par MAC
//! - ✅ Export XML (`SADPDeviceList`) et CSV
//!
//! ## Constantes SADP
//!
//! - **Multicast Address**: 239.255.255.250:37020
//! - **Taille maximale d'un datagramme**: 65535 octets

use std::net::Ipv4Addr;
use std::time::Duration;

mod catalog;
mod codec;
mod device;
mod errors;
mod registry;
mod scanner;

pub use catalog::{
    COMMANDS, Command, DEFAULT_NEW_MASK, DEFAULT_NEW_PORT, Param, SendOptions, build_command_xml,
    list_commands, lookup,
};
pub use codec::{CSV_HEADER, DEVICE_LIST_VERSION, from_xml, parse_response, to_csv, to_xml, truncate};
pub use device::Device;
pub use errors::SadpError;
pub use registry::DeviceRegistry;
pub use scanner::{SadpScanner, response_matches_mac};

/// Adresse multicast SADP
pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Port SADP
pub const SADP_PORT: u16 = 37020;

/// Taille maximale d'un datagramme reçu
pub const MAX_PACKET_SIZE: usize = 65535;

/// Délai par défaut d'une commande
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
