//! Utilitaires réseau pour l'outillage SADP.
//!
//! Ce crate regroupe les briques sans état utilisées par les commandes :
//!
//! - [`expand_cidr`] : énumération des adresses d'un préfixe
//! - [`is_valid_mac`] / [`is_hikvision_mac`] : validation et filtrage OUI
//! - [`is_host_alive`] : test de présence (TCP puis ICMP)
//! - [`local_ipv4_adapters`] : adresses IPv4 des interfaces actives
//! - [`arp`] : lecture de la table ARP du système
//! - [`http`] : client HTTP minimal sur socket brute
//!
//! # Examples
//!
//! ```
//! use hikutils::{expand_cidr, is_hikvision_mac};
//!
//! let hosts = expand_cidr("192.168.1.0/30").unwrap();
//! assert_eq!(hosts, vec!["192.168.1.1", "192.168.1.2"]);
//! assert!(is_hikvision_mac("00-0d-c5-11-22-33"));
//! ```

pub mod arp;
mod cidr;
mod errors;
pub mod http;
mod ip_utils;
mod liveness;
mod mac;

pub use cidr::{MAX_HOST_BITS, expand_cidr};
pub use errors::NetError;
pub use ip_utils::{LocalAdapter, local_ipv4_adapters};
pub use liveness::{PROBE_PORTS, is_host_alive, ping_host, sweep_alive};
pub use mac::{HIKVISION_OUIS, is_hikvision_mac, is_valid_mac, normalize_mac};
