use get_if_addrs::{IfAddr, get_if_addrs};
use std::net::Ipv4Addr;
use tracing::trace;

/// Une adresse IPv4 portée par une interface réseau locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAdapter {
    /// Nom de l'interface (ex: `"eth0"`, `"en0"`)
    pub name: String,
    /// Adresse IPv4 locale
    pub ip: Ipv4Addr,
    /// Masque de sous-réseau associé
    pub netmask: Ipv4Addr,
}

impl LocalAdapter {
    pub fn new(name: impl Into<String>, ip: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            ip,
            netmask,
        }
    }

    /// Adresse de broadcast dirigée du sous-réseau : bits d'hôte de l'IP locale à 1.
    ///
    /// ```
    /// use hikutils::LocalAdapter;
    /// use std::net::Ipv4Addr;
    ///
    /// let adapter = LocalAdapter::new("eth0", Ipv4Addr::new(192, 168, 1, 42), Ipv4Addr::new(255, 255, 255, 0));
    /// assert_eq!(adapter.subnet_broadcast(), Ipv4Addr::new(192, 168, 1, 255));
    /// ```
    pub fn subnet_broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.ip) | !u32::from(self.netmask))
    }
}

/// Liste les adresses IPv4 des interfaces actives, hors loopback.
///
/// Une interface portant plusieurs adresses IPv4 produit une entrée par adresse.
/// Les adresses IPv6 sont ignorées.
///
/// # Errors
///
/// Retourne l'erreur d'E/S du système si l'énumération des interfaces échoue.
pub fn local_ipv4_adapters() -> std::io::Result<Vec<LocalAdapter>> {
    let mut result = Vec::new();

    for iface in get_if_addrs()? {
        if iface.is_loopback() {
            continue;
        }
        if !is_admin_up(&iface.name) {
            trace!(interface = %iface.name, "Skipping interface that is down");
            continue;
        }
        if let IfAddr::V4(v4) = &iface.addr {
            result.push(LocalAdapter::new(iface.name.clone(), v4.ip, v4.netmask));
        }
    }

    Ok(result)
}

/// `IFF_UP` dans `/sys/class/net/<if>/flags`.
#[cfg(target_os = "linux")]
fn is_admin_up(name: &str) -> bool {
    const IFF_UP: u32 = 0x1;

    match std::fs::read_to_string(format!("/sys/class/net/{}/flags", name)) {
        Ok(raw) => {
            let raw = raw.trim().trim_start_matches("0x");
            u32::from_str_radix(raw, 16)
                .map(|flags| flags & IFF_UP != 0)
                .unwrap_or(true)
        }
        // Alias ou interface sans entrée sysfs : getifaddrs ne la liste que si elle est configurée
        Err(_) => true,
    }
}

#[cfg(not(target_os = "linux"))]
fn is_admin_up(_name: &str) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapters_no_loopback() {
        let adapters = local_ipv4_adapters().unwrap_or_default();
        for adapter in adapters {
            assert!(
                !adapter.ip.is_loopback(),
                "Loopback addresses should be filtered out"
            );
        }
    }

    #[test]
    fn test_adapters_interface_names_not_empty() {
        let adapters = local_ipv4_adapters().unwrap_or_default();
        for adapter in adapters {
            assert!(!adapter.name.is_empty(), "Interface names should not be empty");
        }
    }

    #[test]
    fn test_subnet_broadcast() {
        let adapter = LocalAdapter::new(
            "eth0",
            Ipv4Addr::new(10, 20, 30, 40),
            Ipv4Addr::new(255, 255, 240, 0),
        );
        assert_eq!(adapter.subnet_broadcast(), Ipv4Addr::new(10, 20, 31, 255));

        let host_route = LocalAdapter::new(
            "tun0",
            Ipv4Addr::new(10, 8, 0, 6),
            Ipv4Addr::new(255, 255, 255, 255),
        );
        assert_eq!(host_route.subnet_broadcast(), Ipv4Addr::new(10, 8, 0, 6));
    }
}
