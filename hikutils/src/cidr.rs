use crate::errors::NetError;
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::str::FromStr;

/// Nombre maximal de bits d'hôte développés (`/8` en IPv4, `/104` en IPv6)
pub const MAX_HOST_BITS: u8 = 24;

/// Jusqu'à ce nombre de bits d'hôte, réseau et broadcast sont retirés
const SMALL_PREFIX_HOST_BITS: u8 = 8;

/// Développe un préfixe réseau en la liste de ses adresses, par ordre croissant.
///
/// Pour un préfixe d'au plus 8 bits d'hôte (`/24` ou plus long en IPv4), la
/// première et la dernière adresse sont retirées. Une adresse seule, sans
/// préfixe, se retourne elle-même. `/31` et `/32` sont retournés entiers.
///
/// # Errors
///
/// - [`NetError::InvalidCidr`] pour une entrée mal formée ;
/// - [`NetError::PrefixTooLarge`] au-delà de [`MAX_HOST_BITS`] bits d'hôte
///   (plus large que `/8` en IPv4), pour borner la mémoire utilisée.
///
/// ```
/// use hikutils::expand_cidr;
///
/// assert_eq!(expand_cidr("10.0.0.0/24").unwrap().len(), 254);
/// assert_eq!(expand_cidr("10.0.0.7").unwrap(), vec!["10.0.0.7"]);
/// ```
pub fn expand_cidr(cidr: &str) -> Result<Vec<String>, NetError> {
    let cidr = cidr.trim();

    if !cidr.contains('/') {
        return match IpAddr::from_str(cidr) {
            Ok(_) => Ok(vec![cidr.to_string()]),
            Err(e) => Err(NetError::InvalidCidr {
                input: cidr.to_string(),
                reason: e.to_string(),
            }),
        };
    }

    let network = IpNetwork::from_str(cidr).map_err(|e| NetError::InvalidCidr {
        input: cidr.to_string(),
        reason: e.to_string(),
    })?;

    let max_prefix = match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    let host_bits = max_prefix - network.prefix();
    if host_bits > MAX_HOST_BITS {
        return Err(NetError::PrefixTooLarge(cidr.to_string()));
    }

    let mut hosts: Vec<String> = match network {
        IpNetwork::V4(net) => net.iter().map(|ip| ip.to_string()).collect(),
        IpNetwork::V6(net) => net.iter().map(|ip| ip.to_string()).collect(),
    };

    if (2..=SMALL_PREFIX_HOST_BITS).contains(&host_bits) {
        hosts.pop();
        hosts.remove(0);
    }

    Ok(hosts)
}
