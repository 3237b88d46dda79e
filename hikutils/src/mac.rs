/// OUI enregistrés par Hikvision
pub const HIKVISION_OUIS: &[&str] = &[
    "00:0d:c5", "28:57:be", "44:19:b6", "54:c4:15", "80:cc:9c", "a4:14:37", "bc:ad:28",
    "c0:56:e3", "c4:2f:90", "e0:2f:6d", "f4:52:14", "48:40:a9", "8c:e7:48", "4c:bd:8f",
    "18:68:cb", "44:47:cc", "e4:24:6c",
];

/// Normalise une adresse MAC : majuscules, séparateur `:`.
///
/// Seuls la casse et les séparateurs changent ; les octets ne sont pas validés.
pub fn normalize_mac(mac: &str) -> String {
    mac.trim().replace('-', ":").to_ascii_uppercase()
}

/// Six groupes hexadécimaux de deux chiffres séparés par `:` ou `-`
pub fn is_valid_mac(s: &str) -> bool {
    let s = s.replace('-', ":");
    let groups: Vec<&str> = s.split(':').collect();
    groups.len() == 6
        && groups
            .iter()
            .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Vrai si les trois premiers octets correspondent à un OUI Hikvision
pub fn is_hikvision_mac(mac: &str) -> bool {
    let mac = mac.trim().to_ascii_lowercase().replace('-', ":");
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() < 3 {
        return false;
    }
    let oui = parts[..3].join(":");
    HIKVISION_OUIS.contains(&oui.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_macs() {
        assert!(is_valid_mac("00:0D:C5:11:22:33"));
        assert!(is_valid_mac("00-0d-c5-11-22-33"));
        assert!(is_valid_mac("aa:BB:cc:DD:ee:FF"));
    }

    #[test]
    fn test_invalid_macs() {
        assert!(!is_valid_mac(""));
        assert!(!is_valid_mac("00:0D:C5:11:22"));
        assert!(!is_valid_mac("00:0D:C5:11:22:33:44"));
        assert!(!is_valid_mac("00:0D:C5:11:22:3"));
        assert!(!is_valid_mac("00:0D:C5:11:22:GG"));
        assert!(!is_valid_mac("000D.C511.2233"));
    }

    #[test]
    fn test_hikvision_oui() {
        assert!(is_hikvision_mac("00:0D:C5:11:22:33"));
        assert!(is_hikvision_mac("00-0d-c5-11-22-33"));
        assert!(is_hikvision_mac("4C:BD:8F:61:CC:5C"));
        assert!(!is_hikvision_mac("AA:BB:CC:DD:EE:FF"));
        assert!(!is_hikvision_mac("00:0D"));
    }

    #[test]
    fn test_normalize_mac() {
        assert_eq!(normalize_mac("4c-bd-8f-61-cc-5c"), "4C:BD:8F:61:CC:5C");
        assert_eq!(normalize_mac(" aa:bb:cc:dd:ee:ff "), "AA:BB:CC:DD:EE:FF");
    }
}
