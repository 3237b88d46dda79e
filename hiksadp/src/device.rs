//! Enregistrement d'un équipement découvert par SADP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Équipement décrit par une réponse `ProbeMatch`.
///
/// Les champs sont déclarés dans l'ordre du schéma SADP, qui est aussi
/// l'ordre de sérialisation XML. `adapter_ip` et `received_time` sont des
/// métadonnées locales et ne sont jamais sérialisées.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "ProbeMatch", default)]
pub struct Device {
    #[serde(rename = "Uuid")]
    pub uuid: String,
    #[serde(rename = "Types")]
    pub types: String,
    #[serde(rename = "DeviceType")]
    pub device_type: String,
    #[serde(rename = "DeviceDescription")]
    pub device_description: String,
    #[serde(rename = "DeviceSN")]
    pub device_sn: String,
    #[serde(rename = "MAC")]
    pub mac: String,
    #[serde(rename = "IPv4Address")]
    pub ipv4_address: String,
    #[serde(rename = "IPv4SubnetMask")]
    pub ipv4_subnet_mask: String,
    #[serde(rename = "IPv4Gateway")]
    pub ipv4_gateway: String,
    #[serde(rename = "IPv6Address")]
    pub ipv6_address: String,
    #[serde(rename = "IPv6Gateway")]
    pub ipv6_gateway: String,
    #[serde(rename = "IPv6MaskLen", deserialize_with = "lenient_u32")]
    pub ipv6_mask_len: u32,
    #[serde(rename = "DHCP")]
    pub dhcp: String,
    #[serde(rename = "CommandPort", deserialize_with = "lenient_u32")]
    pub command_port: u32,
    #[serde(rename = "HttpPort", deserialize_with = "lenient_u32")]
    pub http_port: u32,
    #[serde(rename = "DSPVersion")]
    pub dsp_version: String,
    #[serde(rename = "BootTime")]
    pub boot_time: String,
    #[serde(rename = "SoftwareVersion")]
    pub software_version: String,
    #[serde(rename = "Activated")]
    pub activated: String,
    #[serde(rename = "PasswordResetModeSecond")]
    pub password_reset_mode: String,
    #[serde(rename = "SupportHCPlatform")]
    pub support_hc_platform: String,
    #[serde(rename = "HCPlatformEnable")]
    pub hc_platform_enable: String,
    #[serde(rename = "Support")]
    pub support_reset: String,
    #[serde(rename = "Encoder")]
    pub encoder: String,
    #[serde(rename = "OEMInfo")]
    pub oem_info: String,
    #[serde(rename = "AnalogChannelNum", deserialize_with = "lenient_u32")]
    pub analog_channel_num: u32,
    #[serde(rename = "DigitalChannelNum", deserialize_with = "lenient_u32")]
    pub digital_channel_num: u32,
    #[serde(rename = "SDKOverTLSPort", deserialize_with = "lenient_u32")]
    pub sdk_over_tls_port: u32,
    #[serde(rename = "SDKServerStatus")]
    pub sdk_server_status: String,

    /// Adresse locale de l'interface qui a reçu la réponse
    #[serde(skip)]
    pub adapter_ip: String,

    /// Instant de réception de la réponse
    #[serde(skip)]
    pub received_time: Option<DateTime<Utc>>,
}

impl Device {
    /// Nombre total de canaux (analogiques + numériques)
    pub fn channel_num(&self) -> u64 {
        u64::from(self.analog_channel_num) + u64::from(self.digital_channel_num)
    }

    pub fn is_activated(&self) -> bool {
        self.activated.eq_ignore_ascii_case("true")
    }
}

/// Accepte un entier, une chaîne vide ou absente (0) ; toute autre valeur est une erreur.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(serde::de::Error::custom)
}
