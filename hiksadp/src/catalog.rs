//! Catalogue des commandes SADP.
//!
//! Chaque commande est décrite par un gabarit XML à substitution positionnelle
//! (`{0}` est toujours l'identifiant de corrélation), la liste ordonnée des
//! paramètres injectés et la liste ordonnée des champs obligatoires. La
//! validation est donc pilotée par la table, sans branche par commande.

use crate::errors::SadpError;
use std::time::Duration;
use uuid::Uuid;

/// Masque appliqué par `update` quand aucun n'est fourni
pub const DEFAULT_NEW_MASK: &str = "255.255.255.0";

/// Port de commande appliqué par `update` quand aucun n'est fourni
pub const DEFAULT_NEW_PORT: u16 = 8000;

macro_rules! probe {
    ($body:literal) => {
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?><Probe>"#,
            $body,
            "</Probe>"
        )
    };
}

/// Paramètre injecté dans un gabarit, après l'identifiant de corrélation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Mac,
    Password,
    Code,
    Email,
    NewIp,
    NewPort,
    NewMask,
    NewGateway,
    Dhcp,
}

impl Param {
    /// Libellé utilisé dans les messages d'erreur de validation
    pub fn label(self) -> &'static str {
        match self {
            Param::Mac => "MAC address",
            Param::Password => "password",
            Param::Code => "security code",
            Param::Email => "email",
            Param::NewIp => "new IP address",
            Param::NewPort => "new port",
            Param::NewMask => "new subnet mask",
            Param::NewGateway => "new gateway",
            Param::Dhcp => "DHCP flag",
        }
    }
}

/// Entrée immuable du catalogue.
#[derive(Debug, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    template: &'static str,
    params: &'static [Param],
    required: &'static [Param],
}

impl Command {
    pub fn needs_mac(&self) -> bool {
        self.required.contains(&Param::Mac)
    }

    pub fn needs_pass(&self) -> bool {
        self.required.contains(&Param::Password)
    }

    /// Champs obligatoires, dans l'ordre où ils sont vérifiés
    pub fn required(&self) -> &'static [Param] {
        self.required
    }

    /// Produit le XML de la commande avec un identifiant de corrélation donné.
    ///
    /// Les champs obligatoires sont vérifiés avant toute substitution ; la
    /// première absence est signalée. Les valeurs sont insérées telles quelles,
    /// sans échappement XML.
    pub fn render(&self, uuid: &str, opts: &SendOptions) -> Result<String, SadpError> {
        if let Some(missing) = self.required.iter().find(|p| opts.value(**p).is_none()) {
            return Err(SadpError::MissingField {
                field: missing.label(),
                command: self.name,
            });
        }

        let mut values = Vec::with_capacity(self.params.len() + 1);
        values.push(uuid.to_string());
        for param in self.params {
            values.push(opts.resolved(*param));
        }

        Ok(fill_template(self.template, &values))
    }
}

/// Catalogue complet, dans l'ordre d'affichage
pub static COMMANDS: &[Command] = &[
    Command {
        name: "inquiry",
        description: "Get device information",
        template: probe!("<Uuid>{0}</Uuid><Types>inquiry</Types>"),
        params: &[],
        required: &[],
    },
    Command {
        name: "inquiry_v32",
        description: "Get device information (v32 format)",
        template: probe!("<Uuid>{0}</Uuid><Types>inquiry_v32</Types>"),
        params: &[],
        required: &[],
    },
    Command {
        name: "exchangecode",
        description: "Get exchange code for password reset",
        template: probe!("<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>exchangecode</Types><Code></Code>"),
        params: &[Param::Mac],
        required: &[Param::Mac],
    },
    Command {
        name: "getencryptstring",
        description: "Get encryption string",
        template: probe!("<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>getencryptstring</Types>"),
        params: &[Param::Mac],
        required: &[Param::Mac],
    },
    Command {
        name: "getencryptstring_v31",
        description: "Get encryption string (v31 format)",
        template: probe!("<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>getencryptstring_v31</Types>"),
        params: &[Param::Mac],
        required: &[Param::Mac],
    },
    Command {
        name: "getqrcodes",
        description: "Get QR codes for device",
        template: probe!("<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>GetQRcodes</Types>"),
        params: &[Param::Mac],
        required: &[Param::Mac],
    },
    Command {
        name: "getbindlist",
        description: "Get device binding list",
        template: probe!("<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>getBindList</Types>"),
        params: &[Param::Mac],
        required: &[Param::Mac],
    },
    Command {
        name: "resetpassword",
        description: "Reset password using security code",
        template: probe!(
            "<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>resetPassword</Types><Code>{2}</Code><Password>{3}</Password>"
        ),
        params: &[Param::Mac, Param::Code, Param::Password],
        required: &[Param::Mac, Param::Code, Param::Password],
    },
    Command {
        name: "securitycode",
        description: "Submit security code for password reset",
        template: probe!(
            "<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>securityCode</Types><SecurityCode>{2}</SecurityCode><Password>{3}</Password>"
        ),
        params: &[Param::Mac, Param::Code, Param::Password],
        required: &[Param::Mac, Param::Code, Param::Password],
    },
    Command {
        name: "activate",
        description: "Activate an inactive device with a new password",
        template: probe!(
            "<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>activate</Types><Password>{2}</Password>"
        ),
        params: &[Param::Mac, Param::Password],
        required: &[Param::Mac, Param::Password],
    },
    Command {
        name: "update",
        description: "Update device network parameters",
        template: probe!(
            "<Uuid>{0}</Uuid><Types>update</Types><PWErrorParse>true</PWErrorParse><MAC>{1}</MAC><Password>{2}</Password><IPv4Address>{3}</IPv4Address><CommandPort>{4}</CommandPort><IPv4SubnetMask>{5}</IPv4SubnetMask><IPv4Gateway>{6}</IPv4Gateway><DHCP>{7}</DHCP>"
        ),
        params: &[
            Param::Mac,
            Param::Password,
            Param::NewIp,
            Param::NewPort,
            Param::NewMask,
            Param::NewGateway,
            Param::Dhcp,
        ],
        required: &[Param::Mac, Param::Password],
    },
    Command {
        name: "reboot",
        description: "Reboot the device",
        template: probe!(
            "<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>reboot</Types><Password>{2}</Password>"
        ),
        params: &[Param::Mac, Param::Password],
        required: &[Param::Mac, Param::Password],
    },
    Command {
        name: "restore",
        description: "Restore device to factory defaults",
        template: probe!(
            "<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>restore</Types><Password>{2}</Password>"
        ),
        params: &[Param::Mac, Param::Password],
        required: &[Param::Mac, Param::Password],
    },
    Command {
        name: "setmailbox",
        description: "Set recovery email address",
        template: probe!(
            "<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>SetMailBox</Types><MailBox>{2}</MailBox><Password>{3}</Password>"
        ),
        params: &[Param::Mac, Param::Email, Param::Password],
        required: &[Param::Mac, Param::Password, Param::Email],
    },
    Command {
        name: "ezvizunbind",
        description: "Unbind device from Ezviz cloud",
        template: probe!(
            "<Uuid>{0}</Uuid><MAC>{1}</MAC><Types>ezvizUnbind</Types><Password>{2}</Password>"
        ),
        params: &[Param::Mac, Param::Password],
        required: &[Param::Mac, Param::Password],
    },
];

/// Recherche une commande par son nom exact
pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|cmd| cmd.name == name)
}

/// Liste les commandes dans l'ordre d'affichage
pub fn list_commands() -> Vec<&'static Command> {
    COMMANDS.iter().collect()
}

/// Construit le XML d'une commande avec un identifiant de corrélation neuf.
pub fn build_command_xml(name: &str, opts: &SendOptions) -> Result<String, SadpError> {
    let command = lookup(name).ok_or_else(|| SadpError::UnknownCommand(name.to_string()))?;
    command.render(&Uuid::new_v4().to_string(), opts)
}

/// Paramètres optionnels d'une commande.
///
/// Une chaîne vide (ou faite d'espaces) est traitée comme absente.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub target_ip: Option<String>,
    pub target_mac: Option<String>,
    pub password: Option<String>,
    pub code: Option<String>,
    pub new_ip: Option<String>,
    pub new_mask: Option<String>,
    pub new_gateway: Option<String>,
    pub new_port: Option<u16>,
    pub dhcp: bool,
    pub email: Option<String>,
    pub timeout: Option<Duration>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl SendOptions {
    pub fn target_ip(&self) -> Option<&str> {
        non_empty(&self.target_ip)
    }

    pub fn target_mac(&self) -> Option<&str> {
        non_empty(&self.target_mac)
    }

    /// Valeur fournie par l'appelant, sans valeur par défaut
    fn value(&self, param: Param) -> Option<String> {
        match param {
            Param::Mac => self.target_mac().map(str::to_string),
            Param::Password => non_empty(&self.password).map(str::to_string),
            Param::Code => non_empty(&self.code).map(str::to_string),
            Param::Email => non_empty(&self.email).map(str::to_string),
            Param::NewIp => non_empty(&self.new_ip).map(str::to_string),
            Param::NewMask => non_empty(&self.new_mask).map(str::to_string),
            Param::NewGateway => non_empty(&self.new_gateway).map(str::to_string),
            Param::NewPort => self.new_port.filter(|p| *p != 0).map(|p| p.to_string()),
            Param::Dhcp => Some(self.dhcp.to_string()),
        }
    }

    /// Valeur substituée dans le gabarit, valeurs par défaut de `update` comprises
    fn resolved(&self, param: Param) -> String {
        if let Some(value) = self.value(param) {
            return value;
        }
        match param {
            Param::NewIp => self.target_ip().unwrap_or_default().to_string(),
            Param::NewMask => DEFAULT_NEW_MASK.to_string(),
            Param::NewPort => DEFAULT_NEW_PORT.to_string(),
            _ => String::new(),
        }
    }
}

/// Remplace chaque `{n}` par `values[n]`; un indice hors limites est laissé tel quel.
fn fill_template(template: &str, values: &[String]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(String::len).sum::<usize>());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let index = after
            .find('}')
            .and_then(|end| after[..end].parse::<usize>().ok().map(|i| (i, end)));

        match index {
            Some((i, end)) if i < values.len() => {
                out.push_str(&values[i]);
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: &str = "AA:BB:CC:DD:EE:FF";

    fn opts_with_mac() -> SendOptions {
        SendOptions {
            target_mac: Some(MAC.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_inquiry_templates() {
        let xml = lookup("inquiry")
            .unwrap()
            .render("1234", &SendOptions::default())
            .unwrap();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="utf-8"?><Probe><Uuid>1234</Uuid><Types>inquiry</Types></Probe>"#
        );

        let xml = build_command_xml("inquiry_v32", &SendOptions::default()).unwrap();
        assert!(xml.contains("<Types>inquiry_v32</Types>"));
    }

    #[test]
    fn test_fresh_uuid_per_call() {
        let a = build_command_xml("inquiry", &SendOptions::default()).unwrap();
        let b = build_command_xml("inquiry", &SendOptions::default()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_command() {
        let err = build_command_xml("selfdestruct", &SendOptions::default()).unwrap_err();
        assert!(matches!(err, SadpError::UnknownCommand(ref n) if n == "selfdestruct"));
        assert_eq!(err.to_string(), "unknown command: selfdestruct");
    }

    #[test]
    fn test_activate_validation_sequence() {
        let err = build_command_xml("activate", &SendOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "MAC address required for activate command");

        let err = build_command_xml("activate", &opts_with_mac()).unwrap_err();
        assert_eq!(err.to_string(), "password required for activate command");

        let opts = SendOptions {
            password: Some("Secret123".into()),
            ..opts_with_mac()
        };
        let xml = build_command_xml("activate", &opts).unwrap();
        assert!(xml.contains("<MAC>AA:BB:CC:DD:EE:FF</MAC>"));
        assert!(xml.contains("<Password>Secret123</Password>"));
    }

    #[test]
    fn test_empty_strings_count_as_missing() {
        let opts = SendOptions {
            target_mac: Some("  ".into()),
            ..Default::default()
        };
        let err = build_command_xml("reboot", &opts).unwrap_err();
        assert!(matches!(
            err,
            SadpError::MissingField {
                field: "MAC address",
                command: "reboot"
            }
        ));
    }

    #[test]
    fn test_reset_password_requires_code_before_password() {
        let err = build_command_xml("resetpassword", &opts_with_mac()).unwrap_err();
        assert_eq!(err.to_string(), "security code required for resetpassword command");

        let opts = SendOptions {
            code: Some("ABCD".into()),
            password: Some("NewPass1".into()),
            ..opts_with_mac()
        };
        let xml = build_command_xml("securitycode", &opts).unwrap();
        assert!(xml.contains("<SecurityCode>ABCD</SecurityCode><Password>NewPass1</Password>"));
    }

    #[test]
    fn test_setmailbox_field_order() {
        let opts = SendOptions {
            password: Some("pw".into()),
            ..opts_with_mac()
        };
        let err = build_command_xml("setmailbox", &opts).unwrap_err();
        assert_eq!(err.to_string(), "email required for setmailbox command");

        let opts = SendOptions {
            email: Some("ops@example.com".into()),
            ..opts
        };
        let xml = build_command_xml("setmailbox", &opts).unwrap();
        assert!(xml.contains(
            "<Types>SetMailBox</Types><MailBox>ops@example.com</MailBox><Password>pw</Password>"
        ));
    }

    #[test]
    fn test_update_defaults() {
        let opts = SendOptions {
            password: Some("pw".into()),
            target_ip: Some("192.168.1.100".into()),
            ..opts_with_mac()
        };
        let xml = build_command_xml("update", &opts).unwrap();
        assert!(xml.contains("<IPv4Address>192.168.1.100</IPv4Address>"));
        assert!(xml.contains("<CommandPort>8000</CommandPort>"));
        assert!(xml.contains("<IPv4SubnetMask>255.255.255.0</IPv4SubnetMask>"));
        assert!(xml.contains("<IPv4Gateway></IPv4Gateway>"));
        assert!(xml.contains("<DHCP>false</DHCP>"));
    }

    #[test]
    fn test_update_explicit_settings() {
        let opts = SendOptions {
            password: Some("pw".into()),
            target_ip: Some("192.168.1.100".into()),
            new_ip: Some("10.0.0.20".into()),
            new_mask: Some("255.255.0.0".into()),
            new_gateway: Some("10.0.0.1".into()),
            new_port: Some(8001),
            dhcp: true,
            ..opts_with_mac()
        };
        let xml = build_command_xml("update", &opts).unwrap();
        assert!(xml.contains(
            "<IPv4Address>10.0.0.20</IPv4Address><CommandPort>8001</CommandPort><IPv4SubnetMask>255.255.0.0</IPv4SubnetMask><IPv4Gateway>10.0.0.1</IPv4Gateway><DHCP>true</DHCP>"
        ));
    }

    #[test]
    fn test_values_are_inserted_verbatim() {
        let opts = SendOptions {
            password: Some("a<b&c'\"d".into()),
            ..opts_with_mac()
        };
        let xml = build_command_xml("reboot", &opts).unwrap();
        assert!(xml.contains("<Password>a<b&c'\"d</Password>"));
        assert!(!xml.contains("&amp;"));
    }

    #[test]
    fn test_exchangecode_layout() {
        let xml = lookup("exchangecode")
            .unwrap()
            .render("u", &opts_with_mac())
            .unwrap();
        assert!(xml.ends_with(
            "<Uuid>u</Uuid><MAC>AA:BB:CC:DD:EE:FF</MAC><Types>exchangecode</Types><Code></Code></Probe>"
        ));
    }

    #[test]
    fn test_list_commands_order_and_flags() {
        let names: Vec<_> = list_commands().iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "inquiry",
                "inquiry_v32",
                "exchangecode",
                "getencryptstring",
                "getencryptstring_v31",
                "getqrcodes",
                "getbindlist",
                "resetpassword",
                "securitycode",
                "activate",
                "update",
                "reboot",
                "restore",
                "setmailbox",
                "ezvizunbind",
            ]
        );

        let inquiry = lookup("inquiry").unwrap();
        assert!(!inquiry.needs_mac() && !inquiry.needs_pass());
        let getbindlist = lookup("getbindlist").unwrap();
        assert!(getbindlist.needs_mac() && !getbindlist.needs_pass());
        let ezviz = lookup("ezvizunbind").unwrap();
        assert!(ezviz.needs_mac() && ezviz.needs_pass());
    }

    #[test]
    fn test_fill_template_leaves_unknown_placeholders() {
        let values = vec!["x".to_string()];
        assert_eq!(fill_template("{0}-{1}-{a}", &values), "x-{1}-{a}");
    }
}
