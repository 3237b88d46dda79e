//! Sonde HTTP d'un équipement : points d'entrée ISAPI et page web.

use hikconfig::get_config;
use hikutils::http::{HttpClient, HttpResponse};
use hikutils::NetError;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// Chemins interrogés, dans l'ordre, avec leur libellé
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("/System/deviceInfo", "Device Info (ISAPI)"),
    ("/ISAPI/System/deviceInfo", "Device Info (ISAPI v2)"),
    ("/", "Web Interface"),
];

lazy_static! {
    static ref FIRMWARE_PATTERNS: Vec<Regex> = compile(&[
        r"<firmwareVersion>([^<]+)</firmwareVersion>",
        r"<version>([^<]+)</version>",
        r#""firmwareVersion"\s*:\s*"([^"]+)""#,
    ]);
    static ref MODEL_PATTERNS: Vec<Regex> = compile(&[
        r"<deviceName>([^<]+)</deviceName>",
        r"<model>([^<]+)</model>",
        r#""model"\s*:\s*"([^"]+)""#,
    ]);
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn first_capture(patterns: &[Regex], body: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(body))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn extract_firmware_version(body: &str) -> Option<String> {
    first_capture(&FIRMWARE_PATTERNS, body)
}

pub fn extract_model(body: &str) -> Option<String> {
    first_capture(&MODEL_PATTERNS, body)
}

/// Ligne de résultat pour un point d'entrée
pub fn describe(label: &str, result: &Result<HttpResponse, NetError>) -> String {
    match result {
        Err(e) => format!("  {:<25} ERROR: {}", label, e),
        Ok(resp) => {
            let mut line = format!("  {:<25} HTTP {}", label, resp.status_code);
            if resp.status_code == 200 && !resp.body.is_empty() {
                let body = resp.body_text();
                if let Some(firmware) = extract_firmware_version(&body) {
                    line.push_str(&format!(" (Firmware: {})", firmware));
                }
                if let Some(model) = extract_model(&body) {
                    line.push_str(&format!(" (Model: {})", model));
                }
            }
            line
        }
    }
}

/// Interroge chaque point d'entrée et affiche le résultat
pub async fn probe_device(ip: &str) -> anyhow::Result<()> {
    let config = get_config();
    let client = HttpClient::new(config.user_agent(), config.http_timeout());

    println!("Probing device at {}...\n", ip);
    println!("Checking endpoints:");
    println!("{}", "-".repeat(51));

    for &(path, label) in ENDPOINTS {
        let client = client.clone();
        let host = ip.to_string();
        let result = tokio::task::spawn_blocking(move || client.get(&host, path)).await?;
        debug!(path, ok = result.is_ok(), "Endpoint probed");
        println!("{}", describe(label, &result));
    }

    Ok(())
}
