//! Génération du code de réinitialisation (firmware < 5.3.0).

use anyhow::{Context, Result, anyhow, bail};
use hikconfig::get_config;
use hikcrypto::generate_reset_code;
use hikutils::http::HttpClient;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::cli::ResetArgs;

const BANNER: &str = "Hikvision Password Reset Code Generator\n========================================";

lazy_static! {
    static ref MODEL_NUMBER: Option<Regex> = Regex::new(r"<modelNumber>([^<]+)</modelNumber>").ok();
    static ref SERIAL_NUMBER: Option<Regex> = Regex::new(r"<serialNumber>([^<]+)</serialNumber>").ok();
}

fn capture(re: &Option<Regex>, body: &str) -> Option<String> {
    re.as_ref()?
        .captures(body)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Extrait le numéro de série d'une description UPnP, préfixe modèle retiré
pub fn parse_device_description(body: &str) -> Result<String> {
    let serial = capture(&SERIAL_NUMBER, body)
        .ok_or_else(|| anyhow!("could not find serial number in response"))?;

    match capture(&MODEL_NUMBER, body) {
        Some(model) if !model.is_empty() => Ok(serial
            .strip_prefix(model.as_str())
            .unwrap_or(serial.as_str())
            .to_string()),
        _ => Ok(serial),
    }
}

/// Interroge `/upnpdevicedesc.xml` ; la date retournée est celle du jour (heure locale)
pub async fn fetch_device_info(ip: &str) -> Result<(String, String)> {
    let config = get_config();
    let client = HttpClient::new(config.user_agent(), config.http_timeout());

    let host = ip.to_string();
    let resp = tokio::task::spawn_blocking(move || client.get(&host, "/upnpdevicedesc.xml"))
        .await?
        .context("failed to connect")?;

    if resp.status_code != 200 {
        bail!("HTTP {} response", resp.status_code);
    }

    let body = resp.body_text();
    debug!(body = %body.chars().take(500).collect::<String>(), "Response from /upnpdevicedesc.xml");

    let serial = parse_device_description(&body)?;
    let date = chrono::Local::now().format("%Y%m%d").to_string();
    debug!(%serial, %date, "Device info fetched (verify the date matches the device clock)");

    Ok((serial, date))
}

pub fn validate_date(date: &str) -> Result<()> {
    if date.len() != 8 {
        bail!("date must be in YYYYMMDD format (got: {})", date);
    }
    Ok(())
}

fn print_usage() {
    println!("{}\n", BANNER);
    println!("Usage: sadp reset --serial <SERIAL> --date <YYYYMMDD>");
    println!("       sadp reset --ip <DEVICE_IP>\n");
    println!("IMPORTANT:");
    println!("  - Serial number is CASE-SENSITIVE");
    println!("  - Remove the model prefix from the serial number");
    println!("    Example: DS-7616NI-I20123456789 -> 0123456789");
    println!("  - Date must match the device's internal clock, NOT today's date");
    println!("  - Check the 'Start Time' or 'Boot Time' in SADP to find device date\n");
    println!("Note: This only works on firmware versions < 5.3.0");
}

pub async fn run(args: ResetArgs) -> Result<()> {
    let mut serial = args.serial.unwrap_or_default();
    let mut date = args.date.unwrap_or_default();

    if let Some(ip) = args.ip.as_deref() {
        match fetch_device_info(ip).await {
            Ok((fetched_serial, fetched_date)) => {
                if serial.is_empty() {
                    serial = fetched_serial;
                }
                if date.is_empty() {
                    date = fetched_date;
                }
            }
            Err(e) => {
                warn!(ip, error = %e, "Could not auto-fetch device info");
                println!("Please provide --serial and --date manually");
            }
        }
    }

    if serial.is_empty() || date.is_empty() {
        print_usage();
        return Ok(());
    }

    validate_date(&date)?;
    let code = generate_reset_code(&serial, &date);

    println!("{}\n", BANNER);
    println!("Serial Number: {}", serial);
    println!("Device Date:   {}", date);
    println!("Seed:          {}{}\n", serial, date);
    println!("{}", "-".repeat(40));
    println!("RESET CODE:    {}", code);
    println!("{}\n", "-".repeat(40));
    println!("Instructions:");
    println!("1. Open SADP Tool and select your device");
    println!("2. Click 'Forgot Password' or enter the security code field");
    println!("3. Enter the reset code above");
    println!("4. The admin password will be reset to '12345' or '123456789abc'\n");
    println!("Note: This only works on firmware < 5.3.0");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_description_strips_model() {
        let body = "<root><device><modelNumber>DS-7616NI-I2</modelNumber>\
                    <serialNumber>DS-7616NI-I20123456789</serialNumber></device></root>";
        assert_eq!(parse_device_description(body).unwrap(), "0123456789");
    }

    #[test]
    fn test_parse_device_description_without_model() {
        let body = "<serialNumber>ABC123</serialNumber>";
        assert_eq!(parse_device_description(body).unwrap(), "ABC123");

        let other_model = "<modelNumber>XYZ</modelNumber><serialNumber>ABC123</serialNumber>";
        assert_eq!(parse_device_description(other_model).unwrap(), "ABC123");
    }

    #[test]
    fn test_parse_device_description_missing_serial() {
        let err = parse_device_description("<modelNumber>X</modelNumber>").unwrap_err();
        assert_eq!(err.to_string(), "could not find serial number in response");
    }

    #[test]
    fn test_validate_date() {
        assert!(validate_date("20231215").is_ok());
        let err = validate_date("2023-12-15").unwrap_err();
        assert_eq!(err.to_string(), "date must be in YYYYMMDD format (got: 2023-12-15)");
    }
}
