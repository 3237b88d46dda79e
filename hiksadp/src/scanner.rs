//! Transport SADP : découverte multicast et envoi de commandes.
//!
//! Chaque adresse IPv4 locale reçoit sa propre socket UDP et sa propre tâche ;
//! toutes les tâches sont lancées avant d'être attendues. Une interface en
//! échec (bind, envoi) est journalisée et cesse simplement de contribuer.

use crate::catalog::{SendOptions, build_command_xml, lookup};
use crate::codec::parse_response;
use crate::device::Device;
use crate::errors::SadpError;
use crate::registry::DeviceRegistry;
use crate::{DEFAULT_TIMEOUT, MAX_PACKET_SIZE, MULTICAST_ADDR, SADP_PORT};
use chrono::Utc;
use futures::future::join_all;
use hikutils::{LocalAdapter, local_ipv4_adapters, normalize_mac};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capacité du canal des réponses filtrées par MAC
const RESPONSE_CHANNEL_CAPACITY: usize = 10;

/// Échéance au-delà de laquelle un délai est considéré comme infini
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Échéance `timeout` après maintenant, bornée pour ne jamais déborder
fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout.min(FAR_FUTURE)
}

/// Destination des envois de groupe (adresse multicast et port SADP)
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    group: Ipv4Addr,
    port: u16,
}

impl Endpoint {
    fn group_addr(&self) -> SocketAddr {
        SocketAddrV4::new(self.group, self.port).into()
    }

    fn addr(&self, ip: Ipv4Addr) -> SocketAddr {
        SocketAddrV4::new(ip, self.port).into()
    }
}

/// Client SADP
///
/// ```no_run
/// use hiksadp::SadpScanner;
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), hiksadp::SadpError> {
/// let scanner = SadpScanner::new(Duration::from_secs(3));
/// for device in scanner.discover().await? {
///     println!("{} {}", device.mac, device.ipv4_address);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SadpScanner {
    timeout: Duration,
    endpoint: Endpoint,
    adapters: Option<Vec<LocalAdapter>>,
}

impl SadpScanner {
    /// Crée un client dont les lectures de découverte durent `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            endpoint: Endpoint {
                group: MULTICAST_ADDR,
                port: SADP_PORT,
            },
            adapters: None,
        }
    }

    /// Port SADP distant (37020 par défaut)
    pub fn with_port(mut self, port: u16) -> Self {
        self.endpoint.port = port;
        self
    }

    /// Adresse de groupe visée par les sondes (239.255.255.250 par défaut)
    pub fn with_multicast_group(mut self, group: Ipv4Addr) -> Self {
        self.endpoint.group = group;
        self
    }

    /// Remplace l'énumération des interfaces locales par une liste fixe
    pub fn with_adapters(mut self, adapters: Vec<LocalAdapter>) -> Self {
        self.adapters = Some(adapters);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn adapters(&self) -> Result<Vec<LocalAdapter>, SadpError> {
        match &self.adapters {
            Some(list) => Ok(list.clone()),
            None => local_ipv4_adapters().map_err(SadpError::Interfaces),
        }
    }

    /// Découverte multicast/broadcast sur toutes les interfaces.
    ///
    /// Retourne un équipement par MAC, dans un ordre quelconque.
    pub async fn discover(&self) -> Result<Vec<Device>, SadpError> {
        let adapters = self.adapters()?;
        let registry = Arc::new(DeviceRegistry::new());

        info!(
            "🔍 SADP discovery on {} adapter(s), timeout {:?}",
            adapters.len(),
            self.timeout
        );

        let handles: Vec<_> = adapters
            .into_iter()
            .map(|adapter| {
                tokio::spawn(discover_on_adapter(
                    adapter,
                    self.endpoint,
                    self.timeout,
                    Arc::clone(&registry),
                ))
            })
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("SADP discovery task failed: {}", e);
            }
        }

        let devices = registry.snapshot();
        info!("✅ SADP discovery finished: {} device(s)", devices.len());
        Ok(devices)
    }

    /// Envoie une commande du catalogue et retourne la réponse brute.
    ///
    /// Sans IP cible (ou avec `0.0.0.0`), la commande est diffusée sur toutes
    /// les interfaces et la première réponse mentionnant la MAC cible est
    /// retournée. La validation a lieu avant toute entrée/sortie réseau.
    pub async fn send_command(&self, name: &str, opts: &SendOptions) -> Result<String, SadpError> {
        let xml = build_command_xml(name, opts)?;
        let timeout = opts
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT);

        match opts.target_ip() {
            Some(ip) if ip != "0.0.0.0" => self.send_unicast(&xml, ip, timeout).await,
            _ => {
                let mac = opts.target_mac().ok_or(SadpError::NoRoute)?;
                self.send_broadcast_with_mac(&xml, mac, timeout).await
            }
        }
    }

    async fn send_unicast(
        &self,
        xml: &str,
        target: &str,
        timeout: Duration,
    ) -> Result<String, SadpError> {
        let ip: Ipv4Addr = target
            .trim()
            .parse()
            .map_err(|_| SadpError::InvalidTarget(target.to_string()))?;
        let deadline = deadline_after(timeout);

        debug!(ip = %ip, port = self.endpoint.port, "Sending command");
        debug!(xml = %xml, "XML command");

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(SadpError::Connect)?;
        socket
            .connect(self.endpoint.addr(ip))
            .await
            .map_err(SadpError::Connect)?;

        match timeout_at(deadline, socket.send(xml.as_bytes())).await {
            Err(_) => return Err(SadpError::Timeout(timeout)),
            Ok(Err(e)) => return Err(SadpError::Send(e)),
            Ok(Ok(_)) => {}
        }

        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        match timeout_at(deadline, socket.recv(&mut buf)).await {
            Err(_) => Err(SadpError::Timeout(timeout)),
            Ok(Err(e)) => Err(SadpError::Read(e)),
            Ok(Ok(n)) => Ok(String::from_utf8_lossy(&buf[..n]).into_owned()),
        }
    }

    async fn send_broadcast_with_mac(
        &self,
        xml: &str,
        mac: &str,
        timeout: Duration,
    ) -> Result<String, SadpError> {
        let adapters = self.adapters()?;
        let target_mac = normalize_mac(mac);

        debug!(target_mac = %target_mac, "Sending command via broadcast");
        debug!(xml = %xml, "XML command");

        let (tx, mut rx) = mpsc::channel::<String>(RESPONSE_CHANNEL_CAPACITY);

        for adapter in adapters {
            tokio::spawn(send_on_adapter(
                adapter,
                self.endpoint,
                xml.to_string(),
                target_mac.clone(),
                timeout,
                tx.clone(),
            ));
        }
        drop(tx);

        rx.recv()
            .await
            .ok_or_else(|| SadpError::NoResponseFromMac(mac.to_string()))
    }
}

/// Ouvre une socket UDP liée à l'adresse de l'interface (port éphémère)
fn bind_adapter_socket(ip: Ipv4Addr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_broadcast(true)?;
    if let Err(e) = socket.set_multicast_if_v4(&ip) {
        debug!("SADP: cannot select multicast interface {}: {}", ip, e);
    }
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddr::from((ip, 0)).into())?;

    let socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(socket)
}

async fn send_all(socket: &UdpSocket, payload: &[u8], dest: SocketAddr, local: Ipv4Addr) {
    if let Err(e) = socket.send_to(payload, dest).await {
        debug!(ip = %local, dest = %dest, "Failed to send datagram: {}", e);
    }
}

/// Lit un datagramme avant `deadline`. `None` termine la boucle de lecture.
async fn recv_until(
    socket: &UdpSocket,
    buf: &mut [u8],
    deadline: Instant,
    local: Ipv4Addr,
) -> Option<(usize, SocketAddr)> {
    loop {
        match timeout_at(deadline, socket.recv_from(buf)).await {
            Err(_) => return None,
            Ok(Ok(received)) => return Some(received),
            // ICMP port unreachable remonté par certaines piles
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionReset => continue,
            Ok(Err(e)) => {
                debug!(ip = %local, "SADP read error: {}", e);
                return None;
            }
        }
    }
}

async fn discover_on_adapter(
    adapter: LocalAdapter,
    endpoint: Endpoint,
    timeout: Duration,
    registry: Arc<DeviceRegistry>,
) {
    debug!(interface = %adapter.name, ip = %adapter.ip, "Scanning on interface");

    let socket = match bind_adapter_socket(adapter.ip) {
        Ok(socket) => socket,
        Err(e) => {
            debug!(ip = %adapter.ip, "Failed to bind: {}", e);
            return;
        }
    };

    let probe_uuid = Uuid::new_v4().to_string();
    let probes: Vec<String> = ["inquiry", "inquiry_v32"]
        .iter()
        .filter_map(|name| lookup(name))
        .filter_map(|cmd| cmd.render(&probe_uuid, &SendOptions::default()).ok())
        .collect();

    for probe in &probes {
        send_all(&socket, probe.as_bytes(), endpoint.group_addr(), adapter.ip).await;
    }
    for probe in &probes {
        send_all(
            &socket,
            probe.as_bytes(),
            endpoint.addr(Ipv4Addr::BROADCAST),
            adapter.ip,
        )
        .await;
    }

    let deadline = deadline_after(timeout);
    let mut buf = vec![0u8; MAX_PACKET_SIZE];

    while let Some((n, from)) = recv_until(&socket, &mut buf, deadline, adapter.ip).await {
        debug!(bytes = n, from = %from, "Received response");
        ingest(&registry, &buf[..n], adapter.ip);
    }
}

/// Décode un datagramme et l'insère dans le registre si sa MAC est nouvelle.
pub(crate) fn ingest(registry: &DeviceRegistry, data: &[u8], adapter_ip: Ipv4Addr) -> bool {
    let text = String::from_utf8_lossy(data);
    let Some(mut device) = parse_response(&text) else {
        return false;
    };

    device.adapter_ip = adapter_ip.to_string();
    device.received_time = Some(Utc::now());

    let (ip, mac, device_type) = (
        device.ipv4_address.clone(),
        device.mac.clone(),
        device.device_type.clone(),
    );
    let inserted = registry.insert_if_absent(device);
    if inserted {
        debug!(ip = %ip, mac = %mac, device_type = %device_type, "Found device");
    }
    inserted
}

async fn send_on_adapter(
    adapter: LocalAdapter,
    endpoint: Endpoint,
    xml: String,
    target_mac: String,
    timeout: Duration,
    tx: mpsc::Sender<String>,
) {
    debug!(interface = %adapter.name, ip = %adapter.ip, "Sending on interface");

    let socket = match bind_adapter_socket(adapter.ip) {
        Ok(socket) => socket,
        Err(e) => {
            debug!(ip = %adapter.ip, "Failed to bind: {}", e);
            return;
        }
    };

    let payload = xml.as_bytes();
    send_all(&socket, payload, endpoint.group_addr(), adapter.ip).await;
    send_all(&socket, payload, endpoint.addr(Ipv4Addr::BROADCAST), adapter.ip).await;
    send_all(
        &socket,
        payload,
        endpoint.addr(adapter.subnet_broadcast()),
        adapter.ip,
    )
    .await;

    let deadline = deadline_after(timeout);
    let mut buf = vec![0u8; MAX_PACKET_SIZE];

    while let Some((n, from)) = recv_until(&socket, &mut buf, deadline, adapter.ip).await {
        let response = String::from_utf8_lossy(&buf[..n]).into_owned();
        if !response_matches_mac(&response, &target_mac) {
            continue;
        }
        debug!(from = %from, "Matching response");
        match tx.try_send(response) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }
    }
}

/// Vrai si `response` contient `mac` (forme `:` ou `-`, sans tenir compte de la casse)
pub fn response_matches_mac(response: &str, mac: &str) -> bool {
    let colon = normalize_mac(mac);
    let dash = colon.replace(':', "-");
    let upper = response.to_uppercase();
    upper.contains(&colon) || upper.contains(&dash)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE_A: &str = "<ProbeMatch><MAC>aa-bb-cc-dd-ee-ff</MAC><IPv4Address>10.0.0.5</IPv4Address></ProbeMatch>";
    const RESPONSE_B: &str = "<ProbeMatch><MAC>AA:BB:CC:DD:EE:FF</MAC><IPv4Address>10.0.1.5</IPv4Address><Types>inquiry_v32</Types></ProbeMatch>";

    #[test]
    fn test_ingest_first_adapter_wins() {
        let registry = DeviceRegistry::new();
        let adapter_a = Ipv4Addr::new(10, 0, 0, 1);
        let adapter_b = Ipv4Addr::new(10, 0, 1, 1);

        assert!(ingest(&registry, RESPONSE_A.as_bytes(), adapter_a));
        // décodée correctement mais écartée
        assert!(parse_response(RESPONSE_B).is_some());
        assert!(!ingest(&registry, RESPONSE_B.as_bytes(), adapter_b));

        let devices = registry.snapshot();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(devices[0].adapter_ip, "10.0.0.1");
        assert_eq!(devices[0].ipv4_address, "10.0.0.5");
        assert!(devices[0].received_time.is_some());
    }

    #[test]
    fn test_ingest_ignores_noise() {
        let registry = DeviceRegistry::new();
        assert!(!ingest(&registry, b"garbage", Ipv4Addr::LOCALHOST));
        assert!(!ingest(&registry, &[0xff, 0xfe, 0x00], Ipv4Addr::LOCALHOST));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_response_matches_mac() {
        assert!(response_matches_mac(RESPONSE_A, "AA:BB:CC:DD:EE:FF"));
        assert!(response_matches_mac(RESPONSE_B, "aa-bb-cc-dd-ee-ff"));
        assert!(!response_matches_mac(RESPONSE_A, "AA:BB:CC:DD:EE:00"));
    }

    #[test]
    fn test_deadline_after_huge_timeout() {
        let before = Instant::now();
        assert!(deadline_after(Duration::MAX) > before + Duration::from_secs(86400));

        let short = deadline_after(Duration::from_millis(500));
        assert!(short >= before + Duration::from_millis(500));
        assert!(short < before + Duration::from_secs(60));
    }

    #[test]
    fn test_builders() {
        let scanner = SadpScanner::new(Duration::from_millis(200))
            .with_port(40000)
            .with_multicast_group(Ipv4Addr::LOCALHOST);
        assert_eq!(scanner.timeout(), Duration::from_millis(200));
        assert_eq!(
            scanner.endpoint.group_addr(),
            "127.0.0.1:40000".parse::<SocketAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_send_validation_precedes_network() {
        let scanner = SadpScanner::new(Duration::from_millis(100)).with_adapters(Vec::new());
        let err = scanner
            .send_command("reboot", &SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SadpError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_send_without_route() {
        let scanner = SadpScanner::new(Duration::from_millis(100)).with_adapters(Vec::new());
        let opts = SendOptions {
            target_ip: Some("0.0.0.0".into()),
            ..Default::default()
        };
        let err = scanner.send_command("inquiry", &opts).await.unwrap_err();
        assert!(matches!(err, SadpError::NoRoute));
    }

    #[tokio::test]
    async fn test_send_invalid_target() {
        let scanner = SadpScanner::new(Duration::from_millis(100));
        let opts = SendOptions {
            target_ip: Some("not-an-ip".into()),
            ..Default::default()
        };
        let err = scanner.send_command("inquiry", &opts).await.unwrap_err();
        assert!(matches!(err, SadpError::InvalidTarget(_)));
    }
}
