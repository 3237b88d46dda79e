use futures::stream::{self, StreamExt};
use std::net::{IpAddr, SocketAddr};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Ports TCP essayés, dans l'ordre, avant le repli ICMP
pub const PROBE_PORTS: [u16; 5] = [80, 443, 8000, 8080, 554];

/// Vrai si l'hôte accepte une connexion sur un des [`PROBE_PORTS`], sinon
/// s'il répond à un écho ICMP.
///
/// Chaque tentative TCP et le ping sont bornés par `probe_timeout`.
pub async fn is_host_alive(ip: IpAddr, probe_timeout: Duration) -> bool {
    for port in PROBE_PORTS {
        let addr = SocketAddr::new(ip, port);
        if let Ok(Ok(_stream)) = timeout(probe_timeout, TcpStream::connect(addr)).await {
            trace!(%addr, "TCP connect succeeded");
            return true;
        }
    }

    ping_host(ip, probe_timeout).await
}

fn ping_command(ip: IpAddr) -> Option<Command> {
    let ip = ip.to_string();

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        let mut cmd = Command::new("ping");
        cmd.args(["-c", "1", "-W", "1", &ip]);
        Some(cmd)
    }

    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("ping");
        cmd.args(["-n", "1", "-w", "1000", &ip]);
        Some(cmd)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        let _ = ip;
        None
    }
}

/// Envoie un écho ICMP via la commande `ping` du système.
///
/// Le processus fils est tué si `probe_timeout` expire avant sa fin.
pub async fn ping_host(ip: IpAddr, probe_timeout: Duration) -> bool {
    let Some(mut cmd) = ping_command(ip) else {
        return false;
    };
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!(%ip, error = %e, "Failed to spawn ping");
            return false;
        }
    };

    match timeout(probe_timeout, child.wait()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            debug!(%ip, error = %e, "ping wait failed");
            false
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                debug!(%ip, error = %e, "Failed to kill ping");
            }
            false
        }
    }
}

/// Teste toutes les adresses, au plus `workers` à la fois, et retourne celles
/// qui ont répondu. Les adresses illisibles sont ignorées.
pub async fn sweep_alive(ips: &[String], workers: usize, probe_timeout: Duration) -> Vec<String> {
    stream::iter(ips.iter().cloned())
        .map(|ip| async move {
            let addr: IpAddr = ip.parse().ok()?;
            if is_host_alive(addr, probe_timeout).await {
                debug!(ip = %ip, "Host alive");
                Some(ip)
            } else {
                None
            }
        })
        .buffer_unordered(workers.max(1))
        .filter_map(|result| async move { result })
        .collect()
        .await
}
