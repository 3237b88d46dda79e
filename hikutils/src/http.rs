//! Client HTTP bloquant minimal sur socket TCP brute.
//!
//! Les serveurs web des anciens firmwares renvoient des en-têtes parfois
//! invalides : la requête est écrite à la main et la réponse analysée de façon
//! tolérante (code de statut, en-têtes en minuscules, corps brut).

use crate::errors::NetError;
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Réponse à une requête
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: Vec<u8>,
    /// Noms d'en-têtes en minuscules
    pub headers: HashMap<String, String>,
}

impl HttpResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    pub user_agent: String,
    pub timeout: Duration,
}

impl HttpClient {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }

    pub fn get(&self, host: &str, path: &str) -> Result<HttpResponse, NetError> {
        self.get_with_auth(host, path, "")
    }

    /// GET avec `?auth=<token>` ajouté quand `auth_token` n'est pas vide
    pub fn get_with_auth(
        &self,
        host: &str,
        path: &str,
        auth_token: &str,
    ) -> Result<HttpResponse, NetError> {
        let mut full_url = format!("http://{}{}", host, path);
        if !auth_token.is_empty() {
            full_url.push_str("?auth=");
            full_url.push_str(auth_token);
        }
        let url = Url::parse(&full_url)?;

        let hostname = url.host_str().unwrap_or(host).to_string();
        let port = url.port().unwrap_or(80);

        let addr = (hostname.as_str(), port)
            .to_socket_addrs()
            .map_err(|source| NetError::Connect {
                host: host.to_string(),
                source,
            })?
            .next()
            .ok_or_else(|| NetError::Connect {
                host: host.to_string(),
                source: std::io::Error::new(ErrorKind::NotFound, "no address resolved"),
            })?;

        let mut stream = TcpStream::connect_timeout(&addr, self.timeout).map_err(|e| {
            if e.kind() == ErrorKind::TimedOut {
                NetError::ConnectTimeout(host.to_string())
            } else {
                NetError::Connect {
                    host: host.to_string(),
                    source: e,
                }
            }
        })?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(NetError::Read)?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(NetError::Send)?;

        let mut path_with_query = url.path().to_string();
        if let Some(query) = url.query() {
            path_with_query.push('?');
            path_with_query.push_str(query);
        }

        let request = format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             User-Agent: {}\r\n\
             Accept: */*\r\n\
             Connection: close\r\n\
             \r\n",
            path_with_query, hostname, self.user_agent
        );
        debug!(%addr, path = %path_with_query, "HTTP GET");

        stream
            .write_all(request.as_bytes())
            .map_err(NetError::Send)?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).map_err(NetError::Read)?;

        parse_http_response(&raw)
    }
}

/// Analyse une réponse HTTP brute : ligne de statut, en-têtes, puis tout ce
/// qui suit la ligne vide comme corps.
pub fn parse_http_response(data: &[u8]) -> Result<HttpResponse, NetError> {
    let header_end = data
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| NetError::MalformedResponse("no header separator found".to_string()))?;

    let head = String::from_utf8_lossy(&data[..header_end]);
    let body = data[header_end + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let mut status_parts = status_line.splitn(3, ' ');
    let _version = status_parts.next();
    let code = status_parts
        .next()
        .ok_or_else(|| NetError::MalformedResponse(format!("invalid status line: {}", status_line)))?;
    let status_code = code
        .parse::<u16>()
        .map_err(|_| NetError::MalformedResponse(format!("invalid status code: {}", code)))?;

    let headers = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
        .collect();

    Ok(HttpResponse {
        status_code,
        body,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_parse_response() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nX-Custom: a: b\r\n\r\n<root/>";
        let resp = parse_http_response(raw).unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.headers.get("content-type").unwrap(), "text/xml");
        assert_eq!(resp.headers.get("x-custom").unwrap(), "a: b");
        assert_eq!(resp.body, b"<root/>");
    }

    #[test]
    fn test_parse_response_without_separator() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\n";
        assert!(matches!(
            parse_http_response(raw),
            Err(NetError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_response_bad_status() {
        assert!(parse_http_response(b"HTTP/1.1\r\n\r\n").is_err());
        assert!(parse_http_response(b"HTTP/1.1 abc OK\r\n\r\n").is_err());
    }

    #[test]
    fn test_get_with_auth_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let n = conn.read(&mut buf).unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            conn.write_all(b"HTTP/1.0 404 Not Found\r\nServer: test\r\n\r\nnope")
                .unwrap();
            request
        });

        let client = HttpClient::new("hiktest/1.0", Duration::from_secs(2));
        let resp = client
            .get_with_auth(&format!("127.0.0.1:{}", port), "/ISAPI/System/deviceInfo", "tok")
            .unwrap();

        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.headers.get("server").unwrap(), "test");
        assert_eq!(resp.body_text(), "nope");

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /ISAPI/System/deviceInfo?auth=tok HTTP/1.1\r\n"));
        assert!(request.contains("User-Agent: hiktest/1.0\r\n"));
        assert!(request.contains("Connection: close\r\n"));
    }

    #[test]
    fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = HttpClient::new("hiktest/1.0", Duration::from_millis(500));
        let err = client.get(&format!("127.0.0.1:{}", port), "/").unwrap_err();
        assert!(matches!(err, NetError::Connect { .. } | NetError::ConnectTimeout(_)));
    }
}
