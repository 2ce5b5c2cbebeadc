#![allow(dead_code)]

pub mod test_server {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Configure the may runtime once per test binary. Symbolizing stacks
    /// while the CPU profiler runs wants a larger coroutine stack.
    pub fn setup_may_runtime() {
        INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

pub mod profiler {
    use std::sync::{Mutex, MutexGuard};

    static PROFILER: Mutex<()> = Mutex::new(());

    /// The CPU profiler is process-wide; tests that start one take this
    /// first.
    pub fn lock() -> MutexGuard<'static, ()> {
        PROFILER.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub mod http {
    use brrtrouter_pprof::router::Router;
    use brrtrouter_pprof::server::{HttpServer, ServerHandle};
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::time::{Duration, Instant};

    use super::test_server::setup_may_runtime;

    pub struct RawResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn header_values(&self, name: &str) -> Vec<&str> {
            self.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
                .collect()
        }

        pub fn body_str(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    pub fn start_server(router: Router) -> ServerHandle {
        setup_may_runtime();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let handle = HttpServer::from_router(router).start(addr).unwrap();
        handle.wait_ready().unwrap();
        handle
    }

    /// Send a raw request and read until the declared body has arrived or
    /// `timeout` passes.
    pub fn send_request_with_timeout(addr: SocketAddr, req: &str, timeout: Duration) -> RawResponse {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let deadline = Instant::now() + timeout;
        let mut buf = Vec::new();
        loop {
            let mut chunk = [0u8; 4096];
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if is_complete(&buf) {
                        break;
                    }
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    if Instant::now() >= deadline {
                        break;
                    }
                }
                Err(e) => panic!("read error: {e}"),
            }
        }
        parse_response(&buf)
    }

    pub fn send_request(addr: SocketAddr, req: &str) -> RawResponse {
        send_request_with_timeout(addr, req, Duration::from_secs(2))
    }

    pub fn get(addr: SocketAddr, path: &str, extra_headers: &str) -> RawResponse {
        send_request(
            addr,
            &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n{extra_headers}\r\n"),
        )
    }

    fn split_head(buf: &[u8]) -> Option<(&[u8], &[u8])> {
        let pos = buf.windows(4).position(|w| w == b"\r\n\r\n")?;
        Some((&buf[..pos], &buf[pos + 4..]))
    }

    fn content_length(head: &str) -> Option<usize> {
        head.lines().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse().ok())
                .flatten()
        })
    }

    fn is_complete(buf: &[u8]) -> bool {
        let Some((head, body)) = split_head(buf) else {
            return false;
        };
        let head = String::from_utf8_lossy(head);
        match content_length(&head) {
            Some(len) => body.len() >= len,
            None => true,
        }
    }

    pub fn parse_response(buf: &[u8]) -> RawResponse {
        let (head, body) = split_head(buf).unwrap_or((buf, &[]));
        let head = String::from_utf8_lossy(head);
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.strip_prefix("HTTP/1.1 "))
            .and_then(|l| l.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        RawResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }
}
