//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use broker_gate::auth::AdmissionPolicy;
use broker_gate::config::{AuthConfig, GateConfig};
use broker_gate::lifecycle::Shutdown;
use broker_gate::net::Listener;
use broker_gate::server::{GateServer, MessageRouter, NullRouter};
use broker_gate::GateError;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

pub const AUTH_VIOLATION: &str = "-ERR 'Authorization Violation'\r\n";

pub const TOKEN: &str = "_YZZ22_";
pub const USER: &str = "derek";
pub const PASS: &str = "foobar";

pub const BCRYPT_AUTH_PASS: &str = "IW@$6v(y1(t@fhPDvf!5^%";
pub const BCRYPT_AUTH_HASH: &str = "$2a$04$Q.CgCP2Sl9pkcTXEZHazaeMwPaAkSHk7AI51HkyMt5iJQQyUA4qxq";
pub const BCRYPT_AUTH_TOKEN: &str = "0uhJOSr3GW7xvHvtd^K6pa";
pub const BCRYPT_AUTH_TOKEN_HASH: &str =
    "$2a$04$u5ZClXpcjHgpfc61Ee0VKuwI1K3vTC4zq7SjphjnlHMeb1Llkb5Y6";

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub fn token_auth(token: &str) -> AuthConfig {
    AuthConfig {
        token: token.to_string(),
        ..AuthConfig::default()
    }
}

pub fn user_pass_auth(username: &str, password: &str) -> AuthConfig {
    AuthConfig {
        username: username.to_string(),
        password: password.to_string(),
        ..AuthConfig::default()
    }
}

/// A gate running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: Option<JoinHandle<Result<(), GateError>>>,
}

impl TestServer {
    pub async fn start(auth: AuthConfig) -> Self {
        let mut config = GateConfig::default();
        config.auth = auth;
        Self::start_with(config, Arc::new(NullRouter)).await
    }

    pub async fn start_with(mut config: GateConfig, router: Arc<dyn MessageRouter>) -> Self {
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config.timeouts.drain_ms = 1_000;

        let policy = AdmissionPolicy::from_config(&config.auth).expect("valid auth config");
        let listener = Listener::bind(&config.listener).await.expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");

        let shutdown = Shutdown::new();
        let server = GateServer::new(&config, policy, router);
        let handle = tokio::spawn(server.run(listener, shutdown.clone()));

        Self {
            addr,
            shutdown,
            handle: Some(handle),
        }
    }

    pub async fn client(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }

    /// Trigger shutdown and wait for the accept loop to drain.
    pub async fn stop(mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            let result = tokio::time::timeout(READ_TIMEOUT, handle)
                .await
                .expect("server stopped in time")
                .expect("server task");
            result.expect("server run");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Raw protocol client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }

    /// Next line from the server, CRLF included. Empty on EOF.
    pub async fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = String::new();
        tokio::time::timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("server replied in time")?;
        Ok(line)
    }

    /// Read the INFO banner and return its JSON body.
    pub async fn expect_info(&mut self) -> Value {
        let line = self.read_line().await.expect("read INFO");
        let json = line
            .strip_prefix("INFO ")
            .unwrap_or_else(|| panic!("expected INFO, got {line:?}"));
        serde_json::from_str(json.trim_end()).expect("INFO json")
    }

    pub async fn send(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).await.expect("write");
    }

    pub async fn send_connect(&mut self, fields: Value) {
        self.send(&format!("CONNECT {fields}\r\n")).await;
    }

    pub async fn expect_line(&mut self, expected: &str) {
        let line = self.read_line().await.expect("read reply");
        assert_eq!(line, expected);
    }

    pub async fn expect_ok(&mut self) {
        self.expect_line("+OK\r\n").await;
    }

    pub async fn expect_auth_violation(&mut self) {
        self.expect_line(AUTH_VIOLATION).await;
    }

    /// The server has closed the connection.
    pub async fn expect_closed(&mut self) {
        match self.read_line().await {
            Ok(line) => assert!(line.is_empty(), "expected EOF, got {line:?}"),
            // A reset also means the server hung up.
            Err(_) => {}
        }
    }

    /// Read INFO, send CONNECT, and expect the verbose `+OK`.
    pub async fn admit(&mut self, fields: Value) {
        self.expect_info().await;
        self.send_connect(fields).await;
        self.expect_ok().await;
    }

    pub async fn ping(&mut self) {
        self.send("PING\r\n").await;
        self.expect_line("PONG\r\n").await;
    }
}
