//! RedisStore against an in-process RESP responder.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use session_core::{SessionStore, StoreError};
use session_infrastructure::memory::glob_to_regex;
use session_infrastructure::RedisStore;
use session_shared::config::{RedisSettings, StoreBackend, StoreSettings};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct FakeRedis {
    data: Mutex<BTreeMap<String, String>>,
    commands: Mutex<Vec<Vec<String>>>,
    fail_set: AtomicBool,
    fail_ping: AtomicBool,
}

impl FakeRedis {
    fn seed(&self, key: &str, value: &str) {
        self.data.lock().insert(key.to_string(), value.to_string());
    }

    fn received(&self, name: &str) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .iter()
            .filter(|c| c[0].eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }

    fn reply(&self, args: Vec<String>) -> Vec<u8> {
        let name = args[0].to_ascii_uppercase();
        self.commands.lock().push(args.clone());
        match name.as_str() {
            "PING" if self.fail_ping.load(Ordering::SeqCst) => b"-ERR backend unavailable\r\n".to_vec(),
            "PING" => b"+PONG\r\n".to_vec(),
            "SET" if self.fail_set.load(Ordering::SeqCst) => {
                b"-OOM command not allowed when used memory > 'maxmemory'\r\n".to_vec()
            }
            "SET" => {
                self.seed(&args[1], &args[2]);
                b"+OK\r\n".to_vec()
            }
            "GET" => match self.data.lock().get(&args[1]) {
                Some(value) => bulk(value),
                None => b"$-1\r\n".to_vec(),
            },
            "SCAN" => {
                let matcher = glob_to_regex(&args[3]).unwrap();
                let keys: Vec<String> = self
                    .data
                    .lock()
                    .keys()
                    .filter(|k| matcher.is_match(k))
                    .cloned()
                    .collect();
                // two pages so the cursor loop is exercised
                let half = keys.len() / 2;
                let (page, next) = if args[1] == "0" {
                    (&keys[..half], "1")
                } else {
                    (&keys[half..], "0")
                };
                let mut out = b"*2\r\n".to_vec();
                out.extend(bulk(next));
                out.extend(format!("*{}\r\n", page.len()).into_bytes());
                for key in page {
                    out.extend(bulk(key));
                }
                out
            }
            "DEL" => {
                let mut data = self.data.lock();
                let removed = args[1..].iter().filter(|k| data.remove(*k).is_some()).count();
                format!(":{}\r\n", removed).into_bytes()
            }
            _ => b"+OK\r\n".to_vec(),
        }
    }
}

fn bulk(value: &str) -> Vec<u8> {
    format!("${}\r\n{}\r\n", value.len(), value).into_bytes()
}

/// Parses one `*N` array of bulk strings from the front of `buf`.
fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
    fn line(buf: &[u8], at: usize) -> Option<(&str, usize)> {
        let end = buf[at..].windows(2).position(|w| w == b"\r\n")? + at;
        Some((std::str::from_utf8(&buf[at..end]).ok()?, end + 2))
    }

    let (header, mut at) = line(buf, 0)?;
    let count: usize = header.strip_prefix('*')?.parse().ok()?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let (len, next) = line(buf, at)?;
        let len: usize = len.strip_prefix('$')?.parse().ok()?;
        if buf.len() < next + len + 2 {
            return None;
        }
        args.push(String::from_utf8_lossy(&buf[next..next + len]).into_owned());
        at = next + len + 2;
    }
    Some((args, at))
}

async fn serve_connection(mut socket: TcpStream, fake: Arc<FakeRedis>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        while let Some((args, used)) = parse_command(&buf) {
            buf.drain(..used);
            let reply = fake.reply(args);
            if socket.write_all(&reply).await.is_err() {
                return;
            }
        }
    }
}

async fn start_fake() -> (Arc<FakeRedis>, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let fake = Arc::new(FakeRedis::default());
    let shared = fake.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve_connection(socket, shared.clone()));
        }
    });
    (fake, port)
}

fn settings(port: u16, reconnect_timeout_ms: u64, health_check_interval_ms: u64) -> StoreSettings {
    StoreSettings {
        backend: StoreBackend::Redis,
        prefix: "sess:".into(),
        reconnect_timeout_ms,
        health_check_interval_ms,
        redis: RedisSettings {
            path: None,
            port: Some(port),
            host: Some("127.0.0.1".into()),
            options: None,
        },
    }
}

async fn connect(port: u16, reconnect_timeout_ms: u64, health_check_interval_ms: u64) -> RedisStore {
    RedisStore::connect(&settings(port, reconnect_timeout_ms, health_check_interval_ms))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_set_sends_px_only_with_ttl() {
    let (fake, port) = start_fake().await;
    let store = connect(port, 10_000, 60_000).await;

    store.set("sess:a", "{\"v\":1}", Some(1_500)).await.unwrap();
    store.set("sess:b", "{\"v\":2}", None).await.unwrap();

    let sets = fake.received("SET");
    assert_eq!(sets[0], ["SET", "sess:a", "{\"v\":1}", "PX", "1500"]);
    assert_eq!(sets[1], ["SET", "sess:b", "{\"v\":2}"]);

    assert_eq!(store.get("sess:a").await.unwrap().as_deref(), Some("{\"v\":1}"));
    assert_eq!(store.get("sess:missing").await.unwrap(), None);
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_delete_walks_every_scan_page() {
    let (fake, port) = start_fake().await;
    for key in ["sess:a1", "sess:a2", "sess:a3", "sess:b1", "other:a4"] {
        fake.seed(key, "{}");
    }
    let store = connect(port, 10_000, 60_000).await;

    assert_eq!(store.delete("sess:a*").await.unwrap(), 3);
    assert_eq!(fake.received("SCAN").len(), 2);

    let remaining: Vec<String> = fake.data.lock().keys().cloned().collect();
    assert_eq!(remaining, ["other:a4", "sess:b1"]);
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_delete_without_match_sends_no_del() {
    let (fake, port) = start_fake().await;
    fake.seed("sess:a1", "{}");
    let store = connect(port, 10_000, 60_000).await;

    assert_eq!(store.delete("sess:zz*").await.unwrap(), 0);
    assert!(fake.received("DEL").is_empty());
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_failed_command_arms_and_next_success_clears() {
    let (fake, port) = start_fake().await;
    let store = connect(port, 10_000, 60_000).await;
    // let the monitor's first ping settle
    tokio::time::sleep(Duration::from_millis(100)).await;

    fake.fail_set.store(true, Ordering::SeqCst);
    let err = store.set("sess:a", "{}", None).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(store.watchdog().is_armed());

    fake.fail_set.store(false, Ordering::SeqCst);
    store.set("sess:a", "{}", None).await.unwrap();
    assert!(!store.watchdog().is_armed());
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_monitor_arms_on_failed_ping_and_clears_on_recovery() {
    let (fake, port) = start_fake().await;
    let store = connect(port, 10_000, 50).await;

    fake.fail_ping.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(store.watchdog().is_armed());

    fake.fail_ping.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!store.watchdog().is_armed());
    assert!(!store.watchdog().has_expired());
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_unrecovered_backend_expires_watchdog() {
    let (fake, port) = start_fake().await;
    let store = connect(port, 300, 50).await;

    fake.fail_ping.store(true, Ordering::SeqCst);
    let expired = store.watchdog().expired();
    tokio::time::timeout(Duration::from_secs(3), expired)
        .await
        .expect("watchdog should expire while pings keep failing");
    assert!(store.watchdog().has_expired());
}

#[tokio::test]
async fn test_healthy_ping_clears_countdown_from_failed_command() {
    let (fake, port) = start_fake().await;
    let store = connect(port, 300, 50).await;

    // the connection stays up, only the write is refused
    fake.fail_set.store(true, Ordering::SeqCst);
    assert!(store.set("sess:a", "{}", None).await.is_err());

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(!store.watchdog().has_expired());
    assert!(!store.watchdog().is_armed());
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_close_stops_monitor_and_disarms() {
    let (fake, port) = start_fake().await;
    let store = connect(port, 300, 50).await;

    fake.fail_set.store(true, Ordering::SeqCst);
    assert!(store.set("sess:a", "{}", None).await.is_err());
    store.close().await.unwrap();
    assert!(!store.watchdog().is_armed());

    let pings = fake.received("PING").len();
    fake.fail_ping.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fake.received("PING").len(), pings);
    assert!(!store.watchdog().has_expired());
}
