use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use khaneh_common::config::Config;
use khaneh_common::device::{DiscoveredDevice, DiscoveryMethod, Protocol};
use khaneh_core::error::ProbeError;
use khaneh_core::probe::Probe;
use khaneh_protocols::kasa;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

pub const HS100_SYSINFO: &str = r#"{"system":{"get_sysinfo":{"alias":"Living Room Plug","model":"HS100","mac":"AA:BB:CC:DD:EE:FF","relay_state":0,"err_code":0}}}"#;

pub const KL130_SYSINFO: &str = r#"{"system":{"get_sysinfo":{"alias":"چراغ نشیمن","model":"KL130(EU)","mic_mac":"1C3BF3000001","mic_type":"IOT.SMARTBULB","is_dimmable":1,"light_state":{"on_off":0,"brightness":40},"err_code":0}}}"#;

const COMMAND_OK: &str = r#"{"system":{"set_relay_state":{"err_code":0}}}"#;

/// A Kasa device speaking the framed TCP protocol.
///
/// `get_sysinfo` is answered with the configured reply, every other
/// command is acknowledged and recorded.
pub struct FakeKasaDevice {
    pub addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
    peak_serving: Arc<AtomicUsize>,
}

impl FakeKasaDevice {
    /// Listens on 127.0.0.1 and replies at once.
    pub async fn start(sysinfo: &'static str) -> Self {
        Self::start_on(IpAddr::V4(Ipv4Addr::LOCALHOST), sysinfo, Duration::ZERO).await
    }

    /// Listens on `ip`; an unspecified address answers for all of 127.0.0.0/8.
    /// Each request is held for `reply_delay` before the reply is sent.
    pub async fn start_on(ip: IpAddr, sysinfo: &'static str, reply_delay: Duration) -> Self {
        let listener = TcpListener::bind(SocketAddr::new(ip, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let commands: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let serving = Arc::new(AtomicUsize::new(0));
        let peak_serving = Arc::new(AtomicUsize::new(0));

        let (recorded, active, peak) = (commands.clone(), serving.clone(), peak_serving.clone());
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let (recorded, active, peak) = (recorded.clone(), active.clone(), peak.clone());
                tokio::spawn(async move {
                    // Port-scan connects close without sending anything.
                    let mut header = [0u8; kasa::HEADER_LEN];
                    if stream.read_exact(&mut header).await.is_err() {
                        return;
                    }
                    let mut body = vec![0u8; kasa::frame_len(header).unwrap()];
                    stream.read_exact(&mut body).await.unwrap();

                    // Counted from request to reply, a window that lies inside
                    // the client's own connection lifetime.
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(reply_delay).await;

                    let request = String::from_utf8(kasa::decrypt(&body)).unwrap();
                    let reply = if request.contains("get_sysinfo") {
                        sysinfo
                    } else {
                        recorded.lock().unwrap().push(request);
                        COMMAND_OK
                    };
                    active.fetch_sub(1, Ordering::SeqCst);
                    let _ = stream.write_all(&kasa::frame(reply.as_bytes())).await;
                });
            }
        });

        Self {
            addr,
            commands,
            peak_serving,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Most requests this device was ever serving at once.
    pub fn peak_serving(&self) -> usize {
        self.peak_serving.load(Ordering::SeqCst)
    }
}

/// Answers the Kasa UDP discovery datagram on 127.0.0.1.
pub async fn kasa_udp_responder(sysinfo: &'static str) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        while let Ok((len, source)) = socket.recv_from(&mut buf).await {
            if kasa::decrypt(&buf[..len]).starts_with(b"{\"system\"") {
                let _ = socket.send_to(&kasa::encrypt(sysinfo.as_bytes()), source).await;
            }
        }
    });
    addr
}

/// Accepts TCP handshakes on `ip:port` through the kernel backlog but never
/// reads or replies. Drop the listener to stop.
pub async fn tarpit(ip: Ipv4Addr, port: u16) -> TcpListener {
    TcpListener::bind((ip, port)).await.unwrap()
}

/// Config that scans `range` for a Kasa device on `kasa_port` only.
pub fn loopback_config(range: &str, kasa_port: u16) -> Config {
    Config {
        network_range: Some(range.parse().unwrap()),
        kasa_port,
        http_ports: Vec::new(),
        connect_timeout: Duration::from_millis(300),
        http_timeout: Duration::from_secs(1),
        enable_mdns: false,
        ..Config::default()
    }
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Never returns on its own.
pub struct HangingProbe;

#[async_trait]
impl Probe for HangingProbe {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn probe(&self, _timeout: Duration) -> Result<Vec<DiscoveredDevice>, ProbeError> {
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

/// Reports one fixed device immediately.
pub struct InstantProbe;

#[async_trait]
impl Probe for InstantProbe {
    fn name(&self) -> &'static str {
        "instant"
    }

    async fn probe(&self, _timeout: Duration) -> Result<Vec<DiscoveredDevice>, ProbeError> {
        let device = DiscoveredDevice {
            mac: None,
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
            port: None,
            protocol: Protocol::Upnp,
            device_type: khaneh_common::device::DeviceType::Unknown,
            manufacturer: None,
            model: None,
            capabilities: Default::default(),
            confidence: 0.6,
            discovery_method: DiscoveryMethod::Ssdp,
            name: "10.0.0.5".into(),
            display_name: "دستگاه 10.0.0.5".into(),
        };
        Ok(vec![device])
    }
}
