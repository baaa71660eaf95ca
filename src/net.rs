//! WiFi-backed upstream for the wake cycle
//!
//! The radio is only brought up when the cycle first needs the network;
//! cycles that can run from cached state never pay for it.

use embassy_executor::Spawner;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpAddress, Runner, Stack, StackResources};
use embassy_time::{Duration, Timer, with_timeout};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::Controller;
use esp_radio::wifi::{ClientConfig, Config as WifiConfig, ModeConfig, WifiController, WifiDevice};
use log::{debug, info, warn};

use crate::config::{HTTP_TIMEOUT_SECS, NTP_SERVER};
use crate::cycle::{LinkError, Upstream};
use crate::http::{self, BodyBuffer, HttpError, Url};
use crate::sntp::{self, NTP_PACKET_SIZE, NTP_PORT, SntpError};
use crate::weather;

// When you are okay with using a nightly compiler it's better to use https://docs.rs/static_cell/2.1.0/static_cell/macro.make_static.html
macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

const WEATHER_HOST: &str = "api.weatherapi.com";
const CONNECT_ATTEMPTS: u32 = 3;
const IP_TIMEOUT_SECS: u64 = 15;
const NTP_TIMEOUT_SECS: u64 = 5;
/// Fixed local port for SNTP replies
const NTP_LOCAL_PORT: u16 = 50123;

/// Credentials and endpoints, baked in at build time
pub struct NetConfig {
    pub ssid: &'static str,
    pub password: &'static str,
    pub remote_status_url: &'static str,
    pub weather_api_key: &'static str,
    pub weather_location: &'static str,
}

pub struct NetUpstream {
    spawner: Spawner,
    wifi: Option<WIFI<'static>>,
    rng: Rng,
    config: NetConfig,
    controller: Option<WifiController<'static>>,
    stack: Option<Stack<'static>>,
}

impl NetUpstream {
    pub fn new(spawner: Spawner, wifi: WIFI<'static>, rng: Rng, config: NetConfig) -> Self {
        Self {
            spawner,
            wifi: Some(wifi),
            rng,
            config,
            controller: None,
            stack: None,
        }
    }

    fn stack(&self) -> Result<Stack<'static>, HttpError> {
        self.stack.ok_or(HttpError::Connect)
    }
}

impl Upstream for NetUpstream {
    async fn connect(&mut self) -> Result<(), LinkError> {
        if self.stack.is_some() {
            return Ok(());
        }
        let wifi = self.wifi.take().ok_or(LinkError::Radio)?;

        info!("Initializing WiFi...");
        let ctrl = esp_radio::init().map_err(|e| {
            warn!("Radio init failed: {:?}", e);
            LinkError::Radio
        })?;
        let ctrl = mk_static!(Controller<'static>, ctrl);

        let (mut controller, ifaces) = esp_radio::wifi::new(ctrl, wifi, WifiConfig::default())
            .map_err(|e| {
                warn!("WiFi init failed: {:?}", e);
                LinkError::Radio
            })?;

        // DHCP, DNS, one TCP and one UDP socket
        let net_config = embassy_net::Config::dhcpv4(Default::default());
        let (stack, runner) = embassy_net::new(
            ifaces.sta,
            net_config,
            mk_static!(StackResources<4>, StackResources::<4>::new()),
            self.rng.random() as u64,
        );
        self.spawner.spawn(net_task(runner)).ok();

        let joined = wifi_connect(&mut controller, &self.config).await;
        self.controller = Some(controller);
        joined?;

        wait_for_ip(stack).await?;
        self.stack = Some(stack);
        info!("WiFi ready!");
        Ok(())
    }

    async fn fetch_remote_status(&mut self, body: &mut [u8]) -> Result<usize, HttpError> {
        let url = Url::parse(self.config.remote_status_url)?;
        fetch_into(self.stack()?, &url, body).await
    }

    async fn fetch_weather(&mut self, body: &mut [u8]) -> Result<usize, HttpError> {
        let path = weather::request_path(self.config.weather_api_key, self.config.weather_location)
            .map_err(|_| HttpError::TooLarge)?;
        let url = Url {
            host: WEATHER_HOST,
            port: 80,
            path: &path,
        };
        fetch_into(self.stack()?, &url, body).await
    }

    async fn sync_time(&mut self) -> Result<u64, SntpError> {
        let stack = self.stack.ok_or(SntpError::Network)?;
        query_ntp(stack, NTP_SERVER).await
    }

    async fn disconnect(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            wifi_disconnect(controller).await;
        }
    }
}

/// Connect to WiFi network, giving up after a few attempts
async fn wifi_connect(controller: &mut WifiController<'static>, config: &NetConfig) -> Result<(), LinkError> {
    debug!("Device capabilities: {:?}", controller.capabilities());

    if !matches!(controller.is_started(), Ok(true)) {
        let client_config = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(config.ssid.into())
                .with_password(config.password.into()),
        );
        controller.set_config(&client_config).map_err(|e| {
            warn!("WiFi config rejected: {:?}", e);
            LinkError::Radio
        })?;
        info!("Starting WiFi...");
        controller.start_async().await.map_err(|e| {
            warn!("WiFi start failed: {:?}", e);
            LinkError::Radio
        })?;
    }

    info!("Connecting to {}...", config.ssid);
    for attempt in 1..=CONNECT_ATTEMPTS {
        match controller.connect_async().await {
            Ok(_) => {
                info!("WiFi connected!");
                return Ok(());
            }
            Err(e) => {
                warn!("Failed to connect (attempt {}/{}): {:?}", attempt, CONNECT_ATTEMPTS, e);
                Timer::after(Duration::from_secs(2)).await;
            }
        }
    }
    Err(LinkError::Association)
}

/// Disconnect and stop WiFi to save power
async fn wifi_disconnect(controller: &mut WifiController<'static>) {
    if let Err(e) = controller.disconnect_async().await {
        debug!("Disconnect error (may already be disconnected): {:?}", e);
    }
    if let Err(e) = controller.stop_async().await {
        warn!("Stop error: {:?}", e);
    }
    info!("WiFi stopped");
}

/// Wait for network stack to get an IP address
async fn wait_for_ip(stack: Stack<'static>) -> Result<(), LinkError> {
    let wait = async {
        while !stack.is_link_up() {
            Timer::after(Duration::from_millis(500)).await;
        }
        debug!("Link up");
        loop {
            if let Some(config) = stack.config_v4() {
                info!("Got IP: {}", config.address);
                return;
            }
            Timer::after(Duration::from_millis(500)).await;
        }
    };
    with_timeout(Duration::from_secs(IP_TIMEOUT_SECS), wait)
        .await
        .map_err(|_| LinkError::NoAddress)
}

/// Resolve a hostname to an IPv4 address
/// Tries parsing as IPv4 first, falls back to DNS lookup
async fn resolve_host(stack: Stack<'static>, host: &str) -> Option<IpAddress> {
    if let Ok(ip) = http::parse_ipv4(host) {
        return Some(IpAddress::Ipv4(ip));
    }

    debug!("Resolving hostname: {}", host);
    match stack.dns_query(host, DnsQueryType::A).await {
        Ok(addrs) => addrs.first().copied(),
        Err(e) => {
            warn!("DNS lookup for {} failed: {:?}", host, e);
            None
        }
    }
}

/// GET `url` into `body`, bounded by the HTTP timeout
async fn fetch_into(stack: Stack<'static>, url: &Url<'_>, body: &mut [u8]) -> Result<usize, HttpError> {
    let timeout = Duration::from_secs(HTTP_TIMEOUT_SECS);
    with_timeout(timeout, fetch_plain(stack, url, body))
        .await
        .map_err(|_| HttpError::Timeout)?
}

async fn fetch_plain(stack: Stack<'static>, url: &Url<'_>, body: &mut [u8]) -> Result<usize, HttpError> {
    let ip = resolve_host(stack, url.host).await.ok_or(HttpError::Dns)?;
    info!("GET {}:{}{}", url.host, url.port, url.path);

    let mut rx_buf = [0u8; 4096];
    let mut tx_buf = [0u8; 1024];
    let mut socket = TcpSocket::new(stack, &mut rx_buf, &mut tx_buf);
    socket.set_timeout(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)));

    socket.connect((ip, url.port)).await.map_err(|_| HttpError::Connect)?;

    let mut sink = BodyBuffer::new(body);
    let mut http_rx_buf = [0u8; 2048];
    let result = http::get(&mut socket, url, &mut http_rx_buf, |chunk| sink.push(chunk)).await;
    socket.close();

    let response = result?;
    let len = sink.finish()?;
    debug!("HTTP {} ({} bytes)", response.status, len);
    Ok(len)
}

/// One SNTP exchange with `server`
async fn query_ntp(stack: Stack<'static>, server: &str) -> Result<u64, SntpError> {
    let addr = resolve_host(stack, server).await.ok_or(SntpError::Dns)?;

    let mut rx_meta = [PacketMetadata::EMPTY; 1];
    let mut rx_buffer = [0u8; 128];
    let mut tx_meta = [PacketMetadata::EMPTY; 1];
    let mut tx_buffer = [0u8; 128];
    let mut socket = UdpSocket::new(stack, &mut rx_meta, &mut rx_buffer, &mut tx_meta, &mut tx_buffer);

    socket.bind(NTP_LOCAL_PORT).map_err(|e| {
        warn!("NTP socket bind failed: {:?}", e);
        SntpError::Network
    })?;

    debug!("Sending NTP request to {}", addr);
    socket
        .send_to(&sntp::request_packet(), (addr, NTP_PORT))
        .await
        .map_err(|e| {
            warn!("NTP send failed: {:?}", e);
            SntpError::Network
        })?;

    let mut reply = [0u8; NTP_PACKET_SIZE];
    let (n, _from) = with_timeout(Duration::from_secs(NTP_TIMEOUT_SECS), socket.recv_from(&mut reply))
        .await
        .map_err(|_| SntpError::Timeout)?
        .map_err(|e| {
            warn!("NTP receive failed: {:?}", e);
            SntpError::Network
        })?;

    sntp::parse_reply(&reply[..n])
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
