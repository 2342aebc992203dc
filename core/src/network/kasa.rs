//! Async client for the Kasa TCP protocol.

use std::net::SocketAddr;
use std::time::Duration;

use khaneh_protocols::kasa::{self, SysInfo};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::ProbeError;

/// Sends one JSON command and returns the decrypted reply.
///
/// `limit` bounds the whole exchange, connect included.
pub async fn query(addr: SocketAddr, payload: &str, limit: Duration) -> Result<Vec<u8>, ProbeError> {
    timeout(limit, exchange(addr, payload))
        .await
        .map_err(|_elapsed| ProbeError::Timeout {
            operation: "kasa query",
            after: limit,
        })?
}

async fn exchange(addr: SocketAddr, payload: &str) -> Result<Vec<u8>, ProbeError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| ProbeError::connection(addr, e))?;

    stream
        .write_all(&kasa::frame(payload.as_bytes()))
        .await
        .map_err(|e| ProbeError::connection(addr, e))?;

    let mut header = [0u8; kasa::HEADER_LEN];
    stream
        .read_exact(&mut header)
        .await
        .map_err(|e| ProbeError::connection(addr, e))?;
    let len: usize = kasa::frame_len(header).map_err(|e| ProbeError::decode("kasa", e))?;

    let mut body: Vec<u8> = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|e| ProbeError::connection(addr, e))?;

    Ok(kasa::decrypt(&body))
}

pub async fn get_sysinfo(addr: SocketAddr, limit: Duration) -> Result<SysInfo, ProbeError> {
    let reply: Vec<u8> = query(addr, kasa::SYSINFO_QUERY, limit).await?;
    kasa::parse_sysinfo(&reply).map_err(|e| ProbeError::decode("kasa", format!("{e:#}")))
}

/// Sends a control command and checks the device accepted it.
pub async fn command(addr: SocketAddr, payload: &str, limit: Duration) -> Result<(), ProbeError> {
    let reply: Vec<u8> = query(addr, payload, limit).await?;
    match kasa::command_err_code(&reply) {
        Ok(0) => Ok(()),
        Ok(code) => Err(ProbeError::decode("kasa", format!("device rejected command with err_code {code}"))),
        Err(e) => Err(ProbeError::decode("kasa", format!("{e:#}"))),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
