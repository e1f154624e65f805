//! TFTP side-channel listener (RFC 1350, octet mode).
//!
//! The listener serves the station's exchange directory for both transfer
//! directions: the device pulls staged files with RRQ and pushes fetched
//! files with WRQ. It is started once per session and left running for the
//! session's duration, since the device may dial in the instant a copy command
//! is issued.
//!
//! 512-byte blocks, one transfer at a time, no retransmission: the channel
//! is a point-to-point lab/management network and the CLI transport owns
//! timeout reporting. Mode or opcode violations are answered with TFTP
//! ERROR packets.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// TFTP opcodes.
const OP_RRQ: u16 = 1;
const OP_WRQ: u16 = 2;
const OP_DATA: u16 = 3;
const OP_ACK: u16 = 4;
const OP_ERROR: u16 = 5;

// TFTP error codes.
const ERR_NOT_FOUND: u16 = 1;
const ERR_ILLEGAL: u16 = 4;

const OCTET: &str = "octet";
const BLOCK_SIZE: usize = 512;

/// Deadline for the peer's next packet within an active transfer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Background TFTP listener bound to a station directory.
///
/// Serving stops when [`shutdown()`](Self::shutdown) is called or the
/// listener is dropped.
#[derive(Debug)]
pub struct TftpListener {
    local_addr: SocketAddr,
    cancel: CancellationToken,
}

impl TftpListener {
    /// Bind `bind_addr` (e.g. `127.0.0.1:0`) and start serving `root`.
    pub async fn bind(root: impl Into<PathBuf>, bind_addr: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        let local_addr = socket.local_addr()?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let root = root.into();
        debug!(addr = %local_addr, root = %root.display(), "tftp listener started");
        tokio::spawn(serve(socket, root, token));
        Ok(Self { local_addr, cancel })
    }

    /// Address the listener is serving on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bound UDP port.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stop serving.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TftpListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Debug)]
enum Request {
    Read(String),
    Write(String),
}

async fn serve(socket: UdpSocket, root: PathBuf, token: CancellationToken) {
    let mut buf = vec![0u8; 2048];
    loop {
        let (n, peer) = tokio::select! {
            _ = token.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "tftp listener socket failed");
                    break;
                }
            },
        };

        match parse_request(&buf[..n]) {
            Ok(Request::Read(name)) => {
                debug!(%name, %peer, "tftp read request");
                if let Err(e) = handle_read(&root, &name, peer).await {
                    warn!(%name, error = %e, "tftp read transfer failed");
                }
            }
            Ok(Request::Write(name)) => {
                debug!(%name, %peer, "tftp write request");
                if let Err(e) = handle_write(&root, &name, peer).await {
                    warn!(%name, error = %e, "tftp write transfer failed");
                }
            }
            Err(message) => {
                let _ = send_error(&socket, peer, ERR_ILLEGAL, &message).await;
            }
        }
    }
    debug!("tftp listener stopped");
}

fn parse_request(pkt: &[u8]) -> Result<Request, String> {
    if pkt.len() < 4 {
        return Err("short request packet".to_string());
    }
    let opcode = u16::from_be_bytes([pkt[0], pkt[1]]);
    let mut parts = pkt[2..].split(|&b| b == 0);
    let name = std::str::from_utf8(parts.next().unwrap_or(&[]))
        .map_err(|_| "file name is not UTF-8".to_string())?;
    let mode = std::str::from_utf8(parts.next().unwrap_or(&[]))
        .map_err(|_| "mode is not UTF-8".to_string())?;

    if name.is_empty() {
        return Err("empty file name".to_string());
    }
    if name.contains('/') || name.contains('\\') {
        return Err("file name must not contain path separators".to_string());
    }
    if !mode.eq_ignore_ascii_case(OCTET) {
        return Err(format!("unsupported mode {mode}"));
    }
    match opcode {
        OP_RRQ => Ok(Request::Read(name.to_string())),
        OP_WRQ => Ok(Request::Write(name.to_string())),
        other => Err(format!("unexpected opcode {other}")),
    }
}

/// Serve one RRQ: send the staged file in 512-byte DATA blocks.
async fn handle_read(root: &Path, name: &str, peer: SocketAddr) -> io::Result<()> {
    // Per RFC 1350 the transfer continues from a fresh ephemeral port.
    let sock = UdpSocket::bind("0.0.0.0:0").await?;

    let data = match std::fs::read(root.join(name)) {
        Ok(data) => data,
        Err(_) => {
            send_error(&sock, peer, ERR_NOT_FOUND, "file not found").await?;
            return Ok(());
        }
    };

    let mut block: u16 = 1;
    let mut offset = 0;
    loop {
        let end = (offset + BLOCK_SIZE).min(data.len());
        let chunk = &data[offset..end];

        let mut pkt = Vec::with_capacity(4 + chunk.len());
        pkt.extend_from_slice(&OP_DATA.to_be_bytes());
        pkt.extend_from_slice(&block.to_be_bytes());
        pkt.extend_from_slice(chunk);
        sock.send_to(&pkt, peer).await?;
        wait_ack(&sock, peer, block).await?;

        offset = end;
        // A short block terminates the transfer.
        if chunk.len() < BLOCK_SIZE {
            break;
        }
        block = block.wrapping_add(1);
    }
    Ok(())
}

/// Serve one WRQ: collect DATA blocks and write the object into the root.
async fn handle_write(root: &Path, name: &str, peer: SocketAddr) -> io::Result<()> {
    let sock = UdpSocket::bind("0.0.0.0:0").await?;
    send_ack(&sock, peer, 0).await?;

    let mut data = Vec::new();
    let mut expected: u16 = 1;
    let mut buf = vec![0u8; 4 + BLOCK_SIZE + 64];
    loop {
        let (n, from) = timeout(REPLY_TIMEOUT, sock.recv_from(&mut buf))
            .await
            .map_err(|_| timeout_error("timed out waiting for DATA"))??;
        if from != peer {
            continue;
        }
        if n < 4 || u16::from_be_bytes([buf[0], buf[1]]) != OP_DATA {
            send_error(&sock, peer, ERR_ILLEGAL, "expected DATA").await?;
            return Err(protocol_error("unexpected packet while waiting for DATA"));
        }
        let block = u16::from_be_bytes([buf[2], buf[3]]);
        if block != expected {
            // Duplicate block; re-acknowledge and keep waiting.
            send_ack(&sock, peer, block).await?;
            continue;
        }
        data.extend_from_slice(&buf[4..n]);
        send_ack(&sock, peer, block).await?;
        if n - 4 < BLOCK_SIZE {
            break;
        }
        expected = expected.wrapping_add(1);
    }

    std::fs::write(root.join(name), &data)?;
    Ok(())
}

async fn wait_ack(sock: &UdpSocket, peer: SocketAddr, block: u16) -> io::Result<()> {
    let mut buf = [0u8; 256];
    loop {
        let (n, from) = timeout(REPLY_TIMEOUT, sock.recv_from(&mut buf))
            .await
            .map_err(|_| timeout_error("timed out waiting for ACK"))??;
        if from != peer {
            continue;
        }
        if n >= 4 && u16::from_be_bytes([buf[0], buf[1]]) == OP_ERROR {
            return Err(protocol_error("peer aborted the transfer"));
        }
        if n < 4 || u16::from_be_bytes([buf[0], buf[1]]) != OP_ACK {
            return Err(protocol_error("unexpected packet while waiting for ACK"));
        }
        if u16::from_be_bytes([buf[2], buf[3]]) == block {
            return Ok(());
        }
        // Stale ACK for an earlier block; keep waiting.
    }
}

async fn send_ack(sock: &UdpSocket, peer: SocketAddr, block: u16) -> io::Result<()> {
    let mut pkt = Vec::with_capacity(4);
    pkt.extend_from_slice(&OP_ACK.to_be_bytes());
    pkt.extend_from_slice(&block.to_be_bytes());
    sock.send_to(&pkt, peer).await?;
    Ok(())
}

async fn send_error(sock: &UdpSocket, peer: SocketAddr, code: u16, message: &str) -> io::Result<()> {
    let mut pkt = Vec::with_capacity(4 + message.len() + 1);
    pkt.extend_from_slice(&OP_ERROR.to_be_bytes());
    pkt.extend_from_slice(&code.to_be_bytes());
    pkt.extend_from_slice(message.as_bytes());
    pkt.push(0);
    sock.send_to(&pkt, peer).await?;
    Ok(())
}

fn timeout_error(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, message)
}

fn protocol_error(message: &str) -> io::Error {
    io::Error::other(message)
}

fn request_packet(opcode: u16, name: &str) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(2 + name.len() + 1 + OCTET.len() + 1);
    pkt.extend_from_slice(&opcode.to_be_bytes());
    pkt.extend_from_slice(name.as_bytes());
    pkt.push(0);
    pkt.extend_from_slice(OCTET.as_bytes());
    pkt.push(0);
    pkt
}

/// Pull `name` from a TFTP server. Plays the device side of the channel;
/// used by tests and the demo driver.
pub async fn fetch(server: SocketAddr, name: &str) -> io::Result<Vec<u8>> {
    let sock = UdpSocket::bind("0.0.0.0:0").await?;
    sock.send_to(&request_packet(OP_RRQ, name), server).await?;

    let mut data = Vec::new();
    let mut expected: u16 = 1;
    // The server answers from a fresh transfer port; lock onto the first.
    let mut transfer_peer: Option<SocketAddr> = None;
    let mut buf = vec![0u8; 4 + BLOCK_SIZE + 64];
    loop {
        let (n, from) = timeout(REPLY_TIMEOUT, sock.recv_from(&mut buf))
            .await
            .map_err(|_| timeout_error("timed out waiting for DATA"))??;
        let peer = *transfer_peer.get_or_insert(from);
        if from != peer {
            continue;
        }
        if n < 4 {
            return Err(protocol_error("short packet"));
        }
        match u16::from_be_bytes([buf[0], buf[1]]) {
            OP_DATA => {
                let block = u16::from_be_bytes([buf[2], buf[3]]);
                if block != expected {
                    send_ack(&sock, peer, block).await?;
                    continue;
                }
                data.extend_from_slice(&buf[4..n]);
                send_ack(&sock, peer, block).await?;
                if n - 4 < BLOCK_SIZE {
                    return Ok(data);
                }
                expected = expected.wrapping_add(1);
            }
            OP_ERROR => return Err(error_to_io(&buf[..n])),
            _ => return Err(protocol_error("unexpected opcode")),
        }
    }
}

/// Push `name` to a TFTP server. Plays the device side of the channel;
/// used by tests and the demo driver.
pub async fn push(server: SocketAddr, name: &str, data: &[u8]) -> io::Result<()> {
    let sock = UdpSocket::bind("0.0.0.0:0").await?;
    sock.send_to(&request_packet(OP_WRQ, name), server).await?;

    // ACK 0 arrives from the server's fresh transfer port.
    let mut buf = [0u8; 256];
    let (n, peer) = timeout(REPLY_TIMEOUT, sock.recv_from(&mut buf))
        .await
        .map_err(|_| timeout_error("timed out waiting for ACK 0"))??;
    if n >= 4 && u16::from_be_bytes([buf[0], buf[1]]) == OP_ERROR {
        return Err(error_to_io(&buf[..n]));
    }
    if n < 4
        || u16::from_be_bytes([buf[0], buf[1]]) != OP_ACK
        || u16::from_be_bytes([buf[2], buf[3]]) != 0
    {
        return Err(protocol_error("expected ACK 0"));
    }

    let mut block: u16 = 1;
    let mut offset = 0;
    loop {
        let end = (offset + BLOCK_SIZE).min(data.len());
        let chunk = &data[offset..end];

        let mut pkt = Vec::with_capacity(4 + chunk.len());
        pkt.extend_from_slice(&OP_DATA.to_be_bytes());
        pkt.extend_from_slice(&block.to_be_bytes());
        pkt.extend_from_slice(chunk);
        sock.send_to(&pkt, peer).await?;
        wait_ack(&sock, peer, block).await?;

        offset = end;
        if chunk.len() < BLOCK_SIZE {
            return Ok(());
        }
        block = block.wrapping_add(1);
    }
}

fn error_to_io(pkt: &[u8]) -> io::Error {
    let message = pkt
        .get(4..)
        .and_then(|rest| rest.split(|&b| b == 0).next())
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .unwrap_or("unknown error");
    io::Error::other(format!("tftp error: {message}"))
}
