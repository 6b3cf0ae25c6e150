//! Network-related code, i.e. actually sending queries and receiving answers.

use anyhow::{bail, Context, Result};
use byteorder::{NetworkEndian, WriteBytesExt};
use std::fmt::Display;
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

/// Contains all info needed to connect to a nameserver.
#[derive(Clone, Copy, Debug)]
pub struct Nameserver {
    /// Nameserver's IP address.
    pub ip: IpAddr,
    /// Nameserver's port.
    pub port: u16,
}

impl Nameserver {
    /// Creates a `Nameserver` for the standard DNS port.
    pub fn new(ip: IpAddr) -> Self {
        Self { ip, port: 53 }
    }

    fn socket_addr(&self) -> SocketAddr {
        (self.ip, self.port).into()
    }
}

impl Display for Nameserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // if ip is an IPv6 address, check if it is a mapped IPv4 address. if yes, display the
        // IPv4 address
        match self.ip {
            IpAddr::V6(ipv6) => match ipv6.to_ipv4() {
                Some(ipv4) if ipv4.to_ipv6_mapped() == ipv6 => {
                    write!(f, "{}:{}", ipv4, self.port)
                }
                _ => write!(f, "[{}]:{}", ipv6, self.port),
            },
            _ => write!(f, "{}:{}", self.ip, self.port),
        }
    }
}

/// Sends `data` to the given nameserver over UDP and waits for a single datagram in response.
///
/// `bufsize` caps the response size (the query advertises the same value as its EDNS payload
/// size). `timeout` bounds both the send and the wait for the response.
pub fn send_query_udp(
    nameserver: &Nameserver,
    bufsize: u16,
    timeout: Duration,
    data: &[u8],
) -> Result<(Vec<u8>, Duration)> {
    // match the bind address to the IP version of the nameserver; binding a dual-stack socket and
    // connecting to an IPv4 address misbehaves on some platforms
    let bind_addr = if nameserver.ip.is_ipv6() {
        "::"
    } else {
        "0.0.0.0"
    };
    let socket = UdpSocket::bind((bind_addr, 0)).context("Could not create UDP socket.")?;

    socket
        .set_write_timeout(Some(timeout))
        .context("Could not set UDP socket write timeout.")?;
    socket
        .set_read_timeout(Some(timeout))
        .context("Could not set UDP socket read timeout.")?;

    socket
        .connect(nameserver.socket_addr())
        .context(format!("Could not connect to {} via UDP.", nameserver))?;

    let mut res = vec![0; bufsize as usize];

    let before = Instant::now();
    socket
        .send(data)
        .context("Could not send data to nameserver.")?;

    let bytes_recvd = socket
        .recv(&mut res)
        .context("The nameserver did not reply in time.")?;
    let elapsed = before.elapsed();

    res.truncate(bytes_recvd);

    Ok((res, elapsed))
}

/// Sends `data` to the given nameserver over TCP and reads the length-prefixed response.
///
/// Used as the fallback when a UDP response came back truncated (TC bit set).
pub fn send_query_tcp(
    nameserver: &Nameserver,
    timeout: Duration,
    data: &[u8],
) -> Result<(Vec<u8>, Duration)> {
    let mut socket = TcpStream::connect_timeout(&nameserver.socket_addr(), timeout).context(
        format!("Could not connect to {} via TCP.", nameserver),
    )?;

    socket
        .set_write_timeout(Some(timeout))
        .context("Could not set TCP stream write timeout.")?;
    socket
        .set_read_timeout(Some(timeout))
        .context("Could not set TCP stream read timeout.")?;

    let mut msg = Vec::with_capacity(data.len() + 2);
    msg.write_u16::<NetworkEndian>(data.len() as u16)?;
    msg.extend_from_slice(data);

    let before = Instant::now();
    socket
        .write_all(&msg)
        .context("Could not write data to TCP stream.")?;

    // we can't use socket.read_to_end() because we would have to wait for the read timeout to
    // elapse before getting an EOF from the socket. therefore we stop reading as soon as the
    // received number of bytes equals the message length given by the first two bytes (plus two,
    // because the length prefix does not count itself; see RFC 1035, Section 4.2.2)
    let mut offset = 0;
    let mut res = vec![0; u16::MAX as usize + 2];
    while (offset < 2) || (offset - 2 < u16::from_be_bytes([res[0], res[1]]) as usize) {
        let n = socket
            .read(&mut res[offset..])
            .context("Could not read from TCP stream.")?;
        if n == 0 {
            bail!("TCP stream closed before the full message arrived.");
        }
        offset += n;
    }

    let elapsed = before.elapsed();
    socket.shutdown(std::net::Shutdown::Both).ok();

    let bytes_recvd = u16::from_be_bytes([res[0], res[1]]) as usize;
    if bytes_recvd != offset - 2 {
        bail!(
            "Received {} bytes, but TCP message says {} bytes were sent.",
            offset - 2,
            bytes_recvd
        );
    }
    res.drain(..2);
    res.truncate(bytes_recvd);

    Ok((res, elapsed))
}
