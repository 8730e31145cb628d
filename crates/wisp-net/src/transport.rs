//! std::net implementation of `SocketTransport`
//!
//! Streams live in a handle table and are kept in non-blocking mode so the
//! poller can retry receives without parking on the socket.

use crate::config::{KeepaliveConfig, NetConfig};
use crate::handles::SocketHandle;
use crate::stack::{RecvFlags, SocketTransport};
use dashmap::DashMap;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

/// TCP sockets backed by `std::net::TcpStream`.
pub struct TcpTransport {
    streams: DashMap<i32, TcpStream>,
    next_handle: AtomicI32,
    connect_timeout: Duration,
    keepalive: KeepaliveConfig,
}

impl TcpTransport {
    /// Create a transport with explicit connect timeout and socket options
    pub fn new(connect_timeout: Duration, keepalive: KeepaliveConfig) -> Self {
        Self {
            streams: DashMap::new(),
            next_handle: AtomicI32::new(1),
            connect_timeout,
            keepalive,
        }
    }

    /// Create a transport from the extension configuration
    pub fn from_config(config: &NetConfig) -> Self {
        Self::new(config.connect_timeout(), config.keepalive.clone())
    }

    /// Number of open streams
    pub fn open_count(&self) -> usize {
        self.streams.len()
    }

    fn unknown(handle: SocketHandle) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unknown socket handle {}", handle),
        )
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::from_config(&NetConfig::default())
    }
}

impl SocketTransport for TcpTransport {
    fn resolve(&self, host: &str, port: u16) -> Option<SocketAddr> {
        match (host, port).to_socket_addrs() {
            Ok(addrs) => {
                let addrs: Vec<SocketAddr> = addrs.collect();
                addrs
                    .iter()
                    .find(|a| a.is_ipv4())
                    .or_else(|| addrs.first())
                    .copied()
            }
            Err(e) => {
                log::debug!("resolve {}:{} failed: {}", host, port, e);
                None
            }
        }
    }

    fn connect(&self, addr: SocketAddr) -> io::Result<SocketHandle> {
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)?;
        stream.set_nonblocking(true)?;

        if self.keepalive.enabled {
            if let Err(e) = apply_keepalive(&stream, &self.keepalive) {
                log::warn!("keep-alive on {} not applied: {}", addr, e);
            }
        }
        if self.keepalive.no_delay {
            if let Err(e) = stream.set_nodelay(true) {
                log::warn!("no-delay on {} not applied: {}", addr, e);
            }
        }

        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.streams.insert(raw, stream);
        Ok(SocketHandle::from_raw(raw))
    }

    fn send(&self, handle: SocketHandle, data: &[u8]) -> io::Result<usize> {
        let entry = self
            .streams
            .get(&handle.as_raw())
            .ok_or_else(|| Self::unknown(handle))?;
        let mut stream: &TcpStream = entry.value();

        // Blocking for the duration of the write so partial sends finish.
        stream.set_nonblocking(false)?;
        let result = stream.write_all(data);
        stream.set_nonblocking(true)?;
        result.map(|()| data.len())
    }

    fn recv(&self, handle: SocketHandle, buf: &mut [u8], flags: RecvFlags) -> io::Result<usize> {
        let entry = self
            .streams
            .get(&handle.as_raw())
            .ok_or_else(|| Self::unknown(handle))?;
        let mut stream: &TcpStream = entry.value();

        if !flags.dont_wait {
            stream.set_nonblocking(false)?;
        }
        let result = if flags.peek {
            stream.peek(buf)
        } else {
            stream.read(buf)
        };
        if !flags.dont_wait {
            stream.set_nonblocking(true)?;
        }
        result
    }

    fn close(&self, handle: SocketHandle) -> io::Result<()> {
        let (_, stream) = self
            .streams
            .remove(&handle.as_raw())
            .ok_or_else(|| Self::unknown(handle))?;
        match stream.shutdown(Shutdown::Read) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
#[cfg_attr(not(target_os = "linux"), allow(unused_variables))]
fn apply_keepalive(stream: &TcpStream, config: &KeepaliveConfig) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = stream.as_raw_fd();
    set_int_option(fd, libc::SOL_SOCKET, libc::SO_KEEPALIVE, 1)?;
    #[cfg(target_os = "linux")]
    {
        let tcp = libc::IPPROTO_TCP;
        set_int_option(fd, tcp, libc::TCP_KEEPIDLE, config.idle_secs as libc::c_int)?;
        set_int_option(fd, tcp, libc::TCP_KEEPINTVL, config.interval_secs as libc::c_int)?;
        set_int_option(fd, tcp, libc::TCP_KEEPCNT, config.count as libc::c_int)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_keepalive(_stream: &TcpStream, _config: &KeepaliveConfig) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_int_option(
    fd: libc::c_int,
    level: libc::c_int,
    name: libc::c_int,
    value: libc::c_int,
) -> io::Result<()> {
    // SAFETY: `value` outlives the call and the length matches its type
    let ret = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
