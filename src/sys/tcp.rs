use std::io;
use std::net::TcpStream;
use std::os::unix::io::AsRawFd;
use tracing::{debug, info};

/// Receive low-water mark set on TCP inputs to cut wake-ups
pub const TCP_RCVLOWAT: libc::c_int = 65536;

/// Connect the stage input to `host:port` instead of stdin
pub fn connect_input(host: &str, port: u16) -> io::Result<TcpStream> {
    info!(host, port, "connecting input socket");
    let stream = TcpStream::connect((host, port))?;

    if let Err(e) = set_rcvlowat(&stream, TCP_RCVLOWAT) {
        debug!("SO_RCVLOWAT not applied: {}", e);
    }
    info!(host, port, "input socket connected");
    Ok(stream)
}

fn set_rcvlowat(stream: &TcpStream, bytes: libc::c_int) -> io::Result<()> {
    // SAFETY: the option value points at a live c_int of the advertised size.
    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVLOWAT,
            &bytes as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
