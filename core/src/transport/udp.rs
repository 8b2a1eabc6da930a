use std::{
    io::{self, ErrorKind},
    net::{SocketAddr, UdpSocket},
};

use super::{ConnectionlessTransporter, RecvError, SendError, MTU_BYTES};

/// Connectionless transporter over a nonblocking UDP socket.
pub struct UdpConnectionlessTransporter {
    socket: UdpSocket,
    buffer: [u8; MTU_BYTES],
}

impl UdpConnectionlessTransporter {
    pub fn bind(address: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(address)?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            buffer: [0; MTU_BYTES],
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl ConnectionlessTransporter for UdpConnectionlessTransporter {
    fn send_to(&mut self, address: &SocketAddr, payload: &[u8]) -> Result<(), SendError> {
        if payload.len() > MTU_BYTES {
            return Err(SendError);
        }
        self.socket
            .send_to(payload, address)
            .map(|_| ())
            .map_err(|_| SendError)
    }

    fn receive_from(&mut self) -> Result<Option<(SocketAddr, Box<[u8]>)>, RecvError> {
        match self.socket.recv_from(&mut self.buffer) {
            Ok((length, address)) => Ok(Some((address, Box::from(&self.buffer[..length])))),
            Err(error) if error.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(_) => Err(RecvError),
        }
    }
}
