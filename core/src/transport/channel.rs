use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    rc::Rc,
};

use super::{
    ConnectFailure, ConnectionTransporter, ConnectionlessTransporter, QosType, RecvError,
    SendError, TransportEvent, TransportHandle,
};

const FIRST_PORT: u16 = 49152;

/// In-process loopback network. Every transporter handed out by one
/// `ChannelNetwork` can reach every other through the synthetic socket
/// addresses the hub assigns. Delivery is reliable and in order
/// regardless of the requested qos.
#[derive(Clone, Default)]
pub struct ChannelNetwork {
    state: Rc<RefCell<HubState>>,
}

impl ChannelNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection-oriented endpoint on the hub.
    pub fn transporter(&self) -> ChannelTransporter {
        let address = self.state.borrow_mut().register_endpoint();
        ChannelTransporter {
            state: Rc::clone(&self.state),
            address,
        }
    }

    /// Opens a fire-and-forget endpoint on the hub.
    pub fn connectionless_transporter(&self) -> ChannelConnectionlessTransporter {
        let address = self.state.borrow_mut().register_datagram_endpoint();
        ChannelConnectionlessTransporter {
            state: Rc::clone(&self.state),
            address,
        }
    }
}

pub struct ChannelTransporter {
    state: Rc<RefCell<HubState>>,
    address: SocketAddr,
}

impl ChannelTransporter {
    /// The synthetic address peers use to reach this endpoint.
    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

impl ConnectionTransporter for ChannelTransporter {
    fn connect(
        &mut self,
        address: &SocketAddr,
        payload: &[u8],
    ) -> Result<TransportHandle, SendError> {
        self.state.borrow_mut().connect(self.address, address, payload)
    }

    fn accept(&mut self, handle: TransportHandle) -> Result<(), SendError> {
        self.state.borrow_mut().accept(self.address, handle)
    }

    fn reject(&mut self, handle: TransportHandle) -> Result<(), SendError> {
        self.state.borrow_mut().reject(handle)
    }

    fn disconnect(&mut self, handle: TransportHandle) {
        self.state.borrow_mut().disconnect(handle);
    }

    fn send(
        &mut self,
        handle: TransportHandle,
        _qos: QosType,
        payload: &[u8],
    ) -> Result<(), SendError> {
        self.state.borrow_mut().send(handle, payload)
    }

    fn receive(&mut self) -> Result<Option<TransportEvent>, RecvError> {
        Ok(self.state.borrow_mut().receive(self.address))
    }
}

pub struct ChannelConnectionlessTransporter {
    state: Rc<RefCell<HubState>>,
    address: SocketAddr,
}

impl ChannelConnectionlessTransporter {
    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

impl ConnectionlessTransporter for ChannelConnectionlessTransporter {
    fn send_to(&mut self, address: &SocketAddr, payload: &[u8]) -> Result<(), SendError> {
        self.state
            .borrow_mut()
            .send_datagram(self.address, address, payload);
        Ok(())
    }

    fn receive_from(&mut self) -> Result<Option<(SocketAddr, Box<[u8]>)>, RecvError> {
        Ok(self.state.borrow_mut().receive_datagram(self.address))
    }
}

struct Attempt {
    initiator_address: SocketAddr,
    initiator_handle: u64,
}

struct Link {
    peer_handle: u64,
    peer_address: SocketAddr,
}

struct HubState {
    next_handle: u64,
    next_port: u16,
    endpoints: HashMap<SocketAddr, VecDeque<TransportEvent>>,
    // in-flight attempts, keyed by the handle the responder was given
    attempts: HashMap<u64, Attempt>,
    attempt_of_initiator: HashMap<u64, u64>,
    // both ends of every established link, keyed by each side's handle
    links: HashMap<u64, Link>,
    datagrams: HashMap<SocketAddr, VecDeque<(SocketAddr, Box<[u8]>)>>,
}

impl Default for HubState {
    fn default() -> Self {
        Self {
            next_handle: 0,
            next_port: FIRST_PORT,
            endpoints: HashMap::new(),
            attempts: HashMap::new(),
            attempt_of_initiator: HashMap::new(),
            links: HashMap::new(),
            datagrams: HashMap::new(),
        }
    }
}

impl HubState {
    fn allocate_address(&mut self) -> SocketAddr {
        let port = self.next_port;
        self.next_port = self.next_port.wrapping_add(1);
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    fn allocate_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn register_endpoint(&mut self) -> SocketAddr {
        let address = self.allocate_address();
        self.endpoints.insert(address, VecDeque::new());
        address
    }

    fn register_datagram_endpoint(&mut self) -> SocketAddr {
        let address = self.allocate_address();
        self.datagrams.insert(address, VecDeque::new());
        address
    }

    fn push_event(&mut self, address: SocketAddr, event: TransportEvent) {
        if let Some(queue) = self.endpoints.get_mut(&address) {
            queue.push_back(event);
        }
    }

    fn connect(
        &mut self,
        initiator: SocketAddr,
        target: &SocketAddr,
        payload: &[u8],
    ) -> Result<TransportHandle, SendError> {
        let initiator_handle = self.allocate_handle();
        if !self.endpoints.contains_key(target) {
            self.push_event(
                initiator,
                TransportEvent::ConnectFailed {
                    handle: TransportHandle::new(initiator_handle),
                    reason: ConnectFailure::Unreachable,
                },
            );
            return Ok(TransportHandle::new(initiator_handle));
        }
        let responder_handle = self.allocate_handle();
        self.attempts.insert(
            responder_handle,
            Attempt {
                initiator_address: initiator,
                initiator_handle,
            },
        );
        self.attempt_of_initiator
            .insert(initiator_handle, responder_handle);
        self.push_event(
            *target,
            TransportEvent::ConnectionRequest {
                handle: TransportHandle::new(responder_handle),
                payload: payload.into(),
            },
        );
        Ok(TransportHandle::new(initiator_handle))
    }

    fn accept(
        &mut self,
        responder: SocketAddr,
        handle: TransportHandle,
    ) -> Result<(), SendError> {
        // the attempt may have been withdrawn by the initiator already
        let Some(attempt) = self.attempts.remove(&handle.to_u64()) else {
            return Err(SendError);
        };
        self.attempt_of_initiator.remove(&attempt.initiator_handle);
        self.links.insert(
            attempt.initiator_handle,
            Link {
                peer_handle: handle.to_u64(),
                peer_address: responder,
            },
        );
        self.links.insert(
            handle.to_u64(),
            Link {
                peer_handle: attempt.initiator_handle,
                peer_address: attempt.initiator_address,
            },
        );
        self.push_event(
            attempt.initiator_address,
            TransportEvent::Connected {
                handle: TransportHandle::new(attempt.initiator_handle),
            },
        );
        Ok(())
    }

    fn reject(&mut self, handle: TransportHandle) -> Result<(), SendError> {
        let Some(attempt) = self.attempts.remove(&handle.to_u64()) else {
            return Err(SendError);
        };
        self.attempt_of_initiator.remove(&attempt.initiator_handle);
        self.push_event(
            attempt.initiator_address,
            TransportEvent::ConnectFailed {
                handle: TransportHandle::new(attempt.initiator_handle),
                reason: ConnectFailure::Refused,
            },
        );
        Ok(())
    }

    fn disconnect(&mut self, handle: TransportHandle) {
        let raw = handle.to_u64();
        if let Some(link) = self.links.remove(&raw) {
            self.links.remove(&link.peer_handle);
            self.push_event(
                link.peer_address,
                TransportEvent::Disconnected {
                    handle: TransportHandle::new(link.peer_handle),
                },
            );
            return;
        }
        // withdrawing an attempt leaves the responder's request dangling;
        // its eventual accept or reject reports the failure
        if let Some(responder_handle) = self.attempt_of_initiator.remove(&raw) {
            self.attempts.remove(&responder_handle);
        }
    }

    fn send(&mut self, handle: TransportHandle, payload: &[u8]) -> Result<(), SendError> {
        let (peer_handle, peer_address) = match self.links.get(&handle.to_u64()) {
            Some(link) => (link.peer_handle, link.peer_address),
            None => return Err(SendError),
        };
        self.push_event(
            peer_address,
            TransportEvent::Data {
                handle: TransportHandle::new(peer_handle),
                payload: payload.into(),
            },
        );
        Ok(())
    }

    fn receive(&mut self, address: SocketAddr) -> Option<TransportEvent> {
        self.endpoints
            .get_mut(&address)
            .and_then(|queue| queue.pop_front())
    }

    fn send_datagram(&mut self, from: SocketAddr, target: &SocketAddr, payload: &[u8]) {
        // no listener at the target means the datagram is simply lost
        if let Some(queue) = self.datagrams.get_mut(target) {
            queue.push_back((from, payload.into()));
        }
    }

    fn receive_datagram(&mut self, address: SocketAddr) -> Option<(SocketAddr, Box<[u8]>)> {
        self.datagrams
            .get_mut(&address)
            .and_then(|queue| queue.pop_front())
    }
}
