/// One in-process peer: a full networking subsystem over the channel
/// transport, plus the factory it builds entities through.
use std::net::SocketAddr;

use slipstream_core::{ChannelNetwork, Events, NetworkConfig, NetworkSystems};

use crate::{test_protocol, TestFactory};

pub struct TestPeer {
    pub systems: NetworkSystems<u32>,
    pub factory: TestFactory,
    pub address: SocketAddr,
}

impl TestPeer {
    pub fn new(network: &ChannelNetwork) -> Self {
        Self::with_config(network, NetworkConfig::default())
    }

    pub fn with_config(network: &ChannelNetwork, config: NetworkConfig) -> Self {
        let transporter = network.transporter();
        let address = transporter.address();
        let systems = NetworkSystems::new(config, test_protocol::protocol(), Box::new(transporter));
        Self {
            systems,
            factory: TestFactory::new(),
            address,
        }
    }

    /// One frame: drain the transports and dispatch everything queued.
    pub fn process(&mut self) -> Events<u32> {
        self.systems.process(&mut self.factory)
    }
}
