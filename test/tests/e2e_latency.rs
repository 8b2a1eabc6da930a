//! Round-trip measurement through the ping pump: latency reads zero
//! until an echo resolves, samples land per connection, and teardown
//! clears them.

use std::{thread, time::Duration};

use slipstream_core::{ChannelNetwork, ConnectionId};
use slipstream_test::{establish, TestPeer};

#[test]
fn latency_is_zero_before_any_echo() {
    let network = ChannelNetwork::new();
    let alpha = TestPeer::new(&network);

    assert_eq!(alpha.systems.latency(ConnectionId::new(0)), 0.0);
    assert_eq!(alpha.systems.latency(ConnectionId::LOCAL), 0.0);
    assert_eq!(alpha.systems.latency(ConnectionId::NO_CONNECTION), 0.0);
}

#[test]
fn ping_echoes_resolve_into_latency_samples() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let (outgoing, incoming) = establish(&mut alpha, &mut beta);

    alpha.systems.send_pings(16.6, 20.0);
    // give the round trip a measurable duration
    thread::sleep(Duration::from_millis(5));
    beta.process();
    alpha.process();

    assert!(alpha.systems.latency(outgoing) > 0.0);
    // the responder never probed, so it holds no sample
    assert_eq!(beta.systems.latency(incoming), 0.0);
}

#[test]
fn disconnection_clears_the_sample() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let (outgoing, _) = establish(&mut alpha, &mut beta);
    alpha.systems.send_pings(0.0, 0.0);
    thread::sleep(Duration::from_millis(2));
    beta.process();
    alpha.process();
    assert!(alpha.systems.latency(outgoing) > 0.0);

    alpha.systems.disconnect(outgoing);

    assert_eq!(alpha.systems.latency(outgoing), 0.0);
}
