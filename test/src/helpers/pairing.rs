/// Connection choreography between two in-process peers.
use slipstream_core::{ConnectCallbacks, ConnectionId};

use super::TestPeer;

/// Runs the full approval handshake from `initiator` to `responder`,
/// then pumps both sides until every in-flight announcement has
/// landed. Returns the id each side assigned to the other. Lifecycle
/// events raised along the way are consumed; tests that assert on
/// those run the handshake by hand instead.
pub fn establish(
    initiator: &mut TestPeer,
    responder: &mut TestPeer,
) -> (ConnectionId, ConnectionId) {
    let outgoing = initiator
        .systems
        .connect(&responder.address, b"let me in", ConnectCallbacks::new())
        .expect("the id pool should have room for the attempt");
    let mut events = responder.process();
    let approvals = events.take_approvals();
    let (incoming, _) = approvals
        .first()
        .expect("the connect request should surface for approval");
    assert!(responder.systems.approve(*incoming));
    pump_both(initiator, responder, 2);
    (outgoing, *incoming)
}

/// Processes both peers `rounds` times, alternating, so traffic that
/// each frame produces settles before the caller asserts.
pub fn pump_both(a: &mut TestPeer, b: &mut TestPeer, rounds: usize) {
    for _ in 0..rounds {
        a.process();
        b.process();
    }
}
