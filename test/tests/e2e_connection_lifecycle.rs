//! Connection lifecycle through the full subsystem: approval requests
//! and their secrets, establishment on both sides, denial, withdrawal,
//! disconnection, and message flow over established connections.

use std::{cell::RefCell, net::SocketAddr, rc::Rc};

use slipstream_core::{
    ChannelNetwork, ConnectCallbacks, ConnectFailure, ConnectionId, MessageError,
};
use slipstream_test::{establish, ChatLine, TestPeer};

// ========== Handshake ==========

#[test]
fn an_approval_request_surfaces_with_its_secret() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);

    alpha
        .systems
        .connect(&beta.address, b"open sesame", ConnectCallbacks::new())
        .unwrap();
    let mut events = beta.process();

    assert_eq!(
        events.take_approvals(),
        vec![(ConnectionId::new(0), b"open sesame".to_vec())]
    );
    // nothing is established until someone approves
    assert!(beta.systems.connections().is_empty());
}

#[test]
fn approval_establishes_both_sides() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let connected = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&connected);
    let outgoing = alpha
        .systems
        .connect(
            &beta.address,
            b"",
            ConnectCallbacks::new().established(move |id| recorder.borrow_mut().push(id)),
        )
        .unwrap();
    let mut events = beta.process();
    let incoming = events.take_approvals()[0].0;

    assert!(beta.systems.approve(incoming));

    let mut alpha_events = alpha.process();
    assert_eq!(alpha_events.take_establishments(), vec![outgoing]);
    assert_eq!(connected.borrow().as_slice(), &[outgoing]);
    assert!(alpha.systems.is_connected(outgoing));

    // the approver hears about it on its next frame
    let mut beta_events = beta.process();
    assert_eq!(beta_events.take_establishments(), vec![incoming]);
    assert!(beta.systems.is_connected(incoming));
}

#[test]
fn denial_reports_refused_and_establishes_nothing() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let failures = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&failures);
    let outgoing = alpha
        .systems
        .connect(
            &beta.address,
            b"",
            ConnectCallbacks::new().failed(move |id, reason| {
                recorder.borrow_mut().push((id, reason));
            }),
        )
        .unwrap();
    let mut events = beta.process();
    let incoming = events.take_approvals()[0].0;

    beta.systems.deny(incoming);
    let mut alpha_events = alpha.process();

    assert!(alpha_events.is_empty());
    assert_eq!(
        failures.borrow().as_slice(),
        &[(outgoing, ConnectFailure::Refused)]
    );
    assert!(!alpha.systems.is_connected(outgoing));
    assert!(alpha.systems.connections().is_empty());
    assert!(beta.systems.connections().is_empty());
}

#[test]
fn a_withdrawn_attempt_resolves_without_a_trace() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let touched = Rc::new(RefCell::new(Vec::<&'static str>::new()));
    let on_ok = Rc::clone(&touched);
    let on_err = Rc::clone(&touched);
    let on_gone = Rc::clone(&touched);
    let outgoing = alpha
        .systems
        .connect(
            &beta.address,
            b"",
            ConnectCallbacks::new()
                .established(move |_| on_ok.borrow_mut().push("established"))
                .failed(move |_, _| on_err.borrow_mut().push("failed"))
                .disconnected(move |_| on_gone.borrow_mut().push("disconnected")),
        )
        .unwrap();
    let mut events = beta.process();
    let incoming = events.take_approvals()[0].0;

    alpha.systems.cancel_pending(outgoing);
    // the approval races the withdrawal and loses
    assert!(!beta.systems.approve(incoming));

    let mut alpha_events = alpha.process();
    assert!(alpha_events.is_empty());
    let mut beta_events = beta.process();
    assert!(beta_events.is_empty());
    assert!(touched.borrow().is_empty());
    assert!(alpha.systems.connections().is_empty());
    assert!(beta.systems.connections().is_empty());
}

#[test]
fn disconnecting_tears_down_both_sides() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let (outgoing, incoming) = establish(&mut alpha, &mut beta);

    alpha.systems.disconnect(outgoing);

    let mut alpha_events = alpha.process();
    assert_eq!(alpha_events.take_disconnections(), vec![outgoing]);
    let mut beta_events = beta.process();
    assert_eq!(beta_events.take_disconnections(), vec![incoming]);
    assert!(!alpha.systems.is_connected(outgoing));
    assert!(!beta.systems.is_connected(incoming));
}

// ========== Messages ==========

#[test]
fn messages_flow_both_ways_with_the_senders_id() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let (outgoing, incoming) = establish(&mut alpha, &mut beta);
    let alpha_saw = Rc::new(RefCell::new(Vec::new()));
    let beta_saw = Rc::new(RefCell::new(Vec::new()));
    let alpha_recorder = Rc::clone(&alpha_saw);
    let beta_recorder = Rc::clone(&beta_saw);
    alpha.systems.on_message::<ChatLine>(move |meta, message| {
        alpha_recorder
            .borrow_mut()
            .push((meta.sender, message.text.clone()));
    });
    beta.systems.on_message::<ChatLine>(move |meta, message| {
        beta_recorder
            .borrow_mut()
            .push((meta.sender, message.text.clone()));
    });

    alpha
        .systems
        .send_message(
            outgoing,
            &ChatLine {
                text: "hello out there".into(),
            },
        )
        .unwrap();
    beta.process();
    beta.systems
        .send_message(
            incoming,
            &ChatLine {
                text: "loud and clear".into(),
            },
        )
        .unwrap();
    alpha.process();

    assert_eq!(
        beta_saw.borrow().as_slice(),
        &[(incoming, "hello out there".to_string())]
    );
    assert_eq!(
        alpha_saw.borrow().as_slice(),
        &[(outgoing, "loud and clear".to_string())]
    );
}

#[test]
fn broadcasts_reach_every_established_peer() {
    let network = ChannelNetwork::new();
    let mut hub = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let mut gamma = TestPeer::new(&network);
    establish(&mut beta, &mut hub);
    establish(&mut gamma, &mut hub);
    let beta_saw = Rc::new(RefCell::new(Vec::new()));
    let gamma_saw = Rc::new(RefCell::new(Vec::new()));
    let beta_recorder = Rc::clone(&beta_saw);
    let gamma_recorder = Rc::clone(&gamma_saw);
    beta.systems.on_message::<ChatLine>(move |_, message| {
        beta_recorder.borrow_mut().push(message.text.clone());
    });
    gamma.systems.on_message::<ChatLine>(move |_, message| {
        gamma_recorder.borrow_mut().push(message.text.clone());
    });

    hub.systems
        .broadcast_message(&ChatLine {
            text: "all hands".into(),
        })
        .unwrap();
    beta.process();
    gamma.process();

    assert_eq!(beta_saw.borrow().as_slice(), &["all hands".to_string()]);
    assert_eq!(gamma_saw.borrow().as_slice(), &["all hands".to_string()]);
}

#[test]
fn messages_to_strangers_are_errors() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);

    let result = alpha
        .systems
        .send_message(ConnectionId::new(5), &ChatLine::default());

    assert_eq!(result, Err(MessageError::NotConnected { connection: 5 }));
}

// ========== Connectionless ==========

#[test]
fn connectionless_messages_arrive_with_no_sender_id() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let alpha_endpoint = network.connectionless_transporter();
    let alpha_address = alpha_endpoint.address();
    alpha
        .systems
        .set_connectionless_transporter(Box::new(alpha_endpoint));
    let beta_endpoint = network.connectionless_transporter();
    let beta_address = beta_endpoint.address();
    beta.systems
        .set_connectionless_transporter(Box::new(beta_endpoint));
    let seen: Rc<RefCell<Vec<(ConnectionId, Option<SocketAddr>, String)>>> =
        Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&seen);
    beta.systems.on_message::<ChatLine>(move |meta, message| {
        recorder
            .borrow_mut()
            .push((meta.sender, meta.endpoint, message.text.clone()));
    });

    alpha
        .systems
        .send_connectionless(
            &beta_address,
            &ChatLine {
                text: "anyone there".into(),
            },
        )
        .unwrap();
    beta.process();

    assert_eq!(
        seen.borrow().as_slice(),
        &[(
            ConnectionId::NO_CONNECTION,
            Some(alpha_address),
            "anyone there".to_string(),
        )]
    );
}

#[test]
fn sending_connectionless_without_a_transporter_is_an_error() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let somewhere: SocketAddr = "127.0.0.1:49999".parse().unwrap();

    let result = alpha
        .systems
        .send_connectionless(&somewhere, &ChatLine::default());

    assert_eq!(result, Err(MessageError::NoConnectionlessTransport));
}
