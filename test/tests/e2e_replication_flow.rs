//! End-to-end object replication between two in-process peers:
//! creation and deletion announcements, late joiner catch-up, spawn
//! message replay, role-gated object messages, and departure cleanup.

use std::{cell::RefCell, rc::Rc};

use slipstream_core::{
    ChannelNetwork, EntityFactory, NetworkConfig, ObjectId, ObjectRole, ObjectType, Quaternion,
    StoreError, UnknownObjectType, Vec3,
};
use slipstream_test::{crate_type, establish, pump_both, SetLabel, SetVelocity, TestPeer};

#[derive(Default)]
struct ObjectTraffic {
    velocities: RefCell<Vec<(u32, Vec3)>>,
    labels: RefCell<Vec<(u32, String)>>,
}

/// Wires the crate object type with recording handlers on the replica
/// side of the role gate.
fn wire_replica_handlers(peer: &mut TestPeer) -> Rc<ObjectTraffic> {
    let traffic = Rc::new(ObjectTraffic::default());
    let outer = Rc::clone(&traffic);
    peer.systems.register_object_type(crate_type(), move |router| {
        let velocities = Rc::clone(&outer);
        let labels = Rc::clone(&outer);
        router
            .on::<SetVelocity>(ObjectRole::NonAuthoritive, move |entity, _, message| {
                velocities
                    .velocities
                    .borrow_mut()
                    .push((entity, message.velocity));
            })
            .on::<SetLabel>(ObjectRole::NonAuthoritive, move |entity, _, message| {
                labels
                    .labels
                    .borrow_mut()
                    .push((entity, message.label.clone()));
            });
    });
    traffic
}

/// Wires one handler per role so a test can observe which side of the
/// gate fired.
fn wire_both_role_sinks(peer: &mut TestPeer) -> (Rc<RefCell<Vec<u32>>>, Rc<RefCell<Vec<u32>>>) {
    let authority_hits = Rc::new(RefCell::new(Vec::new()));
    let replica_hits = Rc::new(RefCell::new(Vec::new()));
    let on_authority = Rc::clone(&authority_hits);
    let on_replica = Rc::clone(&replica_hits);
    peer.systems.register_object_type(crate_type(), move |router| {
        let on_authority = Rc::clone(&on_authority);
        let on_replica = Rc::clone(&on_replica);
        router
            .on::<SetVelocity>(ObjectRole::Authority, move |entity, _, _| {
                on_authority.borrow_mut().push(entity);
            })
            .on::<SetVelocity>(ObjectRole::NonAuthoritive, move |entity, _, _| {
                on_replica.borrow_mut().push(entity);
            });
    });
    (authority_hits, replica_hits)
}

// ========== Creation ==========

#[test]
fn creating_an_object_spawns_a_replica_on_every_peer() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    establish(&mut alpha, &mut beta);

    let entity = alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::IDENTITY,
        )
        .unwrap();

    let mut events = beta.process();
    let spawned = events.take_spawned();
    assert_eq!(spawned.len(), 1);
    let (object_id, replica) = spawned[0];
    assert_eq!(object_id, ObjectId::new(42));
    assert_eq!(alpha.systems.entity(object_id), Some(entity));
    assert_eq!(beta.systems.entity(object_id), Some(replica));
    assert_eq!(alpha.systems.object_role(object_id), Some(ObjectRole::Authority));
    assert_eq!(
        beta.systems.object_role(object_id),
        Some(ObjectRole::NonAuthoritive)
    );
    let record = beta.systems.object_store().record(object_id).unwrap();
    assert_eq!(record.position(), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn late_joining_peers_catch_up_on_existing_objects() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();

    establish(&mut alpha, &mut beta);

    assert!(beta.systems.entity(ObjectId::new(42)).is_some());
    assert_eq!(
        beta.systems.object_role(ObjectId::new(42)),
        Some(ObjectRole::NonAuthoritive)
    );
    assert_eq!(beta.factory.spawned.len(), 1);
}

#[test]
fn spawn_messages_replay_before_the_replica_goes_live() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let traffic = wire_replica_handlers(&mut beta);
    alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();
    let sender = alpha.systems.object_sender(ObjectId::new(42)).unwrap();
    alpha
        .systems
        .buffer_spawn_message(
            sender,
            &SetLabel {
                label: "crate-alpha".into(),
            },
        )
        .unwrap();

    establish(&mut alpha, &mut beta);

    let replica = beta.systems.entity(ObjectId::new(42)).unwrap();
    assert_eq!(
        traffic.labels.borrow().as_slice(),
        &[(replica, "crate-alpha".to_string())]
    );
}

#[test]
fn creating_an_unknown_type_locally_fails() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);

    let result = alpha.systems.create_object(
        &mut alpha.factory,
        ObjectType::new(9),
        ObjectId::new(1),
        Vec3::ZERO,
        Quaternion::IDENTITY,
    );

    assert_eq!(
        result,
        Err(StoreError::UnknownType(UnknownObjectType { object_type: 9 }))
    );
    assert!(alpha.systems.entity(ObjectId::new(1)).is_none());
}

#[test]
fn an_unknown_type_from_a_peer_degrades_to_a_dropped_announcement() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    establish(&mut alpha, &mut beta);

    // this factory accepts types beta has no recipe for
    struct Omniscient {
        next: u32,
    }
    impl EntityFactory<u32> for Omniscient {
        fn instantiate(
            &mut self,
            _object_type: ObjectType,
            _object_id: ObjectId,
            _role: ObjectRole,
            _position: Vec3,
            _rotation: Quaternion,
        ) -> Result<u32, UnknownObjectType> {
            let entity = self.next;
            self.next += 1;
            Ok(entity)
        }

        fn destroy(&mut self, _entity: u32) {}
    }
    let mut omniscient = Omniscient { next: 1 };
    alpha
        .systems
        .create_object(
            &mut omniscient,
            ObjectType::new(9),
            ObjectId::new(5),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();

    let mut events = beta.process();

    assert!(events.take_spawned().is_empty());
    assert!(beta.systems.entity(ObjectId::new(5)).is_none());
    assert!(alpha.systems.entity(ObjectId::new(5)).is_some());
}

#[test]
fn the_store_honors_its_configured_capacity() {
    let network = ChannelNetwork::new();
    let config = NetworkConfig {
        max_objects: 1,
        ..Default::default()
    };
    let mut alpha = TestPeer::with_config(&network, config);
    alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(1),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();

    let result = alpha.systems.create_object(
        &mut alpha.factory,
        crate_type(),
        ObjectId::new(2),
        Vec3::ZERO,
        Quaternion::IDENTITY,
    );

    assert_eq!(result, Err(StoreError::CapacityExceeded { capacity: 1 }));
}

// ========== Object messages ==========

#[test]
fn object_broadcasts_reach_replica_handlers() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let traffic = wire_replica_handlers(&mut beta);
    establish(&mut alpha, &mut beta);
    alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();
    beta.process();
    let replica = beta.systems.entity(ObjectId::new(42)).unwrap();

    let sender = alpha.systems.object_sender(ObjectId::new(42)).unwrap();
    alpha
        .systems
        .broadcast_object_message(
            sender,
            &SetVelocity {
                velocity: Vec3::new(0.0, -1.0, 0.0),
            },
        )
        .unwrap();
    beta.process();

    assert_eq!(
        traffic.velocities.borrow().as_slice(),
        &[(replica, Vec3::new(0.0, -1.0, 0.0))]
    );
}

#[test]
fn handlers_fire_only_for_the_local_role() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let (alpha_authority, alpha_replica) = wire_both_role_sinks(&mut alpha);
    let (beta_authority, beta_replica) = wire_both_role_sinks(&mut beta);
    let (_, incoming) = establish(&mut alpha, &mut beta);
    let entity = alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();
    beta.process();
    let replica = beta.systems.entity(ObjectId::new(42)).unwrap();

    // owner to replicas: only beta's replica handler may fire
    let from_alpha = alpha.systems.object_sender(ObjectId::new(42)).unwrap();
    alpha
        .systems
        .broadcast_object_message(from_alpha, &SetVelocity::default())
        .unwrap();
    beta.process();

    // replica back to the owner: only alpha's authority handler may fire
    let from_beta = beta.systems.object_sender(ObjectId::new(42)).unwrap();
    beta.systems
        .send_object_message(incoming, from_beta, &SetVelocity::default())
        .unwrap();
    alpha.process();

    assert_eq!(alpha_authority.borrow().as_slice(), &[entity]);
    assert!(alpha_replica.borrow().is_empty());
    assert_eq!(beta_replica.borrow().as_slice(), &[replica]);
    assert!(beta_authority.borrow().is_empty());
}

#[test]
fn messages_for_a_dead_object_drop_quietly() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let traffic = wire_replica_handlers(&mut beta);
    establish(&mut alpha, &mut beta);
    alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();
    beta.process();
    let sender = alpha.systems.object_sender(ObjectId::new(42)).unwrap();
    assert!(alpha.systems.destroy_object(&mut alpha.factory, ObjectId::new(42)));
    pump_both(&mut alpha, &mut beta, 1);

    // the handle outlived its object; sends succeed without traffic
    let result = alpha
        .systems
        .broadcast_object_message(sender, &SetVelocity::default());

    assert_eq!(result, Ok(()));
    assert!(alpha.systems.object_sender(ObjectId::new(42)).is_none());
    pump_both(&mut alpha, &mut beta, 1);
    assert!(traffic.velocities.borrow().is_empty());
}

// ========== Deletion ==========

#[test]
fn deletions_propagate_to_replicas() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    establish(&mut alpha, &mut beta);
    let entity = alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();
    beta.process();
    let replica = beta.systems.entity(ObjectId::new(42)).unwrap();

    assert!(alpha.systems.destroy_object(&mut alpha.factory, ObjectId::new(42)));

    assert_eq!(alpha.factory.destroyed, vec![entity]);
    let mut events = beta.process();
    assert_eq!(events.take_removed(), vec![(ObjectId::new(42), replica)]);
    assert!(beta.systems.entity(ObjectId::new(42)).is_none());
    assert_eq!(beta.factory.destroyed, vec![replica]);
}

#[test]
fn destroying_a_replica_stays_local() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    establish(&mut alpha, &mut beta);
    alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();
    beta.process();

    assert!(beta.systems.destroy_object(&mut beta.factory, ObjectId::new(42)));
    pump_both(&mut alpha, &mut beta, 2);

    // no deletion went on the wire, the authority side keeps its object
    assert!(beta.systems.entity(ObjectId::new(42)).is_none());
    assert!(alpha.systems.entity(ObjectId::new(42)).is_some());
}

#[test]
fn a_departed_peers_objects_are_purged() {
    let network = ChannelNetwork::new();
    let mut alpha = TestPeer::new(&network);
    let mut beta = TestPeer::new(&network);
    let (outgoing, incoming) = establish(&mut alpha, &mut beta);
    let entity = alpha
        .systems
        .create_object(
            &mut alpha.factory,
            crate_type(),
            ObjectId::new(42),
            Vec3::ZERO,
            Quaternion::IDENTITY,
        )
        .unwrap();
    beta.process();
    let replica = beta.systems.entity(ObjectId::new(42)).unwrap();

    alpha.systems.disconnect(outgoing);
    let mut events = beta.process();

    assert_eq!(events.take_disconnections(), vec![incoming]);
    assert_eq!(events.take_removed(), vec![(ObjectId::new(42), replica)]);
    assert!(beta.systems.entity(ObjectId::new(42)).is_none());
    assert_eq!(beta.factory.destroyed, vec![replica]);
    // the departed side still owns its original object
    assert_eq!(alpha.systems.entity(ObjectId::new(42)), Some(entity));
}
