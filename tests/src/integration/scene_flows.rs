//! # Scene Flows
//!
//! Entity-scoped delivery over a scene that changes between and during
//! calls.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{Journal, OnDamage, World};
    use fanout_core::{DispatchError, MessagingApi, NodeId};
    use proptest::prelude::*;

    fn damage(world: &World, node: NodeId, include_disabled: bool) -> usize {
        world
            .messenger
            .execute_with_arg::<dyn OnDamage, u32, _>(node, &1, include_disabled, |r, amount| {
                r.on_damage(*amount)
            })
            .expect("no failing receivers")
    }

    fn names(journal: &Journal) -> Vec<String> {
        journal
            .take()
            .into_iter()
            .map(|entry| entry.split(':').next().unwrap_or_default().to_string())
            .collect()
    }

    // =========================================================================
    // DIRECT AND SUBTREE DELIVERY
    // =========================================================================

    #[test]
    fn test_execute_reaches_only_direct_receivers() {
        let world = World::new();
        let root = world.node("root", None);
        let child = world.node("child", Some(root));
        world.actor(root, "r1");
        world.actor(root, "r2");
        world.actor(child, "c1");

        assert_eq!(damage(&world, root, false), 2);
        assert_eq!(names(&world.journal), vec!["r1", "r2"]);
    }

    #[test]
    fn test_execute_on_node_without_receivers() {
        let world = World::new();
        let empty = world.node("empty", None);
        assert_eq!(damage(&world, empty, true), 0);
        assert_eq!(damage(&world, NodeId(u64::MAX), true), 0);
    }

    #[test]
    fn test_broadcast_skips_inactive_branch() {
        let world = World::new();
        let root = world.node("root", None);
        let hud = world.node("hud", Some(root));
        let menu = world.node("menu", Some(root));
        world.actor(root, "root");
        world.actor(hud, "hud");
        world.actor(menu, "menu");
        world.scene.set_active(hud, false).expect("known");

        let delivered = world
            .messenger
            .broadcast::<dyn OnDamage, _>(root, false, false, |r| r.on_damage(5))
            .expect("ok");
        assert_eq!(delivered, 2);
        assert_eq!(names(&world.journal), vec!["root", "menu"]);

        let delivered = world
            .messenger
            .broadcast::<dyn OnDamage, _>(root, true, true, |r| r.on_damage(5))
            .expect("ok");
        assert_eq!(delivered, 3);
        assert_eq!(names(&world.journal), vec!["root", "hud", "menu"]);
    }

    #[test]
    fn test_broadcast_from_inactive_root_delivers_nothing() {
        let world = World::new();
        let root = world.node("root", None);
        world.actor(root, "root");
        world.scene.set_active(root, false).expect("known");

        let delivered = world
            .messenger
            .broadcast::<dyn OnDamage, _>(root, false, true, |r| r.on_damage(1))
            .expect("ok");
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_execute_upwards_stops_at_root() {
        let world = World::new();
        let world_root = world.node("world", None);
        let room = world.node("room", Some(world_root));
        let chair = world.node("chair", Some(room));
        world.actor(world_root, "world");
        world.actor(room, "room");
        world.actor(chair, "chair");

        let delivered = world
            .messenger
            .execute_upwards::<dyn OnDamage, _>(chair, false, |r| r.on_damage(2))
            .expect("ok");

        assert_eq!(delivered, 3);
        assert_eq!(names(&world.journal), vec!["chair", "room", "world"]);
    }

    #[test]
    fn test_execute_upwards_follows_reparenting() {
        let world = World::new();
        let a = world.node("a", None);
        let b = world.node("b", None);
        let leaf = world.node("leaf", Some(a));
        world.actor(a, "a");
        world.actor(b, "b");
        world.scene.set_parent(leaf, Some(b)).expect("no cycle");

        world
            .messenger
            .execute_upwards::<dyn OnDamage, _>(leaf, false, |r| r.on_damage(1))
            .expect("ok");
        assert_eq!(names(&world.journal), vec!["b"]);
    }

    // =========================================================================
    // LIVENESS CHANGES DURING DELIVERY
    // =========================================================================

    #[test]
    fn test_handler_disabling_peer_prevents_its_delivery() {
        let world = World::new();
        let node = world.node("squad", None);
        world.actor(node, "leader");
        let (_, follower) = world.actor(node, "follower");

        world
            .messenger
            .execute::<dyn OnDamage, _>(node, false, |r| {
                world.scene.set_enabled(follower, false)?;
                r.on_damage(1)
            })
            .expect("ok");

        assert_eq!(names(&world.journal), vec!["leader"]);
        assert_eq!(damage(&world, node, true), 2);
    }

    #[test]
    fn test_local_failure_aborts_and_propagates() {
        let world = World::new();
        let node = world.node("squad", None);
        world.actor(node, "first");
        let (broken, _) = world.actor(node, "broken");
        world.actor(node, "last");
        broken.fail();

        let result = world
            .messenger
            .execute::<dyn OnDamage, _>(node, false, |r| r.on_damage(9));

        match result {
            Err(DispatchError::Receiver { source, .. }) => {
                assert!(source.to_string().contains("broken refused"));
            }
            other => panic!("expected receiver failure, got {other:?}"),
        }
        assert_eq!(names(&world.journal), vec!["first"]);
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Upward delivery equals `execute` at each ancestor in turn.
        #[test]
        fn test_upwards_equals_execute_per_ancestor(
            parents in prop::collection::vec(any::<prop::sample::Index>(), 1..24),
            start in any::<prop::sample::Index>(),
        ) {
            let world = World::new();
            let mut nodes = vec![world.node("n0", None)];
            for (i, parent) in parents.iter().enumerate() {
                let parent = nodes[parent.index(nodes.len())];
                nodes.push(world.node(&format!("n{}", i + 1), Some(parent)));
            }
            for (i, node) in nodes.iter().enumerate() {
                if i % 3 != 1 {
                    world.actor(*node, format!("n{i}"));
                }
            }
            let start = nodes[start.index(nodes.len())];

            let upwards = world
                .messenger
                .execute_upwards::<dyn OnDamage, _>(start, false, |r| r.on_damage(1))
                .expect("ok");
            let recorded = world.journal.take();

            let mut stepwise = 0;
            let mut current = Some(start);
            while let Some(node) = current {
                stepwise += damage(&world, node, false);
                current = world.scene.parent_of(node);
            }

            prop_assert_eq!(upwards, stepwise);
            prop_assert_eq!(recorded, world.journal.take());
        }
    }
}
