//! # Registry Flows
//!
//! The global registry driven through `MessagingApi`, with receivers whose
//! lifecycle is owned by a live scene.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{Actor, OnDamage, OnSave, World};
    use fanout_core::{DispatchError, DispatchState, MessagingApi, ReceiverKey};
    use std::cell::Cell;
    use std::rc::Rc;

    fn save_all(world: &World) -> fanout_core::DispatchReport {
        world
            .messenger
            .broadcast_global::<dyn OnSave, _>(|r| r.on_save())
            .expect("not re-entrant")
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    #[test]
    fn test_two_registrations_both_delivered() {
        let world = World::new();
        let (a, _) = world.loose_actor("a");
        let (b, _) = world.loose_actor("b");
        world.messenger.register_global::<dyn OnSave>(a).expect("live");
        world.messenger.register_global::<dyn OnSave>(b).expect("live");

        let report = save_all(&world);

        let mut entries = world.journal.take();
        entries.sort();
        assert_eq!(entries, vec!["a:save", "b:save"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(world.messenger.hub().count::<dyn OnSave>(), 2);
    }

    #[test]
    fn test_register_then_unregister_restores_count() {
        let world = World::new();
        let (a, key) = world.loose_actor("a");
        let hub = world.messenger.hub();

        assert!(world.messenger.register_global::<dyn OnSave>(a.clone()).expect("live"));
        assert!(!world.messenger.register_global::<dyn OnSave>(a).expect("live"));
        assert_eq!(hub.count::<dyn OnSave>(), 1);

        assert!(world.messenger.unregister_global::<dyn OnSave>(key));
        assert!(!world.messenger.unregister_global::<dyn OnSave>(key));
        assert_eq!(hub.count::<dyn OnSave>(), 0);
    }

    #[test]
    fn test_capabilities_are_independent() {
        let world = World::new();
        let (a, key) = world.loose_actor("a");
        world.messenger.register_global::<dyn OnSave>(a.clone()).expect("live");
        world.messenger.register_global::<dyn OnDamage>(a).expect("live");

        world.messenger.unregister_global::<dyn OnSave>(key);

        assert_eq!(world.messenger.hub().count::<dyn OnSave>(), 0);
        assert_eq!(world.messenger.hub().count::<dyn OnDamage>(), 1);
    }

    // =========================================================================
    // MUTATION DURING DISPATCH
    // =========================================================================

    #[test]
    fn test_register_during_dispatch_visible_next_time() {
        let world = World::new();
        let (a, _) = world.loose_actor("a");
        let (c, _) = world.loose_actor("c");
        world.messenger.register_global::<dyn OnSave>(a).expect("live");
        let pending = Cell::new(Some(c));

        world
            .messenger
            .broadcast_global::<dyn OnSave, _>(|r| {
                if let Some(c) = pending.take() {
                    world.messenger.register_global::<dyn OnSave>(c)?;
                }
                r.on_save()
            })
            .expect("not re-entrant");

        assert_eq!(world.journal.take(), vec!["a:save"]);
        assert_eq!(world.messenger.hub().count::<dyn OnSave>(), 2);

        save_all(&world);
        assert_eq!(world.journal.take(), vec!["a:save", "c:save"]);
    }

    #[test]
    fn test_self_unregister_notifies_once() {
        let world = World::new();
        let (once, once_key) = world.loose_actor("once");
        let (always, _) = world.loose_actor("always");
        world.messenger.register_global::<dyn OnSave>(once).expect("live");
        world.messenger.register_global::<dyn OnSave>(always).expect("live");

        for _ in 0..2 {
            world
                .messenger
                .broadcast_global::<dyn OnSave, _>(|r| {
                    r.on_save()?;
                    if ReceiverKey::of(r) == once_key {
                        world.messenger.unregister_global::<dyn OnSave>(once_key);
                    }
                    Ok(())
                })
                .expect("not re-entrant");
        }

        assert_eq!(
            world.journal.take(),
            vec!["once:save", "always:save", "always:save"]
        );
    }

    #[test]
    fn test_registry_state_visible_from_handler() {
        let world = World::new();
        let (a, _) = world.loose_actor("a");
        world.messenger.register_global::<dyn OnSave>(a).expect("live");
        let registry = world.messenger.hub().registry::<dyn OnSave>();
        let mut observed = None;

        world
            .messenger
            .broadcast_global::<dyn OnSave, _>(|_| {
                observed = Some(registry.state());
                Ok(())
            })
            .expect("not re-entrant");

        assert_eq!(observed, Some(DispatchState::Dispatching));
        assert_eq!(registry.state(), DispatchState::Idle);
    }

    // =========================================================================
    // FAILURES AND RE-ENTRANCY
    // =========================================================================

    #[test]
    fn test_failing_subscriber_does_not_silence_others() {
        let world = World::new();
        let actors: Vec<Rc<Actor>> = ["a", "b", "c"]
            .into_iter()
            .map(|name| world.loose_actor(name).0)
            .collect();
        actors[1].fail();
        for actor in &actors {
            world
                .messenger
                .register_global::<dyn OnSave>(actor.clone())
                .expect("live");
        }

        let report = save_all(&world);

        assert_eq!(world.journal.take(), vec!["a:save", "c:save"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(world.messenger.hub().metrics().snapshot().receiver_failures, 1);
    }

    #[test]
    fn test_same_capability_reentry_rejected_other_allowed() {
        let world = World::new();
        let (a, _) = world.loose_actor("a");
        world.messenger.register_global::<dyn OnSave>(a.clone()).expect("live");
        world.messenger.register_global::<dyn OnDamage>(a).expect("live");
        let mut same = None;
        let mut other = None;

        world
            .messenger
            .broadcast_global::<dyn OnSave, _>(|_| {
                same = Some(world.messenger.broadcast_global::<dyn OnSave, _>(|r| r.on_save()));
                other = Some(
                    world
                        .messenger
                        .broadcast_global_with_arg::<dyn OnDamage, u32, _>(&3, |r, amount| {
                            r.on_damage(*amount)
                        }),
                );
                Ok(())
            })
            .expect("outer dispatch");

        assert!(same.expect("ran").is_err_and(|err| err.is_reentrant()));
        assert_eq!(other.expect("ran").expect("different capability").delivered, 1);
        assert_eq!(world.journal.take(), vec!["a:damage=3"]);
        assert_eq!(
            world.messenger.hub().metrics().snapshot().reentrancy_rejections,
            1
        );
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    #[test]
    fn test_destroyed_subscriber_pruned_on_next_dispatch() {
        let world = World::new();
        let root = world.node("root", None);
        let (doomed, doomed_key) = world.actor(root, "doomed");
        let (kept, _) = world.actor(root, "kept");
        world.messenger.register_global::<dyn OnSave>(doomed).expect("live");
        world.messenger.register_global::<dyn OnSave>(kept).expect("live");

        world.scene.destroy(doomed_key).expect("attached");
        let report = save_all(&world);

        assert_eq!(world.journal.take(), vec!["kept:save"]);
        assert_eq!(report.pruned, 1);
        assert_eq!(world.messenger.hub().count::<dyn OnSave>(), 1);
    }

    #[test]
    fn test_despawn_prunes_whole_subtree() {
        let world = World::new();
        let root = world.node("root", None);
        let squad = world.node("squad", Some(root));
        for name in ["s1", "s2"] {
            let (actor, _) = world.actor(squad, name);
            world.messenger.register_global::<dyn OnSave>(actor).expect("live");
        }

        assert_eq!(world.scene.despawn(squad), Ok(2));
        let report = save_all(&world);

        assert_eq!(report.delivered, 0);
        assert_eq!(report.pruned, 2);
        assert_eq!(world.messenger.hub().count::<dyn OnSave>(), 0);
    }

    #[test]
    fn test_registering_destroyed_receiver_is_invalid() {
        let world = World::new();
        let (ghost, key) = world.loose_actor("ghost");
        world.scene.destroy(key).expect("tracked");

        let result = world.messenger.register_global::<dyn OnSave>(ghost);

        assert!(matches!(result, Err(DispatchError::InvalidArgument(_))));
        assert_eq!(world.messenger.hub().capability_count(), 1);
        assert_eq!(world.messenger.hub().count::<dyn OnSave>(), 0);
    }

    #[test]
    fn test_teardown_forgets_all_registries() {
        let world = World::new();
        let (a, _) = world.loose_actor("a");
        world.messenger.register_global::<dyn OnSave>(a.clone()).expect("live");
        world.messenger.register_global::<dyn OnDamage>(a).expect("live");

        world.messenger.hub().teardown();

        assert_eq!(world.messenger.hub().capability_count(), 0);
        assert_eq!(save_all(&world).delivered, 0);
        assert!(world.journal.take().is_empty());
    }
}
