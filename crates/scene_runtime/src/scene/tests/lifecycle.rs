use approx::assert_relative_eq;
use serde_json::json;

use super::support::*;
use crate::ecs::entity::{BehaviorSelection, LifecycleStage};
use crate::physics::{ContactEvent, ContactKind};
use crate::prelude::*;
use crate::scene::RenderRequest;

#[test]
fn test_create_late_follows_every_create() {
    let mut scene = test_scene();
    take_journal();

    let data = json!({"components": [{"type": "Probe"}, {"type": "Echo"}]});
    let id = scene.create_entity_from("A", data.as_object());

    assert_eq!(
        take_journal(),
        vec!["A/probe:create", "A/echo:create", "A/probe:create_late", "A/echo:create_late"]
    );
    let entity = scene.entity(id).unwrap();
    assert_eq!(entity.stage(), LifecycleStage::CreatedLate);
    assert!(entity.finished_creation());
    assert!(!entity.has_started());
}

#[test]
fn test_late_unit_is_fast_forwarded_once() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");
    scene.add_behavior::<Probe>(id).unwrap();
    assert_eq!(hooks_of(&take_journal(), "A/probe"), vec!["create", "create_late"]);

    scene.start();
    assert_eq!(hooks_of(&take_journal(), "A/probe"), vec!["start", "late_start"]);

    scene.add_behavior::<Echo>(id).unwrap();
    assert_eq!(
        hooks_of(&take_journal(), "A/echo"),
        vec!["create", "create_late", "start", "late_start"]
    );
    assert_eq!(scene.entity(id).unwrap().behavior_stage::<Echo>(), Some(LifecycleStage::LateStarted));
}

#[test]
fn test_stages_are_never_replayed() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");
    scene.add_behavior::<Probe>(id).unwrap();
    scene.start();
    scene.start();
    scene.on_start();

    let hooks = hooks_of(&take_journal(), "A/probe");
    assert_eq!(hooks, vec!["create", "create_late", "start", "late_start"]);
}

#[test]
fn test_start_reaches_every_entity_before_late_start() {
    let mut scene = test_scene();
    for name in ["A", "B"] {
        let id = scene.create_entity(name);
        scene.add_behavior::<Probe>(id).unwrap();
    }
    take_journal();

    scene.start();
    assert_eq!(
        take_journal(),
        vec!["A/probe:start", "B/probe:start", "A/probe:late_start", "B/probe:late_start"]
    );
    assert!(scene.has_started());
}

#[test]
fn test_self_removal_mid_update_is_deferred() {
    let mut scene = test_scene();
    let a = scene.create_entity("A");
    let b = scene.create_entity("B");
    let c = scene.create_entity("C");
    for id in [a, b, c] {
        scene.add_behavior::<Probe>(id).unwrap();
    }
    scene.add_behavior::<SelfDestruct>(b).unwrap();
    take_journal();

    scene.on_update(0.016);
    let journal = take_journal();
    assert_eq!(hooks_of(&journal, "A/probe"), vec!["update"]);
    assert_eq!(hooks_of(&journal, "B/probe"), vec!["update"]);
    assert_eq!(hooks_of(&journal, "C/probe"), vec!["update"]);
    assert!(scene.contains(b));
    assert!(scene.entity(b).unwrap().is_pending_destroy());

    scene.on_update_internal();
    assert_eq!(take_journal(), vec!["B/probe:destroy"]);
    assert!(!scene.contains(b));
    assert!(scene.is_destroyed(b));

    scene.on_update_internal();
    assert!(take_journal().is_empty());
    assert_eq!(scene.entity_ids(), vec![a, c]);
}

#[test]
fn test_remove_entity_is_idempotent() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");
    scene.add_behavior::<Probe>(id).unwrap();
    take_journal();

    assert!(scene.remove_entity(id));
    assert!(!scene.remove_entity(id));
    scene.on_update_internal();
    assert!(!scene.remove_entity(id));
    scene.on_update_internal();

    assert_eq!(take_journal(), vec!["A/probe:destroy"]);
    assert!(matches!(scene.set_active(id, false), Err(SceneError::EntityDestroyed(_))));
    assert!(matches!(
        scene.set_active(EntityId::new(99), false),
        Err(SceneError::UnknownEntity(_))
    ));
}

#[test]
fn test_behavior_removal_runs_destroy_in_maintenance() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");
    scene.add_behavior::<Remover>(id).unwrap();
    scene.add_behavior::<Counter>(id).unwrap();
    take_journal();

    scene.on_update(0.016);
    assert!(scene.get_behavior::<Remover>(id).is_some());
    assert_eq!(take_journal(), vec!["A/remover:update"]);

    scene.on_update_internal();
    assert_eq!(take_journal(), vec!["A/remover:destroy"]);
    assert!(scene.get_behavior::<Remover>(id).is_none());
    assert_eq!(scene.get_behavior::<Counter>(id).map(|c| c.updates), Some(1));
}

#[test]
fn test_ids_are_unique_and_never_reused() {
    let mut scene = test_scene();
    let a = scene.create_entity("A");
    let b = scene.create_entity("B");
    scene.remove_entity(b);
    let c = scene.create_entity("C");
    scene.on_update_internal();
    let d = scene.create_entity("D");

    assert_eq!([a, b, c, d].map(EntityId::raw), [1, 2, 3, 4]);
    assert_eq!(scene.entity_ids(), vec![a, c, d]);
    assert!(scene.iter().all(|e| e.id().is_assigned()));
    assert!(scene.iter().all(|e| scene.entity(e.id()).map(Entity::id) == Some(e.id())));
}

#[test]
fn test_inactive_entities_skip_frame_passes() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");
    scene.add_behavior::<Counter>(id).unwrap();
    scene.add_behavior::<Probe>(id).unwrap();
    scene.set_active(id, false).unwrap();
    take_journal();

    scene.start();
    scene.tick(1.0);

    assert_eq!(hooks_of(&take_journal(), "A/probe"), vec!["start", "late_start"]);
    assert_eq!(scene.get_behavior::<Counter>(id), Some(&Counter::default()));
}

#[test]
fn test_tick_runs_fixed_steps() {
    crate::foundation::logging::init_for_tests();
    let config = SceneConfig {
        fixed_timestep: 0.25,
        max_fixed_steps: 3,
        ..SceneConfig::default()
    };
    let mut scene = SceneIndex::with_config(test_registry(), ResourceCatalog::new(), config);
    let id = scene.create_entity("A");
    scene.add_behavior::<Counter>(id).unwrap();

    scene.tick(0.5);
    scene.tick(2.0);

    let counter = scene.get_behavior::<Counter>(id).unwrap();
    assert_eq!(counter.updates, 2);
    assert_eq!(counter.late_updates, 2);
    assert_eq!(counter.fixed_updates, 5);
    assert_eq!(scene.time().frame, 2);
}

#[test]
fn test_typed_add_rejects_duplicates() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");
    scene.add_behavior::<Counter>(id).unwrap().updates = 7;

    let err = scene.add_behavior::<Counter>(id).err();
    assert!(matches!(err, Some(SceneError::DuplicateBehavior(ref name)) if name == "Counter"));
    assert_eq!(scene.get_behavior::<Counter>(id).map(|c| c.updates), Some(7));
    assert_eq!(scene.entity(id).unwrap().behavior_count(), 1);
}

#[test]
fn test_add_by_name() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");

    assert!(scene.add_behavior_by_name(id, "NotAType", None).is_none());
    assert!(scene.add_behavior_by_name(EntityId::new(42), "Counter", None).is_none());

    let data = json!({"updates": 3});
    assert!(scene.add_behavior_by_name(id, "Counter", data.as_object()).is_some());
    assert!(scene.add_behavior_by_name(id, "Counter", None).is_none());
    assert_eq!(scene.get_behavior::<Counter>(id).map(|c| c.updates), Some(3));
}

#[test]
fn test_units_added_mid_pass_wait_for_next_pass() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");
    scene.add_behavior::<Spawner>(id).unwrap();
    let before = scene.len();
    take_journal();

    scene.on_update(0.016);
    assert_eq!(scene.len(), before + 1);
    assert_eq!(hooks_of(&take_journal(), "A/echo"), vec!["create", "create_late"]);

    scene.on_update(0.016);
    assert_eq!(hooks_of(&take_journal(), "A/echo"), vec!["update"]);
    assert_eq!(scene.get_behavior::<Spawner>(id).map(|s| s.spawned.len()), Some(2));
}

#[test]
fn test_units_added_to_later_entity_wait_for_next_pass() {
    let mut scene = test_scene();
    let a = scene.create_entity("A");
    let b = scene.create_entity("B");
    scene.add_behavior::<Recruiter>(a).unwrap().target = Some(b);

    scene.on_update(0.016);
    assert_eq!(scene.get_behavior::<Counter>(b).map(|c| c.updates), Some(0));

    scene.on_fixed_update(0.02);
    scene.on_late_update(0.016);
    scene.on_update(0.016);
    let counter = scene.get_behavior::<Counter>(b).unwrap();
    assert_eq!((counter.updates, counter.fixed_updates, counter.late_updates), (1, 1, 1));
}

#[test]
fn test_delete_selected_behavior_only() {
    let mut scene = test_scene();
    let id = scene.create_entity("A");
    scene.add_behavior::<Counter>(id).unwrap();
    scene.add_behavior::<Probe>(id).unwrap();
    scene
        .entity_mut(id)
        .unwrap()
        .select_behavior(Some(BehaviorSelection::Unit(std::any::TypeId::of::<Counter>())));

    assert!(scene.delete_entity(id, false));
    scene.on_update_internal();

    let entity = scene.entity(id).unwrap();
    assert!(!entity.has_behavior::<Counter>());
    assert!(entity.has_behavior::<Probe>());
    assert!(entity.selected_behavior().is_none());
}

#[test]
fn test_delete_removes_children_first() {
    let mut scene = test_scene();
    let root = scene.create_entity("Root");
    let child = scene.create_entity("Child");
    let leaf = scene.create_entity("Leaf");
    scene.set_parent(child, Some(root), false).unwrap();
    scene.set_parent(leaf, Some(child), false).unwrap();
    for id in [root, child, leaf] {
        scene.add_behavior::<Probe>(id).unwrap();
    }
    take_journal();

    assert!(scene.delete_entity(root, true));
    assert!(!scene.delete_entity(root, true));
    scene.on_update_internal();

    assert!(scene.is_empty());
    assert_eq!(
        take_journal(),
        vec!["Leaf/probe:destroy", "Child/probe:destroy", "Root/probe:destroy"]
    );
}

#[test]
fn test_sweep_follows_mark_order() {
    let mut scene = test_scene();
    let ids: Vec<_> = ["A", "B", "C"].into_iter().map(|name| scene.create_entity(name)).collect();
    for id in &ids {
        scene.add_behavior::<Probe>(*id).unwrap();
    }
    take_journal();

    assert!(scene.remove_entity(ids[2]));
    assert!(scene.remove_entity(ids[0]));
    assert!(!scene.remove_entity(ids[2]));
    assert!(scene.remove_entity(ids[1]));
    scene.on_update_internal();

    assert_eq!(take_journal(), vec!["C/probe:destroy", "A/probe:destroy", "B/probe:destroy"]);
}

#[test]
fn test_clear_destroys_everything() {
    let mut scene = test_scene();
    for name in ["A", "B"] {
        let id = scene.create_entity(name);
        scene.add_behavior::<Probe>(id).unwrap();
    }
    take_journal();

    scene.clear();
    assert!(scene.is_empty());
    assert_eq!(take_journal(), vec!["A/probe:destroy", "B/probe:destroy"]);
    assert_eq!(scene.create_entity("C").raw(), 3);
}

#[test]
fn test_contacts_reach_both_participants() {
    let mut scene = test_scene();
    let a = scene.create_entity("A");
    let b = scene.create_entity("B");
    scene.add_behavior::<Toucher>(a).unwrap();
    scene.add_behavior::<Toucher>(b).unwrap();

    scene.dispatch_contact(ContactEvent::new(ContactKind::TriggerEnter, a, b));
    scene.dispatch_contact(ContactEvent::new(ContactKind::CollisionExit, a, b));

    assert_eq!(
        take_journal(),
        vec![
            "A/touch:trigger_enter #2",
            "B/touch:trigger_enter #1",
            "A/touch:collision_exit #2",
            "B/touch:collision_exit #1",
        ]
    );
}

#[test]
fn test_render_pull_skips_inactive() {
    let mut scene = test_scene();
    let a = scene.create_entity("A");
    let b = scene.create_entity("B");
    scene.add_behavior::<Painter>(a).unwrap();
    scene.add_behavior::<Painter>(b).unwrap();
    scene.set_local_position(a, Vec3::new(1.0, 2.0, 3.0)).unwrap();
    scene.set_active(b, false).unwrap();

    let mut requests: Vec<RenderRequest> = Vec::new();
    scene.render(&UniformData::default(), &mut requests);

    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].entity, a);
    assert_eq!(requests[0].mesh, "cube");
    assert_relative_eq!(requests[0].transform, Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)), epsilon = 1e-6);
}

#[test]
fn test_queries() {
    let mut scene = test_scene();
    let a = scene.create_entity("Player");
    let b = scene.create_entity("Enemy");
    let c = scene.create_entity("Enemy");
    scene.add_behavior::<Counter>(b).unwrap();
    scene.add_behavior::<Counter>(c).unwrap();
    scene.entity_mut(b).unwrap().set_tag("Hostile");
    scene.entity_mut(c).unwrap().set_tag("Hostile");

    assert_eq!(scene.find_by_name("Player"), Some(a));
    assert_eq!(scene.find_by_name("Enemy (1)"), Some(c));
    assert_eq!(scene.find_first_of_type::<Counter>().map(|(id, _)| id), Some(b));
    assert_eq!(scene.find_all_of_type::<Counter>().len(), 2);
    assert!(scene.find_first_of_type::<Sizer>().is_none());
    assert_eq!(scene.find_all_with_tag("Hostile"), vec![b, c]);
    assert_eq!(scene.entity(a).unwrap().tag(), "Untagged");
}

#[test]
fn test_hot_reload_restores_placeholders() {
    crate::foundation::logging::init_for_tests();
    let registry = TypeRegistry::new();
    let mut scene = SceneIndex::new(registry.clone(), ResourceCatalog::new());
    let data = json!({"components": [{"type": "Counter", "updates": 4}]});
    let id = scene.create_entity_from("A", data.as_object());
    assert_eq!(scene.entity(id).unwrap().missing_behaviors().len(), 1);

    scene.start();
    registry.register::<Counter>();
    assert_eq!(scene.resolve_missing_behaviors(), 1);

    let entity = scene.entity(id).unwrap();
    assert!(entity.missing_behaviors().is_empty());
    assert_eq!(entity.get_behavior::<Counter>().map(|c| c.updates), Some(4));
    assert_eq!(entity.behavior_stage::<Counter>(), Some(LifecycleStage::LateStarted));
    assert_eq!(scene.resolve_missing_behaviors(), 0);
}
