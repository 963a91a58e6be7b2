//! End-to-end session tests driving the world the way the windowing shell
//! does: fixed-rate ticks with input applied between steps.

use std::collections::HashSet;

use playbox2d::{
    ArcanoidRules, Sandbox, Session, ShapeDesc, Vec2, WorldConfig, WorldEvent,
};

#[test]
fn arcanoid_keeps_exactly_one_ball_alive() {
    let mut session = Session::new(WorldConfig::default(), ArcanoidRules::new());
    let mut created = HashSet::new();
    let mut destroyed = HashSet::new();
    for event in session.drain_events() {
        if let WorldEvent::ItemCreated(id) = event {
            created.insert(id);
        }
    }
    let initial_items = session.world().item_count();

    for tick in 0..600 {
        session.step();
        for event in session.drain_events() {
            match event {
                WorldEvent::ItemCreated(id) => {
                    assert!(created.insert(id), "id reused at tick {}", tick);
                }
                WorldEvent::ItemDestroyed(id) => {
                    assert!(created.contains(&id), "destroyed unknown id at tick {}", tick);
                    assert!(destroyed.insert(id), "double destroy at tick {}", tick);
                }
            }
        }

        let circles = session
            .world()
            .items()
            .filter(|(_, item)| matches!(item.shape(), Some(ShapeDesc::Circle { .. })))
            .count();
        assert_eq!(circles, 1, "ball count broken at tick {}", tick);

        // The entity set only shrinks, except for ball respawns which pair a
        // destruction with a creation.
        assert!(session.world().item_count() <= initial_items);
    }
}

#[test]
fn sandbox_drag_pulls_box_toward_target() {
    let mut session = Session::new(WorldConfig::default(), Sandbox);
    session.pointer_secondary_pressed(Vec2::new(0.0, 0.0));
    let id = session.world().items().next().unwrap().0;

    session.pointer_pressed(Vec2::new(0.0, 0.0));
    assert_eq!(session.world().dragged_item(), Some(id));

    let target = Vec2::new(60.0, 40.0);
    session.pointer_moved(target);
    for _ in 0..240 {
        session.step();
    }

    let pos = session.world().item(id).unwrap().position();
    assert!(
        pos.distance(target) < 10.0,
        "box at {:?} never reached drag target {:?}",
        pos,
        target
    );

    session.pointer_released();
    assert_eq!(session.world().dragged_item(), None);
}

#[test]
fn loaded_scene_participates_in_simulation() {
    let xml = r#"
        <world>
          <gravity direction="0" strength="-5"/>
          <objects>
            <object bodyType="dynamic" name="faller">
              <position x="0" y="100"/>
              <physic density="1.0" friction="0.3" restitution="0.1"/>
              <geometry type="circle" radius="5"/>
            </object>
          </objects>
        </world>
    "#;
    let mut session = Session::new(WorldConfig::default(), Sandbox);
    session.world_mut().load_world(xml);

    let id = session.world().find_item("faller").unwrap();
    let start = session.world().item(id).unwrap().position();
    for _ in 0..60 {
        session.step();
    }
    let end = session.world().item(id).unwrap().position();

    // Simulation gravity is y up, scene coordinates are y down: the item
    // falls toward larger scene y.
    assert!(end.y > start.y + 1.0, "item did not fall: {:?} -> {:?}", start, end);
}
