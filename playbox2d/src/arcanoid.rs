//! The Arcanoid game variant.
//!
//! Boundary walls, a paddle constrained to the bottom of the board by two
//! chained prismatic joints, a ball with continuous collision detection, and
//! a grid of destructible bricks kept spinning by motorized revolute joints.
//! The contact pass destroys bricks the ball touches and respawns the ball
//! when it falls past the paddle into the bottom catcher.

use std::collections::HashSet;

use anyhow::Result;
use log::{debug, warn};

use crate::game::{GameRules, Key};
use crate::item::{Color, Item, ShapeDesc};
use crate::math::{Rect, Vec2};
use crate::physics::{BodyType, ContactEvent, JointAnchor};
use crate::world::{ItemId, World};

const BALL_RADIUS: f32 = 5.0;
const BALL_SPAWN: Vec2 = Vec2 { x: 0.0, y: 200.0 };
/// Serve impulse in simulation units, toward the paddle.
const BALL_SERVE_IMPULSE: Vec2 = Vec2 { x: 0.0, y: -0.5 };

// Gameplay pace bounds, simulation units per second.
const BALL_SPEED_MAX: f32 = 10.0;
const BALL_SPEED_MIN: f32 = 2.0;
const BALL_KICK_IMPULSE: f32 = 0.05;

// Paddle control, simulation units.
const PADDLE_IMPULSE_X: f32 = 10.0;
const PADDLE_IMPULSE_Y: f32 = 5.0;
const PADDLE_TORQUE_IMPULSE: f32 = 25.0;

const BRICK_COLUMNS: u32 = 10;
const BRICK_ROWS: u32 = 10;
const BRICK_MOTOR_TORQUE: f32 = 5000.0;

/// Rules state: ids of the special board items plus the running score.
pub struct ArcanoidRules {
    ball: Option<ItemId>,
    paddle: Option<ItemId>,
    rail: Option<ItemId>,
    bound: Option<ItemId>,
    score: u32,
}

impl Default for ArcanoidRules {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcanoidRules {
    pub fn new() -> Self {
        Self {
            ball: None,
            paddle: None,
            rail: None,
            bound: None,
            score: 0,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn ball(&self) -> Option<ItemId> {
        self.ball
    }

    pub fn paddle(&self) -> Option<ItemId> {
        self.paddle
    }

    /// Spawn the ball at the fixed spawn point and serve it. Replaces the
    /// previous ball reference.
    pub fn create_ball(&mut self, world: &mut World, radius: f32) -> Result<ItemId> {
        let tint = world.random_tint();
        let item = Item::new()
            .with_body_type(BodyType::Dynamic)
            .with_position(BALL_SPAWN)
            .with_friction(1.0)
            .with_density(1.0)
            .with_restitution(1.0)
            .with_shape(ShapeDesc::Circle { radius })
            .with_color(tint);
        let id = world.add_item(item)?;
        world.set_ccd_enabled(id, true);
        world.apply_impulse(id, BALL_SERVE_IMPULSE);
        self.ball = Some(id);
        Ok(id)
    }

    fn build_board(&mut self, world: &mut World) -> Result<()> {
        world.set_gravity(Vec2::new(0.0, -1.0));

        let wall = |pos: Vec2, shape: Rect, restitution: f32| {
            Item::new()
                .with_body_type(BodyType::Static)
                .with_position(pos)
                .with_restitution(restitution)
                .with_color(Color::GRAY)
                .with_shape(ShapeDesc::Rect(shape))
        };
        world.add_item(wall(Vec2::new(-205.0, 0.0), Rect::new(0.0, 0.0, 5.0, 400.0), 1.0))?;
        world.add_item(wall(Vec2::new(200.0, 0.0), Rect::new(0.0, 0.0, 5.0, 400.0), 1.0))?;
        world.add_item(wall(Vec2::new(-200.0, 0.0), Rect::new(0.0, 0.0, 400.0, 5.0), 0.0))?;

        // Invisible rail the paddle hangs from: one prismatic joint ties the
        // rail to the ground horizontally, a second ties the paddle to the
        // rail vertically, both with travel limits.
        let rail = world.add_item(
            Item::new()
                .with_body_type(BodyType::Dynamic)
                .with_position(Vec2::new(0.0, 400.0))
                .with_shape(ShapeDesc::Rect(Rect::new(0.0, 0.0, 5.0, 5.0))),
        )?;
        self.rail = Some(rail);

        let paddle = world.add_item(
            Item::new()
                .with_body_type(BodyType::Dynamic)
                .with_position(Vec2::new(-50.0, 395.0))
                .with_friction(1.0)
                .with_density(1.0)
                .with_restitution(1.5)
                .with_color(Color::GRAY)
                .with_shape(ShapeDesc::Rect(Rect::new(0.0, 0.0, 100.0, 10.0))),
        )?;
        world.set_linear_damping(paddle, 10.0);
        self.paddle = Some(paddle);

        world.create_prismatic_joint(
            JointAnchor::Item(rail),
            JointAnchor::Ground,
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            [-60.0, 60.0],
        )?;
        world.create_prismatic_joint(
            JointAnchor::Item(paddle),
            JointAnchor::Item(rail),
            Vec2::ZERO,
            Vec2::new(0.0, 1.0),
            [0.0, 10.0],
        )?;

        self.create_ball(world, BALL_RADIUS)?;

        for j in 0..BRICK_ROWS {
            for i in 0..BRICK_COLUMNS {
                let pos = Vec2::new(-150.0 + 30.0 * i as f32, 10.0 + 30.0 * j as f32);
                let tint = world.random_tint();
                let brick = world.add_item(
                    Item::new()
                        .with_body_type(BodyType::Dynamic)
                        .with_position(pos)
                        .with_density(1.0)
                        .with_restitution(1.0)
                        .with_color(tint)
                        .with_shape(ShapeDesc::Rect(Rect::new(0.0, 0.0, 10.0, 20.0))),
                )?;

                // Alternating spin directions across the grid.
                let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                let speed = sign * world.random_u32(100) as f32 / 10.0;
                world.create_revolute_joint(
                    JointAnchor::Item(brick),
                    JointAnchor::Ground,
                    pos + Vec2::new(5.0, 10.0),
                    Some((speed, BRICK_MOTOR_TORQUE)),
                )?;
            }
        }

        let bound = world.add_item(
            Item::new()
                .with_body_type(BodyType::Static)
                .with_position(Vec2::new(-205.0, 410.0))
                .with_shape(ShapeDesc::Rect(Rect::new(0.0, 0.0, 410.0, 10.0))),
        )?;
        self.bound = Some(bound);

        debug!("arcanoid board built: {} items", world.item_count());
        Ok(())
    }

    /// Keep the pace bounded: damp the ball above the speed cap, kick it
    /// along its heading when it crawls below the floor.
    fn clamp_ball_speed(&self, world: &mut World) {
        let Some(ball) = self.ball else {
            return;
        };
        let Some(vel) = world.linear_velocity(ball) else {
            return;
        };
        let speed = vel.length();
        if speed > BALL_SPEED_MAX {
            world.set_linear_velocity(ball, vel * (BALL_SPEED_MAX / speed));
        } else if speed > 0.0 && speed < BALL_SPEED_MIN {
            world.apply_impulse(ball, vel.normalized() * BALL_KICK_IMPULSE);
        }
    }

    #[cfg(test)]
    fn with_parts(
        ball: Option<ItemId>,
        paddle: Option<ItemId>,
        rail: Option<ItemId>,
        bound: Option<ItemId>,
    ) -> Self {
        Self {
            ball,
            paddle,
            rail,
            bound,
            score: 0,
        }
    }
}

/// Classify one step's contacts against the ball: ignored endpoints (the
/// paddle and its rail) produce nothing, the bottom catcher requests a
/// respawn, and any other dynamic item joins the deduplicated destruction
/// set. Items may appear in several contact records; the set keeps the
/// destruction pass exactly-once.
fn classify_contacts(
    ball: ItemId,
    ignored: &[ItemId],
    bound: Option<ItemId>,
    is_dynamic: impl Fn(ItemId) -> bool,
    contacts: &[ContactEvent],
) -> (HashSet<ItemId>, bool) {
    let mut doomed = HashSet::new();
    let mut respawn = false;
    for contact in contacts {
        let Some(other) = contact.other(ball) else {
            continue;
        };
        if ignored.contains(&other) {
            continue;
        }
        if Some(other) == bound {
            respawn = true;
        } else if is_dynamic(other) {
            doomed.insert(other);
        }
    }
    (doomed, respawn)
}

impl GameRules for ArcanoidRules {
    fn populate(&mut self, world: &mut World) {
        if let Err(err) = self.build_board(world) {
            warn!("failed to build arcanoid board: {}", err);
        }
    }

    fn after_step(&mut self, world: &mut World) {
        self.clamp_ball_speed(world);

        let contacts = world.contacts();
        if contacts.is_empty() {
            return;
        }
        let Some(ball) = self.ball else {
            return;
        };

        let mut ignored = Vec::with_capacity(2);
        ignored.extend(self.paddle);
        ignored.extend(self.rail);
        let (doomed, respawn) = classify_contacts(
            ball,
            &ignored,
            self.bound,
            |id| world.item(id).map(Item::body_type) == Some(BodyType::Dynamic),
            contacts,
        );

        // Destruction is deferred until the whole contact scan is done.
        for id in doomed {
            world.destroy_item(id);
            self.score += 1;
        }
        if respawn {
            world.destroy_item(ball);
            self.ball = None;
            if let Err(err) = self.create_ball(world, BALL_RADIUS) {
                warn!("failed to respawn ball: {}", err);
            }
        }
    }

    fn on_key_pressed(&mut self, world: &mut World, key: Key) {
        let Some(paddle) = self.paddle else {
            return;
        };
        match key {
            Key::Up => world.apply_impulse(paddle, Vec2::new(0.0, PADDLE_IMPULSE_Y)),
            Key::Down => world.apply_impulse(paddle, Vec2::new(0.0, -PADDLE_IMPULSE_Y)),
            Key::Left => world.apply_impulse(paddle, Vec2::new(-PADDLE_IMPULSE_X, 0.0)),
            Key::Right => world.apply_impulse(paddle, Vec2::new(PADDLE_IMPULSE_X, 0.0)),
            Key::SpinCcw => world.apply_torque_impulse(paddle, PADDLE_TORQUE_IMPULSE),
            Key::SpinCw => world.apply_torque_impulse(paddle, -PADDLE_TORQUE_IMPULSE),
            // Unmapped keys do nothing.
            Key::Space | Key::Escape => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{WorldConfig, WorldEvent};

    fn test_world() -> World {
        World::new(WorldConfig::default())
    }

    fn spawn_static(world: &mut World, pos: Vec2, w: f32, h: f32) -> ItemId {
        world
            .add_item(
                Item::new()
                    .with_body_type(BodyType::Static)
                    .with_position(pos)
                    .with_shape(ShapeDesc::Rect(Rect::from_center(Vec2::ZERO, w, h))),
            )
            .unwrap()
    }

    #[test]
    fn classify_deduplicates_repeated_contacts() {
        let ball = ItemId(1);
        let brick = ItemId(2);
        let contacts = vec![
            ContactEvent { a: ball, b: brick },
            ContactEvent { a: brick, b: ball },
            ContactEvent { a: ball, b: brick },
        ];
        let (doomed, respawn) = classify_contacts(ball, &[], None, |_| true, &contacts);
        assert_eq!(doomed.len(), 1);
        assert!(doomed.contains(&brick));
        assert!(!respawn);
    }

    #[test]
    fn classify_ignores_paddle_and_unrelated_contacts() {
        let ball = ItemId(1);
        let paddle = ItemId(2);
        let wall = ItemId(3);
        let contacts = vec![
            ContactEvent { a: ball, b: paddle },
            ContactEvent { a: ball, b: wall },
            // Not involving the ball at all.
            ContactEvent { a: paddle, b: wall },
        ];
        let (doomed, respawn) =
            classify_contacts(ball, &[paddle], None, |_| false, &contacts);
        assert!(doomed.is_empty());
        assert!(!respawn);
    }

    #[test]
    fn classify_flags_boundary_respawn() {
        let ball = ItemId(1);
        let bound = ItemId(9);
        let contacts = vec![
            ContactEvent { a: ball, b: bound },
            ContactEvent { a: bound, b: ball },
        ];
        let (doomed, respawn) =
            classify_contacts(ball, &[], Some(bound), |_| false, &contacts);
        assert!(doomed.is_empty());
        assert!(respawn);
    }

    #[test]
    fn brick_contact_destroys_it_exactly_once() {
        let mut world = test_world();
        let mut rules = ArcanoidRules::with_parts(None, None, None, None);
        let ball = rules.create_ball(&mut world, BALL_RADIUS).unwrap();

        // A dynamic brick overlapping the ball spawn: first step reports the
        // contact, the rules pass destroys the brick.
        let brick = world
            .add_item(
                Item::new()
                    .with_body_type(BodyType::Dynamic)
                    .with_position(BALL_SPAWN)
                    .with_shape(ShapeDesc::Rect(Rect::from_center(Vec2::ZERO, 10.0, 20.0))),
            )
            .unwrap();
        world.drain_events();

        world.step();
        rules.after_step(&mut world);

        assert!(world.item(brick).is_none());
        assert!(world.item(ball).is_some());
        assert_eq!(rules.score(), 1);
        let destroyed: Vec<_> = world
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, WorldEvent::ItemDestroyed(id) if *id == brick))
            .collect();
        assert_eq!(destroyed.len(), 1);
    }

    #[test]
    fn boundary_contact_respawns_exactly_one_ball() {
        let mut world = test_world();
        let bound = spawn_static(&mut world, BALL_SPAWN, 400.0, 10.0);
        let mut rules = ArcanoidRules::with_parts(None, None, None, Some(bound));
        let old_ball = rules.create_ball(&mut world, BALL_RADIUS).unwrap();

        world.step();
        rules.after_step(&mut world);

        let new_ball = rules.ball().expect("ball must be respawned");
        assert_ne!(new_ball, old_ball);
        assert!(world.item(old_ball).is_none());

        let circles = world
            .items()
            .filter(|(_, item)| matches!(item.shape(), Some(ShapeDesc::Circle { .. })))
            .count();
        assert_eq!(circles, 1);
    }

    #[test]
    fn ball_speed_is_clamped_from_above_and_below() {
        let mut world = test_world();
        let mut rules = ArcanoidRules::with_parts(None, None, None, None);
        let ball = rules.create_ball(&mut world, BALL_RADIUS).unwrap();

        world.set_linear_velocity(ball, Vec2::new(30.0, 0.0));
        rules.after_step(&mut world);
        let fast = world.linear_velocity(ball).unwrap().length();
        assert!(fast <= BALL_SPEED_MAX + 1e-3);

        world.set_linear_velocity(ball, Vec2::new(0.1, 0.0));
        rules.after_step(&mut world);
        let slow = world.linear_velocity(ball).unwrap().length();
        assert!(slow > 0.1);
    }

    #[test]
    fn populate_builds_a_full_board() {
        let mut world = test_world();
        let mut rules = ArcanoidRules::new();
        rules.populate(&mut world);

        // 3 walls + rail + paddle + ball + 100 bricks + bound.
        assert_eq!(world.item_count(), 107);
        // 2 prismatic rails + 100 brick motors.
        assert_eq!(world.joint_count(), 102);
        assert!(rules.ball().is_some());
        assert!(rules.paddle().is_some());
        assert_eq!(world.gravity(), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn unmapped_keys_are_noops() {
        let mut world = test_world();
        let mut rules = ArcanoidRules::new();
        rules.populate(&mut world);
        let paddle = rules.paddle().unwrap();
        let before = world.linear_velocity(paddle).unwrap();

        rules.on_key_pressed(&mut world, Key::Space);
        rules.on_key_pressed(&mut world, Key::Escape);
        assert_eq!(world.linear_velocity(paddle).unwrap(), before);

        rules.on_key_pressed(&mut world, Key::Right);
        assert!(world.linear_velocity(paddle).unwrap().x > before.x);
    }
}
