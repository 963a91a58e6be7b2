//! Game-variant composition.
//!
//! A game variant is a [`GameRules`] value composed with a shared [`World`]
//! inside a [`Session`]. The session drives the tick order: step the
//! simulation, let the rules interpret the frame's contacts, and leave the
//! lifecycle events queued for the render adapter to drain.

use log::warn;

use crate::math::Vec2;
use crate::world::{World, WorldConfig, WorldEvent};

/// Logical input keys delivered by the windowing shell. Variants a game
/// does not map are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    SpinCcw,
    SpinCw,
    Space,
    Escape,
}

/// Capability interface of a game variant. Every hook has a default no-op
/// so simple playgrounds only implement what they need.
pub trait GameRules {
    /// Build the initial scene into `world`.
    fn populate(&mut self, world: &mut World);

    /// Inspect the frame's contact set and mutate the entity set. Runs
    /// after the simulation advance of each tick.
    fn after_step(&mut self, world: &mut World) {
        let _ = world;
    }

    fn on_key_pressed(&mut self, world: &mut World, key: Key) {
        let _ = (world, key);
    }

    fn on_key_released(&mut self, world: &mut World, key: Key) {
        let _ = (world, key);
    }
}

/// A running game: one world plus one set of rules, driven by an external
/// fixed-rate tick (nominally 60 Hz). Input arrives between ticks and is
/// applied immediately; nothing here blocks or suspends.
pub struct Session<R: GameRules> {
    world: World,
    rules: R,
}

impl<R: GameRules> Session<R> {
    pub fn new(config: WorldConfig, mut rules: R) -> Self {
        let mut world = World::new(config);
        rules.populate(&mut world);
        Self { world, rules }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// One tick: advance the simulation, then run the rules' contact pass.
    pub fn step(&mut self) {
        self.world.step();
        self.rules.after_step(&mut self.world);
    }

    /// Drain lifecycle events for the render adapter. Called after `step`
    /// so destruction of the finished tick is fully observable.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        self.world.drain_events()
    }

    pub fn key_pressed(&mut self, key: Key) {
        self.rules.on_key_pressed(&mut self.world, key);
    }

    pub fn key_released(&mut self, key: Key) {
        self.rules.on_key_released(&mut self.world, key);
    }

    /// Pointer press: grab the item under the cursor (scene units).
    pub fn pointer_pressed(&mut self, point: Vec2) {
        self.world.grab_item(point);
    }

    /// Secondary pointer press: spawn a box at the cursor.
    pub fn pointer_secondary_pressed(&mut self, point: Vec2) {
        if let Err(err) = self.world.create_box(point) {
            warn!("failed to spawn box: {}", err);
        }
    }

    pub fn pointer_moved(&mut self, point: Vec2) {
        self.world.move_item(point);
    }

    pub fn pointer_released(&mut self) {
        self.world.drop_item();
    }
}

/// Convenience for playgrounds with no rules at all: a bare sandbox world.
pub struct Sandbox;

impl GameRules for Sandbox {
    fn populate(&mut self, _world: &mut World) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_session_steps_and_drains() {
        let mut session = Session::new(WorldConfig::default(), Sandbox);
        session.pointer_secondary_pressed(Vec2::new(10.0, 10.0));
        session.step();
        let events = session.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], WorldEvent::ItemCreated(_)));
    }

    #[test]
    fn pointer_flow_grabs_and_releases() {
        let mut session = Session::new(WorldConfig::default(), Sandbox);
        session.pointer_secondary_pressed(Vec2::new(10.0, 10.0));

        session.pointer_pressed(Vec2::new(10.0, 10.0));
        assert!(session.world().dragged_item().is_some());
        session.pointer_moved(Vec2::new(40.0, 40.0));
        session.pointer_released();
        assert!(session.world().dragged_item().is_none());
    }
}
