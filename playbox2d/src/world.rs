// playbox2d/src/world.rs
use std::collections::HashMap;

use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::item::{Color, Item, ShapeDesc};
use crate::math::{Rect, Vec2};
use crate::physics::{BodyType, ContactEvent, JointAnchor, PhysicsWorld};
use crate::scene::{GeometryDesc, SceneDesc, GROUND_NAME};

/// Stable identifier for an item registered in a [`World`].
///
/// Ids are allocated monotonically and never reused within a world, so a
/// stale id held across a destruction simply fails lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    /// Get the underlying integer id (useful for debugging or logging).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Outbound lifecycle notification, drained by the render adapter each frame
/// to add or remove drawable proxies. Events queued during a step become
/// observable only after that step's destruction pass completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    ItemCreated(ItemId),
    ItemDestroyed(ItemId),
}

/// Simulation configuration, set once before the first step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Fixed time step in seconds.
    pub time_step: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    /// Gravity in simulation units (y up).
    pub gravity: Vec2,
    /// Seed for tints and motor speeds, injected for reproducible runs.
    pub rng_seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 60.0,
            velocity_iterations: 10,
            position_iterations: 10,
            gravity: Vec2::ZERO,
            rng_seed: 0x5eed,
        }
    }
}

impl WorldConfig {
    /// Deserialize a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Default spawn parameters for [`World::create_box`].
const BOX_SIZE: f32 = 20.0;
const BOX_FRICTION: f32 = 0.9;
const BOX_DENSITY: f32 = 1.0;
const BOX_RESTITUTION: f32 = 0.5;
const BOX_TEXTURE: &str = "crate.png";

/// The world/entity binding layer: owns the physics simulation, the item
/// registry, the single drag constraint, and the outbound event queue.
pub struct World {
    physics: PhysicsWorld,
    items: HashMap<ItemId, Item>,
    /// Creation order; lookups and iteration follow it deterministically.
    order: Vec<ItemId>,
    events: Vec<WorldEvent>,
    rng: fastrand::Rng,
    config: WorldConfig,
    next_id: u32,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let mut physics = PhysicsWorld::new();
        physics.set_gravity(config.gravity);
        physics.set_solver_iterations(config.velocity_iterations, config.position_iterations);
        debug!("world created, dt={}s", config.time_step);
        Self {
            physics,
            items: HashMap::new(),
            order: Vec::new(),
            events: Vec::new(),
            rng: fastrand::Rng::with_seed(config.rng_seed),
            config,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Gravity in simulation units.
    pub fn gravity(&self) -> Vec2 {
        self.physics.gravity()
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.physics.set_gravity(gravity);
    }

    // ------------------------------
    // Item lifecycle
    // ------------------------------

    /// Register a configured item: allocate its body, attach its collider if
    /// a shape is present, and queue the creation event.
    pub fn add_item(&mut self, mut item: Item) -> Result<ItemId> {
        let id = ItemId(self.next_id);
        self.next_id += 1;

        item.create_body(&mut self.physics, id)?;
        if item.shape().is_some() {
            if let Err(err) = item.apply_shape(&mut self.physics) {
                self.physics.remove_body(id);
                return Err(err);
            }
        }

        self.items.insert(id, item);
        self.order.push(id);
        self.events.push(WorldEvent::ItemCreated(id));
        Ok(id)
    }

    /// Destroy an item: clear the drag if it holds this body, remove the
    /// body (severing its joints), queue the removal event, release the
    /// item. No-op for unknown or already-destroyed ids.
    pub fn destroy_item(&mut self, id: ItemId) {
        if self.items.remove(&id).is_none() {
            return;
        }
        self.physics.remove_body(id);
        self.order.retain(|&other| other != id);
        self.events.push(WorldEvent::ItemDestroyed(id));
        debug!("item {} destroyed", id.to_u32());
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Live items in creation order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.order
            .iter()
            .filter_map(move |id| self.items.get(id).map(|item| (*id, item)))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// First name match in creation order; duplicate names resolve to the
    /// earliest-created item.
    pub fn find_item(&self, name: &str) -> Option<ItemId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.items.get(id).and_then(Item::name) == Some(name))
    }

    /// Replace an item's geometry and push the new collider into the
    /// simulation.
    pub fn set_item_shape(&mut self, id: ItemId, shape: ShapeDesc) -> Result<()> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no such item {:?}", id))?;
        item.set_shape(shape);
        item.apply_shape(&mut self.physics)
    }

    // ------------------------------
    // Stepping
    // ------------------------------

    /// Advance one fixed time step: refresh every item's cached transform
    /// from its body, then step the simulation. The contact set of the
    /// previous step is replaced.
    pub fn step(&mut self) {
        let dt = self.config.time_step;
        let Self {
            physics,
            items,
            order,
            ..
        } = self;
        for id in order.iter() {
            if let Some(item) = items.get_mut(id) {
                item.sync(physics);
            }
        }
        physics.step(dt);
    }

    /// Contacts recorded by the most recent step.
    pub fn contacts(&self) -> &[ContactEvent] {
        self.physics.contacts()
    }

    /// Drain queued lifecycle events, in emission order.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------
    // Pointer interaction
    // ------------------------------

    /// Grab the dynamic item under `point` (scene units) with a drag
    /// constraint anchored to the ground, max force proportional to the
    /// body's mass. No-op while a drag is already active.
    pub fn grab_item(&mut self, point: Vec2) -> Option<ItemId> {
        self.physics.grab(point.to_sim())
    }

    /// Release the active drag; no-op without one.
    pub fn drop_item(&mut self) {
        self.physics.release_drag();
    }

    /// Retarget the active drag to `point` (scene units); no-op without one.
    pub fn move_item(&mut self, point: Vec2) {
        self.physics.retarget_drag(point.to_sim());
    }

    /// The item currently held by the drag, if any.
    pub fn dragged_item(&self) -> Option<ItemId> {
        self.physics.dragged_item()
    }

    /// Current drag target in scene units, if a drag is active.
    pub fn drag_target(&self) -> Option<Vec2> {
        self.physics.drag_target().map(Vec2::to_scene)
    }

    /// Spawn a dynamic square item at `point` (scene units) with default
    /// material parameters and a randomized tint.
    pub fn create_box(&mut self, point: Vec2) -> Result<ItemId> {
        self.create_box_sized(point, BOX_SIZE)
    }

    pub fn create_box_sized(&mut self, point: Vec2, size: f32) -> Result<ItemId> {
        let tint = self.random_tint();
        let item = Item::new()
            .with_body_type(BodyType::Dynamic)
            .with_position(point)
            .with_friction(BOX_FRICTION)
            .with_density(BOX_DENSITY)
            .with_restitution(BOX_RESTITUTION)
            .with_shape(ShapeDesc::Rect(Rect::from_center(Vec2::ZERO, size, size)))
            .with_color(tint)
            .with_texture(BOX_TEXTURE);
        let id = self.add_item(item)?;
        debug!("box {} created at {:?}", id.to_u32(), point);
        Ok(id)
    }

    /// Random bright tint from the world's seeded generator.
    pub fn random_tint(&mut self) -> Color {
        Color::rgb(
            128 + self.rng.u8(0..128),
            128 + self.rng.u8(0..128),
            128 + self.rng.u8(0..128),
        )
    }

    /// Random value in `0..n` from the world's seeded generator.
    pub fn random_u32(&mut self, n: u32) -> u32 {
        self.rng.u32(0..n)
    }

    // ------------------------------
    // Joints
    // ------------------------------

    /// Revolute joint pinned at the world-space `anchor` (scene units).
    /// Motor speed is in radians per second, torque in simulation units.
    pub fn create_revolute_joint(
        &mut self,
        a: JointAnchor,
        b: JointAnchor,
        anchor: Vec2,
        motor: Option<(f32, f32)>,
    ) -> Result<()> {
        self.physics
            .create_revolute_joint(a, b, anchor.to_sim(), motor)
    }

    /// Prismatic joint sliding along `axis` (scene coordinates, y down),
    /// anchored at `anchor`, with travel limits in scene units.
    pub fn create_prismatic_joint(
        &mut self,
        a: JointAnchor,
        b: JointAnchor,
        anchor: Vec2,
        axis: Vec2,
        limits: [f32; 2],
    ) -> Result<()> {
        self.physics.create_prismatic_joint(
            a,
            b,
            anchor.to_sim(),
            axis.to_sim(),
            [crate::math::to_sim_len(limits[0]), crate::math::to_sim_len(limits[1])],
        )
    }

    pub fn joint_count(&self) -> usize {
        self.physics.joint_count()
    }

    // ------------------------------
    // Body actions for game rules (simulation units)
    // ------------------------------

    pub fn apply_impulse(&mut self, id: ItemId, impulse: Vec2) {
        self.physics.apply_impulse(id, impulse);
    }

    pub fn apply_torque_impulse(&mut self, id: ItemId, torque: f32) {
        self.physics.apply_torque_impulse(id, torque);
    }

    pub fn linear_velocity(&self, id: ItemId) -> Option<Vec2> {
        self.physics.linear_velocity(id)
    }

    pub fn set_linear_velocity(&mut self, id: ItemId, velocity: Vec2) {
        self.physics.set_linear_velocity(id, velocity);
    }

    pub fn set_linear_damping(&mut self, id: ItemId, damping: f32) {
        self.physics.set_linear_damping(id, damping);
    }

    /// Flag a body for continuous collision detection.
    pub fn set_ccd_enabled(&mut self, id: ItemId, enabled: bool) {
        self.physics.set_ccd_enabled(id, enabled);
    }

    // ------------------------------
    // Declarative loading
    // ------------------------------

    /// Load a scene description from XML text. Whole-document failures
    /// abort the load with a log line; malformed or unresolvable entries
    /// are skipped individually.
    pub fn load_world(&mut self, xml: &str) {
        match SceneDesc::parse(xml) {
            Ok(scene) => self.apply_scene(&scene),
            Err(err) => warn!("failed to load world: {}", err),
        }
    }

    /// Load a scene description from a file on disk.
    pub fn load_world_file(&mut self, path: &std::path::Path) {
        match SceneDesc::parse_file(path) {
            Ok(scene) => self.apply_scene(&scene),
            Err(err) => warn!("failed to load world from {:?}: {}", path, err),
        }
    }

    fn apply_scene(&mut self, scene: &SceneDesc) {
        if let Some(gravity) = scene.gravity {
            self.set_gravity(gravity);
        }

        for object in &scene.objects {
            let mut item = Item::new()
                .with_body_type(object.body_type)
                .with_position(object.position)
                .with_rotation(object.rotation)
                .with_density(object.density)
                .with_friction(object.friction)
                .with_restitution(object.restitution)
                .with_color(object.color);
            if let Some(name) = &object.name {
                item.set_name(name.clone());
            }
            if let Some(texture) = &object.texture {
                item.set_texture_name(texture.clone());
            }
            match object.geometry {
                Some(GeometryDesc::Box { width, height }) => {
                    item.set_shape(ShapeDesc::Rect(Rect::from_center(Vec2::ZERO, width, height)));
                }
                Some(GeometryDesc::Circle { radius }) => {
                    item.set_shape(ShapeDesc::Circle { radius });
                }
                None => {}
            }
            if let Err(err) = self.add_item(item) {
                warn!("skipping object {:?}: {}", object.name, err);
            }
        }

        for joint in &scene.joints {
            let Some(a) = self.find_item(&joint.body_a) else {
                warn!("joint endpoint {:?} not found, joint skipped", joint.body_a);
                continue;
            };
            let b = if joint.body_b == GROUND_NAME {
                JointAnchor::Ground
            } else {
                match self.find_item(&joint.body_b) {
                    Some(id) => JointAnchor::Item(id),
                    None => {
                        warn!("joint endpoint {:?} not found, joint skipped", joint.body_b);
                        continue;
                    }
                }
            };

            // Pinned at body A's position, mirroring the declarative format.
            let anchor = match self.items.get(&a) {
                Some(item) => item.position(),
                None => continue,
            };
            let motor = joint
                .motor
                .filter(|m| m.enabled)
                .map(|m| (m.speed, m.torque));
            if let Err(err) = self.create_revolute_joint(JointAnchor::Item(a), b, anchor, motor) {
                warn!("failed to create joint {:?}-{:?}: {}", joint.body_a, joint.body_b, err);
            }
        }

        debug!(
            "scene applied: {} items, {} joints",
            self.item_count(),
            self.joint_count()
        );
    }

    /// Tear the world down in a fixed order: the drag constraint first (it
    /// may reference any body), then every item, then the simulation itself.
    pub fn clear(&mut self) {
        self.physics.release_drag();
        for id in std::mem::take(&mut self.order) {
            self.items.remove(&id);
            self.events.push(WorldEvent::ItemDestroyed(id));
        }
        let mut physics = PhysicsWorld::new();
        physics.set_gravity(self.config.gravity);
        physics.set_solver_iterations(
            self.config.velocity_iterations,
            self.config.position_iterations,
        );
        self.physics = physics;
    }
}
