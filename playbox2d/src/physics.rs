// playbox2d/src/physics.rs
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::math::Vec2;
use crate::world::ItemId;

// Rapier is a private implementation detail: do NOT re-export it.
use rapier2d::na;
use rapier2d::prelude::*;

/// Engine-facing rigid body type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    #[default]
    Static,
    Dynamic,
    Kinematic,
}

/// Collider geometry in simulation units. Items build these from their
/// scene-unit shape descriptors.
#[derive(Clone, Debug, PartialEq)]
pub enum ColliderDesc {
    Cuboid { hx: f32, hy: f32, center: Vec2 },
    Ball { radius: f32 },
    ConvexPolygon { vertices: Vec<Vec2> },
}

/// Joint endpoint: a registered item or the world-fixed ground anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JointAnchor {
    Item(ItemId),
    Ground,
}

/// One new contact between two items, recorded during the last step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactEvent {
    pub a: ItemId,
    pub b: ItemId,
}

impl ContactEvent {
    /// The other endpoint if `id` participates in this contact.
    pub fn other(&self, id: ItemId) -> Option<ItemId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Drag max force per kilogram of dragged body mass. Heavier bodies get a
/// proportionally stronger constraint so the drag overrides their inertia
/// uniformly.
const DRAG_FORCE_PER_MASS: f32 = 1000.0;

// Spring coefficients for the drag constraint, tuned for a soft grab that
// does not oscillate at 60 Hz.
const DRAG_STIFFNESS: f32 = 120.0;
const DRAG_DAMPING: f32 = 18.0;

/// The soft drag constraint between the ground anchor and one dynamic body.
#[derive(Clone, Copy, Debug)]
struct DragSpring {
    item: ItemId,
    target: Vec2,
    max_force: f32,
}

/// Binding between item ids and a rapier simulation.
///
/// Owns every rapier set plus a static ground body used as the world-fixed
/// endpoint of constraints. Items are referenced by stable `ItemId`; the
/// handle side tables are private to this type.
pub struct PhysicsWorld {
    // --- rapier internals ---
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,

    // Event channels
    event_recv_collision: crossbeam_channel::Receiver<CollisionEvent>,
    event_recv_contact_force: crossbeam_channel::Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,

    // --- mappings (items <-> rapier) ---
    item_to_body: HashMap<ItemId, RigidBodyHandle>,
    body_to_item: HashMap<RigidBodyHandle, ItemId>,

    ground: RigidBodyHandle,
    gravity: Vec2,
    drag: Option<DragSpring>,

    // New contacts recorded by the most recent step.
    contacts: Vec<ContactEvent>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let (send_col, recv_col) = crossbeam_channel::unbounded();
        let (send_force, recv_force) = crossbeam_channel::unbounded();
        let event_handler = ChannelEventCollector::new(send_col, send_force);

        let mut rigid_bodies = RigidBodySet::new();
        let ground = rigid_bodies.insert(RigidBodyBuilder::fixed().build());

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies,
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),

            event_recv_collision: recv_col,
            event_recv_contact_force: recv_force,
            event_handler,

            item_to_body: HashMap::new(),
            body_to_item: HashMap::new(),

            ground,
            gravity: Vec2::ZERO,
            drag: None,
            contacts: Vec::new(),
        }
    }

    /// Set the solver iteration counts. Intended to be called once before
    /// the first step.
    pub fn set_solver_iterations(&mut self, velocity: usize, position: usize) {
        self.integration_parameters.max_velocity_iterations = velocity;
        self.integration_parameters.max_stabilization_iterations = position;
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Create a body for an item. Fails if the item already has one; a body
    /// is created exactly once per item and removed on destruction.
    pub fn create_body(
        &mut self,
        item: ItemId,
        body_type: BodyType,
        position: Vec2,
        rotation: f32,
    ) -> Result<()> {
        if self.item_to_body.contains_key(&item) {
            return Err(anyhow!("item {:?} already has a body", item));
        }

        let rb_type = match body_type {
            BodyType::Static => RigidBodyType::Fixed,
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Kinematic => RigidBodyType::KinematicPositionBased,
        };

        let body = RigidBodyBuilder::new(rb_type)
            .translation(vector![position.x, position.y])
            .rotation(rotation)
            .build();

        let handle = self.rigid_bodies.insert(body);
        self.item_to_body.insert(item, handle);
        self.body_to_item.insert(handle, item);
        Ok(())
    }

    /// Remove a body (with its colliders and joints). Returns whether one
    /// existed. Clears the drag first when it references this item.
    pub fn remove_body(&mut self, item: ItemId) -> bool {
        if self.drag.map(|d| d.item) == Some(item) {
            self.drag = None;
        }
        if let Some(handle) = self.item_to_body.remove(&item) {
            self.rigid_bodies.remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
            self.body_to_item.remove(&handle);
            true
        } else {
            false
        }
    }

    /// Attach collision geometry with material properties, replacing any
    /// collider the body already carries.
    pub fn set_collider(
        &mut self,
        item: ItemId,
        desc: &ColliderDesc,
        density: f32,
        friction: f32,
        restitution: f32,
    ) -> Result<()> {
        let body = self.body_handle(item)?;

        let old: Vec<ColliderHandle> = self
            .colliders
            .iter()
            .filter(|(_, c)| c.parent() == Some(body))
            .map(|(h, _)| h)
            .collect();
        for h in old {
            self.colliders
                .remove(h, &mut self.island_manager, &mut self.rigid_bodies, true);
        }

        let (shape, offset) = self.to_rapier_shape(desc)?;
        let collider = ColliderBuilder::new(shape)
            .translation(vector![offset.x, offset.y])
            .density(density)
            .friction(friction)
            .restitution(restitution)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();

        self.colliders
            .insert_with_parent(collider, body, &mut self.rigid_bodies);
        Ok(())
    }

    /// Step the simulation by `dt` seconds. Applies the drag spring, clears
    /// the previous contact set, and records the contacts of this advance.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.contacts.clear();
        self.apply_drag_spring(dt);

        let gravity = vector![self.gravity.x, self.gravity.y];
        let hooks = &();

        self.pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            hooks,
            &self.event_handler,
        );

        self.collect_contacts();
    }

    /// Contacts recorded by the most recent `step`.
    pub fn contacts(&self) -> &[ContactEvent] {
        &self.contacts
    }

    // ------------------------------
    // Drag constraint (mouse joint)
    // ------------------------------

    /// Try to grab the dynamic body under `point`. Returns the grabbed item,
    /// or `None` when nothing dynamic is there or a drag is already active.
    pub fn grab(&mut self, point: Vec2) -> Option<ItemId> {
        if self.drag.is_some() {
            return None;
        }

        let pt = point![point.x, point.y];
        for (_, c) in self.colliders.iter() {
            if !c.shape().contains_point(c.position(), &pt) {
                continue;
            }
            let Some(body_handle) = c.parent() else {
                continue;
            };
            let Some(body) = self.rigid_bodies.get(body_handle) else {
                continue;
            };
            if !body.is_dynamic() {
                continue;
            }
            let Some(&item) = self.body_to_item.get(&body_handle) else {
                continue;
            };
            self.drag = Some(DragSpring {
                item,
                target: point,
                max_force: DRAG_FORCE_PER_MASS * body.mass(),
            });
            if let Some(b) = self.rigid_bodies.get_mut(body_handle) {
                b.wake_up(true);
            }
            return Some(item);
        }
        None
    }

    /// Retarget the active drag. No-op without one.
    pub fn retarget_drag(&mut self, point: Vec2) {
        if let Some(drag) = &mut self.drag {
            drag.target = point;
        }
    }

    /// Release the active drag. Returns whether one was active.
    pub fn release_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    pub fn dragged_item(&self) -> Option<ItemId> {
        self.drag.map(|d| d.item)
    }

    pub fn drag_target(&self) -> Option<Vec2> {
        self.drag.map(|d| d.target)
    }

    // ------------------------------
    // Joints
    // ------------------------------

    /// Revolute joint pinned at the world-space `anchor`, optionally driven
    /// by a velocity motor with bounded torque.
    pub fn create_revolute_joint(
        &mut self,
        a: JointAnchor,
        b: JointAnchor,
        anchor: Vec2,
        motor: Option<(f32, f32)>,
    ) -> Result<()> {
        let (ha, hb) = (self.anchor_handle(a)?, self.anchor_handle(b)?);
        let mut builder = RevoluteJointBuilder::new()
            .local_anchor1(self.local_point(ha, anchor)?)
            .local_anchor2(self.local_point(hb, anchor)?);
        if let Some((speed, max_torque)) = motor {
            builder = builder.motor_velocity(speed, 1.0).motor_max_force(max_torque);
        }
        self.impulse_joints.insert(ha, hb, builder.build(), true);
        Ok(())
    }

    /// Prismatic joint sliding along `axis`, anchored at the world-space
    /// `anchor`, with travel limits in simulation units.
    pub fn create_prismatic_joint(
        &mut self,
        a: JointAnchor,
        b: JointAnchor,
        anchor: Vec2,
        axis: Vec2,
        limits: [f32; 2],
    ) -> Result<()> {
        if axis.length_squared() == 0.0 {
            return Err(anyhow!("prismatic joint axis must be non-zero"));
        }
        let (ha, hb) = (self.anchor_handle(a)?, self.anchor_handle(b)?);
        let axis = na::Unit::new_normalize(vector![axis.x, axis.y]);
        let joint = PrismaticJointBuilder::new(axis)
            .local_anchor1(self.local_point(ha, anchor)?)
            .local_anchor2(self.local_point(hb, anchor)?)
            .limits(limits)
            .build();
        self.impulse_joints.insert(ha, hb, joint, true);
        Ok(())
    }

    /// Number of impulse joints currently alive.
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    // ------------------------------
    // Per-item body queries/actions
    // ------------------------------

    pub fn body_position(&self, item: ItemId) -> Option<Vec2> {
        let b = self.body(item)?;
        let t = b.translation();
        Some(Vec2::new(t.x, t.y))
    }

    pub fn body_rotation(&self, item: ItemId) -> Option<f32> {
        Some(self.body(item)?.rotation().angle())
    }

    pub fn linear_velocity(&self, item: ItemId) -> Option<Vec2> {
        let v = self.body(item)?.linvel();
        Some(Vec2::new(v.x, v.y))
    }

    pub fn set_linear_velocity(&mut self, item: ItemId, vel: Vec2) {
        if let Some(b) = self.body_mut(item) {
            b.set_linvel(vector![vel.x, vel.y], true);
        }
    }

    pub fn apply_impulse(&mut self, item: ItemId, impulse: Vec2) {
        if let Some(b) = self.body_mut(item) {
            b.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    pub fn apply_torque_impulse(&mut self, item: ItemId, torque: f32) {
        if let Some(b) = self.body_mut(item) {
            b.apply_torque_impulse(torque, true);
        }
    }

    pub fn set_linear_damping(&mut self, item: ItemId, damping: f32) {
        if let Some(b) = self.body_mut(item) {
            b.set_linear_damping(damping);
        }
    }

    /// Enable continuous collision detection (the "bullet" flag) so fast
    /// bodies do not tunnel through thin colliders.
    pub fn set_ccd_enabled(&mut self, item: ItemId, enabled: bool) {
        if let Some(b) = self.body_mut(item) {
            b.enable_ccd(enabled);
        }
    }

    // ------------------------------
    // Private helpers
    // ------------------------------

    fn body(&self, item: ItemId) -> Option<&RigidBody> {
        let h = *self.item_to_body.get(&item)?;
        self.rigid_bodies.get(h)
    }

    fn body_mut(&mut self, item: ItemId) -> Option<&mut RigidBody> {
        let h = *self.item_to_body.get(&item)?;
        self.rigid_bodies.get_mut(h)
    }

    fn body_handle(&self, item: ItemId) -> Result<RigidBodyHandle> {
        self.item_to_body
            .get(&item)
            .copied()
            .ok_or_else(|| anyhow!("item {:?} has no physics body", item))
    }

    fn anchor_handle(&self, anchor: JointAnchor) -> Result<RigidBodyHandle> {
        match anchor {
            JointAnchor::Item(item) => self.body_handle(item),
            JointAnchor::Ground => Ok(self.ground),
        }
    }

    fn local_point(&self, handle: RigidBodyHandle, world: Vec2) -> Result<Point<Real>> {
        let body = self
            .rigid_bodies
            .get(handle)
            .ok_or_else(|| anyhow!("joint endpoint body no longer exists"))?;
        Ok(body
            .position()
            .inverse_transform_point(&point![world.x, world.y]))
    }

    fn to_rapier_shape(&self, desc: &ColliderDesc) -> Result<(SharedShape, Vec2)> {
        match desc {
            ColliderDesc::Cuboid { hx, hy, center } => {
                Ok((SharedShape::cuboid(*hx, *hy), *center))
            }
            ColliderDesc::Ball { radius } => Ok((SharedShape::ball(*radius), Vec2::ZERO)),
            ColliderDesc::ConvexPolygon { vertices } => {
                let points: Vec<Point<Real>> =
                    vertices.iter().map(|v| point![v.x, v.y]).collect();
                let shape = SharedShape::convex_hull(&points)
                    .ok_or_else(|| anyhow!("degenerate polygon shape"))?;
                Ok((shape, Vec2::ZERO))
            }
        }
    }

    /// Soft spring toward the drag target, clamped to the max force chosen
    /// at grab time. Emulates a mouse joint without a solver constraint.
    fn apply_drag_spring(&mut self, dt: f32) {
        let Some(drag) = self.drag else {
            return;
        };
        let Some(handle) = self.item_to_body.get(&drag.item).copied() else {
            return;
        };
        let Some(body) = self.rigid_bodies.get_mut(handle) else {
            return;
        };

        let pos = body.translation();
        let vel = body.linvel();
        let mass = body.mass();
        let mut force = vector![
            (drag.target.x - pos.x) * DRAG_STIFFNESS - vel.x * DRAG_DAMPING,
            (drag.target.y - pos.y) * DRAG_STIFFNESS - vel.y * DRAG_DAMPING
        ] * mass;
        let magnitude = force.norm();
        if magnitude > drag.max_force {
            force *= drag.max_force / magnitude;
        }
        body.apply_impulse(force * dt, true);
    }

    fn collect_contacts(&mut self) {
        while let Ok(ev) = self.event_recv_collision.try_recv() {
            if let CollisionEvent::Started(c1, c2, _) = ev {
                if let Some(contact) = self.map_pair(c1, c2) {
                    self.contacts.push(contact);
                }
            }
        }
        // Contact force events are not interpreted; drain so the channel
        // does not grow.
        while self.event_recv_contact_force.try_recv().is_ok() {}
    }

    fn map_pair(&self, c1: ColliderHandle, c2: ColliderHandle) -> Option<ContactEvent> {
        let b1 = self.colliders.get(c1)?.parent()?;
        let b2 = self.colliders.get(c2)?.parent()?;
        let a = *self.body_to_item.get(&b1)?;
        let b = *self.body_to_item.get(&b2)?;
        Some(ContactEvent { a, b })
    }
}
