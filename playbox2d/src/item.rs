// playbox2d/src/item.rs
use std::cell::Cell;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::math::{to_sim_len, Rect, Vec2};
use crate::physics::{BodyType, ColliderDesc, PhysicsWorld};
use crate::world::ItemId;

/// RGBA fill color for an item's visual shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`. Returns `None` for anything else.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Item geometry in scene units, local to the item origin.
///
/// Rectangles may sit off-center (their offset is preserved in the collider);
/// circles are centered on the origin; polygon vertices are local scene-unit
/// coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeDesc {
    Rect(Rect),
    Circle { radius: f32 },
    Polygon(Vec<Vec2>),
}

impl ShapeDesc {
    /// Axis-aligned bounds of the geometry, before stroke expansion.
    fn bounds(&self) -> Rect {
        match self {
            ShapeDesc::Rect(r) => *r,
            ShapeDesc::Circle { radius } => {
                Rect::from_center(Vec2::ZERO, radius * 2.0, radius * 2.0)
            }
            ShapeDesc::Polygon(vertices) => Rect::bounding(vertices),
        }
    }

    /// Convert to a simulation-unit collider. One scale and one Y flip,
    /// identical for every shape kind.
    fn to_collider(&self) -> ColliderDesc {
        match self {
            ShapeDesc::Rect(r) => ColliderDesc::Cuboid {
                hx: to_sim_len(r.w / 2.0),
                hy: to_sim_len(r.h / 2.0),
                center: r.center().to_sim(),
            },
            ShapeDesc::Circle { radius } => ColliderDesc::Ball {
                radius: to_sim_len(*radius),
            },
            ShapeDesc::Polygon(vertices) => ColliderDesc::ConvexPolygon {
                vertices: vertices.iter().map(|v| v.to_sim()).collect(),
            },
        }
    }
}

/// A simulation entity: one rigid body plus its renderable shape.
///
/// Attributes set before `create_body` configure the initial body and
/// collider; afterwards, physical parameters require an explicit
/// `apply_shape` to reach the simulation.
#[derive(Clone, Debug)]
pub struct Item {
    name: Option<String>,
    body_type: BodyType,
    density: f32,
    friction: f32,
    restitution: f32,

    // Scene-unit transform, refreshed from the body each frame once created.
    position: Vec2,
    rotation: f32,

    shape: Option<ShapeDesc>,
    color: Color,
    stroke_width: f32,
    texture: Option<String>,

    id: Option<ItemId>,
    bounding: Cell<Option<Rect>>,
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

impl Item {
    pub fn new() -> Self {
        Self {
            name: None,
            body_type: BodyType::Static,
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            position: Vec2::ZERO,
            rotation: 0.0,
            shape: None,
            color: Color::WHITE,
            stroke_width: 1.0,
            texture: None,
            id: None,
            bounding: Cell::new(None),
        }
    }

    // ------------------------------
    // Builder-style configuration
    // ------------------------------

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: ShapeDesc) -> Self {
        self.set_shape(shape);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.texture = Some(texture.into());
        self
    }

    // ------------------------------
    // Accessors
    // ------------------------------

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn set_density(&mut self, density: f32) {
        self.density = density;
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    /// Position in scene units. Authoritative until the body exists; after
    /// that it mirrors the body and is refreshed by `sync`.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Rotation in radians, scene convention (clockwise on screen).
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.stroke_width = width;
        self.bounding.set(None);
    }

    pub fn texture_name(&self) -> Option<&str> {
        self.texture.as_deref()
    }

    pub fn set_texture_name(&mut self, texture: impl Into<String>) {
        self.texture = Some(texture.into());
    }

    pub fn shape(&self) -> Option<&ShapeDesc> {
        self.shape.as_ref()
    }

    /// The registry id, once the item has been added to a world.
    pub fn id(&self) -> Option<ItemId> {
        self.id
    }

    // ------------------------------
    // Body & shape lifecycle
    // ------------------------------

    /// Allocate this item's body in the simulation. Each item owns exactly
    /// one body; a second call is rejected.
    pub fn create_body(&mut self, physics: &mut PhysicsWorld, id: ItemId) -> Result<()> {
        if self.id.is_some() {
            return Err(anyhow!("item already owns a body"));
        }
        // The Y flip mirrors angles as well as positions.
        physics.create_body(id, self.body_type, self.position.to_sim(), -self.rotation)?;
        self.id = Some(id);
        Ok(())
    }

    /// Replace the geometry descriptor and invalidate the bounding cache.
    /// Call `apply_shape` to push the change into the simulation.
    pub fn set_shape(&mut self, shape: ShapeDesc) {
        self.shape = Some(shape);
        self.bounding.set(None);
    }

    /// Rebuild the simulation collider from the current shape descriptor and
    /// material parameters. Replaces any existing collider on the body.
    pub fn apply_shape(&self, physics: &mut PhysicsWorld) -> Result<()> {
        let id = self.id.ok_or_else(|| anyhow!("item has no body yet"))?;
        let shape = self
            .shape
            .as_ref()
            .ok_or_else(|| anyhow!("item has no shape descriptor"))?;
        physics.set_collider(
            id,
            &shape.to_collider(),
            self.density,
            self.friction,
            self.restitution,
        )
    }

    /// Local-space bounds expanded by half the stroke width. Lazily cached;
    /// invalidated by `set_shape` and `set_stroke_width`, unaffected by
    /// transform changes.
    pub fn bounding_rect(&self) -> Rect {
        if let Some(cached) = self.bounding.get() {
            return cached;
        }
        let rect = match &self.shape {
            Some(shape) => shape.bounds().expanded(self.stroke_width / 2.0),
            None => Rect::default(),
        };
        self.bounding.set(Some(rect));
        rect
    }

    /// Refresh the scene-unit transform from the simulation body. Invoked by
    /// `World::step` for every live item before the simulation advances.
    pub fn sync(&mut self, physics: &PhysicsWorld) {
        let Some(id) = self.id else {
            return;
        };
        if let Some(pos) = physics.body_position(id) {
            self.position = pos.to_scene();
        }
        if let Some(angle) = physics.body_rotation(id) {
            self.rotation = -angle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_rect_expands_by_half_stroke() {
        let mut item = Item::new();
        item.set_stroke_width(2.0);
        item.set_shape(ShapeDesc::Rect(Rect::new(0.0, 0.0, 10.0, 20.0)));
        assert_eq!(item.bounding_rect(), Rect::new(-1.0, -1.0, 12.0, 22.0));

        // Pure transform changes leave the cached bounds untouched.
        item.set_position(Vec2::new(50.0, 50.0));
        assert_eq!(item.bounding_rect(), Rect::new(-1.0, -1.0, 12.0, 22.0));
    }

    #[test]
    fn bounding_rect_recomputed_after_set_shape() {
        let mut item = Item::new();
        item.set_stroke_width(0.0);
        item.set_shape(ShapeDesc::Circle { radius: 5.0 });
        assert_eq!(item.bounding_rect(), Rect::new(-5.0, -5.0, 10.0, 10.0));

        item.set_shape(ShapeDesc::Polygon(vec![
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 2.0),
        ]));
        assert_eq!(item.bounding_rect(), Rect::new(-1.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn rect_collider_keeps_local_offset() {
        let shape = ShapeDesc::Rect(Rect::new(0.0, 0.0, 40.0, 20.0));
        match shape.to_collider() {
            ColliderDesc::Cuboid { hx, hy, center } => {
                assert_eq!(hx, 1.0);
                assert_eq!(hy, 0.5);
                assert_eq!(center, Vec2::new(1.0, -0.5));
            }
            other => panic!("unexpected collider: {:?}", other),
        }
    }

    #[test]
    fn color_hex_parsing() {
        assert_eq!(Color::from_hex("#808080"), Some(Color::GRAY));
        assert_eq!(
            Color::from_hex("#11223344"),
            Some(Color {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x44
            })
        );
        assert_eq!(Color::from_hex("gray"), None);
    }
}
