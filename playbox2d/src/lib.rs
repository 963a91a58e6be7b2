//! Playbox2D - an interactive 2D rigid-body physics playground.
//!
//! The crate is the binding layer between declarative scene descriptions
//! and a live rigid-body simulation: XML-defined objects and joints become
//! bodies, per-frame state is synchronized back into items, contact events
//! are resolved into game rules, and pointer/key input turns into impulses
//! and drag targets. Rendering and windowing live outside and talk to the
//! world through items and drained lifecycle events.

pub mod arcanoid;
pub mod game;
pub mod item;
pub mod math;
pub mod physics;
pub mod scene;
pub mod world;

pub use crate::arcanoid::ArcanoidRules;
pub use crate::game::{GameRules, Key, Sandbox, Session};
pub use crate::item::{Color, Item, ShapeDesc};
pub use crate::math::{Rect, Vec2};
pub use crate::physics::{BodyType, ContactEvent, JointAnchor};
pub use crate::scene::{SceneDesc, SceneError};
pub use crate::world::{ItemId, World, WorldConfig, WorldEvent};
