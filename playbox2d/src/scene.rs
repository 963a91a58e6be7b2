//! Declarative scene descriptions.
//!
//! A scene is an XML tree rooted at `world`: an optional `gravity` element,
//! an `objects` section of `object` definitions, and a `joints` section of
//! `joint` definitions. The description is consumed once at load time;
//! whole-document problems abort the load, while malformed individual
//! entries are logged and skipped (robustness over strictness).

use log::warn;
use thiserror::Error;

use crate::item::Color;
use crate::math::Vec2;
use crate::physics::BodyType;

/// Sentinel joint endpoint name referring to the world-fixed ground body.
pub const GROUND_NAME: &str = "_ground";

/// Whole-document load failures. Per-entry problems never surface here.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed scene XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element is <{0}>, expected <world>")]
    NotAWorld(String),
}

/// One object definition: body parameters plus visual attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDesc {
    pub name: Option<String>,
    pub body_type: BodyType,
    pub position: Vec2,
    pub rotation: f32,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub geometry: Option<GeometryDesc>,
    pub color: Color,
    pub texture: Option<String>,
}

/// Scene-unit geometry of an object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GeometryDesc {
    Box { width: f32, height: f32 },
    Circle { radius: f32 },
}

/// One revolute joint definition between two named endpoints. Endpoint `b`
/// may be [`GROUND_NAME`].
#[derive(Clone, Debug, PartialEq)]
pub struct JointDesc {
    pub body_a: String,
    pub body_b: String,
    pub motor: Option<MotorDesc>,
}

/// Motor parameters for a revolute joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotorDesc {
    pub speed: f32,
    pub torque: f32,
    pub enabled: bool,
}

/// A parsed scene description, ready to be applied to a world.
#[derive(Clone, Debug, Default)]
pub struct SceneDesc {
    pub gravity: Option<Vec2>,
    pub objects: Vec<ObjectDesc>,
    pub joints: Vec<JointDesc>,
}

impl SceneDesc {
    /// Parse a scene description from XML text.
    pub fn parse(xml: &str) -> Result<Self, SceneError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        if root.tag_name().name() != "world" {
            return Err(SceneError::NotAWorld(root.tag_name().name().to_string()));
        }

        let mut scene = SceneDesc::default();

        if let Some(gravity) = child(root, "gravity") {
            // `direction` is the horizontal component, `strength` the
            // vertical one, both in simulation units.
            match (attr_f32(gravity, "direction"), attr_f32(gravity, "strength")) {
                (Some(x), Some(y)) => scene.gravity = Some(Vec2::new(x, y)),
                _ => warn!("scene: gravity element missing direction/strength, ignored"),
            }
        }

        if let Some(objects) = child(root, "objects") {
            for node in objects.children().filter(|n| n.has_tag_name("object")) {
                match parse_object(node) {
                    Some(object) => scene.objects.push(object),
                    None => warn!("scene: skipping malformed object entry"),
                }
            }
        }

        if let Some(joints) = child(root, "joints") {
            for node in joints.children().filter(|n| n.has_tag_name("joint")) {
                match parse_joint(node) {
                    Some(joint) => scene.joints.push(joint),
                    None => warn!("scene: skipping malformed joint entry"),
                }
            }
        }

        Ok(scene)
    }

    /// Parse a scene description from a file on disk.
    pub fn parse_file(path: &std::path::Path) -> Result<Self, SceneError> {
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }
}

fn parse_object(node: roxmltree::Node) -> Option<ObjectDesc> {
    let body_type = match node.attribute("bodyType") {
        Some("dynamic") => BodyType::Dynamic,
        Some("static") | None => BodyType::Static,
        Some(other) => {
            warn!("scene: unknown bodyType {:?}", other);
            return None;
        }
    };

    let mut object = ObjectDesc {
        name: node.attribute("name").map(str::to_string),
        body_type,
        position: Vec2::ZERO,
        rotation: 0.0,
        density: 1.0,
        friction: 0.2,
        restitution: 0.0,
        geometry: None,
        color: Color::WHITE,
        texture: None,
    };

    if let Some(position) = child(node, "position") {
        object.position = Vec2::new(attr_f32(position, "x")?, attr_f32(position, "y")?);
        if let Some(rotation) = attr_f32(position, "rotation") {
            object.rotation = rotation;
        }
    }

    if let Some(physic) = child(node, "physic") {
        object.density = attr_f32(physic, "density")?;
        object.friction = attr_f32(physic, "friction")?;
        object.restitution = attr_f32(physic, "restitution")?;
    }

    if let Some(geometry) = child(node, "geometry") {
        object.geometry = Some(match geometry.attribute("type") {
            Some("box") => GeometryDesc::Box {
                width: attr_f32(geometry, "width")?,
                height: attr_f32(geometry, "height")?,
            },
            Some("circle") => GeometryDesc::Circle {
                radius: attr_f32(geometry, "radius")?,
            },
            other => {
                warn!("scene: unknown geometry type {:?}", other);
                return None;
            }
        });
    }

    if let Some(color) = child(node, "color").and_then(|n| n.text()) {
        match Color::from_hex(color.trim()) {
            Some(parsed) => object.color = parsed,
            None => warn!("scene: unparsable color {:?}, using white", color),
        }
    }

    if let Some(texture) = child(node, "texture").and_then(|n| n.text()) {
        object.texture = Some(texture.trim().to_string());
    }

    Some(object)
}

fn parse_joint(node: roxmltree::Node) -> Option<JointDesc> {
    match node.attribute("type") {
        Some("revolute") => {}
        other => {
            warn!("scene: unsupported joint type {:?}", other);
            return None;
        }
    }

    let bodies = child(node, "bodies")?;
    let mut joint = JointDesc {
        body_a: bodies.attribute("a")?.to_string(),
        body_b: bodies.attribute("b")?.to_string(),
        motor: None,
    };

    if let Some(motor) = child(node, "motor") {
        joint.motor = Some(MotorDesc {
            speed: attr_f32(motor, "speed")?,
            torque: attr_f32(motor, "torque")?,
            enabled: motor.attribute("enable") == Some("true"),
        });
    }

    Some(joint)
}

fn child<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn attr_f32(node: roxmltree::Node, name: &str) -> Option<f32> {
    node.attribute(name)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
        <world>
          <gravity direction="0" strength="-10"/>
          <objects>
            <object bodyType="static" name="floor">
              <position x="0" y="300"/>
              <physic density="1.0" friction="0.5" restitution="0.2"/>
              <geometry type="box" width="400" height="10"/>
              <color>#808080</color>
            </object>
            <object bodyType="dynamic" name="box">
              <position x="0" y="100" rotation="0.3"/>
              <physic density="1.0" friction="0.3" restitution="0.5"/>
              <geometry type="circle" radius="8"/>
              <texture>crate.png</texture>
            </object>
          </objects>
          <joints>
            <joint type="revolute">
              <bodies a="box" b="floor"/>
              <motor speed="2.5" torque="100" enable="true"/>
            </joint>
          </joints>
        </world>
    "#;

    #[test]
    fn parses_full_scene() {
        let scene = SceneDesc::parse(SCENE).unwrap();
        assert_eq!(scene.gravity, Some(Vec2::new(0.0, -10.0)));
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.joints.len(), 1);

        let floor = &scene.objects[0];
        assert_eq!(floor.name.as_deref(), Some("floor"));
        assert_eq!(floor.body_type, BodyType::Static);
        assert_eq!(
            floor.geometry,
            Some(GeometryDesc::Box {
                width: 400.0,
                height: 10.0
            })
        );
        assert_eq!(floor.color, Color::GRAY);

        let boxy = &scene.objects[1];
        assert_eq!(boxy.body_type, BodyType::Dynamic);
        assert_eq!(boxy.rotation, 0.3);
        assert_eq!(boxy.texture.as_deref(), Some("crate.png"));

        let joint = &scene.joints[0];
        assert_eq!(joint.body_a, "box");
        assert_eq!(joint.body_b, "floor");
        assert_eq!(
            joint.motor,
            Some(MotorDesc {
                speed: 2.5,
                torque: 100.0,
                enabled: true
            })
        );
    }

    #[test]
    fn wrong_root_aborts_load() {
        let err = SceneDesc::parse("<scene></scene>").unwrap_err();
        assert!(matches!(err, SceneError::NotAWorld(tag) if tag == "scene"));
    }

    #[test]
    fn broken_xml_aborts_load() {
        assert!(matches!(
            SceneDesc::parse("<world><objects>"),
            Err(SceneError::Xml(_))
        ));
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let xml = r#"
            <world>
              <objects>
                <object bodyType="dynamic" name="ok">
                  <position x="1" y="2"/>
                  <geometry type="box" width="10" height="10"/>
                </object>
                <object bodyType="dynamic" name="broken">
                  <position x="oops" y="2"/>
                </object>
                <object bodyType="hovercraft" name="also-broken"/>
              </objects>
              <joints>
                <joint type="rope"><bodies a="ok" b="_ground"/></joint>
                <joint type="revolute"/>
              </joints>
            </world>
        "#;
        let scene = SceneDesc::parse(xml).unwrap();
        assert_eq!(scene.objects.len(), 1);
        assert_eq!(scene.objects[0].name.as_deref(), Some("ok"));
        assert!(scene.joints.is_empty());
    }

    #[test]
    fn missing_gravity_defaults_to_none() {
        let scene = SceneDesc::parse("<world/>").unwrap();
        assert_eq!(scene.gravity, None);
        assert!(scene.objects.is_empty());
    }
}
