use std::str::FromStr;

use rapier3d::na::{DMatrix, UnitQuaternion};
use rapier3d::prelude::*;

use crate::error::{PhysicsError, Result};

/// Shape parameters for a collider, expressed in the owning node's *unscaled* local units.
///
/// The owner's world scale is applied by [`ShapeDesc::build`], so a `Ball { radius: 0.5 }` on a
/// node scaled by 2 collides as a 1m sphere.
#[derive(Clone, Debug)]
pub enum ShapeDesc {
    /// Oriented cuboid with given half-extents.
    Cuboid { half_extents: Vector<Real> },

    /// Sphere/ball.
    Ball { radius: Real },

    /// Y-aligned cylinder.
    Cylinder { half_height: Real, radius: Real },

    /// Y-aligned cone.
    Cone { half_height: Real, radius: Real },

    /// Y-aligned capsule. `half_height` excludes the hemispherical caps.
    Capsule { half_height: Real, radius: Real },

    /// Rounded cuboid.
    ///
    /// `border_radius` rounds all edges/corners and is not scaled.
    RoundCuboid {
        half_extents: Vector<Real>,
        border_radius: Real,
    },

    /// Convex hull of a point cloud.
    ConvexHull { points: Vec<Point<Real>> },

    /// Triangle mesh.
    TriMesh {
        vertices: Vec<Point<Real>>,
        indices: Vec<[u32; 3]>,
    },

    /// Heightfield. Rows run along X, columns along Z; `scale` is the full X/Y/Z extent.
    HeightField {
        heights: DMatrix<Real>,
        scale: Vector<Real>,
    },
}

impl ShapeDesc {
    /// Build the engine shape with every dimension pre-multiplied by `scale`.
    ///
    /// Scaling rules
    /// - Cuboids, meshes, hulls and heightfields scale per axis.
    /// - Balls scale by the largest axis.
    /// - Y-aligned round shapes scale their half height by `scale.y` and radius by
    ///   `max(scale.x, scale.z)`.
    pub fn build(&self, scale: &Vector<Real>) -> Result<SharedShape> {
        validate_scale(scale)?;
        let radial = scale.x.abs().max(scale.z.abs());
        let axial = scale.y.abs();

        let shape = match self {
            ShapeDesc::Cuboid { half_extents } => {
                let he = half_extents.component_mul(scale).abs();
                SharedShape::cuboid(he.x, he.y, he.z)
            }

            ShapeDesc::Ball { radius } => SharedShape::ball(radius * scale.abs().max()),

            ShapeDesc::Cylinder {
                half_height,
                radius,
            } => SharedShape::cylinder(half_height * axial, radius * radial),

            ShapeDesc::Cone {
                half_height,
                radius,
            } => SharedShape::cone(half_height * axial, radius * radial),

            ShapeDesc::Capsule {
                half_height,
                radius,
            } => SharedShape::capsule_y(half_height * axial, radius * radial),

            ShapeDesc::RoundCuboid {
                half_extents,
                border_radius,
            } => {
                let he = half_extents.component_mul(scale).abs();
                SharedShape::round_cuboid(he.x, he.y, he.z, *border_radius)
            }

            ShapeDesc::ConvexHull { points } => {
                let scaled = scale_points(points, scale);
                SharedShape::convex_hull(&scaled).ok_or_else(|| {
                    PhysicsError::InvalidShape(format!(
                        "convex hull of {} points is degenerate",
                        points.len()
                    ))
                })?
            }

            ShapeDesc::TriMesh { vertices, indices } => {
                if indices.is_empty() {
                    return Err(PhysicsError::InvalidShape("trimesh has no triangles".into()));
                }
                let scaled = scale_points(vertices, scale);
                SharedShape::trimesh(scaled, indices.clone())
                    .map_err(|err| PhysicsError::InvalidShape(format!("trimesh: {err:?}")))?
            }

            ShapeDesc::HeightField { heights, scale: hs } => {
                if heights.nrows() < 2 || heights.ncols() < 2 {
                    return Err(PhysicsError::InvalidShape(
                        "heightfield needs at least 2x2 samples".into(),
                    ));
                }
                SharedShape::heightfield(heights.clone(), hs.component_mul(scale))
            }
        };

        Ok(shape)
    }
}

fn validate_scale(scale: &Vector<Real>) -> Result<()> {
    let ok = scale.iter().all(|s| s.is_finite() && s.abs() > Real::EPSILON);
    if ok {
        Ok(())
    } else {
        Err(PhysicsError::InvalidScale(scale.x, scale.y, scale.z))
    }
}

fn scale_points(points: &[Point<Real>], scale: &Vector<Real>) -> Vec<Point<Real>> {
    points
        .iter()
        .map(|p| Point::from(p.coords.component_mul(scale)))
        .collect()
}

/// How a body participates in the simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum BodyKind {
    #[default]
    Dynamic,
    Fixed,
    KinematicVelocity,
    KinematicPosition,
}

impl BodyKind {
    pub fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Fixed => RigidBodyType::Fixed,
            BodyKind::KinematicVelocity => RigidBodyType::KinematicVelocityBased,
            BodyKind::KinematicPosition => RigidBodyType::KinematicPositionBased,
        }
    }
}

impl FromStr for BodyKind {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dynamic" => Ok(BodyKind::Dynamic),
            "fixed" => Ok(BodyKind::Fixed),
            "kinematicVelocity" | "kinematic-velocity" | "kinematic_velocity" => {
                Ok(BodyKind::KinematicVelocity)
            }
            "kinematicPosition" | "kinematic-position" | "kinematic_position" => {
                Ok(BodyKind::KinematicPosition)
            }
            other => Err(PhysicsError::UnsupportedBodyType(other.to_owned())),
        }
    }
}

/// Rigid-body configuration applied at creation time.
#[derive(Clone, Debug)]
pub struct RigidBodyDesc {
    pub kind: BodyKind,
    pub linvel: Vector<Real>,
    pub angvel: Vector<Real>,
    pub linear_damping: Real,
    pub angular_damping: Real,
    pub gravity_scale: Real,
    /// Per-axis translation enable flags (X, Y, Z). `false` locks the axis.
    pub enabled_translations: [bool; 3],
    /// Per-axis rotation enable flags (X, Y, Z). `false` locks the axis.
    pub enabled_rotations: [bool; 3],
    pub ccd: bool,
    pub can_sleep: bool,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            enabled_translations: [true; 3],
            enabled_rotations: [true; 3],
            ccd: false,
            can_sleep: true,
        }
    }
}

impl RigidBodyDesc {
    pub fn new(kind: BodyKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Parse the body kind from its string name.
    pub fn from_kind_str(kind: &str) -> Result<Self> {
        Ok(Self::new(kind.parse()?))
    }

    /// Rapier body placed at the given *world* pose.
    pub fn build(&self, translation: Vector<Real>, rotation: UnitQuaternion<Real>) -> RigidBody {
        let [tx, ty, tz] = self.enabled_translations;
        let [rx, ry, rz] = self.enabled_rotations;
        RigidBodyBuilder::new(self.kind.to_rapier())
            .translation(translation)
            .rotation(rotation.scaled_axis())
            .linvel(self.linvel)
            .angvel(self.angvel)
            .linear_damping(self.linear_damping)
            .angular_damping(self.angular_damping)
            .gravity_scale(self.gravity_scale)
            .enabled_translations(tx, ty, tz)
            .enabled_rotations(rx, ry, rz)
            .ccd_enabled(self.ccd)
            .can_sleep(self.can_sleep)
            .build()
    }
}

/// Collider configuration applied at creation time.
#[derive(Clone, Debug)]
pub struct ColliderDesc {
    pub shape: ShapeDesc,
    pub friction: Real,
    pub restitution: Real,
    pub density: Real,
    pub sensor: bool,
}

impl ColliderDesc {
    pub fn new(shape: ShapeDesc) -> Self {
        Self {
            shape,
            friction: 0.5,
            restitution: 0.0,
            density: 1.0,
            sensor: false,
        }
    }

    pub fn friction(mut self, friction: Real) -> Self {
        self.friction = friction;
        self
    }

    pub fn restitution(mut self, restitution: Real) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn density(mut self, density: Real) -> Self {
        self.density = density;
        self
    }

    pub fn sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    /// Rapier collider at `translation`/`rotation` relative to its parent (or the world, when
    /// freestanding). Rapier cannot re-pose a collider relative to its parent after the fact, so
    /// the pose is part of construction.
    pub fn build(
        &self,
        scale: &Vector<Real>,
        translation: Vector<Real>,
        rotation: UnitQuaternion<Real>,
        active_events: ActiveEvents,
    ) -> Result<Collider> {
        let shape = self.shape.build(scale)?;
        Ok(ColliderBuilder::new(shape)
            .translation(translation)
            .rotation(rotation.scaled_axis())
            .friction(self.friction)
            .restitution(self.restitution)
            .density(self.density)
            .sensor(self.sensor)
            .active_events(active_events)
            .build())
    }
}

/// Ball-and-socket joint between two bodies with body-local anchors.
pub fn spherical_joint(anchor1: Point<Real>, anchor2: Point<Real>) -> GenericJoint {
    SphericalJointBuilder::new()
        .local_anchor1(anchor1)
        .local_anchor2(anchor2)
        .build()
        .into()
}
