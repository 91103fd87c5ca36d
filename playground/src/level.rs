use std::cell::{Cell, RefCell};
use std::f32::consts::FRAC_PI_4;
use std::rc::Rc;

use anyhow::Context;
use physics::rapier3d::prelude::{ColliderHandle, DMatrix, RigidBodyHandle, point, vector};
use physics::{
    BodyKind, ColliderDesc, EventBundle, LocalTransform, NodeId, Quat, RigidBodyDesc, SceneGraph,
    ShapeDesc, Simulation, Vec3,
};

const SPHERE_COUNT: usize = 10;
const SPHERE_RADIUS: f32 = 0.4;

/// Everything in the playground that is not the player.
pub struct Level {
    pub spheres: Vec<(NodeId, RigidBodyHandle)>,
    pub pendulum: (RigidBodyHandle, RigidBodyHandle),
    pub sensor: ColliderHandle,
    /// Total collision-enter callbacks seen by the spheres.
    pub sphere_hits: Rc<Cell<u32>>,
    /// Bodies that touched the sensor; removed after the frame that reported them.
    despawn: Rc<RefCell<Vec<RigidBodyHandle>>>,
}

impl Level {
    pub fn build(sim: &mut Simulation, scene: &mut SceneGraph) -> anyhow::Result<Self> {
        spawn_floor(sim, scene)?;
        spawn_obstacles(sim, scene)?;
        spawn_group(sim, scene)?;

        let sphere_hits = Rc::new(Cell::new(0));
        let spheres = spawn_spheres(sim, scene, sphere_hits.clone())?;
        let pendulum = spawn_pendulum(sim, scene)?;

        let despawn = Rc::new(RefCell::new(Vec::new()));
        let sensor = spawn_sensor(sim, scene, despawn.clone())?;

        Ok(Self {
            spheres,
            pendulum,
            sensor,
            sphere_hits,
            despawn,
        })
    }

    /// Remove whatever the sensor swallowed during the last `advance`.
    pub fn process_despawns(&mut self, sim: &mut Simulation, scene: &mut SceneGraph) {
        let pending: Vec<RigidBodyHandle> = self.despawn.borrow_mut().drain(..).collect();
        for body in pending {
            // Only spheres are swallowed; the player walking through is left alone.
            let Some(&(node, _)) = self.spheres.iter().find(|(_, b)| *b == body) else {
                continue;
            };
            if sim.unmount_body(body) {
                tracing::info!("sensor swallowed {body:?}");
            }
            scene.remove(node);
            self.spheres.retain(|(_, b)| *b != body);
        }
    }
}

fn spawn_floor(sim: &mut Simulation, scene: &mut SceneGraph) -> anyhow::Result<()> {
    // Top face at y = 0.
    let node = scene.add(
        SceneGraph::ROOT,
        LocalTransform::from_translation(Vec3::new(0.0, -0.5, 0.0)),
    )?;
    let body = sim.mount_body(scene, node, &RigidBodyDesc::new(BodyKind::Fixed))?;
    let desc = ColliderDesc::new(ShapeDesc::Cuboid {
        half_extents: vector![25.0, 0.5, 25.0],
    })
    .friction(0.8);
    sim.mount_collider(scene, node, &desc, Some(body))?;
    Ok(())
}

fn spawn_obstacles(sim: &mut Simulation, scene: &mut SceneGraph) -> anyhow::Result<()> {
    let fixed = RigidBodyDesc::from_kind_str("fixed")?;

    // A low step the player can climb and a ramp it can walk up.
    let obstacles = [
        (
            LocalTransform::from_translation(Vec3::new(0.0, 0.15, 9.0)),
            ShapeDesc::Cuboid {
                half_extents: vector![2.0, 0.15, 1.0],
            },
        ),
        (
            LocalTransform::from_translation(Vec3::new(6.0, 0.5, 6.0))
                .with_rotation(Quat::from_axis_angle(&Vec3::x_axis(), 0.35)),
            ShapeDesc::Cuboid {
                half_extents: vector![1.5, 0.1, 3.0],
            },
        ),
        (
            LocalTransform::from_translation(Vec3::new(-6.0, 1.0, 6.0)),
            ShapeDesc::Cylinder {
                half_height: 1.0,
                radius: 0.5,
            },
        ),
        (
            LocalTransform::from_translation(Vec3::new(-3.0, 0.0, 3.0))
                .with_scale(Vec3::new(1.5, 1.0, 1.5)),
            ShapeDesc::ConvexHull {
                points: vec![
                    point![-0.5, 0.0, -0.5],
                    point![0.5, 0.0, -0.5],
                    point![0.5, 0.0, 0.5],
                    point![-0.5, 0.0, 0.5],
                    point![0.0, 0.7, 0.0],
                ],
            },
        ),
    ];

    for (local, shape) in obstacles {
        let node = scene.add(SceneGraph::ROOT, local)?;
        let body = sim.mount_body(scene, node, &fixed)?;
        sim.mount_collider(scene, node, &ColliderDesc::new(shape), Some(body))?;
    }

    // Freestanding bumpy terrain patch, attached to no body.
    let heights = DMatrix::from_fn(9, 9, |i, j| {
        ((i as f32 * 0.7).sin() + (j as f32 * 0.5).cos()) * 0.1
    });
    let node = scene.add(
        SceneGraph::ROOT,
        LocalTransform::from_translation(Vec3::new(15.0, 0.0, 15.0)),
    )?;
    let terrain = ColliderDesc::new(ShapeDesc::HeightField {
        heights,
        scale: vector![8.0, 1.0, 8.0],
    });
    sim.mount_collider(scene, node, &terrain, None)?;
    Ok(())
}

/// Crates nested in a rotated, offset group.
fn spawn_group(sim: &mut Simulation, scene: &mut SceneGraph) -> anyhow::Result<()> {
    let group = scene.add(
        SceneGraph::ROOT,
        LocalTransform::from_translation(Vec3::new(6.0, 0.0, -6.0))
            .with_rotation(Quat::from_axis_angle(&Vec3::y_axis(), FRAC_PI_4)),
    )?;

    for i in 0..3 {
        let node = scene.add(
            group,
            LocalTransform::from_translation(Vec3::new(0.0, 0.5 + i as f32 * 1.05, 0.0)),
        )?;
        let body = sim.mount_body(scene, node, &RigidBodyDesc::default())?;
        let desc = ColliderDesc::new(ShapeDesc::RoundCuboid {
            half_extents: vector![0.45, 0.45, 0.45],
            border_radius: 0.05,
        })
        .density(0.5);
        sim.mount_collider(scene, node, &desc, Some(body))?;
    }
    Ok(())
}

fn spawn_spheres(
    sim: &mut Simulation,
    scene: &mut SceneGraph,
    hits: Rc<Cell<u32>>,
) -> anyhow::Result<Vec<(NodeId, RigidBodyHandle)>> {
    let mut spheres = Vec::with_capacity(SPHERE_COUNT);
    for i in 0..SPHERE_COUNT {
        let x = (i as f32 - SPHERE_COUNT as f32 / 2.0) * 1.5;
        let node = scene.add(
            SceneGraph::ROOT,
            LocalTransform::from_translation(Vec3::new(x, 3.0 + i as f32 * 0.5, -2.0)),
        )?;
        let body = sim.mount_body(scene, node, &RigidBodyDesc::default())?;
        let desc = ColliderDesc::new(ShapeDesc::Ball {
            radius: SPHERE_RADIUS,
        })
        .restitution(0.3);
        sim.mount_collider(scene, node, &desc, Some(body))?;

        let counter = hits.clone();
        sim.set_body_events(
            body,
            EventBundle::new().on_collision_enter(move |event| {
                counter.set(counter.get() + 1);
                tracing::debug!(
                    "sphere {:?} hit {:?}",
                    event.this.body_node,
                    event.target.collider_node
                );
            }),
        );
        spheres.push((node, body));
    }

    // One extra sphere dropped straight into the sensor.
    let node = scene.add(
        SceneGraph::ROOT,
        LocalTransform::from_translation(Vec3::new(0.0, 4.0, -8.0)),
    )?;
    let body = sim.mount_body(scene, node, &RigidBodyDesc::default())?;
    sim.mount_collider(
        scene,
        node,
        &ColliderDesc::new(ShapeDesc::Ball {
            radius: SPHERE_RADIUS,
        }),
        Some(body),
    )?;
    spheres.push((node, body));

    Ok(spheres)
}

fn spawn_pendulum(
    sim: &mut Simulation,
    scene: &mut SceneGraph,
) -> anyhow::Result<(RigidBodyHandle, RigidBodyHandle)> {
    let anchor_node = scene.add(
        SceneGraph::ROOT,
        LocalTransform::from_translation(Vec3::new(-8.0, 6.0, -4.0)),
    )?;
    let anchor = sim.mount_body(scene, anchor_node, &RigidBodyDesc::new(BodyKind::Fixed))?;

    let bob_node = scene.add(
        SceneGraph::ROOT,
        LocalTransform::from_translation(Vec3::new(-8.0, 3.5, -4.0)),
    )?;
    let bob_desc = RigidBodyDesc {
        linvel: vector![3.0, 0.0, 0.0],
        angular_damping: 0.5,
        ..RigidBodyDesc::default()
    };
    let bob = sim.mount_body(scene, bob_node, &bob_desc)?;
    sim.mount_collider(
        scene,
        bob_node,
        &ColliderDesc::new(ShapeDesc::Ball { radius: 0.5 }).density(2.0),
        Some(bob),
    )?;

    sim.mount_spherical_joint(anchor, bob, point![0.0, 0.0, 0.0], point![0.0, 2.5, 0.0])
        .context("pendulum joint")?;
    Ok((anchor, bob))
}

fn spawn_sensor(
    sim: &mut Simulation,
    scene: &mut SceneGraph,
    despawn: Rc<RefCell<Vec<RigidBodyHandle>>>,
) -> anyhow::Result<ColliderHandle> {
    let node = scene.add(
        SceneGraph::ROOT,
        LocalTransform::from_translation(Vec3::new(0.0, 0.75, -8.0)),
    )?;
    let body = sim.mount_body(scene, node, &RigidBodyDesc::new(BodyKind::Fixed))?;
    let desc = ColliderDesc::new(ShapeDesc::Cuboid {
        half_extents: vector![1.0, 0.75, 1.0],
    })
    .sensor(true);
    let sensor = sim.mount_collider(scene, node, &desc, Some(body))?;

    // Callbacks run inside `advance` and cannot unmount; queue the body instead.
    sim.set_collider_events(
        sensor,
        EventBundle::new()
            .on_collision_enter(move |event| {
                if let Some(body) = event.target.body {
                    despawn.borrow_mut().push(body);
                }
            })
            .on_collision_exit(|event| {
                tracing::debug!("left sensor: {:?}", event.target.collider);
            }),
    );
    Ok(sensor)
}
