use std::cell::RefCell;
use std::rc::Rc;

use physics::rapier3d::prelude::RigidBodyHandle;
use physics::{
    BodyKind, CharacterController, ColliderDesc, ControllerSettings, LocalTransform, NodeId,
    RigidBodyDesc, SceneGraph, ScriptedInput, ShapeDesc, Simulation, StepHook, Vec3,
};

const CAPSULE_RADIUS: f32 = 0.3;
const CAPSULE_HALF_HEIGHT: f32 = 0.6;

/// The kinematic capsule driven by the character controller.
pub struct Player {
    pub node: NodeId,
    pub body: RigidBodyHandle,
    pub controller: Rc<RefCell<CharacterController>>,
    pub input: Rc<ScriptedInput>,
    hook: StepHook,
}

impl Player {
    pub fn spawn(
        sim: &mut Simulation,
        scene: &mut SceneGraph,
        settings: &ControllerSettings,
    ) -> anyhow::Result<Self> {
        let node = scene.add(
            SceneGraph::ROOT,
            LocalTransform::from_translation(Vec3::new(0.0, 1.5, 5.0)),
        )?;
        let body = sim.mount_body(scene, node, &RigidBodyDesc::new(BodyKind::KinematicPosition))?;
        let capsule = ColliderDesc::new(ShapeDesc::Capsule {
            half_height: CAPSULE_HALF_HEIGHT,
            radius: CAPSULE_RADIUS,
        });
        sim.mount_collider(scene, node, &capsule, Some(body))?;

        let input = Rc::new(ScriptedInput::default());
        let mut controller = CharacterController::new(settings.clone(), input.clone())?;
        controller.attach(body);

        let (controller, hook) = controller.into_hook();
        sim.add_pre_step(hook.clone());

        Ok(Self {
            node,
            body,
            controller,
            input,
            hook,
        })
    }

    pub fn translation(&self, sim: &Simulation) -> Option<Vec3> {
        sim.world()
            .and_then(|w| w.bodies.get(self.body))
            .map(|b| *b.translation())
    }

    pub fn despawn(self, sim: &mut Simulation, scene: &mut SceneGraph) {
        sim.remove_pre_step(&self.hook);
        self.controller.borrow_mut().detach();
        sim.unmount_body(self.body);
        scene.remove(self.node);
    }
}
