//! Local/world transform conversion between the scene graph and the physics world.
//!
//! Rapier only knows world space. Scene nodes store parent-relative transforms. At mount we
//! decompose the node's world matrix (so shapes see ancestor scaling and bodies start at the
//! rendered pose) and, for nodes nested under a non-root parent, cache the inverse of the
//! parent's world matrix. Every write-back applies that correction so the parent transform is
//! not applied twice.
//!
//! Notes
//! - The correction is captured once per mount. A parent that moves afterwards leaves the child
//!   rendering with a stale offset until it is remounted.
//! - Only local translation and rotation are written back; node scale is owned by the scene.

use std::collections::HashMap;

use nalgebra as na;
use rapier3d::prelude::RigidBodyHandle;

use crate::error::Result;
use crate::scene::{Mat4, NodeId, Quat, SceneGraph, Vec3};

/// World-space pose extracted from a homogeneous matrix.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorldPose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl WorldPose {
    pub fn isometry(&self) -> na::Isometry3<f32> {
        na::Isometry3::from_parts(na::Translation3::from(self.translation), self.rotation)
    }
}

/// Split `m` into translation, rotation and (signed) scale.
///
/// A negative determinant is folded into the X scale so the remaining basis is a proper
/// rotation.
pub fn decompose(m: &Mat4) -> WorldPose {
    let translation = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);

    let basis: na::Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let mut scale = Vec3::new(
        basis.column(0).norm(),
        basis.column(1).norm(),
        basis.column(2).norm(),
    );
    if basis.determinant() < 0.0 {
        scale.x = -scale.x;
    }

    let mut rot = basis;
    for (i, s) in scale.iter().enumerate() {
        if s.abs() > f32::EPSILON {
            let col = rot.column(i) / *s;
            rot.set_column(i, &col);
        }
    }

    let rotation = Quat::from_rotation_matrix(&na::Rotation3::from_matrix_unchecked(rot));

    WorldPose {
        translation,
        rotation,
        scale,
    }
}

/// Blend two poses: lerp translation, slerp rotation.
pub fn interpolate(
    previous: &na::Isometry3<f32>,
    current: &na::Isometry3<f32>,
    alpha: f32,
) -> na::Isometry3<f32> {
    let t = previous
        .translation
        .vector
        .lerp(&current.translation.vector, alpha);
    let r = previous
        .rotation
        .try_slerp(&current.rotation, alpha, 1.0e-6)
        .unwrap_or(current.rotation);
    na::Isometry3::from_parts(na::Translation3::from(t), r)
}

/// Per-body cache of world-to-parent corrections.
#[derive(Debug, Default)]
pub struct TransformSync {
    /// `None` means the node hangs directly off the scene root (world == local).
    corrections: HashMap<RigidBodyHandle, Option<Mat4>>,
}

impl TransformSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute and cache the correction for `body`, owned by `node`.
    pub fn capture(&mut self, scene: &SceneGraph, node: NodeId, body: RigidBodyHandle) -> Result<()> {
        let correction = correction_for(scene, node)?;
        self.insert(body, correction);
        Ok(())
    }

    /// Cache a correction computed earlier with [`correction_for`].
    pub fn insert(&mut self, body: RigidBodyHandle, correction: Option<Mat4>) {
        self.corrections.insert(body, correction);
    }

    pub fn forget(&mut self, body: RigidBodyHandle) {
        self.corrections.remove(&body);
    }

    pub fn correction(&self, body: RigidBodyHandle) -> Option<&Mat4> {
        self.corrections.get(&body).and_then(Option::as_ref)
    }

    pub fn is_tracked(&self, body: RigidBodyHandle) -> bool {
        self.corrections.contains_key(&body)
    }

    pub fn clear(&mut self) {
        self.corrections.clear();
    }

    /// Write a world-space `pose` into `node`'s local translation/rotation.
    pub fn write_back(
        &self,
        scene: &mut SceneGraph,
        node: NodeId,
        body: RigidBodyHandle,
        pose: &na::Isometry3<f32>,
    ) -> Result<()> {
        let (translation, rotation) = to_local(self.correction(body), pose);
        scene.set_local_pose(node, translation, rotation)
    }
}

/// The inverted parent world matrix, or `None` when the parent is the scene root.
pub fn correction_for(scene: &SceneGraph, node: NodeId) -> Result<Option<Mat4>> {
    if scene.is_root_child(node) {
        return Ok(None);
    }
    match scene.parent(node) {
        Some(parent) => {
            let parent_world = scene.world_matrix(parent)?;
            // A singular parent (zero scale) cannot host a physics child; fall back to raw world.
            Ok(parent_world.try_inverse())
        }
        None => Ok(None),
    }
}

/// Convert a world pose into the parent-local pose implied by `correction`.
pub fn to_local(correction: Option<&Mat4>, pose: &na::Isometry3<f32>) -> (Vec3, Quat) {
    match correction {
        None => (pose.translation.vector, pose.rotation),
        Some(c) => {
            let local = decompose(&(c * pose.to_homogeneous()));
            (local.translation, local.rotation)
        }
    }
}
