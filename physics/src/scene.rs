//! Retained scene graph read and written by the physics layer.
//!
//! Each physics-backed entity owns one node. The physics layer only ever:
//! - reads a node's world matrix once at mount (scale and world pose extraction), and
//! - writes a node's *local* translation/rotation every rendered frame.
//!
//! Nodes live in an arena indexed by [`NodeId`]. Removed slots are never reused, so a stale
//! `NodeId` resolves to nothing instead of to a different node.

use nalgebra as na;

use crate::error::{PhysicsError, Result};

pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Mat4 = na::Matrix4<f32>;

/// Opaque scene node identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Parent-relative transform of a node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::repeat(1.0),
        }
    }
}

impl LocalTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// `T * R * S` as a homogeneous matrix.
    pub fn to_matrix(&self) -> Mat4 {
        let iso = na::Isometry3::from_parts(na::Translation3::from(self.translation), self.rotation);
        iso.to_homogeneous() * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    local: LocalTransform,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<Option<Node>>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// The scene root. Always live, always identity.
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                parent: None,
                local: LocalTransform::default(),
                children: Vec::new(),
            })],
        }
    }

    /// Add a node under `parent` (which must be live).
    pub fn add(&mut self, parent: NodeId, local: LocalTransform) -> Result<NodeId> {
        if !self.contains(parent) {
            return Err(PhysicsError::UnknownNode(parent));
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node {
            parent: Some(parent),
            local,
            children: Vec::new(),
        }));
        if let Some(Some(p)) = self.nodes.get_mut(parent.index()) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Remove `node` and all of its descendants. Removing twice (or removing the root) is a no-op.
    pub fn remove(&mut self, node: NodeId) {
        if node == Self::ROOT || !self.contains(node) {
            return;
        }

        if let Some(parent) = self.parent(node) {
            if let Some(Some(p)) = self.nodes.get_mut(parent.index()) {
                p.children.retain(|&c| c != node);
            }
        }

        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                if let Some(removed) = slot.take() {
                    pending.extend(removed.children);
                }
            }
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        matches!(self.nodes.get(node.index()), Some(Some(_)))
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    /// Whether the node hangs directly off the scene root.
    pub fn is_root_child(&self, node: NodeId) -> bool {
        self.parent(node) == Some(Self::ROOT)
    }

    pub fn local(&self, node: NodeId) -> Option<&LocalTransform> {
        self.node(node).map(|n| &n.local)
    }

    pub fn set_local(&mut self, node: NodeId, local: LocalTransform) -> Result<()> {
        let n = self.node_mut(node)?;
        n.local = local;
        Ok(())
    }

    /// Overwrite local translation and rotation. Scale is left untouched.
    pub fn set_local_pose(&mut self, node: NodeId, translation: Vec3, rotation: Quat) -> Result<()> {
        let n = self.node_mut(node)?;
        n.local.translation = translation;
        n.local.rotation = rotation;
        Ok(())
    }

    /// Compose `parent_world * local` up to the root.
    pub fn world_matrix(&self, node: NodeId) -> Result<Mat4> {
        let mut current = Some(node);
        let mut world = Mat4::identity();
        while let Some(id) = current {
            let n = self.node(id).ok_or(PhysicsError::UnknownNode(id))?;
            world = n.local.to_matrix() * world;
            current = n.parent;
        }
        Ok(world)
    }

    fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(node.index())
            .and_then(Option::as_mut)
            .ok_or(PhysicsError::UnknownNode(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut scene = SceneGraph::new();
        let group = scene
            .add(
                SceneGraph::ROOT,
                LocalTransform::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            )
            .unwrap();
        let child = scene
            .add(group, LocalTransform::from_translation(Vec3::new(0.0, 1.0, 0.0)))
            .unwrap();

        let world = scene.world_matrix(child).unwrap();
        let p = world.transform_point(&na::Point3::origin());
        assert!((p - na::Point3::new(5.0, 1.0, 0.0)).norm() < 1.0e-6);
    }

    #[test]
    fn removal_takes_descendants_and_is_idempotent() {
        let mut scene = SceneGraph::new();
        let group = scene.add(SceneGraph::ROOT, LocalTransform::default()).unwrap();
        let child = scene.add(group, LocalTransform::default()).unwrap();

        scene.remove(group);
        assert!(!scene.contains(group));
        assert!(!scene.contains(child));

        scene.remove(group);
        assert!(scene.contains(SceneGraph::ROOT));
        assert!(matches!(
            scene.add(group, LocalTransform::default()),
            Err(PhysicsError::UnknownNode(_))
        ));
    }

    #[test]
    fn set_local_pose_keeps_scale() {
        let mut scene = SceneGraph::new();
        let node = scene
            .add(
                SceneGraph::ROOT,
                LocalTransform::default().with_scale(Vec3::new(2.0, 2.0, 2.0)),
            )
            .unwrap();

        scene
            .set_local_pose(node, Vec3::new(1.0, 2.0, 3.0), Quat::identity())
            .unwrap();

        let local = scene.local(node).unwrap();
        assert_eq!(local.scale, Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(local.translation, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn set_local_replaces_scale_and_root_children_are_reported() {
        let mut scene = SceneGraph::new();
        let group = scene.add(SceneGraph::ROOT, LocalTransform::default()).unwrap();
        let child = scene.add(group, LocalTransform::default()).unwrap();
        assert!(scene.is_root_child(group));
        assert!(!scene.is_root_child(child));
        assert!(!scene.is_root_child(SceneGraph::ROOT));

        scene
            .set_local(child, LocalTransform::default().with_scale(Vec3::new(3.0, 1.0, 1.0)))
            .unwrap();
        assert_eq!(scene.local(child).unwrap().scale, Vec3::new(3.0, 1.0, 1.0));

        scene.remove(group);
        assert!(matches!(
            scene.set_local(child, LocalTransform::default()),
            Err(PhysicsError::UnknownNode(_))
        ));
    }
}
