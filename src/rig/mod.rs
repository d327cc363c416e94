mod parse;

pub use parse::{fetch_assets, parse_rig_description};

use std::sync::Arc;

use nalgebra::Vector3;
use thiserror::Error;

use crate::asset::FetchedAsset;
use crate::transform::CFrame;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to parse rig description: {0}")]
    InvalidDescription(#[from] serde_json::Error),
    #[error("object key {0:?} is not a numeric id")]
    InvalidKey(String),
    #[error("object {name:?} references unknown id {id}")]
    UnresolvedReference { name: String, id: i64 },
    #[error("rig description has no root object")]
    NoRoot,
    #[error("rig description has multiple roots: {first:?} and {second:?}")]
    MultipleRoots { first: String, second: String },
}

/// Index of a node within its owning [`RigGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Marker geometry assigned to an attachment during skeleton reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentMarker {
    Sphere,
    Spike,
}

/// Which constraint classes participate in skeleton reconstruction: only
/// motor constraints produce bones, welds are purely structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Weld,
    Motor,
}

#[derive(Debug, Clone)]
pub struct MeshPartData {
    pub mesh_id: String,
    pub texture_id: String,
    pub mesh_type: String,
    pub offset: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub size: Vector3<f32>,
    pub mesh_payload: Option<Arc<FetchedAsset>>,
    pub texture_payload: Option<Arc<FetchedAsset>>,
}

#[derive(Debug, Clone)]
pub struct ConstraintData {
    pub kind: ConstraintKind,
    pub part0: Option<NodeId>,
    pub part1: Option<NodeId>,
    pub c0: CFrame,
    pub c1: CFrame,
    pub transform: CFrame,
}

/// Variant payloads for the closed set of rig node classes.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Group {
        primary: Option<NodeId>,
    },
    RigidBody {
        size: Vector3<f32>,
    },
    SkinnedMesh(MeshPartData),
    Bone {
        /// Frame relative to the parent bone, set once the bone is attached.
        local_frame: Option<CFrame>,
        /// The constraint this bone was synthesized from, cleared when the
        /// bone is resolved into the hierarchy.
        constraint: Option<NodeId>,
    },
    Attachment {
        marker: Option<AttachmentMarker>,
    },
    Accessory {
        attach_point: CFrame,
    },
    Constraint(ConstraintData),
}

#[derive(Debug, Clone)]
pub struct RigNode {
    pub name: String,
    pub frame: CFrame,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

impl RigNode {
    pub fn is_geometry(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::RigidBody { .. } | NodeKind::SkinnedMesh(_)
        )
    }
}

/// Arena-backed rig node graph with a single root.
#[derive(Debug, Clone)]
pub struct RigGraph {
    nodes: Vec<RigNode>,
    root: NodeId,
}

impl RigGraph {
    pub(crate) fn new(nodes: Vec<RigNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &RigNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut RigNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Appends a freshly constructed node to the arena.
    pub(crate) fn push(&mut self, node: RigNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Links `child` under `parent`, replacing any previous parent link.
    pub(crate) fn attach(&mut self, child: NodeId, parent: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Detaches `child` from its parent, leaving it parentless.
    pub(crate) fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node_mut(child).parent.take() {
            self.node_mut(parent).children.retain(|&id| id != child);
        }
    }

    /// Pre-order traversal of the subtree rooted at `start`.
    pub fn linearize(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            // Reverse so children pop in declaration order.
            for &child in self.node(id).children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}
