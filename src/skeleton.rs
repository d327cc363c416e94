use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::rig::{AttachmentMarker, ConstraintKind, NodeId, NodeKind, RigGraph, RigNode};
use crate::transform::CFrame;

/// Name of the synthetic skeleton root bone.
pub const ROOT_BONE_NAME: &str = "HumanoidRootNode";

/// A motor constraint with this name re-centers the whole scene on its
/// first attach frame instead of the primary body.
const ROOT_CONSTRAINT_NAME: &str = "Root";

/// Suffix appended to geometry node names; bones locate their geometry by
/// `bone name + suffix`.
const GEOMETRY_SUFFIX: &str = "_Geo";

/// Grip attachments carry an extra half-turn about X and a spike marker so
/// the grip axis is visible in the destination tool.
const GRIP_ATTACHMENT_NAMES: [&str; 2] = ["LeftGrip_Att", "RightGrip_Att"];

#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("rig has no primary body to center the scene on")]
    MissingPrimaryBody,
    #[error("constraint {name:?} references a missing body")]
    DanglingConstraint { name: String },
    #[error("both bodies of constraint for bone {name:?} are already attached to the skeleton")]
    AmbiguousConstraint { name: String },
    #[error("constraint graph is disconnected or cyclic; {unresolved} bone(s) left unattached")]
    DisconnectedGraph { unresolved: usize },
}

/// An accessory subtree scheduled for separate export: the accessory node
/// (for its name) plus its flattened geometry/attachment members.
#[derive(Debug)]
pub struct AccessoryGroup {
    pub node: NodeId,
    pub members: Vec<NodeId>,
}

/// Result of skeleton reconstruction: a rooted bone tree inside the graph
/// arena plus the accessory groups split off before reconstruction.
#[derive(Debug)]
pub struct Skeleton {
    pub root_bone: NodeId,
    pub bones: Vec<NodeId>,
    pub accessories: Vec<AccessoryGroup>,
}

/// Converts the rig's pairwise motor constraints into a rooted bone tree and
/// re-parents geometry and attachments onto their owning bones.
///
/// Reconstruction is all-or-nothing: a disconnected or cyclic constraint
/// graph, an ambiguous constraint or a missing primary body aborts with an
/// error and the graph must be considered unusable afterwards.
pub fn reconstruct(graph: &mut RigGraph) -> Result<Skeleton, ReconstructionError> {
    let root = graph.root();

    // Accessories hang off the rig root but are exported as a separate
    // group; split them off before the skeleton passes.
    let accessory_ids: Vec<NodeId> = graph
        .node(root)
        .children
        .iter()
        .copied()
        .filter(|&id| matches!(graph.node(id).kind, NodeKind::Accessory { .. }))
        .collect();
    for &id in &accessory_ids {
        debug!("accessory: {}", graph.node(id).name);
        graph.detach(id);
    }

    let primary = match &graph.node(root).kind {
        NodeKind::Group { primary } => *primary,
        NodeKind::RigidBody { .. } | NodeKind::SkinnedMesh(_) => Some(root),
        _ => None,
    }
    .ok_or(ReconstructionError::MissingPrimaryBody)?;

    let nodes = graph.linearize(root);

    // The primary body's world frame centers the scene, unless a motor
    // constraint named "Root" overrides it with its first joint frame.
    let mut scene_center = graph.node(primary).frame;
    for &id in &nodes {
        let node = graph.node(id);
        if let NodeKind::Constraint(data) = &node.kind
            && data.kind == ConstraintKind::Motor
            && node.name == ROOT_CONSTRAINT_NAME
        {
            let part0 = data.part0.ok_or_else(|| ReconstructionError::DanglingConstraint {
                name: node.name.clone(),
            })?;
            scene_center = graph.node(part0).frame.compose(&data.c0);
            break;
        }
    }
    let center_inv = scene_center.inverse();

    debug!("1. center scene");
    for &id in &nodes {
        let node = graph.node_mut(id);
        if matches!(
            node.kind,
            NodeKind::RigidBody { .. } | NodeKind::SkinnedMesh(_) | NodeKind::Bone { .. }
        ) {
            node.frame = center_inv.compose(&node.frame);
        }
    }

    debug!("2. generate bones");
    let mut bones = Vec::new();
    let root_bone = graph.push(RigNode {
        name: ROOT_BONE_NAME.to_string(),
        frame: CFrame::identity(),
        parent: None,
        children: Vec::new(),
        kind: NodeKind::Bone {
            local_frame: Some(CFrame::identity()),
            constraint: None,
        },
    });
    bones.push(root_bone);

    // (constraint id, bone name, joint world frame, both endpoints).
    let mut pending = Vec::new();
    for &id in &nodes {
        if id == primary {
            continue;
        }
        let node = graph.node(id);
        let NodeKind::Constraint(data) = &node.kind else {
            continue;
        };
        if data.kind != ConstraintKind::Motor {
            continue;
        }
        let (Some(part0), Some(part1)) = (data.part0, data.part1) else {
            return Err(ReconstructionError::DanglingConstraint {
                name: node.name.clone(),
            });
        };

        // Both sides of the constraint describe the same joint location
        // (part0.frame * c0 == part1.frame * c1); only the first is used.
        let frame = graph.node(part0).frame.compose(&data.c0).to_export_space();
        let name = graph.node(part1).name.clone();
        pending.push((id, name, frame, part0, part1));
    }

    let mut bone_endpoints: HashMap<NodeId, (NodeId, NodeId)> = HashMap::new();
    for (constraint, name, frame, part0, part1) in pending {
        let bone = graph.push(RigNode {
            name,
            frame,
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Bone {
                local_frame: None,
                constraint: Some(constraint),
            },
        });
        bone_endpoints.insert(bone, (part0, part1));
        bones.push(bone);
    }

    debug!("3. rename geometry");
    for &id in &nodes {
        if graph.node(id).is_geometry() {
            graph.node_mut(id).name.push_str(GEOMETRY_SUFFIX);
        }
    }

    debug!("4. build hierarchy");
    let mut connected: HashMap<NodeId, NodeId> = HashMap::new();
    connected.insert(primary, root_bone);

    let mut unresolved = bones.len() - 1;
    while unresolved > 0 {
        // Scan-then-apply: candidates are collected against the previous
        // pass's connection state, then linked as a batch.
        let mut batch = Vec::new();
        for &bone_id in &bones {
            let NodeKind::Bone {
                constraint: Some(_),
                ..
            } = &graph.node(bone_id).kind
            else {
                continue;
            };
            let Some(&(part0, part1)) = bone_endpoints.get(&bone_id) else {
                continue;
            };

            match (connected.get(&part0), connected.get(&part1)) {
                (Some(_), Some(_)) => {
                    return Err(ReconstructionError::AmbiguousConstraint {
                        name: graph.node(bone_id).name.clone(),
                    });
                }
                (Some(&parent), None) => batch.push((bone_id, parent, part1)),
                (None, Some(&parent)) => batch.push((bone_id, parent, part0)),
                (None, None) => {}
            }
        }

        if batch.is_empty() {
            return Err(ReconstructionError::DisconnectedGraph { unresolved });
        }

        for (bone_id, parent_bone, child_part) in batch {
            debug!(
                "{} -> {}/{}",
                graph.node(parent_bone).name,
                graph.node(bone_id).name,
                graph.node(child_part).name
            );
            let local = graph
                .node(parent_bone)
                .frame
                .inverse()
                .compose(&graph.node(bone_id).frame);
            if let NodeKind::Bone {
                local_frame,
                constraint,
            } = &mut graph.node_mut(bone_id).kind
            {
                *local_frame = Some(local);
                *constraint = None;
            }
            graph.attach(bone_id, parent_bone);
            connected.insert(child_part, bone_id);
            unresolved -= 1;
        }
    }

    debug!("5. convert to export space");
    for &id in &nodes {
        if !matches!(graph.node(id).kind, NodeKind::Attachment { .. }) {
            continue;
        }
        let Some(parent) = graph.node(id).parent else {
            continue;
        };
        // Promote to world space before the convention flip.
        let world = graph.node(parent).frame.compose(&graph.node(id).frame);
        graph.node_mut(id).frame = world.to_export_space();
    }
    for &id in &nodes {
        if graph.node(id).is_geometry() {
            let node = graph.node_mut(id);
            node.frame = node.frame.to_export_space();
        }
    }

    debug!("6. re-parent geometry onto bones");
    // Rig-internal attachments are dropped; the rest are indexed by the
    // name of the geometry node that owns them.
    let mut geo_attachments: HashMap<String, Vec<NodeId>> = HashMap::new();
    for &id in &nodes {
        if !matches!(graph.node(id).kind, NodeKind::Attachment { .. }) {
            continue;
        }
        let name = graph.node(id).name.clone();
        if name.ends_with("RigAttachment") {
            continue;
        }
        if let Some(stripped) = name.strip_suffix("Attachment") {
            graph.node_mut(id).name = format!("{stripped}_Att");
        }
        let Some(parent) = graph.node(id).parent else {
            continue;
        };
        let parent_name = graph.node(parent).name.clone();
        geo_attachments.entry(parent_name).or_default().push(id);
    }

    // Unlink the source hierarchy entirely; bones keep their links.
    for &id in &nodes {
        let node = graph.node_mut(id);
        node.children.clear();
        node.parent = None;
    }

    for &bone_id in &bones {
        let geo_name = format!("{}{}", graph.node(bone_id).name, GEOMETRY_SUFFIX);
        let bone_inv = graph.node(bone_id).frame.inverse();

        for &id in &nodes {
            if graph.node(id).name == geo_name && graph.node(id).is_geometry() {
                let local = bone_inv.compose(&graph.node(id).frame);
                graph.node_mut(id).frame = local;
                graph.attach(id, bone_id);
            }
        }

        let Some(attachments) = geo_attachments.get(&geo_name) else {
            continue;
        };
        for &att in attachments {
            let name = graph.node(att).name.clone();
            let mut frame = graph.node(att).frame;
            let marker = if GRIP_ATTACHMENT_NAMES.contains(&name.as_str()) {
                frame = frame.compose(&CFrame::rotation_x(std::f32::consts::PI));
                AttachmentMarker::Spike
            } else {
                AttachmentMarker::Sphere
            };
            frame = bone_inv.compose(&frame);

            let node = graph.node_mut(att);
            node.frame = frame;
            if let NodeKind::Attachment { marker: slot } = &mut node.kind {
                *slot = Some(marker);
            }
            graph.attach(att, bone_id);
        }
    }

    debug!("7. normalize accessories");
    let mut accessories = Vec::new();
    for &acc in &accessory_ids {
        let subtree = graph.linearize(acc);

        for &id in &subtree {
            if !matches!(graph.node(id).kind, NodeKind::Attachment { .. }) {
                continue;
            }
            let Some(parent) = graph.node(id).parent else {
                continue;
            };
            let world = graph.node(parent).frame.compose(&graph.node(id).frame);
            graph.node_mut(id).frame = world;
        }

        for &id in &subtree {
            let node = graph.node_mut(id);
            node.children.clear();
            node.parent = None;
        }

        let mut members = Vec::new();
        for &id in &subtree {
            match &mut graph.node_mut(id).kind {
                NodeKind::SkinnedMesh(_) => {}
                NodeKind::Attachment { marker } => *marker = Some(AttachmentMarker::Sphere),
                _ => continue,
            }
            let node = graph.node_mut(id);
            node.frame = center_inv.compose(&node.frame).to_export_space();
            members.push(id);
        }

        accessories.push(AccessoryGroup { node: acc, members });
    }

    Ok(Skeleton {
        root_bone,
        bones,
        accessories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::parse_rig_description;
    use crate::transform::CFrame;

    fn reconstruct_json(json: &str) -> Result<(RigGraph, Skeleton), ReconstructionError> {
        let mut graph = parse_rig_description(json).expect("description should parse");
        let skeleton = reconstruct(&mut graph)?;
        Ok((graph, skeleton))
    }

    fn assert_identity(frame: &CFrame) {
        assert!((frame.rotation - nalgebra::Matrix3::identity()).norm() < 1.0e-5);
        assert!(frame.translation.norm() < 1.0e-5);
    }

    #[test]
    fn given_single_primary_part_when_reconstructed_then_only_root_bone_exists() {
        let (graph, skeleton) =
            reconstruct_json(r#"{"1": {"Class": "Part", "Name": "Root", "Parent": -1}}"#).unwrap();

        assert_eq!(skeleton.bones.len(), 1);
        assert_eq!(graph.node(skeleton.root_bone).name, ROOT_BONE_NAME);
        assert!(graph.node(skeleton.root_bone).children.is_empty());
        assert!(skeleton.accessories.is_empty());
    }

    #[test]
    fn given_two_parts_and_root_motor_when_reconstructed_then_two_bones_with_identity_local() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "Part", "Name": "LowerTorso", "Parent": 1},
            "4": {"Class": "Motor6D", "Name": "Root", "Parent": 2, "Part0": 2, "Part1": 3}
        }"#;
        let (graph, skeleton) = reconstruct_json(json).unwrap();

        assert_eq!(skeleton.bones.len(), 2);
        let torso_bone = skeleton.bones[1];
        let torso = graph.node(torso_bone);
        assert_eq!(torso.name, "LowerTorso");
        assert_eq!(torso.parent, Some(skeleton.root_bone));

        let NodeKind::Bone {
            local_frame: Some(local),
            constraint,
        } = &torso.kind
        else {
            panic!("expected resolved bone");
        };
        assert!(constraint.is_none());
        assert_identity(local);

        // The torso geometry was adopted by its bone.
        let geo = graph
            .ids()
            .find(|&id| graph.node(id).name == "LowerTorso_Geo")
            .unwrap();
        assert_eq!(graph.node(geo).parent, Some(torso_bone));
    }

    #[test]
    fn given_chain_of_constraints_when_reconstructed_then_bone_count_is_k_plus_one() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "A", "Parent": 1},
            "3": {"Class": "Part", "Name": "B", "Parent": 1},
            "4": {"Class": "Part", "Name": "C", "Parent": 1},
            "5": {"Class": "Motor6D", "Name": "M1", "Parent": 2, "Part0": 2, "Part1": 3},
            "6": {"Class": "Motor6D", "Name": "M2", "Parent": 3, "Part0": 3, "Part1": 4}
        }"#;
        let (graph, skeleton) = reconstruct_json(json).unwrap();

        assert_eq!(skeleton.bones.len(), 3);
        for &bone in &skeleton.bones {
            let parent_count = skeleton
                .bones
                .iter()
                .filter(|&&other| graph.node(other).children.contains(&bone))
                .count();
            let expected = usize::from(bone != skeleton.root_bone);
            assert_eq!(parent_count, expected);
        }
    }

    #[test]
    fn given_cyclic_constraint_graph_when_reconstructed_then_error_not_hang() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "A", "Parent": 1},
            "3": {"Class": "Part", "Name": "B", "Parent": 1},
            "4": {"Class": "Part", "Name": "C", "Parent": 1},
            "5": {"Class": "Part", "Name": "D", "Parent": 1},
            "6": {"Class": "Motor6D", "Name": "M1", "Parent": 3, "Part0": 3, "Part1": 4},
            "7": {"Class": "Motor6D", "Name": "M2", "Parent": 4, "Part0": 4, "Part1": 5},
            "8": {"Class": "Motor6D", "Name": "M3", "Parent": 5, "Part0": 5, "Part1": 3}
        }"#;
        assert!(matches!(
            reconstruct_json(json),
            Err(ReconstructionError::DisconnectedGraph { unresolved: 3 })
        ));
    }

    #[test]
    fn given_redundant_constraint_when_reconstructed_then_ambiguity_is_fatal() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "A", "Parent": 1},
            "3": {"Class": "Part", "Name": "B", "Parent": 1},
            "4": {"Class": "Part", "Name": "C", "Parent": 1},
            "5": {"Class": "Motor6D", "Name": "M1", "Parent": 2, "Part0": 2, "Part1": 3},
            "6": {"Class": "Motor6D", "Name": "M2", "Parent": 3, "Part0": 3, "Part1": 4},
            "7": {"Class": "Motor6D", "Name": "M3", "Parent": 2, "Part0": 2, "Part1": 4}
        }"#;
        assert!(matches!(
            reconstruct_json(json),
            Err(ReconstructionError::AmbiguousConstraint { .. })
        ));
    }

    #[test]
    fn given_motor_with_missing_body_when_reconstructed_then_dangling_error() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "A", "Parent": 1},
            "3": {"Class": "Motor6D", "Name": "M1", "Parent": 2, "Part0": 2}
        }"#;
        assert!(matches!(
            reconstruct_json(json),
            Err(ReconstructionError::DanglingConstraint { .. })
        ));
    }

    #[test]
    fn given_model_without_primary_when_reconstructed_then_missing_primary_error() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1},
            "2": {"Class": "Part", "Name": "A", "Parent": 1}
        }"#;
        assert!(matches!(
            reconstruct_json(json),
            Err(ReconstructionError::MissingPrimaryBody)
        ));
    }

    #[test]
    fn given_grip_attachment_when_reconstructed_then_spike_marker_and_x_half_turn() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "Part", "Name": "RightHand", "Parent": 1},
            "4": {"Class": "Motor6D", "Name": "RightWrist", "Parent": 2, "Part0": 2, "Part1": 3},
            "5": {"Class": "Attachment", "Name": "RightGripAttachment", "Parent": 3},
            "6": {"Class": "Attachment", "Name": "FaceFrontAttachment", "Parent": 3},
            "7": {"Class": "Attachment", "Name": "RootRigAttachment", "Parent": 3}
        }"#;
        let (graph, skeleton) = reconstruct_json(json).unwrap();

        let hand_bone = skeleton.bones[1];
        let grip = graph
            .ids()
            .find(|&id| graph.node(id).name == "RightGrip_Att")
            .unwrap();
        assert_eq!(graph.node(grip).parent, Some(hand_bone));
        let NodeKind::Attachment { marker } = graph.node(grip).kind else {
            panic!("expected attachment");
        };
        assert_eq!(marker, Some(AttachmentMarker::Spike));
        // Half-turn about X flips the Y basis vector.
        assert!((graph.node(grip).frame.rotation[(1, 1)] + 1.0).abs() < 1.0e-5);

        let face = graph
            .ids()
            .find(|&id| graph.node(id).name == "FaceFront_Att")
            .unwrap();
        let NodeKind::Attachment { marker } = graph.node(face).kind else {
            panic!("expected attachment");
        };
        assert_eq!(marker, Some(AttachmentMarker::Sphere));

        // Rig-internal attachments are dropped from the skeleton.
        let rig_att = graph
            .ids()
            .find(|&id| graph.node(id).name == "RootRigAttachment")
            .unwrap();
        assert!(graph.node(rig_att).parent.is_none());
    }

    #[test]
    fn given_accessory_when_reconstructed_then_members_are_split_off() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "Accessory", "Name": "HatAccessory", "Parent": 1},
            "4": {"Class": "MeshPart", "Name": "Handle", "Parent": 3,
                  "CFrame": {"tx": 1.0, "ty": 2.0, "tz": 3.0}},
            "5": {"Class": "Attachment", "Name": "HatCenterAttachment", "Parent": 4}
        }"#;
        let (graph, skeleton) = reconstruct_json(json).unwrap();

        assert_eq!(skeleton.accessories.len(), 1);
        let group = &skeleton.accessories[0];
        assert_eq!(graph.node(group.node).name, "HatAccessory");
        assert_eq!(group.members.len(), 2);

        // Accessory members skip the geometry rename pass and keep their
        // names; the handle frame went through the export-space flip.
        let handle = group.members[0];
        assert_eq!(graph.node(handle).name, "Handle");
        assert_eq!(
            graph.node(handle).frame.translation,
            nalgebra::Vector3::new(-1.0, 2.0, -3.0)
        );

        let attachment = group.members[1];
        let NodeKind::Attachment { marker } = graph.node(attachment).kind else {
            panic!("expected attachment");
        };
        assert_eq!(marker, Some(AttachmentMarker::Sphere));
    }
}
