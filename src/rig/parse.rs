use std::collections::{BTreeMap, HashMap};

use log::debug;
use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;

use super::{
    ConstraintData, ConstraintKind, GraphError, MeshPartData, NodeId, NodeKind, RigGraph, RigNode,
};
use crate::asset::{AssetCache, AssetSource};
use crate::transform::CFrame;

/// Sentinel reference value meaning "no object".
const NONE_REF: i64 = -1;

fn none_ref() -> i64 {
    NONE_REF
}

fn one() -> f32 {
    1.0
}

fn unsupported_mesh_type() -> String {
    "Unsupported".to_string()
}

/// Wire representation of a rigid frame: translation plus a row-major
/// rotation matrix, all components optional with identity defaults.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
struct FrameRecord {
    tx: f32,
    ty: f32,
    tz: f32,
    r00: f32,
    r01: f32,
    r02: f32,
    r10: f32,
    r11: f32,
    r12: f32,
    r20: f32,
    r21: f32,
    r22: f32,
}

impl Default for FrameRecord {
    fn default() -> Self {
        Self {
            tx: 0.0,
            ty: 0.0,
            tz: 0.0,
            r00: 1.0,
            r01: 0.0,
            r02: 0.0,
            r10: 0.0,
            r11: 1.0,
            r12: 0.0,
            r20: 0.0,
            r21: 0.0,
            r22: 1.0,
        }
    }
}

impl From<FrameRecord> for CFrame {
    fn from(record: FrameRecord) -> Self {
        CFrame {
            rotation: Matrix3::new(
                record.r00, record.r01, record.r02, //
                record.r10, record.r11, record.r12, //
                record.r20, record.r21, record.r22,
            ),
            translation: Vector3::new(record.tx, record.ty, record.tz),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModelRecord {
    name: String,
    parent: i64,
    #[serde(default = "none_ref")]
    primary_part: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PartRecord {
    name: String,
    parent: i64,
    #[serde(rename = "CFrame", default)]
    cframe: FrameRecord,
    #[serde(default = "one")]
    size_x: f32,
    #[serde(default = "one")]
    size_y: f32,
    #[serde(default = "one")]
    size_z: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MeshPartRecord {
    name: String,
    parent: i64,
    #[serde(default)]
    mesh_id: String,
    #[serde(default)]
    texture_id: String,
    #[serde(default = "unsupported_mesh_type")]
    mesh_type: String,
    #[serde(rename = "CFrame", default)]
    cframe: FrameRecord,
    #[serde(default = "one")]
    offset_x: f32,
    #[serde(default = "one")]
    offset_y: f32,
    #[serde(default = "one")]
    offset_z: f32,
    #[serde(default = "one")]
    scale_x: f32,
    #[serde(default = "one")]
    scale_y: f32,
    #[serde(default = "one")]
    scale_z: f32,
    #[serde(default = "one")]
    size_x: f32,
    #[serde(default = "one")]
    size_y: f32,
    #[serde(default = "one")]
    size_z: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BoneRecord {
    name: String,
    parent: i64,
    #[serde(rename = "CFrame", default)]
    cframe: FrameRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttachmentRecord {
    name: String,
    parent: i64,
    #[serde(rename = "CFrame", default)]
    cframe: FrameRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WeldRecord {
    name: String,
    parent: i64,
    #[serde(rename = "Part0", default = "none_ref")]
    part0: i64,
    #[serde(rename = "Part1", default = "none_ref")]
    part1: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MotorRecord {
    name: String,
    parent: i64,
    #[serde(rename = "Part0", default = "none_ref")]
    part0: i64,
    #[serde(rename = "Part1", default = "none_ref")]
    part1: i64,
    #[serde(rename = "C0", default)]
    c0: FrameRecord,
    #[serde(rename = "C1", default)]
    c1: FrameRecord,
    #[serde(default)]
    transform: FrameRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessoryRecord {
    name: String,
    parent: i64,
    #[serde(default)]
    attach_point: FrameRecord,
}

/// One object record, discriminated by its required `Class` tag. The class
/// set is closed; an unrecognized tag fails the whole parse.
#[derive(Debug, Deserialize)]
#[serde(tag = "Class")]
enum ObjectRecord {
    Model(ModelRecord),
    Part(PartRecord),
    MeshPart(MeshPartRecord),
    Bone(BoneRecord),
    Attachment(AttachmentRecord),
    WeldConstraint(WeldRecord),
    Motor6D(MotorRecord),
    Accessory(AccessoryRecord),
}

/// Raw integer references carried by a record, resolved in pass 2.
#[derive(Debug, Clone, Copy)]
struct RawRefs {
    parent: i64,
    primary: i64,
    part0: i64,
    part1: i64,
}

impl RawRefs {
    fn parent_only(parent: i64) -> Self {
        Self {
            parent,
            primary: NONE_REF,
            part0: NONE_REF,
            part1: NONE_REF,
        }
    }
}

fn instantiate(record: ObjectRecord) -> (RigNode, RawRefs) {
    let (name, frame, kind, refs) = match record {
        ObjectRecord::Model(r) => (
            r.name,
            CFrame::identity(),
            NodeKind::Group { primary: None },
            RawRefs {
                parent: r.parent,
                primary: r.primary_part,
                part0: NONE_REF,
                part1: NONE_REF,
            },
        ),
        ObjectRecord::Part(r) => (
            r.name,
            r.cframe.into(),
            NodeKind::RigidBody {
                size: Vector3::new(r.size_x, r.size_y, r.size_z),
            },
            RawRefs::parent_only(r.parent),
        ),
        ObjectRecord::MeshPart(r) => (
            r.name,
            r.cframe.into(),
            NodeKind::SkinnedMesh(MeshPartData {
                mesh_id: r.mesh_id,
                texture_id: r.texture_id,
                mesh_type: r.mesh_type,
                offset: Vector3::new(r.offset_x, r.offset_y, r.offset_z),
                scale: Vector3::new(r.scale_x, r.scale_y, r.scale_z),
                size: Vector3::new(r.size_x, r.size_y, r.size_z),
                mesh_payload: None,
                texture_payload: None,
            }),
            RawRefs::parent_only(r.parent),
        ),
        ObjectRecord::Bone(r) => (
            r.name,
            r.cframe.into(),
            NodeKind::Bone {
                local_frame: None,
                constraint: None,
            },
            RawRefs::parent_only(r.parent),
        ),
        ObjectRecord::Attachment(r) => (
            r.name,
            r.cframe.into(),
            NodeKind::Attachment { marker: None },
            RawRefs::parent_only(r.parent),
        ),
        ObjectRecord::WeldConstraint(r) => (
            r.name,
            CFrame::identity(),
            NodeKind::Constraint(ConstraintData {
                kind: ConstraintKind::Weld,
                part0: None,
                part1: None,
                c0: CFrame::identity(),
                c1: CFrame::identity(),
                transform: CFrame::identity(),
            }),
            RawRefs {
                parent: r.parent,
                primary: NONE_REF,
                part0: r.part0,
                part1: r.part1,
            },
        ),
        ObjectRecord::Motor6D(r) => (
            r.name,
            CFrame::identity(),
            NodeKind::Constraint(ConstraintData {
                kind: ConstraintKind::Motor,
                part0: None,
                part1: None,
                c0: r.c0.into(),
                c1: r.c1.into(),
                transform: r.transform.into(),
            }),
            RawRefs {
                parent: r.parent,
                primary: NONE_REF,
                part0: r.part0,
                part1: r.part1,
            },
        ),
        ObjectRecord::Accessory(r) => (
            r.name,
            CFrame::identity(),
            NodeKind::Accessory {
                attach_point: r.attach_point.into(),
            },
            RawRefs::parent_only(r.parent),
        ),
    };

    (
        RigNode {
            name,
            frame,
            parent: None,
            children: Vec::new(),
            kind,
        },
        refs,
    )
}

/// Parses a rig description into a resolved node graph.
///
/// Pass 1 instantiates one typed node per record in ascending numeric key
/// order; pass 2 rewrites integer references to arena ids, links children and
/// verifies the single-root invariant. Asset payloads are populated
/// separately by [`fetch_assets`].
pub fn parse_rig_description(json: &str) -> Result<RigGraph, GraphError> {
    let records: BTreeMap<String, ObjectRecord> = serde_json::from_str(json)?;

    let mut keyed: Vec<(i64, ObjectRecord)> = Vec::with_capacity(records.len());
    for (key, record) in records {
        let id = key
            .parse::<i64>()
            .map_err(|_| GraphError::InvalidKey(key.clone()))?;
        keyed.push((id, record));
    }
    keyed.sort_by_key(|&(id, _)| id);

    let mut nodes = Vec::with_capacity(keyed.len());
    let mut refs = Vec::with_capacity(keyed.len());
    let mut id_to_index = HashMap::with_capacity(keyed.len());
    for (key, record) in keyed {
        let (node, raw) = instantiate(record);
        id_to_index.insert(key, nodes.len());
        nodes.push(node);
        refs.push(raw);
    }

    let resolve = |name: &str, id: i64| -> Result<Option<NodeId>, GraphError> {
        if id == NONE_REF {
            return Ok(None);
        }
        id_to_index
            .get(&id)
            .map(|&index| Some(NodeId(index)))
            .ok_or_else(|| GraphError::UnresolvedReference {
                name: name.to_string(),
                id,
            })
    };

    let mut root = None;
    for index in 0..nodes.len() {
        let raw = refs[index];
        let name = nodes[index].name.clone();

        match resolve(&name, raw.parent)? {
            Some(parent) => {
                nodes[index].parent = Some(parent);
                nodes[parent.0].children.push(NodeId(index));
            }
            None => match root {
                None => root = Some(NodeId(index)),
                Some(existing) => {
                    return Err(GraphError::MultipleRoots {
                        first: nodes[existing.0].name.clone(),
                        second: name,
                    });
                }
            },
        }

        let primary = resolve(&name, raw.primary)?;
        let part0 = resolve(&name, raw.part0)?;
        let part1 = resolve(&name, raw.part1)?;
        match &mut nodes[index].kind {
            NodeKind::Group { primary: slot } => *slot = primary,
            NodeKind::Constraint(data) => {
                data.part0 = part0;
                data.part1 = part1;
            }
            _ => {}
        }
    }

    let root = root.ok_or(GraphError::NoRoot)?;
    Ok(RigGraph::new(nodes, root))
}

/// Pass 3: fetch mesh and texture payloads for every skinned-mesh node,
/// deduplicating by identifier through a request-scoped cache. Fetch
/// failures leave the payload empty; the export stage degrades those nodes
/// to locator placeholders.
pub fn fetch_assets(graph: &mut RigGraph, source: &dyn AssetSource) {
    let mut cache = AssetCache::new();
    let ids: Vec<NodeId> = graph.ids().collect();
    for id in ids {
        let (mesh_id, texture_id) = match &graph.node(id).kind {
            NodeKind::SkinnedMesh(data) => (data.mesh_id.clone(), data.texture_id.clone()),
            _ => continue,
        };

        debug!("resolving assets for {:?}", graph.node(id).name);
        let mesh_payload = cache.fetch(source, &mesh_id);
        let texture_payload = cache.fetch(source, &texture_id);

        if let NodeKind::SkinnedMesh(data) = &mut graph.node_mut(id).kind {
            data.mesh_payload = mesh_payload;
            data.texture_payload = texture_payload;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{FetchError, FetchedAsset, MemoryAssetSource};
    use std::cell::Cell;

    fn minimal_rig() -> &'static str {
        r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1, "SizeX": 2.0},
            "3": {"Class": "MeshPart", "Name": "Head", "Parent": 1,
                  "MeshId": "mesh/head", "TextureId": "tex/head",
                  "CFrame": {"ty": 1.5}},
            "4": {"Class": "Motor6D", "Name": "Neck", "Parent": 2,
                  "Part0": 2, "Part1": 3, "C0": {"ty": 1.0}},
            "5": {"Class": "Attachment", "Name": "HairAttachment", "Parent": 3}
        }"#
    }

    #[test]
    fn given_valid_description_when_parsed_then_graph_resolves_references() {
        let graph = parse_rig_description(minimal_rig()).unwrap();

        assert_eq!(graph.len(), 5);
        let root = graph.node(graph.root());
        assert_eq!(root.name, "Avatar");

        let NodeKind::Group { primary } = root.kind else {
            panic!("root should be a group");
        };
        let primary = primary.expect("primary part should resolve");
        assert_eq!(graph.node(primary).name, "HumanoidRootPart");

        let motor = graph
            .ids()
            .find(|&id| graph.node(id).name == "Neck")
            .unwrap();
        let NodeKind::Constraint(data) = &graph.node(motor).kind else {
            panic!("motor should be a constraint");
        };
        assert_eq!(data.kind, ConstraintKind::Motor);
        assert_eq!(graph.node(data.part1.unwrap()).name, "Head");
        assert_eq!(data.c0.translation.y, 1.0);
    }

    #[test]
    fn given_missing_fields_when_parsed_then_defaults_apply() {
        let graph = parse_rig_description(minimal_rig()).unwrap();
        let head = graph
            .ids()
            .find(|&id| graph.node(id).name == "Head")
            .unwrap();

        let NodeKind::SkinnedMesh(data) = &graph.node(head).kind else {
            panic!("head should be a mesh part");
        };
        assert_eq!(data.mesh_type, "Unsupported");
        assert_eq!(data.offset, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(data.scale, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(graph.node(head).frame.translation.y, 1.5);
    }

    #[test]
    fn given_unknown_class_when_parsed_then_description_error_is_returned() {
        let json = r#"{"1": {"Class": "Script", "Name": "x", "Parent": -1}}"#;
        assert!(matches!(
            parse_rig_description(json),
            Err(GraphError::InvalidDescription(_))
        ));
    }

    #[test]
    fn given_missing_name_when_parsed_then_description_error_is_returned() {
        let json = r#"{"1": {"Class": "Part", "Parent": -1}}"#;
        assert!(matches!(
            parse_rig_description(json),
            Err(GraphError::InvalidDescription(_))
        ));
    }

    #[test]
    fn given_two_parentless_objects_when_parsed_then_multiple_roots_error() {
        let json = r#"{
            "1": {"Class": "Part", "Name": "A", "Parent": -1},
            "2": {"Class": "Part", "Name": "B", "Parent": -1}
        }"#;
        assert!(matches!(
            parse_rig_description(json),
            Err(GraphError::MultipleRoots { .. })
        ));
    }

    #[test]
    fn given_dangling_parent_reference_when_parsed_then_unresolved_error() {
        let json = r#"{"1": {"Class": "Part", "Name": "A", "Parent": 99}}"#;
        assert!(matches!(
            parse_rig_description(json),
            Err(GraphError::UnresolvedReference { id: 99, .. })
        ));
    }

    #[test]
    fn given_non_numeric_key_when_parsed_then_invalid_key_error() {
        let json = r#"{"root": {"Class": "Part", "Name": "A", "Parent": -1}}"#;
        assert!(matches!(
            parse_rig_description(json),
            Err(GraphError::InvalidKey(_))
        ));
    }

    struct CountingSource {
        inner: MemoryAssetSource,
        calls: Cell<usize>,
    }

    impl AssetSource for CountingSource {
        fn fetch(&self, identifier: &str) -> Result<FetchedAsset, FetchError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.fetch(identifier)
        }
    }

    #[test]
    fn given_repeated_asset_ids_when_fetching_then_cache_deduplicates() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "Root", "Parent": 1},
            "3": {"Class": "MeshPart", "Name": "L", "Parent": 1,
                  "MeshId": "shared/mesh", "TextureId": "shared/tex"},
            "4": {"Class": "MeshPart", "Name": "R", "Parent": 1,
                  "MeshId": "shared/mesh", "TextureId": "shared/tex"}
        }"#;
        let mut graph = parse_rig_description(json).unwrap();

        let mut inner = MemoryAssetSource::new();
        inner.insert("shared/mesh", b"version 9.99 not a mesh".to_vec());
        inner.insert("shared/tex", vec![1, 2, 3]);
        let source = CountingSource {
            inner,
            calls: Cell::new(0),
        };

        fetch_assets(&mut graph, &source);

        // Two distinct identifiers, four references.
        assert_eq!(source.calls.get(), 2);

        for name in ["L", "R"] {
            let id = graph.ids().find(|&id| graph.node(id).name == name).unwrap();
            let NodeKind::SkinnedMesh(data) = &graph.node(id).kind else {
                panic!("expected mesh part");
            };
            assert!(data.mesh_payload.is_some());
            assert!(data.texture_payload.is_some());
        }
    }

    #[test]
    fn given_failing_fetch_when_fetching_then_payload_stays_empty() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "Root", "Parent": 1},
            "3": {"Class": "MeshPart", "Name": "Head", "Parent": 1,
                  "MeshId": "missing/mesh"}
        }"#;
        let mut graph = parse_rig_description(json).unwrap();

        fetch_assets(&mut graph, &MemoryAssetSource::new());

        let head = graph
            .ids()
            .find(|&id| graph.node(id).name == "Head")
            .unwrap();
        let NodeKind::SkinnedMesh(data) = &graph.node(head).kind else {
            panic!("expected mesh part");
        };
        assert!(data.mesh_payload.is_none());
        assert!(data.texture_payload.is_none());
    }
}
