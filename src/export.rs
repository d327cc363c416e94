use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetCache, AssetSource, FetchedAsset, detect_payload_extension};
use crate::fbx::{FbxColor, FbxDocument, FbxTransform, ObjectId};
use crate::mesh::{self, GeometryBuffer, Mesh};
use crate::rig::{
    AttachmentMarker, MeshPartData, NodeId, NodeKind, RigGraph, fetch_assets,
    parse_rig_description,
};
use crate::skeleton::reconstruct;
use crate::transform::CFrame;

// ─── Built-in placeholder assets ──────────────────────────────────────────────

/// Marker meshes substituted for attachments.
const SPHERE_MARKER_ASSET: &str = "rbxasset://sphere.mesh";
const SPIKE_MARKER_ASSET: &str = "rbxasset://spike.mesh";

/// Stand-in meshes for unresolved mesh parts of a known shape.
const HEAD_PLACEHOLDER_ASSET: &str = "rbxasset://sm_head.mesh";
const SPHERE_PLACEHOLDER_ASSET: &str = "rbxasset://sm_sphere.mesh";

/// Asset-calibrated shrink factors for the stand-in meshes. These match the
/// built-in asset dimensions and are not derived from any general rule.
const HEAD_PLACEHOLDER_SCALE_DOWN: f32 = 1.25;
const SPHERE_PLACEHOLDER_SCALE_DOWN: f32 = 1.45;

/// Texture reference emitted when a mesh part has no resolved texture.
const DEFAULT_TEXTURE_FILE: &str = "empty.png";

const ATTACHMENT_MATERIAL_COLOR: FbxColor = FbxColor::rgba(1.0, 0.8, 0.8, 1.0);

// ─── Public types ─────────────────────────────────────────────────────────────

/// Export options shared by the CLI and embedding callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExportOptions {
    /// LOD face range emitted for every decoded mesh. Out-of-range values
    /// fall back to LOD 0 with a warning.
    pub lod: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { lod: 0 }
    }
}

/// Severity level used by export issues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single degradation or anomaly recorded during export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

/// Summary of one conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub model_name: String,
    pub bone_count: usize,
    pub mesh_count: usize,
    pub locator_count: usize,
    pub attachment_count: usize,
    pub accessory_count: usize,
    pub texture_count: usize,
    pub issues: Vec<ExportIssue>,
}

/// A texture payload referenced by the document; the caller decides where
/// the file lands on disk.
#[derive(Debug, Clone)]
pub struct TextureFile {
    pub file_name: String,
    pub asset: Arc<FetchedAsset>,
}

/// Result of a conversion: the document text, the texture payloads it
/// references and the report.
#[derive(Debug)]
pub struct ExportOutput {
    pub document: String,
    pub textures: Vec<TextureFile>,
    pub report: ExportReport,
}

// ─── Pipeline entry point ─────────────────────────────────────────────────────

/// Converts a rig description into an FBX scene document.
///
/// Runs the full synchronous pipeline: parse and resolve the description,
/// fetch referenced assets, reconstruct the bone skeleton from its motor
/// constraints and serialize the result. Structural failures abort the whole
/// conversion; unresolved assets degrade to placeholders and are recorded in
/// the report.
pub fn export_rig(
    description: &str,
    source: &dyn AssetSource,
    options: ExportOptions,
) -> Result<ExportOutput> {
    let mut graph = parse_rig_description(description).context("failed to parse rig description")?;
    fetch_assets(&mut graph, source);
    let skeleton = reconstruct(&mut graph).context("skeleton reconstruction failed")?;

    let model_name = graph.node(graph.root()).name.clone();
    info!("create scene document for {model_name:?}");

    let mut doc = FbxDocument::new(&model_name);
    let mut cache = AssetCache::new();
    let mut issues = Vec::new();

    let half_turn_y = CFrame::rotation_y(std::f32::consts::PI);
    // The spike marker is authored with its base at the origin; shift the
    // pivot so it points along the attachment axis.
    let spike_pivot = half_turn_y.compose(&CFrame::from_translation(0.0, 0.5, 0.0));
    let markers = Markers {
        sphere: load_marker(source, &mut cache, &mut issues, SPHERE_MARKER_ASSET, &half_turn_y),
        spike: load_marker(source, &mut cache, &mut issues, SPIKE_MARKER_ASSET, &spike_pivot),
    };

    let layers = SceneLayers {
        attachments_material: doc.create_material("AttachmentMat", ATTACHMENT_MATERIAL_COLOR),
        attachments: doc.create_layer("Attachments", FbxColor::rgb(1.0, 0.0, 0.0)),
        bones: doc.create_layer("Bones", FbxColor::rgb(0.0, 0.0, 1.0)),
        geos: doc.create_layer("Geos", FbxColor::rgb(0.0, 1.0, 0.0)),
        accs: doc.create_layer("Accs", FbxColor::rgb(1.0, 1.0, 0.0)),
    };

    let mut exporter = Exporter {
        doc,
        layers,
        markers,
        options,
        source,
        cache,
        textures: Vec::new(),
        issues,
        mesh_count: 0,
        locator_count: 0,
        attachment_count: 0,
    };

    exporter.append_node(&graph, skeleton.root_bone, ObjectId::ROOT);

    if !skeleton.accessories.is_empty() {
        let accessories_id = exporter.doc.create_group("Accessories", ObjectId::ROOT);
        exporter.doc.connect(accessories_id, exporter.layers.accs);
        for group in &skeleton.accessories {
            let mut name = graph.node(group.node).name.clone();
            if let Some(stripped) = name.strip_suffix("Accessory") {
                name = format!("{stripped}_Acc");
            }
            let group_id = exporter.doc.create_group(&name, accessories_id);
            for &member in &group.members {
                exporter.append_node(&graph, member, group_id);
            }
        }
    }

    let report = ExportReport {
        model_name,
        bone_count: skeleton.bones.len(),
        mesh_count: exporter.mesh_count,
        locator_count: exporter.locator_count,
        attachment_count: exporter.attachment_count,
        accessory_count: skeleton.accessories.len(),
        texture_count: exporter.textures.len(),
        issues: exporter.issues,
    };

    Ok(ExportOutput {
        document: exporter.doc.finalize(),
        textures: exporter.textures,
        report,
    })
}

// ─── Emission helpers ─────────────────────────────────────────────────────────

struct SceneLayers {
    attachments_material: ObjectId,
    attachments: ObjectId,
    bones: ObjectId,
    geos: ObjectId,
    accs: ObjectId,
}

struct Markers {
    sphere: Option<GeometryBuffer>,
    spike: Option<GeometryBuffer>,
}

impl Markers {
    fn get(&self, marker: AttachmentMarker) -> Option<&GeometryBuffer> {
        match marker {
            AttachmentMarker::Sphere => self.sphere.as_ref(),
            AttachmentMarker::Spike => self.spike.as_ref(),
        }
    }
}

struct Exporter<'a> {
    doc: FbxDocument,
    layers: SceneLayers,
    markers: Markers,
    options: ExportOptions,
    source: &'a dyn AssetSource,
    cache: AssetCache,
    textures: Vec<TextureFile>,
    issues: Vec<ExportIssue>,
    mesh_count: usize,
    locator_count: usize,
    attachment_count: usize,
}

impl Exporter<'_> {
    fn issue(&mut self, severity: Severity, code: &str, message: String) {
        self.issues.push(ExportIssue {
            severity,
            code: code.to_string(),
            message,
        });
    }

    /// Emits one node and recurses over its children.
    fn append_node(&mut self, graph: &RigGraph, id: NodeId, parent: ObjectId) {
        let node = graph.node(id);
        let fbx_id = match &node.kind {
            NodeKind::SkinnedMesh(data) => self.append_mesh_part(graph, id, data, parent),
            NodeKind::Bone { local_frame, .. } => {
                let frame = (*local_frame).unwrap_or(node.frame);
                let uid =
                    self.doc
                        .create_bone(&node.name, &FbxTransform::from_frame(&frame), parent);
                self.doc.connect(uid, self.layers.bones);
                uid
            }
            NodeKind::Attachment { marker } => {
                let xform = FbxTransform::from_frame(&node.frame);
                let geometry = (*marker).and_then(|marker| self.markers.get(marker)).cloned();
                let uid = match geometry {
                    Some(geometry) => {
                        let uid = self.doc.create_mesh(
                            &node.name,
                            &xform,
                            &geometry,
                            self.layers.attachments_material,
                            parent,
                        );
                        self.attachment_count += 1;
                        uid
                    }
                    None => {
                        self.locator_count += 1;
                        self.doc.create_locator(&node.name, &xform, parent)
                    }
                };
                self.doc.connect(uid, self.layers.attachments);
                uid
            }
            _ => self.doc.create_group(&node.name, parent),
        };

        for &child in &graph.node(id).children {
            self.append_node(graph, child, fbx_id);
        }
    }

    /// Emits a mesh part as geometry, or as a locator when neither the
    /// payload nor a shape placeholder can be resolved.
    fn append_mesh_part(
        &mut self,
        graph: &RigGraph,
        id: NodeId,
        data: &MeshPartData,
        parent: ObjectId,
    ) -> ObjectId {
        let node = graph.node(id);
        info!("mesh part: {} ({})", node.name, data.mesh_id);
        let xform = FbxTransform::from_frame(&node.frame);

        let mut scale = data.scale;
        let mesh = match &data.mesh_payload {
            Some(asset) => match mesh::decode(&asset.payload) {
                Ok(mesh) => Some(mesh),
                Err(err) => {
                    warn!("can't decode mesh {:?}: {err}", data.mesh_id);
                    self.issue(
                        Severity::Warning,
                        "MESH_DECODE_FAILED",
                        format!("mesh {:?} for {:?} is malformed: {err}", data.mesh_id, node.name),
                    );
                    None
                }
            },
            None => self.shape_placeholder(&data.mesh_type, &mut scale),
        };

        let Some(mut mesh) = mesh else {
            if !data.mesh_id.is_empty() {
                self.issue(
                    Severity::Warning,
                    "MESH_UNRESOLVED",
                    format!("{:?} exported as locator: no mesh for {:?}", node.name, data.mesh_id),
                );
            }
            self.locator_count += 1;
            return self.doc.create_locator(&node.name, &xform, parent);
        };

        // Bake the engine-to-tool half turn and the mesh-fit offset/scale
        // into the vertices; the node transform stays purely rigid.
        mesh.transform(
            &CFrame::rotation_y(std::f32::consts::PI),
            data.offset,
            scale,
        );

        let lod = if self.options.lod < mesh.lod_count() {
            self.options.lod
        } else {
            if self.options.lod != 0 {
                self.issue(
                    Severity::Warning,
                    "LOD_OUT_OF_RANGE",
                    format!(
                        "LOD {} unavailable for {:?} ({} present), using LOD 0",
                        self.options.lod,
                        node.name,
                        mesh.lod_count()
                    ),
                );
            }
            0
        };
        let geometry = match mesh.slice_for_lod(lod) {
            Ok(geometry) => geometry,
            Err(err) => {
                self.issue(
                    Severity::Warning,
                    "MESH_DECODE_FAILED",
                    format!("mesh {:?} for {:?} is malformed: {err}", data.mesh_id, node.name),
                );
                self.locator_count += 1;
                return self.doc.create_locator(&node.name, &xform, parent);
            }
        };

        let material = self
            .doc
            .create_material(&format!("{}Mat", node.name), FbxColor::rgb(1.0, 1.0, 1.0));

        let texture_file = match &data.texture_payload {
            Some(asset) => {
                let extension = detect_payload_extension(&asset.payload);
                let file_name = format!("{}.{extension}", asset.content_hash);
                if !self.textures.iter().any(|t| t.file_name == file_name) {
                    self.textures.push(TextureFile {
                        file_name: file_name.clone(),
                        asset: asset.clone(),
                    });
                }
                file_name
            }
            None => {
                if !data.texture_id.is_empty() {
                    self.issue(
                        Severity::Warning,
                        "TEXTURE_UNRESOLVED",
                        format!(
                            "texture {:?} for {:?} unavailable, using {DEFAULT_TEXTURE_FILE}",
                            data.texture_id, node.name
                        ),
                    );
                }
                DEFAULT_TEXTURE_FILE.to_string()
            }
        };
        self.doc
            .create_texture(&format!("{}Tex", node.name), &texture_file, material, "DiffuseColor");

        let uid = self
            .doc
            .create_mesh(&node.name, &xform, &geometry, material, parent);
        self.doc.connect(uid, self.layers.geos);
        self.mesh_count += 1;
        uid
    }

    /// Resolves the built-in stand-in mesh for a shape-typed mesh part with
    /// no payload, adjusting the fit scale to the placeholder's dimensions.
    fn shape_placeholder(&mut self, mesh_type: &str, scale: &mut Vector3<f32>) -> Option<Mesh> {
        let (asset_id, shrink) = match mesh_type {
            "Head" => {
                let clamped = scale.x.min(scale.z);
                scale.x = clamped;
                scale.z = clamped;
                (HEAD_PLACEHOLDER_ASSET, HEAD_PLACEHOLDER_SCALE_DOWN)
            }
            "Sphere" => (SPHERE_PLACEHOLDER_ASSET, SPHERE_PLACEHOLDER_SCALE_DOWN),
            _ => return None,
        };
        *scale /= shrink;

        let asset = self.cache.fetch(self.source, asset_id)?;
        match mesh::decode(&asset.payload) {
            Ok(mesh) => Some(mesh),
            Err(err) => {
                warn!("can't decode placeholder {asset_id:?}: {err}");
                None
            }
        }
    }
}

/// Loads and pre-orients one attachment marker mesh. Marker failures are
/// not fatal: affected attachments degrade to locators.
fn load_marker(
    source: &dyn AssetSource,
    cache: &mut AssetCache,
    issues: &mut Vec<ExportIssue>,
    asset_id: &str,
    pivot: &CFrame,
) -> Option<GeometryBuffer> {
    let unavailable = |issues: &mut Vec<ExportIssue>, detail: String| {
        issues.push(ExportIssue {
            severity: Severity::Warning,
            code: "MARKER_UNAVAILABLE".to_string(),
            message: detail,
        });
    };

    let Some(asset) = cache.fetch(source, asset_id) else {
        unavailable(issues, format!("marker mesh {asset_id:?} could not be fetched"));
        return None;
    };
    let mut mesh = match mesh::decode(&asset.payload) {
        Ok(mesh) => mesh,
        Err(err) => {
            unavailable(issues, format!("marker mesh {asset_id:?} is malformed: {err}"));
            return None;
        }
    };
    mesh.transform(pivot, Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
    match mesh.slice_for_lod(0) {
        Ok(geometry) => Some(geometry),
        Err(err) => {
            unavailable(issues, format!("marker mesh {asset_id:?} is malformed: {err}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAssetSource;

    fn ascii_mesh() -> Vec<u8> {
        b"version 1.01\n1\n\
          [0,0,0][0,1,0][0,0,0]\
          [1,0,0][0,1,0][0,0,0]\
          [0,1,0][0,1,0][0,1,0]"
            .to_vec()
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = b"\x89PNG\x0d\x0a\x1a\x0a".to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    fn source_with_markers() -> MemoryAssetSource {
        let mut source = MemoryAssetSource::new();
        source.insert(SPHERE_MARKER_ASSET, ascii_mesh());
        source.insert(SPIKE_MARKER_ASSET, ascii_mesh());
        source
    }

    #[test]
    fn given_single_primary_part_when_exported_then_one_bone_and_no_geometry() {
        let json = r#"{"1": {"Class": "Part", "Name": "Root", "Parent": -1}}"#;
        let output = export_rig(json, &source_with_markers(), ExportOptions::default()).unwrap();

        // One bone = one NodeAttribute plus one Model block.
        assert_eq!(output.document.matches("\"LimbNode\" {").count(), 2);
        assert!(output.document.contains("\"Model::HumanoidRootNode\""));
        assert_eq!(output.document.matches("\tGeometry: ").count(), 0);
        assert_eq!(output.document.matches("\tTexture: ").count(), 0);
        assert_eq!(output.report.bone_count, 1);
        assert_eq!(output.report.mesh_count, 0);
        assert!(output.textures.is_empty());
        assert!(output.report.issues.is_empty());
    }

    #[test]
    fn given_two_parts_with_root_motor_when_exported_then_two_bones_emitted() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "Part", "Name": "LowerTorso", "Parent": 1},
            "4": {"Class": "Motor6D", "Name": "Root", "Parent": 2, "Part0": 2, "Part1": 3}
        }"#;
        let output = export_rig(json, &source_with_markers(), ExportOptions::default()).unwrap();

        assert_eq!(output.report.bone_count, 2);
        assert_eq!(output.document.matches("\"LimbNode\" {").count(), 4);
        assert!(output.document.contains("\"Model::LowerTorso\""));
        // The torso geometry is a plain part, emitted as a group under its
        // bone.
        assert!(output.document.contains("\"Model::LowerTorso_Geo\", \"Null\""));
    }

    #[test]
    fn given_mesh_part_with_payloads_when_exported_then_geometry_and_texture_emitted() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "MeshPart", "Name": "Head", "Parent": 1,
                  "MeshId": "mem://head.mesh", "TextureId": "mem://head.png"},
            "4": {"Class": "Motor6D", "Name": "Neck", "Parent": 2, "Part0": 2, "Part1": 3}
        }"#;
        let mut source = source_with_markers();
        source.insert("mem://head.mesh", ascii_mesh());
        source.insert("mem://head.png", png_bytes());

        let output = export_rig(json, &source, ExportOptions::default()).unwrap();

        assert_eq!(output.report.mesh_count, 1);
        assert_eq!(output.document.matches("\tGeometry: ").count(), 1);
        assert!(output.document.contains("\"Model::Head_Geo\", \"Mesh\""));

        assert_eq!(output.textures.len(), 1);
        let texture = &output.textures[0];
        assert!(texture.file_name.ends_with(".png"));
        assert!(output
            .document
            .contains(&format!("FileName: \"{}\"", texture.file_name)));
    }

    #[test]
    fn given_mesh_part_without_payload_when_exported_then_locator_degrades() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "MeshPart", "Name": "Head", "Parent": 1,
                  "MeshId": "mem://missing.mesh"},
            "4": {"Class": "Motor6D", "Name": "Neck", "Parent": 2, "Part0": 2, "Part1": 3}
        }"#;
        let output = export_rig(json, &source_with_markers(), ExportOptions::default()).unwrap();

        assert_eq!(output.report.mesh_count, 0);
        assert_eq!(output.report.locator_count, 1);
        assert!(output
            .report
            .issues
            .iter()
            .any(|issue| issue.code == "MESH_UNRESOLVED"));
        // The locator keeps the node name.
        assert!(output.document.contains("\"Model::Head_Geo\", \"Null\""));
    }

    #[test]
    fn given_grip_attachment_when_exported_then_marker_mesh_uses_attachment_material() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "Part", "Name": "RightHand", "Parent": 1},
            "4": {"Class": "Motor6D", "Name": "RightWrist", "Parent": 2, "Part0": 2, "Part1": 3},
            "5": {"Class": "Attachment", "Name": "RightGripAttachment", "Parent": 3}
        }"#;
        let output = export_rig(json, &source_with_markers(), ExportOptions::default()).unwrap();

        assert_eq!(output.report.attachment_count, 1);
        assert!(output.document.contains("\"Model::RightGrip_Att\", \"Mesh\""));
    }

    #[test]
    fn given_missing_markers_when_exporting_attachment_then_locator_with_issue() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "Part", "Name": "RightHand", "Parent": 1},
            "4": {"Class": "Motor6D", "Name": "RightWrist", "Parent": 2, "Part0": 2, "Part1": 3},
            "5": {"Class": "Attachment", "Name": "FaceFrontAttachment", "Parent": 3}
        }"#;
        let output =
            export_rig(json, &MemoryAssetSource::new(), ExportOptions::default()).unwrap();

        assert_eq!(output.report.attachment_count, 0);
        assert!(output.document.contains("\"Model::FaceFront_Att\", \"Null\""));
        assert!(output
            .report
            .issues
            .iter()
            .any(|issue| issue.code == "MARKER_UNAVAILABLE"));
    }

    #[test]
    fn given_accessory_when_exported_then_grouped_with_acc_suffix() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "Accessory", "Name": "HatAccessory", "Parent": 1},
            "4": {"Class": "MeshPart", "Name": "Handle", "Parent": 3, "MeshId": "mem://hat.mesh"}
        }"#;
        let mut source = source_with_markers();
        source.insert("mem://hat.mesh", ascii_mesh());

        let output = export_rig(json, &source, ExportOptions::default()).unwrap();

        assert_eq!(output.report.accessory_count, 1);
        assert!(output.document.contains("\"Model::Accessories\""));
        assert!(output.document.contains("\"Model::Hat_Acc\""));
        assert!(output.document.contains("\"Model::Handle\", \"Mesh\""));
    }

    #[test]
    fn given_structurally_broken_rig_when_exported_then_no_output_is_produced() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1},
            "2": {"Class": "Part", "Name": "A", "Parent": 1}
        }"#;
        assert!(export_rig(json, &source_with_markers(), ExportOptions::default()).is_err());
    }

    #[test]
    fn given_shape_typed_mesh_part_without_payload_then_placeholder_scales_down() {
        let json = r#"{
            "1": {"Class": "Model", "Name": "Avatar", "Parent": -1, "PrimaryPart": 2},
            "2": {"Class": "Part", "Name": "HumanoidRootPart", "Parent": 1},
            "3": {"Class": "MeshPart", "Name": "Head", "Parent": 1, "MeshType": "Head",
                  "ScaleX": 1.0, "ScaleY": 1.0, "ScaleZ": 1.0,
                  "OffsetX": 0.0, "OffsetY": 0.0, "OffsetZ": 0.0},
            "4": {"Class": "Motor6D", "Name": "Neck", "Parent": 2, "Part0": 2, "Part1": 3}
        }"#;
        let mut source = source_with_markers();
        source.insert(HEAD_PLACEHOLDER_ASSET, ascii_mesh());

        let output = export_rig(json, &source, ExportOptions::default()).unwrap();

        assert_eq!(output.report.mesh_count, 1);
        assert!(output.document.contains("\"Model::Head_Geo\", \"Mesh\""));
        // The stand-in mesh spans x in [0, 1]; after the 1.25 shrink and the
        // half turn about Y its vertices land at x in [-0.8, 0].
        assert!(output.document.contains("-0.8"));
    }
}
