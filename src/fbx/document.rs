use std::collections::HashSet;

use uuid::Uuid;

use super::{FbxColor, FbxTransform, ObjectId, generate_object_id};
use crate::mesh::GeometryBuffer;

/// Bound on the linear suffix probe used for name disambiguation. Past it,
/// a globally unique token is used instead; this is a guaranteed
/// non-collision policy, not a performance knob.
const NAME_PROBE_LIMIT: usize = 5000;

/// Streaming FBX ASCII 7.3.0 document builder.
///
/// Objects are appended as self-contained text blocks in call order;
/// parent/child and named property links are deferred and written by
/// [`FbxDocument::finalize`], which consumes the builder. Block order is
/// fixed: header, definitions, objects, connections.
pub struct FbxDocument {
    text: String,
    names: HashSet<String>,
    connections: Vec<(ObjectId, ObjectId)>,
    named_connections: Vec<(ObjectId, ObjectId, String)>,
}

impl FbxDocument {
    pub fn new(name: &str) -> Self {
        let mut doc = Self {
            text: String::new(),
            names: HashSet::new(),
            connections: Vec::new(),
            named_connections: Vec::new(),
        };
        doc.write_header(name);
        doc.line("; Object properties;");
        doc.line(";------------------------------------------------------------------");
        doc.line("");
        doc.line("Objects:  {");
        doc
    }

    fn line(&mut self, text: &str) {
        self.text.push_str(text);
        self.text.push('\n');
    }

    /// Disambiguates a display name against the registry by probing small
    /// integer suffixes, falling back to a unique token once the probe
    /// probe limit is reached.
    fn unique_name(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        for i in 0..NAME_PROBE_LIMIT {
            if !self.names.contains(&candidate) {
                self.names.insert(candidate.clone());
                return candidate;
            }
            candidate = format!("{name}{i}");
        }

        let token = Uuid::new_v4().simple().to_string();
        self.names.insert(token.clone());
        token
    }

    fn write_header(&mut self, name: &str) {
        let stem = file_stem(name);

        self.line("; FBX 7.3.0 project file");
        self.line("; ----------------------------------------------------");
        self.line("");
        self.line("FBXHeaderExtension:  {");
        self.line("\tFBXHeaderVersion: 1003");
        self.line("\tFBXVersion: 7300");

        let now = jiff::Zoned::now();
        let stamp = now.datetime();
        self.line("\tCreationTimeStamp:  {");
        self.line("\t\tVersion: 1000");
        self.line(&format!("\t\tYear: {}", stamp.year()));
        self.line(&format!("\t\tMonth: {}", stamp.month()));
        self.line(&format!("\t\tDay: {}", stamp.day()));
        self.line(&format!("\t\tHour: {}", stamp.hour()));
        self.line(&format!("\t\tMinute: {}", stamp.minute()));
        self.line(&format!("\t\tSecond: {}", stamp.second()));
        self.line(&format!("\t\tMillisecond: {}", stamp.millisecond()));
        self.line("\t}");

        self.line("\tCreator: \"rig2fbx exporter\"");
        self.line("\tSceneInfo: \"SceneInfo::GlobalInfo\", \"UserData\" {");
        self.line("\t\tType: \"UserData\"");
        self.line("\t\tVersion: 100");
        self.line("\t\tMetaData:  {");
        self.line("\t\t\tVersion: 100");
        self.line("\t\t\tTitle: \"\"");
        self.line("\t\t\tSubject: \"\"");
        self.line("\t\t\tAuthor: \"\"");
        self.line("\t\t\tKeywords: \"\"");
        self.line("\t\t\tRevision: \"\"");
        self.line("\t\t\tComment: \"\"");
        self.line("\t\t}");
        self.line("\t\tProperties70:  {");
        self.line(&format!(
            "\t\t\tP: \"DocumentUrl\", \"KString\", \"Url\", \"\", \"{stem}.fbx\""
        ));
        self.line(&format!(
            "\t\t\tP: \"SrcDocumentUrl\", \"KString\", \"Url\", \"\", \"{stem}.fbx\""
        ));
        self.text.push_str(SCENE_INFO_TAIL);
        self.text.push_str(GLOBAL_SETTINGS);
        self.text.push_str(DEFINITIONS);
    }

    pub fn create_layer(&mut self, name: &str, color: FbxColor) -> ObjectId {
        let name = self.unique_name(name);
        let uid = generate_object_id();
        self.line(&format!(
            "\tCollectionExclusive: {uid}, \"DisplayLayer::{name}\", \"DisplayLayer\" {{"
        ));
        self.line("\t\tProperties70:  {");
        self.line(&format!(
            "\t\t\tP: \"Color\", \"ColorRGB\", \"Color\", \"\",{:.3},{:.3},{:.3}",
            color.r, color.g, color.b
        ));
        self.line("\t\t}");
        self.line("\t}");
        uid
    }

    pub fn create_group(&mut self, name: &str, parent: ObjectId) -> ObjectId {
        let name = self.unique_name(name);
        let uid = generate_object_id();
        self.line(&format!("\tModel: {uid}, \"Model::{name}\", \"Null\" {{"));
        self.line("\t\tVersion: 232");
        self.line("\t\tProperties70:  {");
        self.line("\t\t\tP: \"RotationActive\", \"bool\", \"\", \"\",1");
        self.line("\t\t\tP: \"InheritType\", \"enum\", \"\", \"\",1");
        self.line("\t\t\tP: \"ScalingMax\", \"Vector3D\", \"Vector\", \"\",0,0,0");
        self.line("\t\t\tP: \"DefaultAttributeIndex\", \"int\", \"Integer\", \"\",0");
        self.line("\t\t}");
        self.line("\t\tShading: Y");
        self.line("\t\tCulling: \"CullingOff\"");
        self.line("\t}");
        self.connections.push((uid, parent));
        uid
    }

    pub fn create_locator(&mut self, name: &str, t: &FbxTransform, parent: ObjectId) -> ObjectId {
        let name = self.unique_name(name);
        let attr_uid = generate_object_id();
        self.line(&format!(
            "\tNodeAttribute: {attr_uid}, \"NodeAttribute::\", \"Null\" {{"
        ));
        self.line("\t\tTypeFlags: \"Null\"");
        self.line("\t}");

        let uid = generate_object_id();
        self.line(&format!("\tModel: {uid}, \"Model::{name}\", \"Null\" {{"));
        self.line("\t\tVersion: 232");
        self.line("\t\tProperties70:  {");
        self.line("\t\t\tP: \"RotationActive\", \"bool\", \"\", \"\",1");
        self.line("\t\t\tP: \"InheritType\", \"enum\", \"\", \"\",1");
        self.line("\t\t\tP: \"ScalingMax\", \"Vector3D\", \"Vector\", \"\",0,0,0");
        self.line("\t\t\tP: \"DefaultAttributeIndex\", \"int\", \"Integer\", \"\",0");
        self.write_local_transform(t);
        self.line("\t\t}");
        self.line("\t\tShading: Y");
        self.line("\t\tCulling: \"CullingOff\"");
        self.line("\t}");
        self.connections.push((uid, parent));
        self.connections.push((attr_uid, uid));
        uid
    }

    pub fn create_bone(&mut self, name: &str, t: &FbxTransform, parent: ObjectId) -> ObjectId {
        let name = self.unique_name(name);
        let attr_uid = generate_object_id();
        self.line(&format!(
            "\tNodeAttribute: {attr_uid}, \"NodeAttribute::\", \"LimbNode\" {{"
        ));
        self.line("\t\tProperties70:  {");
        self.line("\t\t\tP: \"Size\", \"double\", \"Number\", \"\",10.0");
        self.line("\t\t}");
        self.line("\t\tTypeFlags: \"Skeleton\"");
        self.line("\t}");

        let uid = generate_object_id();
        self.line(&format!("\tModel: {uid}, \"Model::{name}\", \"LimbNode\" {{"));
        self.line("\t\tVersion: 232");
        self.line("\t\tProperties70:  {");
        self.line("\t\t\tP: \"PreRotation\", \"Vector3D\", \"Vector\", \"\",0, 0, 0");
        self.line("\t\t\tP: \"RotationActive\", \"bool\", \"\", \"\",1");
        self.line("\t\t\tP: \"InheritType\", \"enum\", \"\", \"\",1");
        self.line("\t\t\tP: \"ScalingMax\", \"Vector3D\", \"Vector\", \"\",0,0,0");
        self.line("\t\t\tP: \"DefaultAttributeIndex\", \"int\", \"Integer\", \"\",0");
        self.write_local_transform(t);
        self.line("\t\t}");
        self.line("\t\tShading: Y");
        self.line("\t\tCulling: \"CullingOff\"");
        self.line("\t}");
        self.connections.push((uid, parent));
        self.connections.push((attr_uid, uid));
        uid
    }

    pub fn create_material(&mut self, name: &str, color: FbxColor) -> ObjectId {
        let name = self.unique_name(name);
        let (r, g, b, a) = (color.r, color.g, color.b, color.a);
        let t = 1.0 - a;
        let uid = generate_object_id();
        self.line(&format!("\tMaterial: {uid}, \"Material::{name}\", \"\" {{"));
        self.line("\t\tVersion: 102");
        self.line("\t\tShadingModel: \"lambert\"");
        self.line("\t\tMultiLayer: 0");
        self.line("\t\tProperties70:  {");
        self.line("\t\t\tP: \"AmbientColor\", \"Color\", \"\", \"A\",0,0,0");
        self.line(&format!(
            "\t\t\tP: \"DiffuseColor\", \"Color\", \"\", \"A\",{r:.3},{g:.3},{b:.3}"
        ));
        self.line("\t\t\tP: \"DiffuseFactor\", \"Number\", \"\", \"A\",1.0");
        self.line(&format!(
            "\t\t\tP: \"TransparentColor\", \"Color\", \"\", \"A\",{t:.3},{t:.3},{t:.3}"
        ));
        self.line("\t\t\tP: \"TransparencyFactor\", \"Number\", \"\", \"A\",1");
        self.line("\t\t\tP: \"Emissive\", \"Vector3D\", \"Vector\", \"\",0,0,0");
        self.line("\t\t\tP: \"Ambient\", \"Vector3D\", \"Vector\", \"\",0,0,0");
        self.line(&format!(
            "\t\t\tP: \"Diffuse\", \"Vector3D\", \"Vector\", \"\",{r:.2},{g:.2},{b:.2}"
        ));
        self.line(&format!("\t\t\tP: \"Opacity\", \"double\", \"Number\", \"\",{a:.3}"));
        self.line("\t\t}");
        self.line("\t}");
        uid
    }

    pub fn create_texture(
        &mut self,
        name: &str,
        file_name: &str,
        material: ObjectId,
        property: &str,
    ) -> ObjectId {
        let name = self.unique_name(name);
        let uid = generate_object_id();
        self.line(&format!("\tTexture: {uid}, \"Texture::{name}\", \"\" {{"));
        self.line("\t\tType: \"TextureVideoClip\"");
        self.line("\t\tVersion: 202");
        self.line(&format!("\t\tTextureName: \"Texture::{name}\""));
        self.line("\t\tProperties70:  {");
        self.line("\t\t\tP: \"CurrentTextureBlendMode\", \"enum\", \"\", \"\",0");
        self.line("\t\t\tP: \"UVSet\", \"KString\", \"\", \"\",\"map1\"");
        self.line("\t\t\tP: \"UseMaterial\", \"bool\", \"\", \"\",1");
        self.line("\t\t}");
        self.line(&format!("\t\tMedia: \"Video::{name}\""));
        self.line(&format!("\t\tFileName: \"{file_name}\""));
        self.line(&format!("\t\tRelativeFilename: \"{file_name}\""));
        self.line("\t\tModelUVTranslation: 0,0");
        self.line("\t\tModelUVScaling: 1,1");
        self.line("\t\tTexture_Alpha_Source: \"None\"");
        self.line("\t\tCropping: 0,0,0,0");
        self.line("\t}");
        self.named_connections.push((uid, material, property.to_string()));
        uid
    }

    pub fn create_mesh(
        &mut self,
        name: &str,
        t: &FbxTransform,
        geometry: &GeometryBuffer,
        material: ObjectId,
        parent: ObjectId,
    ) -> ObjectId {
        let name = self.unique_name(name);
        let geom_uid = generate_object_id();
        self.line(&format!("\tGeometry: {geom_uid}, \"Geometry::\", \"Mesh\" {{"));

        let vertex_count = geometry.vertices.len();
        let index_count = geometry.indices.len();

        let positions = geometry
            .vertices
            .iter()
            .map(|v| format!("{},{},{}", v.position.x, v.position.y, v.position.z))
            .collect::<Vec<_>>()
            .join(",");
        self.line(&format!("\t\tVertices: *{} {{", vertex_count * 3));
        self.line(&format!("\t\t\ta: {positions}"));
        self.line("\t\t} ");

        // The closing index of each polygon is stored bitwise-negated,
        // marking the end of the triangle.
        let polygons = geometry
            .indices
            .chunks_exact(3)
            .map(|tri| format!("{},{},{}", tri[0], tri[1], -(tri[2] as i64) - 1))
            .collect::<Vec<_>>()
            .join(",");
        self.line(&format!("\t\tPolygonVertexIndex: *{index_count} {{"));
        self.line(&format!("\t\t\ta: {polygons}"));
        self.line("\t\t} ");

        // Flat shading: one normal triple per triangle corner rather than
        // per shared vertex.
        let normals = geometry
            .indices
            .iter()
            .map(|&index| {
                let n = geometry.vertices[index as usize].normal;
                format!("{},{},{}", n.x, n.y, n.z)
            })
            .collect::<Vec<_>>()
            .join(",");
        self.line("\t\tGeometryVersion: 124");
        self.line("\t\tLayerElementNormal: 0 {");
        self.line("\t\t\tVersion: 101");
        self.line("\t\t\tName: \"\"");
        self.line("\t\t\tMappingInformationType: \"ByPolygonVertex\"");
        self.line("\t\t\tReferenceInformationType: \"Direct\"");
        self.line(&format!("\t\t\tNormals: *{} {{", index_count * 3));
        self.line(&format!("\t\t\t\ta: {normals}"));
        self.line("\t\t\t}");
        self.line("\t\t}");

        let uvs = geometry
            .vertices
            .iter()
            .map(|v| format!("{},{}", v.uv.x, v.uv.y))
            .collect::<Vec<_>>()
            .join(",");
        let uv_indices = geometry
            .indices
            .iter()
            .map(|index| index.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.line("\t\tLayerElementUV: 0 {");
        self.line("\t\t\tVersion: 101");
        self.line("\t\t\tName: \"map1\"");
        self.line("\t\t\tMappingInformationType: \"ByPolygonVertex\"");
        self.line("\t\t\tReferenceInformationType: \"IndexToDirect\"");
        self.line(&format!("\t\t\tUV: *{} {{", vertex_count * 2));
        self.line(&format!("\t\t\t\ta: {uvs}"));
        self.line("\t\t\t\t}");
        self.line(&format!("\t\t\tUVIndex: *{index_count} {{"));
        self.line(&format!("\t\t\t\ta: {uv_indices}"));
        self.line("\t\t\t}");
        self.line("\t\t}");

        self.line("\t\tLayerElementMaterial: 0 {");
        self.line("\t\t\tVersion: 101");
        self.line("\t\t\tName: \"\"");
        self.line("\t\t\tMappingInformationType: \"AllSame\"");
        self.line("\t\t\tReferenceInformationType: \"IndexToDirect\"");
        self.line("\t\t\tMaterials: *1 {");
        self.line("\t\t\t\ta: 0");
        self.line("\t\t\t}");
        self.line("\t\t}");

        self.line("\t\tLayer: 0 {");
        self.line("\t\t\tVersion: 101");
        self.line("\t\t\tLayerElement:  {");
        self.line("\t\t\t\tType: \"LayerElementNormal\"");
        self.line("\t\t\t\tTypedIndex: 0");
        self.line("\t\t\t}");
        self.line("\t\t\tLayerElement:  {");
        self.line("\t\t\t\tType: \"LayerElementMaterial\"");
        self.line("\t\t\t\tTypedIndex: 0");
        self.line("\t\t\t}");
        self.line("\t\t\tLayerElement:  {");
        self.line("\t\t\t\tType: \"LayerElementUV\"");
        self.line("\t\t\t\tTypedIndex: 0");
        self.line("\t\t\t}");
        self.line("\t\t}");
        self.line("\t}");

        let uid = generate_object_id();
        self.line(&format!("\tModel: {uid}, \"Model::{name}\", \"Mesh\" {{"));
        self.line("\t\tVersion: 232");
        self.line("\t\tProperties70:  {");
        // RotationOrder 0 = Euler XYZ.
        self.line("\t\t\tP: \"RotationOrder\", \"enum\", \"\", \"\",0");
        self.line("\t\t\tP: \"RotationActive\", \"bool\", \"\", \"\",1");
        self.line("\t\t\tP: \"InheritType\", \"enum\", \"\", \"\",1");
        self.line("\t\t\tP: \"ScalingMax\", \"Vector3D\", \"Vector\", \"\",0,0,0");
        self.line("\t\t\tP: \"DefaultAttributeIndex\", \"int\", \"Integer\", \"\",0");
        self.write_local_transform(t);
        self.line("\t\t\tP: \"currentUVSet\", \"KString\", \"\", \"U\", \"map1\"");
        self.line("\t\t}");
        self.line("\t\tShading: T");
        self.line("\t\tCulling: \"CullingOff\"");
        self.line("\t}");

        if !material.is_root() {
            self.connections.push((material, uid));
        }
        self.connections.push((uid, parent));
        self.connections.push((geom_uid, uid));
        uid
    }

    fn write_local_transform(&mut self, t: &FbxTransform) {
        self.line(&format!(
            "\t\t\tP: \"Lcl Translation\", \"Lcl Translation\", \"\", \"A\",{},{},{}",
            t.translation.x, t.translation.y, t.translation.z
        ));
        self.line(&format!(
            "\t\t\tP: \"Lcl Rotation\", \"Lcl Rotation\", \"\", \"A\",{},{},{}",
            t.rotation_deg.x, t.rotation_deg.y, t.rotation_deg.z
        ));
        self.line(&format!(
            "\t\t\tP: \"Lcl Scaling\", \"Lcl Scaling\", \"\", \"A\",{},{},{}",
            t.scale.x, t.scale.y, t.scale.z
        ));
    }

    /// Records a deferred child-to-parent link; links touching the document
    /// root are dropped, matching layer assignment semantics.
    pub fn connect(&mut self, object: ObjectId, owner: ObjectId) {
        if object.is_root() || owner.is_root() {
            return;
        }
        self.connections.push((object, owner));
    }

    /// Records a deferred named property link.
    pub fn connect_named(&mut self, object: ObjectId, owner: ObjectId, property: &str) {
        self.named_connections.push((object, owner, property.to_string()));
    }

    /// Closes the object section, appends all deferred connections and
    /// returns the document text. Consumes the builder: a document is
    /// finalized exactly once.
    pub fn finalize(mut self) -> String {
        self.line("}");
        self.line("; Object connections");
        self.line(";------------------------------------------------------------------");
        self.line("");
        self.line("Connections:  {");

        let connections = std::mem::take(&mut self.connections);
        for (object, owner) in connections {
            self.line(&format!("\tC: \"OO\",{object},{owner}"));
        }
        let named = std::mem::take(&mut self.named_connections);
        for (object, owner, property) in named {
            self.line(&format!("\tC: \"OP\",{object},{owner}, \"{property}\""));
        }

        self.line("}");
        self.text
    }
}

/// Reduces a path-like document name to its file stem.
fn file_stem(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    let base = normalized.rsplit('/').next().unwrap_or(&normalized);
    match base.rfind('.') {
        Some(index) => base[..index].to_string(),
        None => base.to_string(),
    }
}

const SCENE_INFO_TAIL: &str = "\t\t\tP: \"Original\", \"Compound\", \"\", \"\"\n\
\t\t\tP: \"Original|ApplicationVendor\", \"KString\", \"\", \"\", \"\"\n\
\t\t\tP: \"Original|ApplicationName\", \"KString\", \"\", \"\", \"\"\n\
\t\t\tP: \"Original|ApplicationVersion\", \"KString\", \"\", \"\", \"\"\n\
\t\t\tP: \"Original|DateTime_GMT\", \"DateTime\", \"\", \"\", \"\"\n\
\t\t\tP: \"Original|FileName\", \"KString\", \"\", \"\", \"\"\n\
\t\t\tP: \"LastSaved\", \"Compound\", \"\", \"\"\n\
\t\t\tP: \"LastSaved|ApplicationVendor\", \"KString\", \"\", \"\", \"\"\n\
\t\t\tP: \"LastSaved|ApplicationName\", \"KString\", \"\", \"\", \"\"\n\
\t\t\tP: \"LastSaved|ApplicationVersion\", \"KString\", \"\", \"\", \"\"\n\
\t\t\tP: \"LastSaved|DateTime_GMT\", \"DateTime\", \"\", \"\", \"\"\n\
\t\t}\n\
\t}\n\
}\n";

const GLOBAL_SETTINGS: &str = "GlobalSettings:  {\n\
\tVersion: 1000\n\
\tProperties70:  {\n\
\t\tP: \"UpAxis\", \"int\", \"Integer\", \"\",1\n\
\t\tP: \"UpAxisSign\", \"int\", \"Integer\", \"\",1\n\
\t\tP: \"FrontAxis\", \"int\", \"Integer\", \"\",2\n\
\t\tP: \"FrontAxisSign\", \"int\", \"Integer\", \"\",1\n\
\t\tP: \"CoordAxis\", \"int\", \"Integer\", \"\",0\n\
\t\tP: \"CoordAxisSign\", \"int\", \"Integer\", \"\",1\n\
\t\tP: \"OriginalUpAxis\", \"int\", \"Integer\", \"\",-1\n\
\t\tP: \"OriginalUpAxisSign\", \"int\", \"Integer\", \"\",1\n\
\t\tP: \"UnitScaleFactor\", \"double\", \"Number\", \"\",1\n\
\t\tP: \"OriginalUnitScaleFactor\", \"double\", \"Number\", \"\",100\n\
\t\tP: \"AmbientColor\", \"ColorRGB\", \"Color\", \"\",0,0,0\n\
\t\tP: \"DefaultCamera\", \"KString\", \"\", \"\", \"Producer Perspective\"\n\
\t\tP: \"TimeMode\", \"enum\", \"\", \"\",11\n\
\t\tP: \"TimeSpanStart\", \"KTime\", \"Time\", \"\",0\n\
\t\tP: \"TimeSpanStop\", \"KTime\", \"Time\", \"\",479181389250\n\
\t\tP: \"CustomFrameRate\", \"double\", \"Number\", \"\",-1\n\
\t}\n\
}\n\
; Document References\n\
;------------------------------------------------------------------\n\
\n\
References:  {\n\
}\n";

const DEFINITIONS: &str = "; Object definitions\n\
;------------------------------------------------------------------\n\
\n\
Definitions:  {\n\
\tVersion: 100\n\
\tCount: 8\n\
\tObjectType: \"GlobalSettings\" {\n\
\t\tCount: 1\n\
\t}\n\
\tObjectType: \"Model\" {\n\
\t\tCount: 1\n\
\t\tPropertyTemplate: \"FbxNode\" {\n\
\t\t\tProperties70:  {\n\
\t\t\t\tP: \"QuaternionInterpolate\", \"enum\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationOffset\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"RotationPivot\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"ScalingOffset\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"ScalingPivot\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"TranslationActive\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"TranslationMin\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"TranslationMax\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"TranslationMinX\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"TranslationMinY\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"TranslationMinZ\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"TranslationMaxX\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"TranslationMaxY\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"TranslationMaxZ\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationOrder\", \"enum\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationSpaceForLimitOnly\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationStiffnessX\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"RotationStiffnessY\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"RotationStiffnessZ\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"AxisLen\", \"double\", \"Number\", \"\",10\n\
\t\t\t\tP: \"PreRotation\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"PostRotation\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"RotationActive\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationMin\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"RotationMax\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"RotationMinX\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationMinY\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationMinZ\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationMaxX\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationMaxY\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"RotationMaxZ\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"InheritType\", \"enum\", \"\", \"\",0\n\
\t\t\t\tP: \"ScalingActive\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"ScalingMin\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"ScalingMax\", \"Vector3D\", \"Vector\", \"\",1,1,1\n\
\t\t\t\tP: \"ScalingMinX\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"ScalingMinY\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"ScalingMinZ\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"ScalingMaxX\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"ScalingMaxY\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"ScalingMaxZ\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"GeometricTranslation\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"GeometricRotation\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"GeometricScaling\", \"Vector3D\", \"Vector\", \"\",1,1,1\n\
\t\t\t\tP: \"MinDampRangeX\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MinDampRangeY\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MinDampRangeZ\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MaxDampRangeX\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MaxDampRangeY\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MaxDampRangeZ\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MinDampStrengthX\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MinDampStrengthY\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MinDampStrengthZ\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MaxDampStrengthX\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MaxDampStrengthY\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"MaxDampStrengthZ\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"PreferedAngleX\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"PreferedAngleY\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"PreferedAngleZ\", \"double\", \"Number\", \"\",0\n\
\t\t\t\tP: \"LookAtProperty\", \"object\", \"\", \"\"\n\
\t\t\t\tP: \"UpVectorProperty\", \"object\", \"\", \"\"\n\
\t\t\t\tP: \"Show\", \"bool\", \"\", \"\",1\n\
\t\t\t\tP: \"NegativePercentShapeSupport\", \"bool\", \"\", \"\",1\n\
\t\t\t\tP: \"DefaultAttributeIndex\", \"int\", \"Integer\", \"\",-1\n\
\t\t\t\tP: \"Freeze\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"LODBox\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"Lcl Translation\", \"Lcl Translation\", \"\", \"A\",0,0,0\n\
\t\t\t\tP: \"Lcl Rotation\", \"Lcl Rotation\", \"\", \"A\",0,0,0\n\
\t\t\t\tP: \"Lcl Scaling\", \"Lcl Scaling\", \"\", \"A\",1,1,1\n\
\t\t\t\tP: \"Visibility\", \"Visibility\", \"\", \"A\",1\n\
\t\t\t\tP: \"Visibility Inheritance\", \"Visibility Inheritance\", \"\", \"\",1\n\
\t\t\t}\n\
\t\t}\n\
\t}\n\
\tObjectType: \"CollectionExclusive\" {\n\
\t\tCount: 1\n\
\t\tPropertyTemplate: \"FbxDisplayLayer\" {\n\
\t\t\tProperties70:  {\n\
\t\t\t\tP: \"Color\", \"ColorRGB\", \"Color\", \"\",0.8,0.8,0.8\n\
\t\t\t\tP: \"Show\", \"bool\", \"\", \"\",1\n\
\t\t\t\tP: \"Freeze\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"LODBox\", \"bool\", \"\", \"\",0\n\
\t\t\t}\n\
\t\t}\n\
\t}\n\
\tObjectType: \"NodeAttribute\" {\n\
\t\tCount: 1\n\
\t\tPropertyTemplate: \"FbxNull\" {\n\
\t\t\tProperties70:  {\n\
\t\t\t\tP: \"Color\", \"ColorRGB\", \"Color\", \"\",0.8,0.8,0.8\n\
\t\t\t\tP: \"Size\", \"double\", \"Number\", \"\",100\n\
\t\t\t\tP: \"Look\", \"enum\", \"\", \"\",1\n\
\t\t\t}\n\
\t\t}\n\
\t}\n\
\tObjectType: \"Pose\" {\n\
\t\tCount: 1\n\
\t}\n\
\tObjectType: \"Deformer\" {\n\
\t\tCount: 1\n\
\t}\n\
\tObjectType: \"Geometry\" {\n\
\t\tCount: 1\n\
\t\tPropertyTemplate: \"FbxMesh\" {\n\
\t\t\tProperties70:  {\n\
\t\t\t\tP: \"Color\", \"ColorRGB\", \"Color\", \"\",0.8,0.8,0.8\n\
\t\t\t\tP: \"BBoxMin\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"BBoxMax\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"Primary Visibility\", \"bool\", \"\", \"\",1\n\
\t\t\t\tP: \"Casts Shadows\", \"bool\", \"\", \"\",1\n\
\t\t\t\tP: \"Receive Shadows\", \"bool\", \"\", \"\",1\n\
\t\t\t}\n\
\t\t}\n\
\t}\n\
\tObjectType: \"Material\" {\n\
\t\tCount: 1\n\
\t\tPropertyTemplate: \"FbxSurfaceLambert\" {\n\
\t\t\tProperties70:  {\n\
\t\t\t\tP: \"ShadingModel\", \"KString\", \"\", \"\", \"Lambert\"\n\
\t\t\t\tP: \"MultiLayer\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"EmissiveColor\", \"Color\", \"\", \"A\",0,0,0\n\
\t\t\t\tP: \"EmissiveFactor\", \"Number\", \"\", \"A\",1\n\
\t\t\t\tP: \"AmbientColor\", \"Color\", \"\", \"A\",0.2,0.2,0.2\n\
\t\t\t\tP: \"AmbientFactor\", \"Number\", \"\", \"A\",1\n\
\t\t\t\tP: \"DiffuseColor\", \"Color\", \"\", \"A\",0.8,0.8,0.8\n\
\t\t\t\tP: \"DiffuseFactor\", \"Number\", \"\", \"A\",1\n\
\t\t\t\tP: \"Bump\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"NormalMap\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"BumpFactor\", \"double\", \"Number\", \"\",1\n\
\t\t\t\tP: \"TransparentColor\", \"Color\", \"\", \"A\",0,0,0\n\
\t\t\t\tP: \"TransparencyFactor\", \"Number\", \"\", \"A\",0\n\
\t\t\t\tP: \"DisplacementColor\", \"ColorRGB\", \"Color\", \"\",0,0,0\n\
\t\t\t\tP: \"DisplacementFactor\", \"double\", \"Number\", \"\",1\n\
\t\t\t\tP: \"VectorDisplacementColor\", \"ColorRGB\", \"Color\", \"\",0,0,0\n\
\t\t\t\tP: \"VectorDisplacementFactor\", \"double\", \"Number\", \"\",1\n\
\t\t\t}\n\
\t\t}\n\
\t}\n\
\tObjectType: \"Texture\" {\n\
\t\tCount: 1\n\
\t\tPropertyTemplate: \"FbxFileTexture\" {\n\
\t\t\tProperties70:  {\n\
\t\t\t\tP: \"TextureTypeUse\", \"enum\", \"\", \"\",0\n\
\t\t\t\tP: \"Texture alpha\", \"Number\", \"\", \"A\",1\n\
\t\t\t\tP: \"CurrentMappingType\", \"enum\", \"\", \"\",0\n\
\t\t\t\tP: \"WrapModeU\", \"enum\", \"\", \"\",0\n\
\t\t\t\tP: \"WrapModeV\", \"enum\", \"\", \"\",0\n\
\t\t\t\tP: \"UVSwap\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"PremultiplyAlpha\", \"bool\", \"\", \"\",1\n\
\t\t\t\tP: \"Translation\", \"Vector\", \"\", \"A\",0,0,0\n\
\t\t\t\tP: \"Rotation\", \"Vector\", \"\", \"A\",0,0,0\n\
\t\t\t\tP: \"Scaling\", \"Vector\", \"\", \"A\",1,1,1\n\
\t\t\t\tP: \"TextureRotationPivot\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"TextureScalingPivot\", \"Vector3D\", \"Vector\", \"\",0,0,0\n\
\t\t\t\tP: \"CurrentTextureBlendMode\", \"enum\", \"\", \"\",1\n\
\t\t\t\tP: \"UVSet\", \"KString\", \"\", \"\", \"default\"\n\
\t\t\t\tP: \"UseMaterial\", \"bool\", \"\", \"\",0\n\
\t\t\t\tP: \"UseMipMap\", \"bool\", \"\", \"\",0\n\
\t\t\t}\n\
\t\t}\n\
\t}\n\
}\n\
\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{GeometryBuffer, GeometryVertex};
    use nalgebra::{Vector2, Vector3};

    fn triangle_buffer() -> GeometryBuffer {
        let vertex = |x: f32| GeometryVertex {
            position: Vector3::new(x, 0.0, 0.0),
            normal: Vector3::new(0.0, 1.0, 0.0),
            uv: Vector2::new(0.0, 0.0),
        };
        GeometryBuffer {
            vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0)],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn given_empty_document_when_finalized_then_sections_appear_in_order() {
        let text = FbxDocument::new("Avatar").finalize();

        let header = text.find("FBXHeaderExtension").unwrap();
        let definitions = text.find("Definitions:").unwrap();
        let objects = text.find("Objects:").unwrap();
        let connections = text.find("Connections:").unwrap();
        assert!(header < definitions && definitions < objects && objects < connections);
        assert!(text.contains("\"Avatar.fbx\""));
    }

    #[test]
    fn given_duplicate_names_when_creating_groups_then_suffix_disambiguates() {
        let mut doc = FbxDocument::new("scene");
        doc.create_group("Torso", ObjectId::ROOT);
        doc.create_group("Torso", ObjectId::ROOT);
        doc.create_group("Torso", ObjectId::ROOT);
        let text = doc.finalize();

        assert!(text.contains("\"Model::Torso\""));
        assert!(text.contains("\"Model::Torso0\""));
        assert!(text.contains("\"Model::Torso1\""));
    }

    #[test]
    fn given_bone_when_created_then_limb_node_and_attribute_are_linked() {
        let mut doc = FbxDocument::new("scene");
        let bone = doc.create_bone("Spine", &FbxTransform::default(), ObjectId::ROOT);
        let text = doc.finalize();

        assert_eq!(text.matches("\"LimbNode\" {").count(), 2);
        assert!(text.contains(&format!(",{bone}\n")));
    }

    #[test]
    fn given_triangle_mesh_when_created_then_last_index_is_negated() {
        let mut doc = FbxDocument::new("scene");
        let material = doc.create_material("Mat", FbxColor::rgb(1.0, 1.0, 1.0));
        doc.create_mesh(
            "Tri",
            &FbxTransform::default(),
            &triangle_buffer(),
            material,
            ObjectId::ROOT,
        );
        let text = doc.finalize();

        assert!(text.contains("PolygonVertexIndex: *3 {"));
        assert!(text.contains("a: 0,1,-3"));
        // Flat shading emits one normal triple per triangle corner.
        assert!(text.contains("Normals: *9 {"));
    }

    #[test]
    fn given_texture_when_created_then_named_connection_is_deferred() {
        let mut doc = FbxDocument::new("scene");
        let material = doc.create_material("Mat", FbxColor::rgb(1.0, 1.0, 1.0));
        let texture = doc.create_texture("Tex", "skin.png", material, "DiffuseColor");
        let text = doc.finalize();

        assert!(text.contains(&format!("C: \"OP\",{texture},{material}, \"DiffuseColor\"")));
        assert!(text.contains("FileName: \"skin.png\""));
    }

    #[test]
    fn given_root_linkage_when_connecting_then_link_is_dropped() {
        let mut doc = FbxDocument::new("scene");
        let group = doc.create_group("G", ObjectId::ROOT);
        doc.connect(group, ObjectId::ROOT);
        let text = doc.finalize();

        // Only the implicit create_group link remains.
        assert_eq!(text.matches("C: \"OO\"").count(), 1);
    }

    #[test]
    fn given_path_like_name_when_reduced_then_stem_remains() {
        assert_eq!(file_stem("./Avatars/Rig/Rig.fbx"), "Rig");
        assert_eq!(file_stem("C:\\out\\model.fbx"), "model");
        assert_eq!(file_stem("plain"), "plain");
    }
}
