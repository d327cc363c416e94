use nalgebra::{Vector2, Vector3};
use thiserror::Error;

use super::{Mesh, Triangle, Vertex};

/// Every payload starts with a fixed-length textual signature.
const SIGNATURE_LEN: usize = 12;

/// Payloads declaring more LODs than this are considered corrupt.
const MAX_LOD_COUNT: u16 = 8;

/// Joint record layout in the skeletal section of v4+ payloads:
/// name offset (4) + parent (2) + lod (2) + skin radius (4) + 3x4 frame (48).
const JOINT_RECORD_SIZE: usize = 60;

/// Skin subset record: five u32 counters plus 26 u16 joint mappings.
const SUBSET_RECORD_SIZE: usize = 72;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognized mesh signature {0:?}")]
    UnrecognizedSignature(String),
    #[error("mesh version {0:?} is not supported")]
    UnsupportedVersion(String),
    #[error("unexpected mesh v{version} header size {size}")]
    HeaderSizeMismatch { version: u8, size: u16 },
    #[error("unsupported vertex record size {0}")]
    UnsupportedVertexSize(u16),
    #[error("unsupported face record size {0}")]
    UnsupportedFaceSize(u16),
    #[error("unsupported LOD record size {0}")]
    UnsupportedLodSize(u16),
    #[error("LOD count {0} exceeds the limit of {MAX_LOD_COUNT}")]
    TooManyLods(u16),
    #[error("mesh declares no vertices or no faces")]
    EmptyMesh,
    #[error("payload truncated at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("malformed text mesh: {0}")]
    MalformedText(String),
    #[error("LOD boundary table is not a non-decreasing cover of the face list")]
    InvalidLodTable,
    #[error("LOD index {lod} out of range for a mesh with {count} LOD(s)")]
    LodIndexOutOfRange { lod: usize, count: usize },
    #[error("vertex index {index} out of range for {count} vertices")]
    VertexIndexOutOfRange { index: u32, count: usize },
}

/// Little-endian reader over a payload slice. All reads are bounds-checked
/// and report the offset at which the payload ran short.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(DecodeError::UnexpectedEof { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.take(len).map(|_| ())
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_u32()?))
    }
}

/// Decodes a mesh payload, dispatching on the leading version signature.
///
/// Decoding is strict: any header mismatch, out-of-bounds count or truncated
/// section fails with a typed error and yields no mesh. Skeletal joint and
/// skin-weight sections of v4+ payloads are consumed but not retained.
pub fn decode(bytes: &[u8]) -> Result<Mesh, DecodeError> {
    if bytes.len() < SIGNATURE_LEN {
        return Err(DecodeError::UnrecognizedSignature(
            String::from_utf8_lossy(bytes).into_owned(),
        ));
    }

    let signature = &bytes[..SIGNATURE_LEN];
    match signature {
        b"version 1.00" => decode_text(bytes, 0.5),
        b"version 1.01" => decode_text(bytes, 1.0),
        b"version 2.00" => decode_binary(bytes, 2),
        b"version 3.00" | b"version 3.01" => decode_binary(bytes, 3),
        b"version 4.00" | b"version 4.01" => decode_binary(bytes, 4),
        b"version 5.00" => decode_binary(bytes, 5),
        b"version 6.00" | b"version 7.00" => Err(DecodeError::UnsupportedVersion(
            String::from_utf8_lossy(signature).into_owned(),
        )),
        _ => Err(DecodeError::UnrecognizedSignature(
            String::from_utf8_lossy(signature).into_owned(),
        )),
    }
}

/// Textual variant: a face count line followed by a grid of bracketed
/// `[x,y,z]` triplets, `faces * 9` of them (position, normal, uv per
/// vertex). Positions are scaled by `position_scale` (0.5 for 1.00 payloads)
/// and the stored V texture coordinate is sign-inverted.
fn decode_text(bytes: &[u8], position_scale: f32) -> Result<Mesh, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| DecodeError::MalformedText("payload is not valid UTF-8".to_string()))?;

    let mut lines = text.lines();
    lines.next(); // signature line
    let num_faces: usize = lines
        .next()
        .map(str::trim)
        .ok_or_else(|| DecodeError::MalformedText("missing face count line".to_string()))?
        .parse()
        .map_err(|_| DecodeError::MalformedText("face count is not an integer".to_string()))?;
    let data = lines
        .next()
        .map(str::trim)
        .ok_or_else(|| DecodeError::MalformedText("missing vertex data line".to_string()))?;

    let data = data
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| DecodeError::MalformedText("vertex data is not bracketed".to_string()))?;
    let triplets: Vec<&str> = data.split("][").collect();
    if triplets.len() != num_faces * 9 {
        return Err(DecodeError::MalformedText(format!(
            "expected {} triplets, found {}",
            num_faces * 9,
            triplets.len()
        )));
    }

    let mut mesh = Mesh::default();
    for chunk in triplets.chunks_exact(3) {
        let position = parse_triplet(chunk[0])?;
        let normal = parse_triplet(chunk[1])?;
        let uv = parse_triplet(chunk[2])?;

        mesh.vertices.push(Vertex {
            position: position * position_scale,
            normal,
            uv: Vector2::new(uv.x, -uv.y),
            ..Vertex::default()
        });
    }

    for face in 0..num_faces as u32 {
        mesh.triangles.push(Triangle {
            indices: [face * 3, face * 3 + 1, face * 3 + 2],
        });
    }

    mesh.assign_lod_offsets(vec![0, num_faces as u32])?;
    Ok(mesh)
}

fn parse_triplet(triplet: &str) -> Result<Vector3<f32>, DecodeError> {
    let mut values = triplet.split(',').map(|value| value.trim().parse::<f32>());
    let mut next = || {
        values
            .next()
            .and_then(Result::ok)
            .ok_or_else(|| DecodeError::MalformedText(format!("bad triplet {triplet:?}")))
    };
    let parsed = Vector3::new(next()?, next()?, next()?);
    if values.next().is_some() {
        return Err(DecodeError::MalformedText(format!("bad triplet {triplet:?}")));
    }
    Ok(parsed)
}

struct BinaryHeader {
    vertex_size: u16,
    face_size: u16,
    lod_size: u16,
    num_lods: u16,
    num_vertices: u32,
    num_faces: u32,
    num_joints: u16,
    num_joint_name_chars: u32,
    num_skinning_subsets: u16,
    facs_driver_size: u32,
}

/// Binary variant family: four header shapes (v2/v3/v4/v5) sharing a common
/// vertex/face body, with optional LOD, skeletal and FACS trailer sections.
fn decode_binary(bytes: &[u8], version: u8) -> Result<Mesh, DecodeError> {
    // Signature plus the newline that terminates the header line.
    let mut reader = Reader::new(bytes, SIGNATURE_LEN);
    reader.skip(1)?;

    let header_size = reader.read_u16()?;
    let header = match version {
        2 => {
            let vertex_size = reader.read_u8()? as u16;
            let face_size = reader.read_u8()? as u16;
            let num_vertices = reader.read_u32()?;
            let num_faces = reader.read_u32()?;
            if header_size != 12 {
                return Err(DecodeError::HeaderSizeMismatch {
                    version,
                    size: header_size,
                });
            }
            BinaryHeader {
                vertex_size,
                face_size,
                lod_size: 4,
                num_lods: 0,
                num_vertices,
                num_faces,
                num_joints: 0,
                num_joint_name_chars: 0,
                num_skinning_subsets: 0,
                facs_driver_size: 0,
            }
        }
        3 => {
            let vertex_size = reader.read_u8()? as u16;
            let face_size = reader.read_u8()? as u16;
            let lod_size = reader.read_u16()?;
            let num_lods = reader.read_u16()?;
            let num_vertices = reader.read_u32()?;
            let num_faces = reader.read_u32()?;
            if header_size != 16 {
                return Err(DecodeError::HeaderSizeMismatch {
                    version,
                    size: header_size,
                });
            }
            BinaryHeader {
                vertex_size,
                face_size,
                lod_size,
                num_lods,
                num_vertices,
                num_faces,
                num_joints: 0,
                num_joint_name_chars: 0,
                num_skinning_subsets: 0,
                facs_driver_size: 0,
            }
        }
        4 | 5 => {
            let _lod_type = reader.read_u16()?;
            let num_vertices = reader.read_u32()?;
            let num_faces = reader.read_u32()?;
            let num_lods = reader.read_u16()?;
            let num_joints = reader.read_u16()?;
            let num_joint_name_chars = reader.read_u32()?;
            let num_skinning_subsets = reader.read_u16()?;
            let _num_quality_lods = reader.read_u8()?;
            reader.skip(1)?; // padding

            let mut facs_driver_size = 0;
            if version == 5 {
                let facs_driver_version = reader.read_u32()?;
                let size = reader.read_u32()?;
                if facs_driver_version != 0 {
                    facs_driver_size = size;
                }
            }

            let expected = if version == 4 { 24 } else { 32 };
            if header_size != expected {
                return Err(DecodeError::HeaderSizeMismatch {
                    version,
                    size: header_size,
                });
            }
            BinaryHeader {
                vertex_size: 40,
                face_size: 12,
                lod_size: 4,
                num_lods,
                num_vertices,
                num_faces,
                num_joints,
                num_joint_name_chars,
                num_skinning_subsets,
                facs_driver_size,
            }
        }
        _ => unreachable!("decode() dispatches known binary versions only"),
    };

    if header.num_vertices == 0 || header.num_faces == 0 {
        return Err(DecodeError::EmptyMesh);
    }
    if header.num_lods > MAX_LOD_COUNT {
        return Err(DecodeError::TooManyLods(header.num_lods));
    }
    if header.vertex_size != 36 && header.vertex_size != 40 {
        return Err(DecodeError::UnsupportedVertexSize(header.vertex_size));
    }
    if header.face_size != 12 {
        return Err(DecodeError::UnsupportedFaceSize(header.face_size));
    }
    if header.num_lods > 0 && header.lod_size != 4 {
        return Err(DecodeError::UnsupportedLodSize(header.lod_size));
    }

    let mut mesh = Mesh::default();
    for _ in 0..header.num_vertices {
        let position = Vector3::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?);
        let normal = Vector3::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?);
        let u = reader.read_f32()?;
        let v = reader.read_f32()?;
        let _w = reader.read_f32()?;

        let color = if header.vertex_size == 40 {
            let bytes = reader.take(4)?;
            [bytes[0], bytes[1], bytes[2], bytes[3]]
        } else {
            [0xff; 4]
        };

        mesh.vertices.push(Vertex {
            position,
            normal,
            uv: Vector2::new(u, v),
            color,
        });
    }

    // Per-vertex joint indices and weights: consumed, not retained.
    if header.num_joints > 0 {
        reader.skip(header.num_vertices as usize * 8)?;
    }

    for _ in 0..header.num_faces {
        mesh.triangles.push(Triangle {
            indices: [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?],
        });
    }

    let lods = if header.num_lods > 0 {
        let mut lods = Vec::with_capacity(header.num_lods as usize);
        for _ in 0..header.num_lods {
            lods.push(reader.read_u32()?);
        }
        lods
    } else {
        vec![0, header.num_faces]
    };

    // Skeletal joint records, the joint name table and skin subsets: the
    // export target carries no skinning, so the stream is advanced past them.
    reader.skip(header.num_joints as usize * JOINT_RECORD_SIZE)?;
    reader.skip(header.num_joint_name_chars as usize)?;
    reader.skip(header.num_skinning_subsets as usize * SUBSET_RECORD_SIZE)?;
    reader.skip(header.facs_driver_size as usize)?;

    mesh.assign_lod_offsets(lods)?;
    Ok(mesh)
}
