use std::ops::Range;

use bytemuck::Pod;

use crate::device::{BufferUsage, Device, GpuError, IndexFormat, RenderEncoder, VertexLayout};

/// A contiguous range of the index buffer drawn with one call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Submesh {
    pub first_index: u32,
    pub index_count: u32,
}

impl Submesh {
    pub const fn new(first_index: u32, index_count: u32) -> Self {
        Self {
            first_index,
            index_count,
        }
    }

    pub fn range(&self) -> Range<u32> {
        self.first_index..self.first_index + self.index_count
    }
}

/// Index data as handed over by a geometry provider.
#[derive(Debug, Copy, Clone)]
pub struct IndexData<'a> {
    pub format: IndexFormat,
    pub bytes: &'a [u8],
    /// Draw ranges. Empty means one draw over every index.
    pub submeshes: &'a [Submesh],
}

/// Supplier of startup geometry.
///
/// The layout describes the bytes returned by `vertex_bytes`; the pipeline is compiled against
/// that same layout.
pub trait GeometrySource {
    fn vertex_layout(&self) -> VertexLayout;
    fn vertex_bytes(&self) -> &[u8];
    fn indices(&self) -> Option<IndexData<'_>>;
}

#[derive(Debug, Clone)]
enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

/// CPU-side mesh built from plain-old-data vertex records.
#[derive(Debug, Clone)]
pub struct MeshData<V> {
    vertices: Vec<V>,
    layout: VertexLayout,
    indices: Option<(Indices, Vec<Submesh>)>,
}

impl<V: Pod> MeshData<V> {
    pub fn new(vertices: Vec<V>, layout: VertexLayout) -> Self {
        Self {
            vertices,
            layout,
            indices: None,
        }
    }

    pub fn with_indices_u16(mut self, indices: Vec<u16>, submeshes: Vec<Submesh>) -> Self {
        self.indices = Some((Indices::U16(indices), submeshes));
        self
    }

    pub fn with_indices_u32(mut self, indices: Vec<u32>, submeshes: Vec<Submesh>) -> Self {
        self.indices = Some((Indices::U32(indices), submeshes));
        self
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }
}

impl<V: Pod> GeometrySource for MeshData<V> {
    fn vertex_layout(&self) -> VertexLayout {
        self.layout.clone()
    }

    fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    fn indices(&self) -> Option<IndexData<'_>> {
        let (indices, submeshes) = self.indices.as_ref()?;
        let (format, bytes) = match indices {
            Indices::U16(v) => (IndexFormat::Uint16, bytemuck::cast_slice::<u16, u8>(v)),
            Indices::U32(v) => (IndexFormat::Uint32, bytemuck::cast_slice::<u32, u8>(v)),
        };
        Some(IndexData {
            format,
            bytes,
            submeshes,
        })
    }
}

/// Device-resident index data and its draw ranges.
pub struct IndexBuffer<B> {
    buffer: B,
    format: IndexFormat,
    count: u32,
    submeshes: Vec<Submesh>,
}

impl<B> IndexBuffer<B> {
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn format(&self) -> IndexFormat {
        self.format
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }
}

/// Immutable device-resident geometry.
pub struct GeometryBuffer<B> {
    vertices: B,
    vertex_count: u32,
    layout: VertexLayout,
    indices: Option<IndexBuffer<B>>,
}

impl<B> GeometryBuffer<B> {
    /// Copies `source` into device memory.
    ///
    /// The vertex byte length must be a whole number of records for the declared stride, and
    /// every submesh and index must stay in bounds.
    pub fn upload<D>(device: &D, source: &impl GeometrySource) -> Result<Self, GpuError>
    where
        D: Device<Buffer = B>,
    {
        let layout = source.vertex_layout();
        layout.validate().map_err(GpuError::InvalidGeometry)?;

        let bytes = source.vertex_bytes();
        if bytes.is_empty() {
            return Err(GpuError::InvalidGeometry("no vertex data".into()));
        }
        if bytes.len() as u64 % layout.stride() != 0 {
            return Err(GpuError::InvalidGeometry(format!(
                "{} vertex bytes is not a multiple of stride {}",
                bytes.len(),
                layout.stride()
            )));
        }
        let vertex_count = u32::try_from(bytes.len() as u64 / layout.stride())
            .map_err(|_| GpuError::InvalidGeometry("too many vertices".into()))?;

        let indices = match source.indices() {
            Some(data) => Some(upload_indices(device, data, vertex_count)?),
            None => None,
        };

        let vertices = device.new_buffer("lumen vertex buffer", bytes, BufferUsage::Vertex)?;

        log::info!(
            "geometry uploaded: {vertex_count} vertices, {} draw ranges",
            indices.as_ref().map_or(1, |i| i.submeshes.len())
        );

        Ok(Self {
            vertices,
            vertex_count,
            layout,
            indices,
        })
    }

    pub fn vertex_buffer(&self) -> &B {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn indices(&self) -> Option<&IndexBuffer<B>> {
        self.indices.as_ref()
    }

    /// Number of draw calls `encode_draws` issues.
    pub fn draw_count(&self) -> usize {
        self.indices.as_ref().map_or(1, |i| i.submeshes.len())
    }

    /// Issues one indexed draw per submesh, or one draw over all vertices.
    pub fn encode_draws<E>(&self, encoder: &mut E)
    where
        E: RenderEncoder<Buffer = B>,
    {
        match &self.indices {
            Some(ib) => {
                for submesh in &ib.submeshes {
                    encoder.draw_indexed(&ib.buffer, ib.format, submesh.range());
                }
            }
            None => encoder.draw(0..self.vertex_count),
        }
    }
}

fn upload_indices<D: Device>(
    device: &D,
    data: IndexData<'_>,
    vertex_count: u32,
) -> Result<IndexBuffer<D::Buffer>, GpuError> {
    let size = data.format.size() as usize;
    if data.bytes.is_empty() || data.bytes.len() % size != 0 {
        return Err(GpuError::InvalidGeometry(format!(
            "{} index bytes is not a whole number of {:?} indices",
            data.bytes.len(),
            data.format
        )));
    }
    let count = u32::try_from(data.bytes.len() / size)
        .map_err(|_| GpuError::InvalidGeometry("too many indices".into()))?;

    let submeshes = if data.submeshes.is_empty() {
        vec![Submesh::new(0, count)]
    } else {
        data.submeshes.to_vec()
    };

    for s in &submeshes {
        let end = u64::from(s.first_index) + u64::from(s.index_count);
        if s.index_count == 0 || end > u64::from(count) {
            return Err(GpuError::InvalidGeometry(format!(
                "submesh {}..{end} outside {count} indices",
                s.first_index
            )));
        }
    }

    if let Some(bad) = read_indices(data.format, data.bytes).find(|&i| i >= vertex_count) {
        return Err(GpuError::InvalidGeometry(format!(
            "index {bad} out of range for {vertex_count} vertices"
        )));
    }

    let buffer = device.new_buffer("lumen index buffer", data.bytes, BufferUsage::Index)?;

    Ok(IndexBuffer {
        buffer,
        format: data.format,
        count,
        submeshes,
    })
}

fn read_indices(format: IndexFormat, bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    let size = format.size() as usize;
    bytes.chunks_exact(size).map(move |c| match format {
        IndexFormat::Uint16 => u32::from(u16::from_ne_bytes([c[0], c[1]])),
        IndexFormat::Uint32 => u32::from_ne_bytes([c[0], c[1], c[2], c[3]]),
    })
}
