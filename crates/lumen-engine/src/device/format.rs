//! Backend-neutral descriptions of vertex data, index data and render target formats.

/// Format of one vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Unorm8x4,
}

impl VertexFormat {
    /// Size in bytes.
    pub const fn size(self) -> u64 {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 | VertexFormat::Unorm8x4 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// One attribute inside an interleaved vertex record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    pub format: VertexFormat,
    /// Byte offset from the start of the record.
    pub offset: u64,
}

/// Layout of an interleaved vertex buffer.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    stride: u64,
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Creates an empty layout with the given record stride.
    pub fn new(stride: u64) -> Self {
        Self {
            stride,
            attributes: Vec::new(),
        }
    }

    /// Builds a tightly packed layout; offsets follow declaration order.
    pub fn packed(attributes: &[(u32, VertexFormat)]) -> Self {
        let mut offset = 0;
        let mut out = Vec::with_capacity(attributes.len());
        for &(location, format) in attributes {
            out.push(VertexAttribute {
                location,
                format,
                offset,
            });
            offset += format.size();
        }
        Self {
            stride: offset,
            attributes: out,
        }
    }

    /// Adds an attribute at an explicit offset.
    pub fn with_attribute(mut self, location: u32, format: VertexFormat, offset: u64) -> Self {
        self.attributes.push(VertexAttribute {
            location,
            format,
            offset,
        });
        self
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, location: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.location == location)
    }

    /// Checks that every attribute fits in the stride, locations are unique and no two
    /// attributes share bytes.
    pub fn validate(&self) -> Result<(), String> {
        if self.stride == 0 {
            return Err("vertex stride is zero".to_string());
        }
        if self.attributes.is_empty() {
            return Err("vertex layout declares no attributes".to_string());
        }

        for (i, a) in self.attributes.iter().enumerate() {
            let end = a.offset + a.format.size();
            if end > self.stride {
                return Err(format!(
                    "attribute at location {} ends at byte {end}, past stride {}",
                    a.location, self.stride
                ));
            }
            for b in &self.attributes[i + 1..] {
                if a.location == b.location {
                    return Err(format!("location {} declared twice", a.location));
                }
                let b_end = b.offset + b.format.size();
                if a.offset < b_end && b.offset < end {
                    return Err(format!(
                        "attributes at locations {} and {} overlap",
                        a.location, b.location
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Color format of the render target a pipeline writes to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rgb10a2Unorm,
    Depth32Float,
}

impl PixelFormat {
    /// Whether the format can be used as a color attachment.
    pub const fn is_color_renderable(self) -> bool {
        !matches!(self, PixelFormat::Depth32Float)
    }
}

/// Element type of an index buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub const fn size(self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// How a device buffer is bound.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    /// Uniform data rewritten from the CPU.
    Uniform,
}

/// Color the render pass clears its target to.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ClearColor {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::new(0.2, 0.3, 0.4, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_layout_offsets_follow_order() {
        let layout = VertexLayout::packed(&[
            (0, VertexFormat::Float32x4),
            (1, VertexFormat::Float32x2),
        ]);
        assert_eq!(layout.stride(), 24);
        assert_eq!(layout.attribute(1).map(|a| a.offset), Some(16));
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn attribute_past_stride_is_rejected() {
        let layout = VertexLayout::new(16)
            .with_attribute(0, VertexFormat::Float32x4, 0)
            .with_attribute(1, VertexFormat::Float32x2, 16);
        assert!(layout.validate().is_err());
    }

    #[test]
    fn overlapping_attributes_are_rejected() {
        let layout = VertexLayout::new(32)
            .with_attribute(0, VertexFormat::Float32x4, 0)
            .with_attribute(1, VertexFormat::Float32x2, 8);
        assert!(layout.validate().unwrap_err().contains("overlap"));
    }

    #[test]
    fn duplicate_location_is_rejected() {
        let layout = VertexLayout::new(32)
            .with_attribute(0, VertexFormat::Float32x2, 0)
            .with_attribute(0, VertexFormat::Float32x2, 8);
        assert!(layout.validate().unwrap_err().contains("twice"));
    }

    #[test]
    fn depth_is_not_a_color_format() {
        assert!(!PixelFormat::Depth32Float.is_color_renderable());
        assert!(PixelFormat::Bgra8UnormSrgb.is_color_renderable());
    }
}
