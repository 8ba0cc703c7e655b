use crate::device::{
    Device, GpuError, PipelineDescriptor, PixelFormat, VertexFormat, VertexLayout,
};

use super::shader::{ShaderLibrary, ShaderScalar, ShaderStage};

/// Immutable compiled pipeline.
///
/// Binds a vertex program, a fragment program, a vertex layout and an output format. There
/// are no mutating methods; a different combination needs a new build.
pub struct PipelineState<P> {
    raw: P,
    vertex_program: String,
    fragment_program: String,
    layout: VertexLayout,
    format: PixelFormat,
}

impl<P> PipelineState<P> {
    /// Backend pipeline object.
    pub fn raw(&self) -> &P {
        &self.raw
    }

    pub fn vertex_program(&self) -> &str {
        &self.vertex_program
    }

    pub fn fragment_program(&self) -> &str {
        &self.fragment_program
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }
}

/// Compiles program pairs from a shader library into `PipelineState`s.
///
/// Every check runs before the device is asked for anything, so a failed build allocates
/// nothing. Builds are not cached; callers keep the result.
pub struct PipelineBuilder<'a> {
    library: &'a ShaderLibrary,
    label: &'a str,
    fragment_buffers: u32,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(library: &'a ShaderLibrary) -> Self {
        Self {
            library,
            label: "lumen pipeline",
            fragment_buffers: 0,
        }
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    /// Number of uniform buffers the fragment stage reads, bound at slots `0..n`.
    pub fn fragment_buffers(mut self, count: u32) -> Self {
        self.fragment_buffers = count;
        self
    }

    pub fn build<D: Device>(
        &self,
        device: &D,
        vertex_program: &str,
        fragment_program: &str,
        layout: &VertexLayout,
        format: PixelFormat,
    ) -> Result<PipelineState<D::Pipeline>, GpuError> {
        self.require_stage(vertex_program, ShaderStage::Vertex)?;
        self.require_stage(fragment_program, ShaderStage::Fragment)?;

        layout
            .validate()
            .map_err(|e| GpuError::Compilation(format!("{}: {e}", self.label)))?;

        self.check_vertex_inputs(vertex_program, layout)?;
        self.check_resources(vertex_program, fragment_program)?;

        if !format.is_color_renderable() {
            return Err(GpuError::Compilation(format!(
                "{}: {format:?} is not a color render target format",
                self.label
            )));
        }
        match self.library.color_output(fragment_program) {
            Some(ShaderScalar::Float) => {}
            other => {
                return Err(GpuError::Compilation(format!(
                    "{}: `{fragment_program}` writes {other:?} at location 0, not a float color",
                    self.label
                )));
            }
        }

        let raw = device.new_render_pipeline(&PipelineDescriptor {
            label: self.label,
            source: self.library.source(),
            vertex_entry: vertex_program,
            fragment_entry: fragment_program,
            vertex_layout: layout,
            pixel_format: format,
            fragment_buffers: self.fragment_buffers,
        })?;

        log::info!(
            "pipeline `{}` compiled ({vertex_program} + {fragment_program}, {format:?})",
            self.label
        );

        Ok(PipelineState {
            raw,
            vertex_program: vertex_program.to_string(),
            fragment_program: fragment_program.to_string(),
            layout: layout.clone(),
            format,
        })
    }

    /// Every shader input needs an attribute of the same scalar class. Component counts may
    /// differ; missing components read as 0 (or 1 for w).
    fn check_vertex_inputs(&self, program: &str, layout: &VertexLayout) -> Result<(), GpuError> {
        for input in self.library.vertex_inputs(program).unwrap_or_default() {
            let Some(attr) = layout.attribute(input.location) else {
                return Err(GpuError::Compilation(format!(
                    "{}: `{program}` reads location {}, which the vertex layout does not provide",
                    self.label, input.location
                )));
            };
            if attribute_scalar(attr.format) != input.scalar {
                return Err(GpuError::Compilation(format!(
                    "{}: location {} is {:?} in the vertex layout but {:?} in `{program}`",
                    self.label, input.location, attr.format, input.scalar
                )));
            }
        }
        Ok(())
    }

    /// Fragment uniforms live at `@group(slot) @binding(0)` for `slot < fragment_buffers`; the
    /// vertex stage gets no bindings.
    fn check_resources(
        &self,
        vertex_program: &str,
        fragment_program: &str,
    ) -> Result<(), GpuError> {
        if let Some(r) = self
            .library
            .resources(vertex_program)
            .unwrap_or_default()
            .first()
        {
            return Err(GpuError::Compilation(format!(
                "{}: `{vertex_program}` uses @group({}) @binding({}); the vertex stage has none",
                self.label, r.group, r.binding
            )));
        }

        for r in self.library.resources(fragment_program).unwrap_or_default() {
            if r.group >= self.fragment_buffers || r.binding != 0 || !r.uniform {
                return Err(GpuError::Compilation(format!(
                    "{}: `{fragment_program}` uses @group({}) @binding({}), but only {} uniform \
                     slot(s) at binding 0 are provided",
                    self.label, r.group, r.binding, self.fragment_buffers
                )));
            }
        }
        Ok(())
    }

    fn require_stage(&self, name: &str, stage: ShaderStage) -> Result<(), GpuError> {
        match self.library.function(name) {
            Some(found) if found == stage => Ok(()),
            Some(found) => Err(GpuError::Compilation(format!(
                "{}: `{name}` is a {found:?} program, expected {stage:?}",
                self.label
            ))),
            None => Err(GpuError::Compilation(format!(
                "{}: {stage:?} program `{name}` not found in library `{}`",
                self.label,
                self.library.label()
            ))),
        }
    }
}

fn attribute_scalar(format: VertexFormat) -> ShaderScalar {
    match format {
        VertexFormat::Uint32 => ShaderScalar::Uint,
        VertexFormat::Float32
        | VertexFormat::Float32x2
        | VertexFormat::Float32x3
        | VertexFormat::Float32x4
        | VertexFormat::Unorm8x4 => ShaderScalar::Float,
    }
}
