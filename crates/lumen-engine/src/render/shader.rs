use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};

use crate::device::GpuError;

/// Pipeline stage a shader program runs in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    /// Compute and mesh stages; never usable by a render pipeline here.
    Other,
}

/// Numeric class of a shader input or output value.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderScalar {
    Float,
    Sint,
    Uint,
    /// Booleans, matrices, arrays; never a valid vertex input or color output.
    Other,
}

/// One `@location` input of a vertex program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderInput {
    pub location: u32,
    pub scalar: ShaderScalar,
    pub components: u32,
}

/// A `@group/@binding` resource a program actually touches.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderResource {
    pub group: u32,
    pub binding: u32,
    /// Declared in the `uniform` address space.
    pub uniform: bool,
}

/// Name-addressed collection of compiled shader programs.
///
/// Built from one WGSL source. The source is parsed and validated up front, so a pipeline build
/// only fails on configuration (missing names, wrong stages, layout mismatches), never on
/// syntax.
pub struct ShaderLibrary {
    label: String,
    source: String,
    module: naga::Module,
    info: ModuleInfo,
}

impl ShaderLibrary {
    /// Parses and validates `source`.
    pub fn from_wgsl(label: &str, source: impl Into<String>) -> Result<Self, GpuError> {
        let source = source.into();

        let module = naga::front::wgsl::parse_str(&source).map_err(|e| {
            GpuError::Compilation(format!("{label}: {}", e.emit_to_string(&source)))
        })?;

        let info = Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|e| GpuError::Compilation(format!("{label}: {}", e.emit_to_string(&source))))?;

        log::debug!(
            "shader library `{label}` loaded with {} entry points",
            module.entry_points.len()
        );

        Ok(Self {
            label: label.to_string(),
            source,
            module,
            info,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Looks up a program by exact name.
    pub fn function(&self, name: &str) -> Option<ShaderStage> {
        self.entry_point(name).map(|(_, ep)| stage_of(ep.stage))
    }

    /// All program names with their stages, in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, ShaderStage)> + '_ {
        self.module
            .entry_points
            .iter()
            .map(|ep| (ep.name.as_str(), stage_of(ep.stage)))
    }

    /// `@location` inputs read by the named program, sorted by location.
    ///
    /// Inputs may be declared as bare arguments or as members of an input struct.
    pub fn vertex_inputs(&self, name: &str) -> Option<Vec<ShaderInput>> {
        let (_, ep) = self.entry_point(name)?;
        let mut inputs = Vec::new();

        for arg in &ep.function.arguments {
            match &arg.binding {
                Some(binding) => inputs.extend(self.input(binding, arg.ty)),
                None => {
                    let ty = &self.module.types[arg.ty].inner;
                    if let naga::TypeInner::Struct { members, .. } = ty {
                        inputs.extend(members.iter().filter_map(|m| {
                            m.binding.as_ref().and_then(|b| self.input(b, m.ty))
                        }));
                    }
                }
            }
        }

        inputs.sort_unstable_by_key(|i| i.location);
        Some(inputs)
    }

    /// Input locations read by the named program, sorted.
    pub fn input_locations(&self, name: &str) -> Option<Vec<u32>> {
        self.vertex_inputs(name)
            .map(|inputs| inputs.iter().map(|i| i.location).collect())
    }

    /// Bound resources the named program uses, sorted by group and binding.
    ///
    /// Globals declared in the source but unused by this program are not listed.
    pub fn resources(&self, name: &str) -> Option<Vec<ShaderResource>> {
        let (index, _) = self.entry_point(name)?;
        let uses = self.info.get_entry_point(index);

        let mut out: Vec<ShaderResource> = self
            .module
            .global_variables
            .iter()
            .filter(|(handle, _)| !uses[*handle].is_empty())
            .filter_map(|(_, var)| {
                let binding = var.binding.as_ref()?;
                Some(ShaderResource {
                    group: binding.group,
                    binding: binding.binding,
                    uniform: var.space == naga::AddressSpace::Uniform,
                })
            })
            .collect();

        out.sort_unstable_by_key(|r| (r.group, r.binding));
        Some(out)
    }

    /// Scalar class of the value a fragment program writes to `@location(0)`.
    ///
    /// `None` when the program is missing or writes no color output.
    pub fn color_output(&self, name: &str) -> Option<ShaderScalar> {
        let (_, ep) = self.entry_point(name)?;
        let result = ep.function.result.as_ref()?;

        match &result.binding {
            Some(binding) if location_of(binding) == Some(0) => Some(self.scalar_of(result.ty).0),
            Some(_) => None,
            None => match &self.module.types[result.ty].inner {
                naga::TypeInner::Struct { members, .. } => members
                    .iter()
                    .find(|m| m.binding.as_ref().and_then(location_of) == Some(0))
                    .map(|m| self.scalar_of(m.ty).0),
                _ => None,
            },
        }
    }

    fn entry_point(&self, name: &str) -> Option<(usize, &naga::EntryPoint)> {
        self.module
            .entry_points
            .iter()
            .enumerate()
            .find(|(_, ep)| ep.name == name)
    }

    fn input(&self, binding: &naga::Binding, ty: naga::Handle<naga::Type>) -> Option<ShaderInput> {
        let location = location_of(binding)?;
        let (scalar, components) = self.scalar_of(ty);
        Some(ShaderInput {
            location,
            scalar,
            components,
        })
    }

    fn scalar_of(&self, ty: naga::Handle<naga::Type>) -> (ShaderScalar, u32) {
        match &self.module.types[ty].inner {
            naga::TypeInner::Scalar(scalar) => (scalar_kind(scalar.kind), 1),
            naga::TypeInner::Vector { size, scalar } => (scalar_kind(scalar.kind), *size as u32),
            _ => (ShaderScalar::Other, 0),
        }
    }
}

fn stage_of(stage: naga::ShaderStage) -> ShaderStage {
    match stage {
        naga::ShaderStage::Vertex => ShaderStage::Vertex,
        naga::ShaderStage::Fragment => ShaderStage::Fragment,
        _ => ShaderStage::Other,
    }
}

fn scalar_kind(kind: naga::ScalarKind) -> ShaderScalar {
    match kind {
        naga::ScalarKind::Float => ShaderScalar::Float,
        naga::ScalarKind::Sint => ShaderScalar::Sint,
        naga::ScalarKind::Uint => ShaderScalar::Uint,
        _ => ShaderScalar::Other,
    }
}

fn location_of(binding: &naga::Binding) -> Option<u32> {
    match binding {
        naga::Binding::Location { location, .. } => Some(*location),
        _ => None,
    }
}
