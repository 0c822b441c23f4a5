//! GLSL front end.
//!
//! Shader sources are parsed and validated with naga before any GPU module
//! is created, so a bad source produces an info log instead of a device error.
//! Linking matches the stage interfaces the same way, so a mismatched pair
//! fails to link instead of failing pipeline creation.

use std::collections::BTreeMap;

use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Handle, Module, Type, TypeInner};

use super::types::ShaderStage;

/// Parses and validates `source` as a GLSL shader for `stage`.
///
/// On failure the error carries the compiler's message verbatim.
pub(crate) fn compile_glsl(stage: ShaderStage, source: &str) -> Result<(), String> {
    let module = parse(stage, source)?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| err.to_string())?;

    Ok(())
}

/// Checks that every fragment input location is written by a vertex output
/// of the same type.
pub(crate) fn link_interface(vertex_source: &str, fragment_source: &str) -> Result<(), String> {
    let vertex = parse(ShaderStage::Vertex, vertex_source)?;
    let fragment = parse(ShaderStage::Fragment, fragment_source)?;

    let outputs = interface(&vertex, Direction::Out);
    for (location, ty) in interface(&fragment, Direction::In) {
        match outputs.get(&location) {
            None => {
                return Err(format!(
                    "Fragment input at location {location} is not written by the Vertex shader"
                ));
            }
            Some(out) if *out != ty => {
                return Err(format!(
                    "Vertex output and Fragment input at location {location} differ in type"
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn parse(stage: ShaderStage, source: &str) -> Result<Module, String> {
    let options = Options::from(stage.to_naga());
    Frontend::default()
        .parse(&options, source)
        .map_err(|errors| errors.to_string())
}

#[derive(Copy, Clone)]
enum Direction {
    In,
    Out,
}

/// User-defined locations of the entry point's inputs or outputs.
fn interface(module: &Module, direction: Direction) -> BTreeMap<u32, TypeInner> {
    let mut found = BTreeMap::new();
    let Some(entry) = module.entry_points.first() else {
        return found;
    };

    match direction {
        Direction::In => {
            for arg in &entry.function.arguments {
                collect_locations(module, arg.ty, arg.binding.as_ref(), &mut found);
            }
        }
        Direction::Out => {
            if let Some(result) = &entry.function.result {
                collect_locations(module, result.ty, result.binding.as_ref(), &mut found);
            }
        }
    }
    found
}

fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    found: &mut BTreeMap<u32, TypeInner>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            found.insert(*location, module.types[ty].inner.clone());
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), found);
                }
            }
        }
    }
}
