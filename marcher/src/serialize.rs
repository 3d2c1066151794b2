// Writes the scene text format: a surface section and a material section,
// one object per line, compositional nodes followed by their indented
// target.

use crate::material::Material;
use crate::scene::Scene;
use crate::sdf::SdfObject;

use simple_error::{bail, SimpleResult};

use std::io::{self, Write};

pub(crate) const SURFACES_HEADER: &str = "--BEGIN SURFACES--";
pub(crate) const MATERIALS_HEADER: &str = "--BEGIN MATERIALS--";

/// Written in place of nodes the format cannot express; the deserializer
/// turns these back into placeholder objects.
pub(crate) const NONSERIALIZABLE_MARKER: &str = "__NONSERIALIZABLE__";

pub fn serialize_scene(scene: &Scene, os: &mut impl Write) -> SimpleResult<()> {
    if let Err(err) = serialize_internal(scene, os) {
        bail!("error writing scene file: {}", err);
    }
    Ok(())
}

fn serialize_internal(scene: &Scene, os: &mut impl Write) -> io::Result<()> {
    writeln!(os, "{}", SURFACES_HEADER)?;
    for object in scene.objects() {
        serialize_object(os, object, 0)?;
    }
    writeln!(os, "{}", MATERIALS_HEADER)?;
    for material in scene.materials() {
        serialize_material(os, material)?;
    }
    Ok(())
}

fn write_indent(os: &mut impl Write, depth: usize) -> io::Result<()> {
    for _ in 0..depth {
        write!(os, "  ")?;
    }
    Ok(())
}

fn serialize_object(os: &mut impl Write, object: &SdfObject, depth: usize) -> io::Result<()> {
    write_indent(os, depth)?;
    match object {
        SdfObject::Sphere { radius } => writeln!(os, "Sphere with {}", radius),
        SdfObject::Box3 { size } => {
            writeln!(os, "Box with {} {} {}", size.x, size.y, size.z)
        }
        SdfObject::Plane { normal } => {
            writeln!(os, "Plane with {} {} {}", normal.x, normal.y, normal.z)
        }
        SdfObject::Translate { target, offset } => {
            writeln!(os, "Translate<> with {} {} {}", offset.x, offset.y, offset.z)?;
            serialize_object(os, target, depth + 1)
        }
        SdfObject::Rotate { target, rotation } => {
            writeln!(
                os,
                "Rotate<> with {} {} {} {}",
                rotation.w, rotation.xyz.x, rotation.xyz.y, rotation.xyz.z
            )?;
            serialize_object(os, target, depth + 1)
        }
        other => {
            log::warn!(
                "objects of kind {:?} cannot be written to the scene format",
                other.kind()
            );
            writeln!(os, "{}", NONSERIALIZABLE_MARKER)
        }
    }
}

fn serialize_material(os: &mut impl Write, material: &Material) -> io::Result<()> {
    match material {
        Material::Flat(color) => writeln!(os, "Flat with {} {} {}", color.r, color.g, color.b),
        Material::Reflective(color) => {
            writeln!(os, "Reflective with {} {} {}", color.r, color.g, color.b)
        }
        Material::Diffuse(color) => {
            writeln!(os, "Diffuse with {} {} {}", color.r, color.g, color.b)
        }
        Material::Transparent {
            color,
            ior,
            ior_variation,
        } => writeln!(
            os,
            "Transparent with {} {} {} {} {}",
            color.r, color.g, color.b, ior, ior_variation
        ),
        other => {
            log::warn!("material {:?} cannot be written to the scene format", other);
            writeln!(os, "{}", NONSERIALIZABLE_MARKER)
        }
    }
}
