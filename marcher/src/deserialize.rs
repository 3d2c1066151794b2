// Reads the scene text format back into a scene. Parsing never aborts: a
// line that cannot be understood turns into a placeholder object or
// material, so the object and material lists stay aligned with the file.

use crate::material::Material;
use crate::scene::Scene;
use crate::sdf::SdfObject;
use crate::serialize::{MATERIALS_HEADER, SURFACES_HEADER};
use crate::spectrum::Color;

use mmath::quaternion::Quatd;
use mmath::vector::{Vec3, Vec3d};

use std::io::BufRead;

enum LineOutcome<T> {
    Value(T),
    Empty,
    SectionChange,
    Failed,
    Eof,
}

struct Deserializer<'a, R: BufRead> {
    reader: &'a mut R,
    in_object_section: bool,
    objects: Vec<SdfObject>,
    materials: Vec<Material>,
}

/// Parses a scene from the text format. Unparseable lines degrade to
/// placeholder objects; a missing surface header or mismatched sections
/// yield the empty scene.
pub fn deserialize_scene(is: &mut impl BufRead) -> Scene {
    Deserializer {
        reader: is,
        in_object_section: true,
        objects: Vec::new(),
        materials: Vec::new(),
    }
    .run()
}

/// Pulls the first `N` numbers out of a payload. Separators are whitespace
/// plus the punctuation of the vector notation, so both `0 1 0` and
/// `(0,1,0)` parse. Trailing tokens are ignored.
fn parse_floats<const N: usize>(payload: &str) -> Option<[f64; N]> {
    let mut values = [0.0; N];
    let mut tokens = payload
        .split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
        .filter(|token| !token.is_empty());
    for value in values.iter_mut() {
        *value = tokens.next()?.parse().ok()?;
    }
    Some(values)
}

impl<'a, R: BufRead> Deserializer<'a, R> {
    fn run(mut self) -> Scene {
        match self.next_line() {
            Some(line) if line == SURFACES_HEADER => {}
            other => {
                log::warn!("incorrect surface section header {:?}", other);
                return Scene::new();
            }
        }

        loop {
            match self.parse_line() {
                None => break,
                Some(true) => {}
                Some(false) => {
                    log::debug!("placing dummy");
                    self.place_dummy();
                }
            }
        }

        if self.in_object_section {
            log::warn!("parser did not leave the surface section; incorrect material header?");
        }

        Scene::from_parts(self.objects, self.materials)
    }

    /// The next line with leading whitespace stripped, or `None` at the end
    /// of the input.
    fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(
                line.trim_start()
                    .trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string(),
            ),
            Err(err) => {
                log::warn!("error reading scene file: {}", err);
                None
            }
        }
    }

    /// Consumes one line. `None` means end of input; `Some(false)` means the
    /// line failed to parse and a dummy has to take its place.
    fn parse_line(&mut self) -> Option<bool> {
        if self.in_object_section {
            match self.parse_object_line() {
                LineOutcome::Eof => None,
                LineOutcome::Empty => Some(true),
                LineOutcome::SectionChange => {
                    self.in_object_section = false;
                    Some(true)
                }
                LineOutcome::Failed => Some(false),
                LineOutcome::Value(object) => {
                    self.objects.push(object);
                    Some(true)
                }
            }
        } else {
            match self.parse_material_line() {
                LineOutcome::Eof => None,
                LineOutcome::Empty => Some(true),
                LineOutcome::SectionChange => {
                    log::warn!("entered the material section twice");
                    Some(false)
                }
                LineOutcome::Failed => Some(false),
                LineOutcome::Value(material) => {
                    self.materials.push(material);
                    Some(true)
                }
            }
        }
    }

    fn place_dummy(&mut self) {
        if self.in_object_section {
            self.objects.push(SdfObject::DeserializationError);
        } else {
            self.materials.push(Material::DeserializationError);
        }
    }

    /// Splits a line into its type name and payload, handling the section
    /// bookkeeping shared by both sections.
    fn split_line(line: &str) -> LineOutcome<(String, String)> {
        if line.is_empty() {
            return LineOutcome::Empty;
        }
        if line == MATERIALS_HEADER {
            return LineOutcome::SectionChange;
        }
        match line.split_once(" with ") {
            Some((type_name, payload)) => {
                LineOutcome::Value((type_name.to_string(), payload.to_string()))
            }
            None => {
                log::warn!("incorrect type name separator in {:?}", line);
                LineOutcome::Failed
            }
        }
    }

    fn parse_object_line(&mut self) -> LineOutcome<SdfObject> {
        let line = match self.next_line() {
            Some(line) => line,
            None => return LineOutcome::Eof,
        };
        let (type_name, payload) = match Self::split_line(&line) {
            LineOutcome::Value(parts) => parts,
            LineOutcome::Empty => return LineOutcome::Empty,
            LineOutcome::SectionChange => return LineOutcome::SectionChange,
            _ => return LineOutcome::Failed,
        };

        if let Some(base_name) = type_name.strip_suffix("<>") {
            return self.parse_targeted_object(base_name, &payload);
        }

        match Self::parse_primitive(&type_name, &payload) {
            Some(object) => LineOutcome::Value(object),
            None => {
                log::warn!(
                    "could not deserialize object of type {:?} with data {:?}",
                    type_name,
                    payload
                );
                LineOutcome::Failed
            }
        }
    }

    fn parse_primitive(type_name: &str, payload: &str) -> Option<SdfObject> {
        match type_name {
            "Sphere" => {
                let [radius] = parse_floats(payload)?;
                Some(SdfObject::Sphere { radius })
            }
            "Box" => {
                let [x, y, z] = parse_floats(payload)?;
                Some(SdfObject::Box3 {
                    size: Vec3::new(x, y, z),
                })
            }
            "Plane" => {
                let [x, y, z] = parse_floats(payload)?;
                let normal: Vec3d = Vec3::new(x, y, z);
                if normal == Vec3::zero() {
                    return None;
                }
                Some(SdfObject::plane(normal))
            }
            _ => None,
        }
    }

    /// Compositional nodes place their own payload on one line and their
    /// target on the next; the target is resolved recursively.
    fn parse_targeted_object(&mut self, base_name: &str, payload: &str) -> LineOutcome<SdfObject> {
        if !matches!(base_name, "Translate" | "Rotate") {
            log::warn!("could not find a deserializer for type name {:?}", base_name);
            return LineOutcome::Failed;
        }

        let target = match self.parse_object_line() {
            LineOutcome::Value(target) => target,
            _ => return LineOutcome::Failed,
        };

        let object = match base_name {
            "Translate" => parse_floats(payload)
                .map(|[x, y, z]| SdfObject::translate(target, Vec3::new(x, y, z))),
            "Rotate" => parse_floats(payload)
                .map(|[w, x, y, z]| SdfObject::rotate(target, Quatd::new(w, x, y, z))),
            _ => unreachable!(),
        };

        match object {
            Some(object) => LineOutcome::Value(object),
            None => {
                log::warn!(
                    "could not deserialize object of type {:?} with data {:?}",
                    base_name,
                    payload
                );
                LineOutcome::Failed
            }
        }
    }

    fn parse_material_line(&mut self) -> LineOutcome<Material> {
        let line = match self.next_line() {
            Some(line) => line,
            None => return LineOutcome::Eof,
        };
        let (type_name, payload) = match Self::split_line(&line) {
            LineOutcome::Value(parts) => parts,
            LineOutcome::Empty => return LineOutcome::Empty,
            LineOutcome::SectionChange => return LineOutcome::SectionChange,
            _ => return LineOutcome::Failed,
        };

        match Self::parse_material(&type_name, &payload) {
            Some(material) => LineOutcome::Value(material),
            None => {
                log::warn!(
                    "could not deserialize material of type {:?} with data {:?}",
                    type_name,
                    payload
                );
                LineOutcome::Failed
            }
        }
    }

    fn parse_material(type_name: &str, payload: &str) -> Option<Material> {
        match type_name {
            "Flat" => {
                let [r, g, b] = parse_floats(payload)?;
                Some(Material::Flat(Color::new(r, g, b)))
            }
            "Reflective" => {
                let [r, g, b] = parse_floats(payload)?;
                Some(Material::Reflective(Color::new(r, g, b)))
            }
            "Diffuse" => {
                let [r, g, b] = parse_floats(payload)?;
                Some(Material::Diffuse(Color::new(r, g, b)))
            }
            "Transparent" => {
                let [r, g, b, ior, ior_variation] = parse_floats(payload)?;
                Some(Material::Transparent {
                    color: Color::new(r, g, b),
                    ior,
                    ior_variation,
                })
            }
            _ => None,
        }
    }
}
