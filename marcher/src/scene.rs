// The scene is a pair of parallel, equally long lists: one SDF object and
// one material per renderable thing, kept grouped by object kind so the
// serializer emits stable output.

use crate::material::Material;
use crate::sdf::SdfObject;
use crate::shading::{BackgroundFunction, RenderData};
use crate::spectrum::Color;

/// Handle returned by `add_object`, pointing back into the scene.
pub struct SceneSlot<'a> {
    pub index: usize,
    pub object: &'a SdfObject,
    pub material: &'a Material,
}

#[derive(Default)]
pub struct Scene {
    objects: Vec<SdfObject>,
    materials: Vec<Material>,
    background: Option<BackgroundFunction>,
}

impl Scene {
    pub fn new() -> Self {
        Scene::default()
    }

    /// Builds a scene directly from its parts. The lists have to be the same
    /// length; mismatched data yields the empty scene.
    pub fn from_parts(objects: Vec<SdfObject>, materials: Vec<Material>) -> Self {
        if objects.len() != materials.len() {
            log::warn!(
                "unable to create a scene from mismatched data: {} objects, {} materials",
                objects.len(),
                materials.len()
            );
            return Scene::new();
        }
        Scene {
            objects,
            materials,
            background: None,
        }
    }

    /// Inserts an object and its material at the position keeping objects of
    /// the same kind contiguous, and returns a handle to the slot.
    pub fn add_object(&mut self, object: SdfObject, material: Material) -> SceneSlot {
        let kind = object.kind();
        let index = self.objects.partition_point(|existing| existing.kind() < kind);

        self.objects.insert(index, object);
        self.materials.insert(index, material);

        SceneSlot {
            index,
            object: &self.objects[index],
            material: &self.materials[index],
        }
    }

    /// Removes the object and material at `index`. Out-of-range indices are
    /// ignored.
    pub fn remove_object(&mut self, index: usize) {
        if index >= self.objects.len() {
            return;
        }
        self.objects.remove(index);
        self.materials.remove(index);
    }

    pub fn set_background_function<F>(&mut self, f: F)
    where
        F: Fn(&RenderData) -> Color + Send + Sync + 'static,
    {
        self.background = Some(Box::new(f));
    }

    pub fn objects(&self) -> &[SdfObject] {
        &self.objects
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn background_function(&self) -> Option<&BackgroundFunction> {
        self.background.as_ref()
    }
}
