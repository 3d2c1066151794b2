use mmath::transform::Transfd;

/// An offset, an orientation, and a zoom factor. Rays are generated in
/// screen space for zoom 1 and rotated into place, so this is all the state
/// a render needs.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub transform: Transfd,
    pub zoom: f64,
}

impl Camera {
    pub fn new(transform: Transfd, zoom: f64) -> Self {
        Camera { transform, zoom }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            transform: Transfd::identity(),
            zoom: 1.0,
        }
    }
}
