use glam::{Mat4, UVec2, Vec2, Vec3};

/// 2D camera with an orthographic, top-left-origin projection.
///
/// The projection is rebuilt from the viewport on every render; position and
/// rotation feed the view matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec2,
    pub rotation: f32,
    pub near: f32,
    pub far: f32,
    viewport: UVec2,
    projection: Mat4,
    view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(-1000.0, 1000.0)
    }
}

impl Camera {
    pub fn new(near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            near,
            far,
            viewport: UVec2::ZERO,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        };
        camera.rebuild(UVec2::ONE);
        camera
    }

    /// Recompute projection and view for `viewport`.
    pub fn rebuild(&mut self, viewport: UVec2) {
        // A zero-sized surface (minimized window) would divide by zero.
        let size = viewport.max(UVec2::ONE).as_vec2();
        self.viewport = viewport;
        self.projection = Mat4::orthographic_rh(0.0, size.x, size.y, 0.0, self.near, self.far);
        self.view = (Mat4::from_translation(self.position.extend(0.0))
            * Mat4::from_rotation_z(self.rotation))
        .inverse();
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Map a world-space point to normalized device coordinates.
    pub fn project(&self, point: Vec3) -> Vec3 {
        self.view_projection().project_point3(point)
    }
}
