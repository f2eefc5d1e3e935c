use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry::{Resource, ResourceRegistry};

/// Value of a named shader uniform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    /// Column-major 4×4 matrix.
    Mat4([f32; 16]),
}

/// A shader program as seen by the scene core.
///
/// Compilation and draw submission belong to the GPU layer; this records the
/// source, bind state and uniforms that layer consumes. Until its source
/// arrives the program is an unready placeholder, which renderers draw with
/// their fallback pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderProgram {
    pub name: String,
    source: Option<String>,
    bound: bool,
    uniforms: BTreeMap<String, UniformValue>,
    freed: bool,
}

impl ShaderProgram {
    pub fn is_ready(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn apply_source(&mut self, source: String) -> bool {
        if self.freed {
            return false;
        }
        self.source = Some(source);
        true
    }

    pub fn bind(&mut self) {
        if self.bound {
            tracing::warn!(program = %self.name, "bind of already bound program");
        }
        self.bound = true;
    }

    pub fn unbind(&mut self) {
        self.bound = false;
    }

    /// Set a uniform. Only valid while bound; otherwise logged and ignored.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
        if !self.bound {
            tracing::warn!(program = %self.name, uniform = name, "set_uniform on unbound program");
            return false;
        }
        self.uniforms.insert(name.to_string(), value);
        true
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

impl Resource for ShaderProgram {
    const KIND: &'static str = "shader";

    fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn free(&mut self) {
        self.source = None;
        self.uniforms.clear();
        self.bound = false;
        self.freed = true;
    }
}

pub type ShaderRegistry = ResourceRegistry<ShaderProgram>;
