#[repr(C)] // make 'C-like' memory storage for compatibility with wgsl and gpu
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    /// Slot 0 reads three tightly packed floats per vertex.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Vertex and index data uploaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Unit-sized quad centered on the origin, drawn as two triangles that
    /// share the top-right/bottom-left diagonal.
    pub fn quad() -> Self {
        Self {
            vertices: vec![
                Vertex {
                    position: [0.5, 0.5, 0.0],
                }, // top right
                Vertex {
                    position: [0.5, -0.5, 0.0],
                }, // bottom right
                Vertex {
                    position: [-0.5, -0.5, 0.0],
                }, // bottom left
                Vertex {
                    position: [-0.5, 0.5, 0.0],
                }, // top left
            ],
            indices: vec![0, 1, 3, 1, 2, 3],
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
