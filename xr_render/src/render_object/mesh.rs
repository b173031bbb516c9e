/// Generic mesh description (geometry upload belongs to the backend)

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertex_count: u32,
    /// Zero for non-indexed draws
    pub index_count: u32,
    pub topology: PrimitiveTopology,
}

impl Mesh {
    pub fn new(vertex_count: u32, index_count: u32, topology: PrimitiveTopology) -> Self {
        Self { vertex_count, index_count, topology }
    }

    pub fn is_indexed(&self) -> bool {
        self.index_count > 0
    }
}
