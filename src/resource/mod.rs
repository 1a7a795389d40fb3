pub mod obj;
pub mod shader;
