pub mod color;
pub mod dsl;
pub mod renderer;
pub mod text;
