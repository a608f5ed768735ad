pub mod app;
pub mod geometry;
pub mod scene;
