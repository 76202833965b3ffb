pub mod error;
pub mod streamline;
pub mod geometry;
pub mod clustering;
pub mod transform;
pub mod config;
pub mod cache;
pub mod recognition;
pub mod io;
