//! Numerical building blocks: dense linear algebra and scalar root-finders.

pub mod linalg;
pub mod solvers;
