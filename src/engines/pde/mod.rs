//! Finite-difference PDE pricing engines.

mod fd_common;
pub mod crank_nicolson;

pub use crank_nicolson::{CrankNicolsonSolver, FdProblem, GridSolution};
