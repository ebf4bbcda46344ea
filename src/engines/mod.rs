//! Pricing engines: the Crank-Nicolson grid solver used for American exercise and
//! the closed-form European reference it is checked against.

pub mod analytic;
pub mod pde;
