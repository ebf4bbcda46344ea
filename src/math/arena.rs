//! Reusable pre-allocated buffers for the finite-difference hot path.

/// Scratch buffers for repeated grid solves.
///
/// Buffers grow on demand and never shrink, so scenario sweeps and
/// bump-and-reprice loops re-solve without reallocating.
#[derive(Debug, Clone, Default)]
pub struct GridArena {
    grid: Vec<f64>,
    values: Vec<f64>,
    next_values: Vec<f64>,
    lhs_lower: Vec<f64>,
    lhs_diag: Vec<f64>,
    lhs_upper: Vec<f64>,
    rhs_lower: Vec<f64>,
    rhs_diag: Vec<f64>,
    rhs_upper: Vec<f64>,
    rhs: Vec<f64>,
    c_star: Vec<f64>,
    d_star: Vec<f64>,
}

/// Borrowed view over a [`GridArena`] sized for one solve.
///
/// Node buffers have `space_steps + 1` entries; band buffers cover the
/// `space_steps - 1` interior nodes.
#[derive(Debug)]
pub struct FdWorkspace<'a> {
    /// Spot nodes.
    pub grid: &'a mut [f64],
    pub values: &'a mut [f64],
    pub next_values: &'a mut [f64],
    pub lhs_lower: &'a mut [f64],
    pub lhs_diag: &'a mut [f64],
    pub lhs_upper: &'a mut [f64],
    pub rhs_lower: &'a mut [f64],
    pub rhs_diag: &'a mut [f64],
    pub rhs_upper: &'a mut [f64],
    pub rhs: &'a mut [f64],
    pub c_star: &'a mut [f64],
    pub d_star: &'a mut [f64],
}

impl GridArena {
    /// Creates an arena sized for grids with `space_steps` intervals.
    pub fn with_capacity(space_steps: usize) -> Self {
        let nodes = space_steps.saturating_add(1);
        let interior = space_steps.saturating_sub(1);
        Self {
            grid: Vec::with_capacity(nodes),
            values: Vec::with_capacity(nodes),
            next_values: Vec::with_capacity(nodes),
            lhs_lower: Vec::with_capacity(interior),
            lhs_diag: Vec::with_capacity(interior),
            lhs_upper: Vec::with_capacity(interior),
            rhs_lower: Vec::with_capacity(interior),
            rhs_diag: Vec::with_capacity(interior),
            rhs_upper: Vec::with_capacity(interior),
            rhs: Vec::with_capacity(interior),
            c_star: Vec::with_capacity(interior),
            d_star: Vec::with_capacity(interior),
        }
    }

    #[inline]
    fn ensure_len(buffer: &mut Vec<f64>, n: usize) -> &mut [f64] {
        if buffer.len() < n {
            buffer.resize(n, 0.0);
        }
        &mut buffer[..n]
    }

    /// Largest node count served so far.
    pub fn node_capacity(&self) -> usize {
        self.values.len()
    }

    /// Returns zero-length-safe slices for a grid with `space_steps` intervals.
    pub fn workspace(&mut self, space_steps: usize) -> FdWorkspace<'_> {
        let nodes = space_steps + 1;
        let interior = space_steps.saturating_sub(1);
        FdWorkspace {
            grid: Self::ensure_len(&mut self.grid, nodes),
            values: Self::ensure_len(&mut self.values, nodes),
            next_values: Self::ensure_len(&mut self.next_values, nodes),
            lhs_lower: Self::ensure_len(&mut self.lhs_lower, interior),
            lhs_diag: Self::ensure_len(&mut self.lhs_diag, interior),
            lhs_upper: Self::ensure_len(&mut self.lhs_upper, interior),
            rhs_lower: Self::ensure_len(&mut self.rhs_lower, interior),
            rhs_diag: Self::ensure_len(&mut self.rhs_diag, interior),
            rhs_upper: Self::ensure_len(&mut self.rhs_upper, interior),
            rhs: Self::ensure_len(&mut self.rhs, interior),
            c_star: Self::ensure_len(&mut self.c_star, interior),
            d_star: Self::ensure_len(&mut self.d_star, interior),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GridArena;

    #[test]
    fn arena_grows_but_does_not_shrink() {
        let mut arena = GridArena::with_capacity(4);

        {
            let ws = arena.workspace(10);
            assert_eq!(ws.values.len(), 11);
            assert_eq!(ws.grid.len(), 11);
            assert_eq!(ws.lhs_diag.len(), 9);
        }
        assert_eq!(arena.node_capacity(), 11);

        {
            let ws = arena.workspace(4);
            assert_eq!(ws.values.len(), 5);
            assert_eq!(ws.c_star.len(), 3);
        }
        assert_eq!(arena.node_capacity(), 11);
    }
}
