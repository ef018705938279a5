//! 2D Poisson problem setup on a rectangular grid.
//!
//! Discretizes -∇²u = f with Dirichlet boundaries by central finite
//! differences on (possibly non-uniform) gridlines, producing the interior
//! 5-point operator as a [`CsrMatrix`] and the boundary-folded right-hand
//! side. The unknowns are the (imax-2)·(jmax-2) interior points, numbered
//! row-major with x fastest.

use crate::error::Error;
use crate::matrix::sparse::CsrMatrix;

/// Gridlines of a rectangular 2D grid.
pub struct Grid2d {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Grid2d {
    /// Uniformly spaced grid with `nx` × `ny` points over the given extents.
    pub fn regular(
        nx: usize,
        ny: usize,
        x_extent: (f64, f64),
        y_extent: (f64, f64),
    ) -> Result<Self, Error> {
        if nx < 3 || ny < 3 {
            return Err(Error::InvalidArgument(
                "grid needs at least 3 points per direction".into(),
            ));
        }
        let linspace = |n: usize, (lo, hi): (f64, f64)| {
            let h = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + i as f64 * h).collect::<Vec<_>>()
        };
        Self::from_gridlines(linspace(nx, x_extent), linspace(ny, y_extent))
    }

    /// Grid from explicit gridlines; each direction must be strictly
    /// increasing with at least 3 points.
    pub fn from_gridlines(x: Vec<f64>, y: Vec<f64>) -> Result<Self, Error> {
        for (name, g) in [("x", &x), ("y", &y)] {
            if g.len() < 3 {
                return Err(Error::InvalidArgument(format!(
                    "{name} gridlines need at least 3 points"
                )));
            }
            if g.windows(2).any(|w| w[1] <= w[0]) {
                return Err(Error::InvalidArgument(format!(
                    "{name} gridlines must be strictly increasing"
                )));
            }
        }
        Ok(Self { x, y })
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn ny(&self) -> usize {
        self.y.len()
    }

    /// Number of interior unknowns, (nx-2)·(ny-2).
    pub fn interior_len(&self) -> usize {
        (self.nx() - 2) * (self.ny() - 2)
    }
}

/// Dirichlet boundary values on the four edges of the grid.
///
/// `south`/`north` run along x (length nx), `west`/`east` along y (length
/// ny).
pub struct DirichletValues {
    pub north: Vec<f64>,
    pub west: Vec<f64>,
    pub south: Vec<f64>,
    pub east: Vec<f64>,
}

impl DirichletValues {
    pub fn zero(grid: &Grid2d) -> Self {
        Self {
            north: vec![0.0; grid.nx()],
            west: vec![0.0; grid.ny()],
            south: vec![0.0; grid.nx()],
            east: vec![0.0; grid.ny()],
        }
    }

    pub fn new(
        grid: &Grid2d,
        north: Vec<f64>,
        west: Vec<f64>,
        south: Vec<f64>,
        east: Vec<f64>,
    ) -> Result<Self, Error> {
        if north.len() != grid.nx() || south.len() != grid.nx() {
            return Err(Error::InvalidArgument(
                "north/south boundary values must have length nx".into(),
            ));
        }
        if west.len() != grid.ny() || east.len() != grid.ny() {
            return Err(Error::InvalidArgument(
                "west/east boundary values must have length ny".into(),
            ));
        }
        Ok(Self { north, west, south, east })
    }
}

/// A Poisson problem -∇²u = f on a grid with Dirichlet boundaries.
pub struct PoissonProblem<F> {
    pub grid: Grid2d,
    pub boundary: DirichletValues,
    /// Source term f(x, y), evaluated at the interior gridpoints.
    pub source: F,
}

impl<F: Fn(f64, f64) -> f64> PoissonProblem<F> {
    pub fn new(grid: Grid2d, boundary: DirichletValues, source: F) -> Self {
        Self { grid, boundary, source }
    }

    /// Assemble the interior operator and right-hand side.
    ///
    /// Stencil weights at interior point (i, j) with spacings dx1 = x_i -
    /// x_{i-1}, dx2 = x_{i+1} - x_i (and likewise in y):
    ///
    /// ```text
    /// center:  2/(dx1 dx2) + 2/(dy1 dy2)
    /// west:   -2/(dx1 (dx1+dx2))    east:  -2/(dx2 (dx1+dx2))
    /// south:  -2/(dy1 (dy1+dy2))    north: -2/(dy2 (dy1+dy2))
    /// ```
    ///
    /// Neighbor weights that fall on the boundary are folded into b with the
    /// prescribed Dirichlet value.
    pub fn assemble(&self) -> Result<(CsrMatrix<f64>, Vec<f64>), Error> {
        let grid = &self.grid;
        let (nx, ny) = (grid.nx(), grid.ny());
        let iimax = nx - 2;
        let n = grid.interior_len();
        let mut coefficients = Vec::with_capacity(5 * n);
        let mut b = vec![0.0; n];

        for j in 1..ny - 1 {
            for i in 1..nx - 1 {
                let idx = (j - 1) * iimax + (i - 1);
                let dx1 = grid.x[i] - grid.x[i - 1];
                let dx2 = grid.x[i + 1] - grid.x[i];
                let dy1 = grid.y[j] - grid.y[j - 1];
                let dy2 = grid.y[j + 1] - grid.y[j];

                coefficients.push((idx, idx, 2. / (dx1 * dx2) + 2. / (dy1 * dy2)));

                let w_south = -2. / (dy1 * (dy1 + dy2));
                if j == 1 {
                    b[idx] -= w_south * self.boundary.south[i];
                } else {
                    coefficients.push((idx, idx - iimax, w_south));
                }

                let w_west = -2. / (dx1 * (dx1 + dx2));
                if i == 1 {
                    b[idx] -= w_west * self.boundary.west[j];
                } else {
                    coefficients.push((idx, idx - 1, w_west));
                }

                let w_east = -2. / (dx2 * (dx1 + dx2));
                if i == nx - 2 {
                    b[idx] -= w_east * self.boundary.east[j];
                } else {
                    coefficients.push((idx, idx + 1, w_east));
                }

                let w_north = -2. / (dy2 * (dy1 + dy2));
                if j == ny - 2 {
                    b[idx] -= w_north * self.boundary.north[i];
                } else {
                    coefficients.push((idx, idx + iimax, w_north));
                }

                b[idx] += (self.source)(grid.x[i], grid.y[j]);
            }
        }

        let a = CsrMatrix::from_triplets(n, n, &coefficients)?;
        Ok((a, b))
    }

    /// Paste an interior solution back into the full nx × ny field,
    /// row-major with x fastest, boundary values on the rim.
    pub fn embed(&self, u: &[f64]) -> Vec<f64> {
        let grid = &self.grid;
        let (nx, ny) = (grid.nx(), grid.ny());
        let mut field = vec![0.0; nx * ny];
        let mut idx = 0;
        for j in 0..ny {
            for i in 0..nx {
                field[j * nx + i] = if i == 0 {
                    self.boundary.west[j]
                } else if i == nx - 1 {
                    self.boundary.east[j]
                } else if j == 0 {
                    self.boundary.south[i]
                } else if j == ny - 1 {
                    self.boundary.north[i]
                } else {
                    let v = u[idx];
                    idx += 1;
                    v
                };
            }
        }
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::sparse::SparseMatrix;
    use approx::assert_abs_diff_eq;

    #[test]
    fn uniform_grid_assembly_matches_standard_laplacian() {
        // 4x4 grid, h = 1: interior is 2x2 and the operator is the textbook
        // (1/h²)·[4 on the diagonal, -1 to each neighbor]
        let grid = Grid2d::regular(4, 4, (0.0, 3.0), (0.0, 3.0)).unwrap();
        let boundary = DirichletValues::zero(&grid);
        let problem = PoissonProblem::new(grid, boundary, |_, _| 0.0);
        let (a, b) = problem.assemble().unwrap();

        assert_eq!(a.nrows(), 4);
        assert_eq!(b, vec![0.0; 4]);
        let expected = [
            [4.0, -1.0, -1.0, 0.0],
            [-1.0, 4.0, 0.0, -1.0],
            [-1.0, 0.0, 4.0, -1.0],
            [0.0, -1.0, -1.0, 4.0],
        ];
        for i in 0..4 {
            let mut row = [0.0; 4];
            for (j, v) in a.row(i) {
                row[j] = v;
            }
            for j in 0..4 {
                assert_abs_diff_eq!(row[j], expected[i][j], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn boundary_values_fold_into_rhs() {
        // 3x3 grid: single interior point, all four neighbors are boundary
        let grid = Grid2d::regular(3, 3, (0.0, 2.0), (0.0, 2.0)).unwrap();
        let boundary = DirichletValues::new(
            &grid,
            vec![1.0; 3], // north
            vec![2.0; 3], // west
            vec![3.0; 3], // south
            vec![4.0; 3], // east
        )
        .unwrap();
        let problem = PoissonProblem::new(grid, boundary, |_, _| 7.0);
        let (a, b) = problem.assemble().unwrap();
        assert_eq!(a.nrows(), 1);
        assert_eq!(a.nnz(), 1);
        // each folded neighbor contributes value/h² with h = 1
        assert_abs_diff_eq!(b[0], 7.0 + 1.0 + 2.0 + 3.0 + 4.0, epsilon = 1e-14);
    }

    #[test]
    fn nonuniform_spacing_weights() {
        // x gridlines 0, 1, 3: dx1 = 1, dx2 = 2 at the interior line
        let grid = Grid2d::from_gridlines(vec![0.0, 1.0, 3.0], vec![0.0, 1.0, 2.0]).unwrap();
        let boundary = DirichletValues::zero(&grid);
        let problem = PoissonProblem::new(grid, boundary, |_, _| 0.0);
        let (a, _) = problem.assemble().unwrap();
        let (col, center) = a.row(0).next().unwrap();
        assert_eq!(col, 0);
        // 2/(dx1 dx2) + 2/(dy1 dy2) = 2/2 + 2/1 = 3
        assert_abs_diff_eq!(center, 3.0, epsilon = 1e-14);
    }

    #[test]
    fn embed_places_interior_and_boundaries() {
        let grid = Grid2d::regular(3, 4, (0.0, 1.0), (0.0, 1.0)).unwrap();
        let boundary = DirichletValues::new(
            &grid,
            vec![9.0; 3],
            vec![8.0; 4],
            vec![7.0; 3],
            vec![6.0; 4],
        )
        .unwrap();
        let problem = PoissonProblem::new(grid, boundary, |_, _| 0.0);
        let field = problem.embed(&[1.0, 2.0]);
        assert_eq!(field.len(), 12);
        // interior column is x index 1; rows j = 1, 2
        assert_eq!(field[1 * 3 + 1], 1.0);
        assert_eq!(field[2 * 3 + 1], 2.0);
        // west edge wins the corners
        assert_eq!(field[0], 8.0);
        assert_eq!(field[1], 7.0);
        assert_eq!(field[3], 8.0);
        assert_eq!(field[5], 6.0);
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert!(Grid2d::regular(2, 4, (0.0, 1.0), (0.0, 1.0)).is_err());
        assert!(Grid2d::from_gridlines(vec![0.0, 1.0, 1.0], vec![0.0, 1.0, 2.0]).is_err());
        let grid = Grid2d::regular(3, 3, (0.0, 1.0), (0.0, 1.0)).unwrap();
        assert!(DirichletValues::new(&grid, vec![0.0; 2], vec![0.0; 3], vec![0.0; 3], vec![0.0; 3])
            .is_err());
    }
}
