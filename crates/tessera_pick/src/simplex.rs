//! Two-phase tableau simplex.
//!
//! Minimizes `c · x` over `x >= 0` subject to `<=` rows followed by `=` rows,
//! every right-hand side non-negative. Each `<=` row gets a slack column and
//! each `=` row an artificial column, so the initial basis is the identity.
//!
//! ```text
//! columns: | variables | slacks (le rows) | artificials (eq rows) | rhs |
//! rows:    constraint rows, then the reduced-cost row (rhs holds -objective)
//! ```
//!
//! The entering column has the most negative reduced cost. The leaving row
//! has the minimum ratio over positive pivot coefficients; equal ratios go
//! to the later row. Artificial columns never re-enter the basis.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplexOutcome {
    Optimal,
    Infeasible,
    Unbounded,
    /// The pivot limit was reached before optimality.
    IterationLimit,
}

pub struct Tableau<'s> {
    cells: &'s mut Vec<f64>,
    basis: &'s mut Vec<usize>,
    variables: usize,
    le_rows: usize,
    eq_rows: usize,
    cols: usize,
    epsilon: f64,
    pivots: usize,
}

impl<'s> Tableau<'s> {
    /// Zeroes a tableau for `variables` unknowns over the caller's storage.
    pub fn new(
        cells: &'s mut Vec<f64>,
        basis: &'s mut Vec<usize>,
        variables: usize,
        le_rows: usize,
        eq_rows: usize,
        epsilon: f64,
    ) -> Self {
        let rows = le_rows + eq_rows;
        let cols = variables + rows + 1;
        cells.clear();
        cells.resize((rows + 1) * cols, 0.0);
        basis.clear();
        for row in 0..rows {
            let auxiliary = variables + row;
            cells[row * cols + auxiliary] = 1.0;
            basis.push(auxiliary);
        }
        Self {
            cells,
            basis,
            variables,
            le_rows,
            eq_rows,
            cols,
            epsilon,
            pivots: 0,
        }
    }

    #[inline]
    fn rows(&self) -> usize {
        self.le_rows + self.eq_rows
    }

    #[inline]
    fn rhs(&self) -> usize {
        self.cols - 1
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    #[inline]
    fn is_artificial(&self, col: usize) -> bool {
        col >= self.variables + self.le_rows && col < self.rhs()
    }

    /// Coefficient of `variable` in constraint `row` (`<=` rows first).
    pub fn set(&mut self, row: usize, variable: usize, value: f64) {
        debug_assert!(row < self.rows() && variable < self.variables);
        self.cells[row * self.cols + variable] = value;
    }

    /// Right-hand side of constraint `row`; must be non-negative.
    pub fn set_rhs(&mut self, row: usize, value: f64) {
        debug_assert!(row < self.rows() && value >= 0.0);
        let rhs = self.rhs();
        self.cells[row * self.cols + rhs] = value;
    }

    /// Pivots performed so far.
    #[must_use]
    pub fn pivots(&self) -> usize {
        self.pivots
    }

    /// Minimizes `objective(j) * x_j` summed over the variables.
    pub fn solve(&mut self, objective: impl Fn(usize) -> f64, limit: usize) -> SimplexOutcome {
        if self.eq_rows > 0 {
            self.load_phase_one();
            let outcome = self.iterate(limit);
            if outcome != SimplexOutcome::Optimal {
                return outcome;
            }
            if self.objective_value() > self.epsilon {
                return SimplexOutcome::Infeasible;
            }
            self.drive_out_artificials();
        }
        self.load_objective(objective);
        self.iterate(limit)
    }

    /// Value of the current objective.
    #[must_use]
    pub fn objective_value(&self) -> f64 {
        -self.at(self.rows(), self.rhs())
    }

    /// Current value of `variable`.
    #[must_use]
    pub fn value(&self, variable: usize) -> f64 {
        self.basis
            .iter()
            .position(|&col| col == variable)
            .map_or(0.0, |row| self.at(row, self.rhs()))
    }

    /// Phase one minimizes the sum of the artificials.
    fn load_phase_one(&mut self) {
        let objective = self.rows();
        for col in 0..self.cols {
            let mut reduced = 0.0;
            if !self.is_artificial(col) {
                for row in self.le_rows..self.rows() {
                    reduced -= self.at(row, col);
                }
            }
            self.cells[objective * self.cols + col] = reduced;
        }
    }

    fn load_objective(&mut self, objective: impl Fn(usize) -> f64) {
        let row = self.rows();
        for col in 0..self.cols {
            self.cells[row * self.cols + col] = if col < self.variables {
                objective(col)
            } else {
                0.0
            };
        }
        for basis_row in 0..self.rows() {
            let col = self.basis[basis_row];
            let reduced = self.at(row, col);
            if reduced != 0.0 {
                self.subtract_row(row, basis_row, reduced);
            }
        }
    }

    /// Pivots zero-valued artificials out of the basis where some other
    /// column can take their place. Rows with no such column are redundant.
    fn drive_out_artificials(&mut self) {
        for row in 0..self.rows() {
            if !self.is_artificial(self.basis[row]) {
                continue;
            }
            let replacement = (0..self.variables + self.le_rows)
                .find(|&col| self.at(row, col).abs() > self.epsilon);
            if let Some(col) = replacement {
                self.pivot(row, col);
            }
        }
    }

    fn iterate(&mut self, limit: usize) -> SimplexOutcome {
        let objective = self.rows();
        loop {
            let mut entering = None;
            let mut most_negative = -self.epsilon;
            for col in 0..self.rhs() {
                if self.is_artificial(col) {
                    continue;
                }
                let reduced = self.at(objective, col);
                if reduced < most_negative {
                    most_negative = reduced;
                    entering = Some(col);
                }
            }
            let Some(col) = entering else {
                return SimplexOutcome::Optimal;
            };

            let mut leaving = None;
            let mut best_ratio = f64::INFINITY;
            for row in 0..self.rows() {
                let coefficient = self.at(row, col);
                if coefficient > self.epsilon {
                    let ratio = self.at(row, self.rhs()) / coefficient;
                    if ratio <= best_ratio {
                        best_ratio = ratio;
                        leaving = Some(row);
                    }
                }
            }
            let Some(row) = leaving else {
                return SimplexOutcome::Unbounded;
            };

            if self.pivots >= limit {
                log::warn!("simplex stopped after {} pivots without converging", self.pivots);
                return SimplexOutcome::IterationLimit;
            }
            self.pivot(row, col);
        }
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let cols = self.cols;
        let scale = self.at(row, col);
        for cell in &mut self.cells[row * cols..(row + 1) * cols] {
            *cell /= scale;
        }
        for other in 0..=self.rows() {
            if other == row {
                continue;
            }
            let factor = self.at(other, col);
            if factor != 0.0 {
                self.subtract_row(other, row, factor);
            }
        }
        self.basis[row] = col;
        self.pivots += 1;
    }

    /// `target -= factor * source`
    fn subtract_row(&mut self, target: usize, source: usize, factor: f64) {
        let cols = self.cols;
        for col in 0..cols {
            let value = self.cells[source * cols + col];
            self.cells[target * cols + col] -= factor * value;
        }
    }
}
