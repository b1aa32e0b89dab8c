//! Dynamic floor field (§4.4): a decaying, diffusing particle density left
//! by pedestrian motion.

use ndarray::Array2;

use crate::config::{DynamicFieldKernel, EmissionPolicy};
use crate::grid::{self, FIRE, IMPASSABLE};
use crate::location::Location;
use crate::random::Rng;

pub struct DynamicField {
    pub grid: Array2<f32>,
    aux: Array2<f32>,
    shape: (usize, usize),
}

impl DynamicField {
    pub fn new(shape: (usize, usize)) -> Self {
        DynamicField {
            grid: grid::new_f32_grid(shape, 0.0),
            aux: grid::new_f32_grid(shape, 0.0),
            shape,
        }
    }

    pub fn reset(&mut self) {
        self.grid.fill(0.0);
    }

    pub fn emit(&mut self, at: Location) {
        if let Some(ix) = at.as_index() {
            if let Some(cell) = self.grid.get_mut(ix) {
                *cell += 1.0;
            }
        }
    }

    fn passable(&self, obstacle_grid: &Array2<i32>, fire_grid: &Array2<i32>, loc: Location) -> bool {
        loc.is_inside(self.shape)
            && grid::get_i32(obstacle_grid, loc) != Some(IMPASSABLE)
            && grid::get_i32(fire_grid, loc) != Some(FIRE)
    }

    /// Combined decay-and-diffusion step (§4.4 main equation), using a
    /// scratch grid and final swap for parallel-update semantics.
    pub fn decay_diffuse(&mut self, obstacle_grid: &Array2<i32>, fire_grid: &Array2<i32>, alpha: f64, delta: f64) {
        let pre_total: f64 = self.grid.iter().map(|&v| v as f64).sum();
        if pre_total <= 0.0 {
            self.aux.fill(0.0);
            std::mem::swap(&mut self.grid, &mut self.aux);
            return;
        }

        self.aux.fill(0.0);
        let keep = (1.0 - alpha) * (1.0 - delta);
        let spread = alpha * (1.0 - delta) / 4.0;

        for (r, c) in ndarray::indices(self.shape) {
            let loc = Location::new(r as i32, c as i32);
            if !self.passable(obstacle_grid, fire_grid, loc) {
                continue;
            }
            let mut value = keep * self.grid[(r, c)] as f64;
            for n in loc.von_neumann4() {
                if self.passable(obstacle_grid, fire_grid, n) {
                    if let Some(v) = grid::get_f32(&self.grid, n) {
                        value += spread * v as f64;
                    }
                }
            }
            self.aux[(r, c)] = value as f32;
        }

        let post_total: f64 = self.aux.iter().map(|&v| v as f64).sum();
        if post_total > 0.0 {
            let scale = pre_total / post_total;
            self.aux.mapv_inplace(|v| (v as f64 * scale) as f32);
        }

        std::mem::swap(&mut self.grid, &mut self.aux);
    }

    /// Legacy kernel: each particle independently decays with probability `delta`.
    pub fn decay(&mut self, rng: &mut Rng, delta: f64) {
        for v in self.grid.iter_mut() {
            let mut remaining = 0.0;
            let count = v.round() as i64;
            for _ in 0..count {
                if !rng.bernoulli(delta) {
                    remaining += 1.0;
                }
            }
            *v = remaining;
        }
    }

    /// Legacy kernel: roulette each particle towards one valid orthogonal
    /// neighbor; `moving` controls whether the source particle relocates.
    pub fn single_diffusion(
        &mut self,
        rng: &mut Rng,
        obstacle_grid: &Array2<i32>,
        fire_grid: &Array2<i32>,
        moving: bool,
    ) {
        self.aux.assign(&self.grid);

        for (r, c) in ndarray::indices(self.shape) {
            let count = self.grid[(r, c)].round() as i64;
            if count <= 0 {
                continue;
            }
            let loc = Location::new(r as i32, c as i32);
            let neighbors: Vec<Location> = loc
                .von_neumann4()
                .into_iter()
                .filter(|&n| self.passable(obstacle_grid, fire_grid, n))
                .collect();
            if neighbors.is_empty() {
                continue;
            }

            for _ in 0..count {
                let weights = vec![1.0; neighbors.len()];
                let total = neighbors.len() as f64;
                if let Some(idx) = rng.roulette(&weights, total) {
                    let target = neighbors[idx];
                    if let Some(tix) = target.as_index() {
                        self.aux[tix] += 1.0;
                        if moving {
                            self.aux[(r, c)] -= 1.0;
                        }
                    }
                }
            }
        }

        std::mem::swap(&mut self.grid, &mut self.aux);
    }

    /// Legacy kernel: independent Bernoulli trial per orthogonal neighbor.
    pub fn multiple_diffusion(
        &mut self,
        rng: &mut Rng,
        obstacle_grid: &Array2<i32>,
        fire_grid: &Array2<i32>,
        diffusion_prob: f64,
    ) {
        self.aux.assign(&self.grid);

        for (r, c) in ndarray::indices(self.shape) {
            let count = self.grid[(r, c)].round() as i64;
            if count <= 0 {
                continue;
            }
            let loc = Location::new(r as i32, c as i32);
            for n in loc.von_neumann4() {
                if !self.passable(obstacle_grid, fire_grid, n) {
                    continue;
                }
                for _ in 0..count {
                    if rng.bernoulli(diffusion_prob) {
                        if let Some(nix) = n.as_index() {
                            self.aux[nix] += 1.0;
                        }
                    }
                }
            }
        }

        std::mem::swap(&mut self.grid, &mut self.aux);
    }

    /// Dispatch to the configured kernel for one step.
    pub fn step(
        &mut self,
        kernel: DynamicFieldKernel,
        rng: &mut Rng,
        obstacle_grid: &Array2<i32>,
        fire_grid: &Array2<i32>,
        alpha: f64,
        delta: f64,
    ) {
        match kernel {
            DynamicFieldKernel::DecayDiffusion => {
                self.decay_diffuse(obstacle_grid, fire_grid, alpha, delta)
            }
            DynamicFieldKernel::Decay => self.decay(rng, delta),
            DynamicFieldKernel::SingleDiffusion => {
                self.single_diffusion(rng, obstacle_grid, fire_grid, true)
            }
            DynamicFieldKernel::MultipleDiffusion => {
                self.multiple_diffusion(rng, obstacle_grid, fire_grid, alpha)
            }
        }
    }
}

pub fn emit_for_step(field: &mut DynamicField, policy: EmissionPolicy, left: Location, current: Location, moved: bool) {
    match policy {
        EmissionPolicy::SourceDensity => {
            if moved {
                field.emit(left);
            }
        }
        EmissionPolicy::VelocityDensity => {
            field.emit(current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::new_i32_grid;

    #[test]
    fn mass_is_conserved_with_zero_decay() {
        let obstacle_grid = new_i32_grid((10, 10), 0);
        let fire_grid = new_i32_grid((10, 10), 0);
        let mut field = DynamicField::new((10, 10));
        field.emit(Location::new(5, 5));
        field.grid[(5, 5)] = 100.0;

        for _ in 0..1000 {
            field.decay_diffuse(&obstacle_grid, &fire_grid, 0.3, 0.0);
            let total: f64 = field.grid.iter().map(|&v| v as f64).sum();
            assert!((total - 100.0).abs() < 1e-3, "total was {total}");
        }
    }

    #[test]
    fn empty_field_stays_zero() {
        let obstacle_grid = new_i32_grid((3, 3), 0);
        let fire_grid = new_i32_grid((3, 3), 0);
        let mut field = DynamicField::new((3, 3));
        field.decay_diffuse(&obstacle_grid, &fire_grid, 0.3, 0.2);
        let total: f64 = field.grid.iter().map(|&v| v as f64).sum();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn renormalization_makes_decay_rate_inert_on_total_mass() {
        // The renormalization step (§4.4: "Σ φ′ = Σ φ") rescales the whole
        // grid back to the pre-step total every time, so `delta` only ever
        // reshapes the distribution transiently before rescaling erases its
        // effect on the total — it never actually drains mass from a closed
        // (obstacle-free) grid, regardless of its value.
        let obstacle_grid = new_i32_grid((10, 10), 0);
        let fire_grid = new_i32_grid((10, 10), 0);
        let mut field = DynamicField::new((10, 10));
        field.grid[(5, 5)] = 100.0;

        for _ in 0..20 {
            field.decay_diffuse(&obstacle_grid, &fire_grid, 0.3, 0.1);
            let total: f64 = field.grid.iter().map(|&v| v as f64).sum();
            assert!((total - 100.0).abs() < 1e-3, "total was {total}");
        }
    }
}
