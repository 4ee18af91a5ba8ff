use crate::constants::{
    CELL_VOLUME_L, MINIMUM_HEAT_CAPACITY, R_KPA_L_PER_MOL_K, T20C, TCMB,
};
use crate::gas::{GAS_COUNT, GasId};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The shared space mixture: immutable, empty, at the background temperature.
/// Queries against missing grids resolve to this, and diffusion into space
/// discards the transferred gas against it.
pub static SPACE_GAS: Lazy<GasMixture> = Lazy::new(|| {
    let mut mix = GasMixture::new(CELL_VOLUME_L);
    mix.mark_immutable();
    mix
});

/// A volume of gas: per-species mole counts, a volume and a temperature.
///
/// Every operation is closed over non-negative moles and temperatures at or
/// above the background floor; out-of-range inputs clamp instead of failing.
/// Mutating an immutable mixture (the space mixture) is a no-op, which is how
/// space acts as an infinite sink without bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasMixture {
    moles: [f64; GAS_COUNT],
    volume_l: f64,
    temperature_k: f64,
    #[serde(default)]
    immutable: bool,
}

impl GasMixture {
    /// Empty mixture at the background temperature floor.
    pub fn new(volume_l: f64) -> GasMixture {
        GasMixture {
            moles: [0.0; GAS_COUNT],
            volume_l: volume_l.max(0.0),
            temperature_k: TCMB,
            immutable: false,
        }
    }

    /// Empty mixture at the default habitable temperature, used when a tile
    /// is (re)created with nothing better to seed it from.
    pub fn new_ambient(volume_l: f64) -> GasMixture {
        let mut mix = GasMixture::new(volume_l);
        mix.temperature_k = T20C;
        mix
    }

    pub fn mark_immutable(&mut self) {
        self.immutable = true;
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn volume_l(&self) -> f64 {
        self.volume_l
    }

    pub fn set_volume_l(&mut self, volume_l: f64) {
        if !self.immutable {
            self.volume_l = volume_l.max(0.0);
        }
    }

    pub fn temperature_k(&self) -> f64 {
        self.temperature_k
    }

    pub fn set_temperature_k(&mut self, temperature_k: f64) {
        if !self.immutable {
            self.temperature_k = temperature_k.max(TCMB);
        }
    }

    pub fn get_moles(&self, gas: GasId) -> f64 {
        self.moles[gas.index()]
    }

    pub fn set_moles(&mut self, gas: GasId, moles: f64) {
        if !self.immutable {
            self.moles[gas.index()] = moles.max(0.0);
        }
    }

    /// Adds (or with a negative delta removes) moles of one species,
    /// clamping at zero.
    pub fn adjust_moles(&mut self, gas: GasId, delta: f64) {
        if !self.immutable {
            self.moles[gas.index()] = (self.moles[gas.index()] + delta).max(0.0);
        }
    }

    pub fn total_moles(&self) -> f64 {
        self.moles.iter().sum()
    }

    /// Ideal-gas pressure in kPa; zero for a zero-volume mixture.
    pub fn pressure_kpa(&self) -> f64 {
        if self.volume_l <= 0.0 {
            return 0.0;
        }
        self.total_moles() * R_KPA_L_PER_MOL_K * self.temperature_k / self.volume_l
    }

    /// Heat capacity in J/K, floored so energy math never divides by zero.
    pub fn heat_capacity(&self) -> f64 {
        let cap: f64 = GasId::ALL
            .iter()
            .map(|gas| self.moles[gas.index()] * gas.specific_heat_j_per_mol_k())
            .sum();
        cap.max(MINIMUM_HEAT_CAPACITY)
    }

    pub fn thermal_energy_j(&self) -> f64 {
        self.heat_capacity() * self.temperature_k
    }

    /// Scales every species by `factor`. Temperature is unchanged.
    pub fn multiply(&mut self, factor: f64) {
        if self.immutable {
            return;
        }
        let factor = factor.max(0.0);
        for moles in &mut self.moles {
            *moles *= factor;
        }
    }

    /// Merges `other` in, conserving total moles and total thermal energy.
    /// The new temperature is the heat-capacity-weighted blend of the two.
    pub fn merge(&mut self, other: &GasMixture) {
        if self.immutable {
            return;
        }
        let self_cap = self.heat_capacity();
        let other_cap = other.heat_capacity();
        let combined_cap = self_cap + other_cap;
        if combined_cap > MINIMUM_HEAT_CAPACITY {
            self.temperature_k = ((self.temperature_k * self_cap)
                + (other.temperature_k * other_cap))
                / combined_cap;
            self.temperature_k = self.temperature_k.max(TCMB);
        }
        for gas in GasId::ALL {
            self.moles[gas.index()] += other.moles[gas.index()];
        }
    }

    /// Removes `ratio` of every species into a new mixture at the same
    /// temperature and volume. `1 - ratio` stays behind.
    pub fn remove_ratio(&mut self, ratio: f64) -> GasMixture {
        let ratio = ratio.clamp(0.0, 1.0);
        let mut removed = GasMixture::new(self.volume_l);
        removed.temperature_k = self.temperature_k;
        for gas in GasId::ALL {
            let taken = self.moles[gas.index()] * ratio;
            removed.moles[gas.index()] = taken;
            if !self.immutable {
                self.moles[gas.index()] -= taken;
            }
        }
        removed
    }

    /// Removes up to `amount` total moles, split across species in
    /// proportion to their presence.
    pub fn remove(&mut self, amount_moles: f64) -> GasMixture {
        let total = self.total_moles();
        if total <= 0.0 {
            return GasMixture::new(self.volume_l);
        }
        self.remove_ratio(amount_moles / total)
    }

    /// One diffusion step against a neighbor: every species moves
    /// `delta / (open_neighbor_count + 1)` down its own gradient, so a tile
    /// splits its surplus evenly between itself and all open neighbors and
    /// can never overshoot. Thermal energy rides along with the moved moles,
    /// conserving total enthalpy exactly. Returns the total moles moved
    /// (both directions).
    pub fn share(&mut self, other: &mut GasMixture, open_neighbor_count: usize) -> f64 {
        let divisor = (open_neighbor_count + 1) as f64;
        let self_temperature = self.temperature_k;
        let other_temperature = other.temperature_k;
        let self_energy = self.thermal_energy_j();
        let other_energy = other.thermal_energy_j();

        let mut moved_moles = 0.0;
        let mut energy_to_other = 0.0;
        for gas in GasId::ALL {
            let index = gas.index();
            let delta = (self.moles[index] - other.moles[index]) / divisor;
            if delta == 0.0 {
                continue;
            }
            // Gas carries the enthalpy of the side it leaves.
            let source_temperature = if delta > 0.0 {
                self_temperature
            } else {
                other_temperature
            };
            energy_to_other += delta * gas.specific_heat_j_per_mol_k() * source_temperature;
            if !self.immutable {
                self.moles[index] = (self.moles[index] - delta).max(0.0);
            }
            if !other.immutable {
                other.moles[index] = (other.moles[index] + delta).max(0.0);
            }
            moved_moles += delta.abs();
        }

        if !self.immutable {
            let cap = self.heat_capacity();
            if cap > MINIMUM_HEAT_CAPACITY {
                self.temperature_k = ((self_energy - energy_to_other) / cap).max(TCMB);
            }
        }
        if !other.immutable {
            let cap = other.heat_capacity();
            if cap > MINIMUM_HEAT_CAPACITY {
                other.temperature_k = ((other_energy + energy_to_other) / cap).max(TCMB);
            }
        }
        moved_moles
    }

    /// Conductive heat exchange without mass transfer. The coefficient is
    /// the fraction of the equilibrium gap closed this step.
    pub fn temperature_share(&mut self, other: &mut GasMixture, conduction_coefficient: f64) {
        let delta = self.temperature_k - other.temperature_k;
        if delta.abs() < f64::EPSILON {
            return;
        }
        let self_cap = self.heat_capacity();
        let other_cap = other.heat_capacity();
        let heat = conduction_coefficient.clamp(0.0, 1.0) * delta * (self_cap * other_cap)
            / (self_cap + other_cap);
        if !self.immutable {
            self.temperature_k = (self.temperature_k - heat / self_cap).max(TCMB);
        }
        if !other.immutable {
            other.temperature_k = (other.temperature_k + heat / other_cap).max(TCMB);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use more_asserts::{assert_gt, assert_lt};

    fn standard_mix(oxygen: f64, nitrogen: f64, temperature_k: f64) -> GasMixture {
        let mut mix = GasMixture::new(CELL_VOLUME_L);
        mix.set_moles(GasId::Oxygen, oxygen);
        mix.set_moles(GasId::Nitrogen, nitrogen);
        mix.set_temperature_k(temperature_k);
        mix
    }

    #[test]
    fn pressure_follows_ideal_gas_law() {
        let mix = standard_mix(21.0, 79.0, 293.15);
        let expected = 100.0 * R_KPA_L_PER_MOL_K * 293.15 / CELL_VOLUME_L;
        assert_abs_diff_eq!(mix.pressure_kpa(), expected, epsilon = 1e-12);
    }

    #[test]
    fn adjust_moles_clamps_at_zero() {
        let mut mix = standard_mix(1.0, 0.0, 300.0);
        mix.adjust_moles(GasId::Oxygen, -5.0);
        assert_eq!(mix.get_moles(GasId::Oxygen), 0.0);
    }

    #[test]
    fn temperature_never_drops_below_background() {
        let mut mix = standard_mix(1.0, 0.0, 300.0);
        mix.set_temperature_k(-40.0);
        assert_eq!(mix.temperature_k(), TCMB);
    }

    #[test]
    fn merge_conserves_moles_and_energy() {
        let mut a = standard_mix(40.0, 10.0, 300.0);
        let b = standard_mix(5.0, 80.0, 500.0);
        let total_moles = a.total_moles() + b.total_moles();
        let total_energy = a.thermal_energy_j() + b.thermal_energy_j();

        a.merge(&b);

        assert_abs_diff_eq!(a.total_moles(), total_moles, epsilon = 1e-9);
        assert_abs_diff_eq!(a.thermal_energy_j(), total_energy, epsilon = 1e-6);
        assert_gt!(a.temperature_k(), 300.0);
        assert_lt!(a.temperature_k(), 500.0);
    }

    #[test]
    fn remove_ratio_splits_every_species() {
        let mut mix = standard_mix(80.0, 20.0, 310.0);
        let removed = mix.remove_ratio(0.25);

        assert_abs_diff_eq!(removed.get_moles(GasId::Oxygen), 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mix.get_moles(GasId::Oxygen), 60.0, epsilon = 1e-12);
        assert_abs_diff_eq!(removed.get_moles(GasId::Nitrogen), 5.0, epsilon = 1e-12);
        assert_eq!(removed.temperature_k(), 310.0);
    }

    #[test]
    fn remove_caps_at_available_moles() {
        let mut mix = standard_mix(10.0, 0.0, 300.0);
        let removed = mix.remove(1000.0);
        assert_abs_diff_eq!(removed.total_moles(), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mix.total_moles(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn share_conserves_moles_and_energy() {
        let mut a = standard_mix(100.0, 0.0, 400.0);
        let mut b = standard_mix(20.0, 30.0, 280.0);
        let total_moles = a.total_moles() + b.total_moles();
        let total_energy = a.thermal_energy_j() + b.thermal_energy_j();

        let moved = a.share(&mut b, 1);

        assert_gt!(moved, 0.0);
        assert_abs_diff_eq!(a.total_moles() + b.total_moles(), total_moles, epsilon = 1e-9);
        assert_abs_diff_eq!(
            a.thermal_energy_j() + b.thermal_energy_j(),
            total_energy,
            epsilon = 1e-6
        );
    }

    #[test]
    fn share_moves_gas_down_the_gradient() {
        let mut a = standard_mix(100.0, 0.0, 300.0);
        let mut b = standard_mix(0.0, 0.0, 300.0);
        a.share(&mut b, 1);

        // One open neighbor: the surplus splits in half.
        assert_abs_diff_eq!(a.get_moles(GasId::Oxygen), 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.get_moles(GasId::Oxygen), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn share_into_space_discards_gas() {
        let mut a = standard_mix(100.0, 0.0, 300.0);
        let mut space = SPACE_GAS.clone();
        let moved = a.share(&mut space, 1);

        assert_gt!(moved, 0.0);
        assert_abs_diff_eq!(a.get_moles(GasId::Oxygen), 50.0, epsilon = 1e-12);
        assert_eq!(space.total_moles(), 0.0);
        assert_eq!(space.temperature_k(), TCMB);
    }

    #[test]
    fn immutable_mixture_ignores_mutation() {
        let mut space = SPACE_GAS.clone();
        space.adjust_moles(GasId::Oxygen, 100.0);
        space.set_temperature_k(500.0);
        let mut donor = standard_mix(10.0, 0.0, 300.0);
        space.merge(&donor);
        let removed = space.remove_ratio(0.5);

        assert_eq!(space.total_moles(), 0.0);
        assert_eq!(space.temperature_k(), TCMB);
        assert_eq!(removed.total_moles(), 0.0);
        assert_abs_diff_eq!(donor.total_moles(), 10.0, epsilon = 1e-12);
        donor.temperature_share(&mut space, 0.5);
        assert_eq!(space.temperature_k(), TCMB);
    }

    #[test]
    fn temperature_share_closes_the_gap_and_conserves_energy() {
        let mut hot = standard_mix(50.0, 0.0, 400.0);
        let mut cold = standard_mix(50.0, 0.0, 200.0);
        let total_energy = hot.thermal_energy_j() + cold.thermal_energy_j();

        hot.temperature_share(&mut cold, 0.5);

        assert_lt!(hot.temperature_k(), 400.0);
        assert_gt!(cold.temperature_k(), 200.0);
        assert_abs_diff_eq!(
            hot.thermal_energy_j() + cold.thermal_energy_j(),
            total_energy,
            epsilon = 1e-6
        );
    }
}
