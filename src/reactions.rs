use crate::constants::{
    FIRE_PLASMA_ENERGY_RELEASED_J_PER_MOL, FIRE_TRITIUM_ENERGY_RELEASED_J_PER_MOL,
    GAS_MIN_MOLES, MINIMUM_HEAT_CAPACITY, OXYGEN_BURN_RATE_BASE, PLASMA_BURN_RATE_DELTA,
    PLASMA_MINIMUM_BURN_TEMPERATURE_K, PLASMA_OXYGEN_FULLBURN, PLASMA_UPPER_TEMPERATURE_K,
    TRITIUM_OXYGEN_RATIO,
};
use crate::gas::GasId;
use crate::mixture::GasMixture;

/// Outcome of running reactions over a mixture. Ordered so a pass can keep
/// the strongest result seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReactionResult {
    NoReaction,
    Reacting,
    /// The reaction consumed the conditions later reactions would need;
    /// stop evaluating the rest of the table this pass.
    StopReactions,
}

/// One chemical reaction over a gas mixture. Implementations mutate the
/// mixture in place and report whether anything happened.
pub trait GasReaction {
    fn name(&self) -> &'static str;

    /// Cheap precondition check, run before `react`.
    fn is_eligible(&self, mixture: &GasMixture) -> bool;

    fn react(&self, mixture: &mut GasMixture) -> ReactionResult;
}

/// Ordered reaction registry. Registration order is evaluation order, which
/// matters when one reaction's products feed another.
pub struct ReactionTable {
    reactions: Vec<Box<dyn GasReaction + Send + Sync>>,
}

impl ReactionTable {
    pub fn new() -> ReactionTable {
        ReactionTable {
            reactions: Vec::new(),
        }
    }

    /// Plasma fire first so the tritium it may produce burns the same pass.
    pub fn with_defaults() -> ReactionTable {
        let mut table = ReactionTable::new();
        table.register(Box::new(PlasmaFireReaction));
        table.register(Box::new(TritiumFireReaction));
        table
    }

    pub fn register(&mut self, reaction: Box<dyn GasReaction + Send + Sync>) {
        self.reactions.push(reaction);
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Runs every eligible reaction in order, returning the strongest
    /// result. A `StopReactions` short-circuits the rest of the table.
    pub fn react(&self, mixture: &mut GasMixture) -> ReactionResult {
        let mut result = ReactionResult::NoReaction;
        for reaction in &self.reactions {
            if !reaction.is_eligible(mixture) {
                continue;
            }
            let outcome = reaction.react(mixture);
            if outcome == ReactionResult::StopReactions {
                return ReactionResult::StopReactions;
            }
            result = result.max(outcome);
        }
        result
    }
}

impl Default for ReactionTable {
    fn default() -> ReactionTable {
        ReactionTable::with_defaults()
    }
}

/// Plasma combustion. Burn rate scales with how far the temperature sits
/// between the ignition point and the upper band; oxygen-rich mixtures burn
/// the plasma fraction faster.
pub struct PlasmaFireReaction;

impl GasReaction for PlasmaFireReaction {
    fn name(&self) -> &'static str {
        "plasma fire"
    }

    fn is_eligible(&self, mixture: &GasMixture) -> bool {
        mixture.temperature_k() >= PLASMA_MINIMUM_BURN_TEMPERATURE_K
            && mixture.get_moles(GasId::Plasma) > GAS_MIN_MOLES
            && mixture.get_moles(GasId::Oxygen) > GAS_MIN_MOLES
    }

    fn react(&self, mixture: &mut GasMixture) -> ReactionResult {
        let initial_energy = mixture.thermal_energy_j();
        let plasma = mixture.get_moles(GasId::Plasma);
        let oxygen = mixture.get_moles(GasId::Oxygen);

        let temperature_scale = ((mixture.temperature_k() - PLASMA_MINIMUM_BURN_TEMPERATURE_K)
            / (PLASMA_UPPER_TEMPERATURE_K - PLASMA_MINIMUM_BURN_TEMPERATURE_K))
            .clamp(0.0, 1.0);
        if temperature_scale <= 0.0 {
            return ReactionResult::NoReaction;
        }
        let oxygen_burn_rate = OXYGEN_BURN_RATE_BASE - temperature_scale;
        let plasma_burn_rate = if oxygen > plasma * PLASMA_OXYGEN_FULLBURN {
            plasma * temperature_scale / PLASMA_BURN_RATE_DELTA
        } else {
            temperature_scale * (oxygen / PLASMA_OXYGEN_FULLBURN) / PLASMA_BURN_RATE_DELTA
        };
        let plasma_burned = plasma_burn_rate
            .min(plasma)
            .min(oxygen / oxygen_burn_rate);
        if plasma_burned < GAS_MIN_MOLES {
            return ReactionResult::NoReaction;
        }

        mixture.adjust_moles(GasId::Plasma, -plasma_burned);
        mixture.adjust_moles(GasId::Oxygen, -plasma_burned * oxygen_burn_rate);
        mixture.adjust_moles(GasId::CarbonDioxide, plasma_burned);

        let energy_released = FIRE_PLASMA_ENERGY_RELEASED_J_PER_MOL * plasma_burned;
        let new_capacity = mixture.heat_capacity();
        if new_capacity > MINIMUM_HEAT_CAPACITY {
            mixture.set_temperature_k((initial_energy + energy_released) / new_capacity);
        }
        ReactionResult::Reacting
    }
}

/// Tritium combustion: one mole of tritium takes half a mole of oxygen and
/// leaves water vapor.
pub struct TritiumFireReaction;

impl GasReaction for TritiumFireReaction {
    fn name(&self) -> &'static str {
        "tritium fire"
    }

    fn is_eligible(&self, mixture: &GasMixture) -> bool {
        mixture.temperature_k() >= PLASMA_MINIMUM_BURN_TEMPERATURE_K
            && mixture.get_moles(GasId::Tritium) > GAS_MIN_MOLES
            && mixture.get_moles(GasId::Oxygen) > GAS_MIN_MOLES
    }

    fn react(&self, mixture: &mut GasMixture) -> ReactionResult {
        let initial_energy = mixture.thermal_energy_j();
        let tritium = mixture.get_moles(GasId::Tritium);
        let oxygen = mixture.get_moles(GasId::Oxygen);

        let burned = tritium.min(oxygen / TRITIUM_OXYGEN_RATIO);
        if burned < GAS_MIN_MOLES {
            return ReactionResult::NoReaction;
        }

        mixture.adjust_moles(GasId::Tritium, -burned);
        mixture.adjust_moles(GasId::Oxygen, -burned * TRITIUM_OXYGEN_RATIO);
        mixture.adjust_moles(GasId::WaterVapor, burned);

        let energy_released = FIRE_TRITIUM_ENERGY_RELEASED_J_PER_MOL * burned;
        let new_capacity = mixture.heat_capacity();
        if new_capacity > MINIMUM_HEAT_CAPACITY {
            mixture.set_temperature_k((initial_energy + energy_released) / new_capacity);
        }
        ReactionResult::Reacting
    }
}
