use serde::{Deserialize, Serialize};

/// Number of simulated gas species.
pub const GAS_COUNT: usize = 6;

/// Identifier of a simulated gas species. Doubles as the index into the
/// per-mixture mole table and the species registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GasId {
    Oxygen = 0,
    Nitrogen = 1,
    CarbonDioxide = 2,
    Plasma = 3,
    Tritium = 4,
    WaterVapor = 5,
}

impl GasId {
    pub const ALL: [GasId; GAS_COUNT] = [
        GasId::Oxygen,
        GasId::Nitrogen,
        GasId::CarbonDioxide,
        GasId::Plasma,
        GasId::Tritium,
        GasId::WaterVapor,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn species(self) -> &'static GasSpecies {
        &GAS_SPECIES[self as usize]
    }

    pub fn specific_heat_j_per_mol_k(self) -> f64 {
        self.species().specific_heat_j_per_mol_k
    }
}

/// Static per-species physical profile.
#[derive(Debug, Clone)]
pub struct GasSpecies {
    pub name: &'static str,
    pub specific_heat_j_per_mol_k: f64,
}

pub const GAS_SPECIES: [GasSpecies; GAS_COUNT] = [
    GasSpecies {
        name: "oxygen",
        specific_heat_j_per_mol_k: 20.0,
    },
    GasSpecies {
        name: "nitrogen",
        specific_heat_j_per_mol_k: 20.0,
    },
    GasSpecies {
        name: "carbon dioxide",
        specific_heat_j_per_mol_k: 30.0,
    },
    GasSpecies {
        name: "plasma",
        specific_heat_j_per_mol_k: 200.0,
    },
    GasSpecies {
        name: "tritium",
        specific_heat_j_per_mol_k: 10.0,
    },
    GasSpecies {
        name: "water vapor",
        specific_heat_j_per_mol_k: 40.0,
    },
];
