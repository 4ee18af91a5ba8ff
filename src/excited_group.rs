use glam::IVec2;

/// Handle to an excited group within one grid atmosphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExcitedGroupId(pub u64);

/// A set of mutually-converged active tiles waiting to settle together.
///
/// Both cooldowns tick up every pass. When the breakdown cooldown expires the
/// member mixtures are averaged in place; when the dismantle cooldown expires
/// the members are deactivated and the group disposed. Any membership change
/// resets both, so a group only ages while it is left alone.
#[derive(Debug, Clone, Default)]
pub struct ExcitedGroup {
    pub tiles: Vec<IVec2>,
    pub breakdown_cooldown: u32,
    pub dismantle_cooldown: u32,
}

impl ExcitedGroup {
    pub fn reset_cooldowns(&mut self) {
        self.breakdown_cooldown = 0;
        self.dismantle_cooldown = 0;
    }
}
