/// Unique identifier for a game object.
///
/// Also stored in the physics user-data slot of every body and collider, so
/// contact callbacks resolve to a registry entry instead of a raw pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Reserved value written into user-data when a body is being torn down.
    pub const DETACHED: EntityId = EntityId(u32::MAX);

    pub fn is_detached(self) -> bool {
        self == Self::DETACHED
    }

    pub(crate) fn to_user_data(self) -> u128 {
        self.0 as u128
    }

    pub(crate) fn from_user_data(data: u128) -> Option<Self> {
        let id = EntityId(u32::try_from(data).ok()?);
        if id.is_detached() {
            None
        } else {
            Some(id)
        }
    }
}
