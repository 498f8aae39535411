use glam::{Quat, Vec3};

use crate::api::game::{palette, SimContext};
use crate::api::types::EntityId;
use crate::components::body::BodyTag;
use crate::components::entity::GameObject;
use crate::components::mesh::MeshHierarchy;
use crate::core::physics::{BodyDesc, ColliderShape, PhysicsError};
use crate::core::transform::Transform;

/// A spinning collectible with an overlap-only collider.
///
/// Collection only marks the coin; the body is removed on the coin's next
/// [`update`](Coin::update), outside the physics step.
#[derive(Debug, Clone)]
pub struct Coin {
    pub object: GameObject,
    /// Yaw rate in rad/s.
    pub spin_speed: f32,
    collected: bool,
}

impl Coin {
    pub const HALF_EXTENTS: Vec3 = Vec3::new(0.2, 0.2, 0.05);
    pub const SPIN_SPEED: f32 = 2.0;

    pub fn new(object: GameObject) -> Self {
        Self {
            object,
            spin_speed: Self::SPIN_SPEED,
            collected: false,
        }
    }

    /// Create a coin with its trigger body at `position`.
    pub fn spawn(ctx: &mut SimContext, position: Vec3, mesh: Option<MeshHierarchy>) -> Result<Self, PhysicsError> {
        let id = ctx.next_id();
        let transform = Transform::from_position(position);
        let desc = BodyDesc::trigger(ColliderShape::Cuboid {
            half_extents: Self::HALF_EXTENTS,
        });
        let body = ctx.spawn_body(id, &transform, desc, BodyTag::coin())?;
        let mut object = GameObject::new(id)
            .with_tag("coin")
            .with_transform(transform)
            .with_color(palette::COIN)
            .with_body(body);
        if let Some(mesh) = mesh {
            object = object.with_mesh(mesh);
        }
        Ok(Self::new(object))
    }

    pub fn id(&self) -> EntityId {
        self.object.id
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    /// Collected and its body already gone.
    pub fn is_removed(&self) -> bool {
        self.collected && self.object.body.is_none()
    }

    /// Spin, or finish a pending removal.
    pub fn update(&mut self, ctx: &mut SimContext, dt: f32) -> Result<(), PhysicsError> {
        if self.collected {
            if let Some(body) = self.object.body.take() {
                ctx.despawn_body(self.object.id, body)?;
                self.object.active = false;
                log::debug!("coin {:?} removed", self.object.id);
            }
            return Ok(());
        }
        self.object
            .rotate(&mut ctx.physics, Quat::from_rotation_y(self.spin_speed * dt))
    }
}

/// Fixed number of coin slots.
#[derive(Debug, Clone, Default)]
pub struct CoinBoard {
    slots: Vec<Option<Coin>>,
}

impl CoinBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Place a coin in the first free slot. A full board hands the coin back.
    pub fn insert(&mut self, coin: Coin) -> Result<usize, Coin> {
        match self.slots.iter().position(Option::is_none) {
            Some(slot) => {
                self.slots[slot] = Some(coin);
                Ok(slot)
            }
            None => Err(coin),
        }
    }

    pub fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|c| c.id() == id))
    }

    pub fn get(&self, slot: usize) -> Option<&Coin> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn is_collected(&self, slot: usize) -> bool {
        self.get(slot).is_some_and(Coin::is_collected)
    }

    /// Mark a slot collected. True only the first time.
    pub fn collect(&mut self, slot: usize) -> bool {
        match self.slots.get_mut(slot).and_then(Option::as_mut) {
            Some(coin) if !coin.collected => {
                coin.collected = true;
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Coin> {
        self.slots.iter_mut().flatten()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn collected_count(&self) -> usize {
        self.iter().filter(|c| c.is_collected()).count()
    }

    pub fn update(&mut self, ctx: &mut SimContext, dt: f32) -> Result<(), PhysicsError> {
        for coin in self.iter_mut() {
            coin.update(ctx, dt)?;
        }
        Ok(())
    }

    /// Empty every slot, returning the coins for teardown.
    pub fn drain(&mut self) -> Vec<Coin> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::game::GameConfig;

    #[test]
    fn board_is_fixed_size() {
        let mut board = CoinBoard::new(2);
        assert_eq!(board.insert(Coin::new(GameObject::new(EntityId(1)))).unwrap(), 0);
        assert_eq!(board.insert(Coin::new(GameObject::new(EntityId(2)))).unwrap(), 1);
        let rejected = board.insert(Coin::new(GameObject::new(EntityId(3)))).unwrap_err();
        assert_eq!(rejected.id(), EntityId(3));
        assert_eq!(board.slot_of(EntityId(2)), Some(1));
        assert_eq!(board.slot_of(EntityId(3)), None);
    }

    #[test]
    fn collect_is_idempotent() {
        let mut board = CoinBoard::new(1);
        board.insert(Coin::new(GameObject::new(EntityId(1)))).unwrap();
        assert!(!board.is_collected(0));
        assert!(board.collect(0));
        assert!(!board.collect(0));
        assert!(board.is_collected(0));
        assert!(!board.collect(5));
        assert_eq!(board.collected_count(), 1);
    }

    #[test]
    fn removal_is_deferred_to_update() {
        let mut ctx = SimContext::new(GameConfig::default());
        let coin = Coin::spawn(&mut ctx, Vec3::new(0.0, 1.0, 0.0), None).unwrap();
        let id = coin.id();
        let mut board = CoinBoard::new(4);
        let slot = board.insert(coin).unwrap();

        board.collect(slot);
        assert_eq!(ctx.physics.body_count(), 1, "collect alone must not touch physics");
        assert!(!board.get(slot).unwrap().is_removed());

        board.update(&mut ctx, 1.0 / 60.0).unwrap();
        assert_eq!(ctx.physics.body_count(), 0);
        assert_eq!(ctx.registry.tag(id), None);
        let coin = board.get(slot).unwrap();
        assert!(coin.is_removed() && coin.is_collected());
        assert!(!coin.object.active);
    }

    #[test]
    fn live_coins_spin_with_their_trigger() {
        let mut ctx = SimContext::new(GameConfig::default());
        let mut coin = Coin::spawn(&mut ctx, Vec3::ZERO, None).unwrap();
        coin.update(&mut ctx, 0.5).unwrap();
        let expected = Quat::from_rotation_y(Coin::SPIN_SPEED * 0.5);
        assert!(coin.object.transform.rotation.abs_diff_eq(expected, 1e-5));
        let (_, rot) = ctx.physics.body_pose(&coin.object.body.as_ref().unwrap().body).unwrap();
        assert!(rot.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn drain_empties_the_board() {
        let mut board = CoinBoard::new(3);
        board.insert(Coin::new(GameObject::new(EntityId(1)))).unwrap();
        assert_eq!(board.drain().len(), 1);
        assert_eq!(board.count(), 0);
        assert_eq!(board.capacity(), 3);
    }
}
