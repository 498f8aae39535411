//! Contact/trigger event routing.
//!
//! Rapier calls the router synchronously from inside `PhysicsWorld::step`.
//! The router only gets shared access to the registry and the coin board and
//! writes nothing but its own [`StepOutcome`]; the level applies the outcome
//! once the step has returned.

use std::collections::HashMap;
use std::sync::Mutex;

use rapier3d::prelude::*;

use crate::api::types::EntityId;
use crate::components::body::BodyTag;
use crate::core::physics::collider_owner;
use crate::game::coin::CoinBoard;

/// Tag lookup for every live body, keyed by the id stored in its user-data.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    tags: HashMap<EntityId, BodyTag>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: EntityId, tag: BodyTag) {
        self.tags.insert(id, tag);
    }

    pub fn unregister(&mut self, id: EntityId) -> Option<BodyTag> {
        self.tags.remove(&id)
    }

    pub fn tag(&self, id: EntityId) -> Option<BodyTag> {
        self.tags.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

/// Everything the callbacks of one step decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// The player touched ground this step.
    pub grounded: bool,
    /// Coin board slots newly entered by the player, each at most once.
    pub collected: Vec<usize>,
    /// The player entered a piston trigger.
    pub die: bool,
}

/// Physics event handler translating raw collider pairs into gameplay facts.
pub struct ContactRouter<'a> {
    registry: &'a BodyRegistry,
    coins: &'a CoinBoard,
    outcome: Mutex<StepOutcome>,
}

impl<'a> ContactRouter<'a> {
    pub fn new(registry: &'a BodyRegistry, coins: &'a CoinBoard) -> Self {
        Self {
            registry,
            coins,
            outcome: Mutex::new(StepOutcome::default()),
        }
    }

    /// Two solid bodies touch. Grounds the player when the other one is ground.
    pub fn on_contact(&self, a: EntityId, b: EntityId) {
        let (Some(ta), Some(tb)) = (self.registry.tag(a), self.registry.tag(b)) else {
            return;
        };
        let grounded = (ta.player && tb.ground) || (tb.player && ta.ground);
        if grounded {
            self.with_outcome(|o| o.grounded = true);
        }
    }

    /// `other` started overlapping `trigger`. Only the player sets anything off.
    pub fn on_trigger(&self, trigger: EntityId, other: EntityId) {
        let (Some(tt), Some(to)) = (self.registry.tag(trigger), self.registry.tag(other)) else {
            return;
        };
        if !to.player {
            return;
        }
        if tt.coin {
            let Some(slot) = self.coins.slot_of(trigger) else {
                return;
            };
            if self.coins.is_collected(slot) {
                return;
            }
            self.with_outcome(|o| {
                if !o.collected.contains(&slot) {
                    o.collected.push(slot);
                }
            });
        }
        if tt.piston_trigger {
            self.with_outcome(|o| o.die = true);
        }
    }

    pub fn outcome(&self) -> StepOutcome {
        match self.outcome.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn into_outcome(self) -> StepOutcome {
        self.outcome.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_outcome(&self, f: impl FnOnce(&mut StepOutcome)) {
        let mut guard = match self.outcome.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}

impl EventHandler for ContactRouter<'_> {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if !event.started() {
            return;
        }
        let (h1, h2) = (event.collider1(), event.collider2());
        let (Some(a), Some(b)) = (collider_owner(colliders, h1), collider_owner(colliders, h2)) else {
            return;
        };
        if event.sensor() {
            let first_is_trigger = colliders.get(h1).is_some_and(|c| c.is_sensor());
            if first_is_trigger {
                self.on_trigger(a, b);
            } else {
                self.on_trigger(b, a);
            }
        } else {
            self.on_contact(a, b);
        }
    }

    // Emitted every step a reporting collider is in contact, which is what
    // keeps the player grounded while standing still.
    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
        if !contact_pair.has_any_active_contact {
            return;
        }
        if let (Some(a), Some(b)) = (
            collider_owner(colliders, contact_pair.collider1),
            collider_owner(colliders, contact_pair.collider2),
        ) {
            self.on_contact(a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::game::GameConfig;
    use crate::api::game::SimContext;
    use crate::components::entity::GameObject;
    use crate::core::physics::{BodyDesc, ColliderShape};
    use crate::core::transform::Transform;
    use crate::game::coin::Coin;
    use glam::Vec3;

    const PLAYER: EntityId = EntityId(1);
    const FLOOR: EntityId = EntityId(2);
    const COIN: EntityId = EntityId(3);
    const PISTON: EntityId = EntityId(4);
    const CRATE: EntityId = EntityId(5);

    fn registry() -> BodyRegistry {
        let mut registry = BodyRegistry::new();
        registry.register(PLAYER, BodyTag::player());
        registry.register(FLOOR, BodyTag::ground());
        registry.register(COIN, BodyTag::coin());
        registry.register(PISTON, BodyTag::piston_trigger());
        registry.register(CRATE, BodyTag::prop());
        registry
    }

    fn board_with_coin() -> CoinBoard {
        let mut board = CoinBoard::new(4);
        board.insert(Coin::new(GameObject::new(COIN))).unwrap();
        board
    }

    #[test]
    fn ground_contact_in_either_order_grounds_the_player() {
        let registry = registry();
        let coins = CoinBoard::new(1);
        let router = ContactRouter::new(&registry, &coins);
        router.on_contact(FLOOR, PLAYER);
        assert!(router.outcome().grounded);

        let router = ContactRouter::new(&registry, &coins);
        router.on_contact(PLAYER, CRATE);
        assert!(router.outcome().grounded);
    }

    #[test]
    fn non_player_contacts_change_nothing() {
        let registry = registry();
        let coins = CoinBoard::new(1);
        let router = ContactRouter::new(&registry, &coins);
        router.on_contact(CRATE, FLOOR);
        router.on_contact(PLAYER, EntityId(99));
        assert_eq!(router.into_outcome(), StepOutcome::default());
    }

    #[test]
    fn coin_counts_once_per_step() {
        let registry = registry();
        let coins = board_with_coin();
        let router = ContactRouter::new(&registry, &coins);
        router.on_trigger(COIN, PLAYER);
        router.on_trigger(COIN, PLAYER);
        assert_eq!(router.into_outcome().collected, vec![0]);
    }

    #[test]
    fn collected_coin_is_ignored() {
        let registry = registry();
        let mut coins = board_with_coin();
        assert!(coins.collect(0));
        let router = ContactRouter::new(&registry, &coins);
        router.on_trigger(COIN, PLAYER);
        assert!(router.into_outcome().collected.is_empty());
    }

    #[test]
    fn only_the_player_triggers() {
        let registry = registry();
        let coins = board_with_coin();
        let router = ContactRouter::new(&registry, &coins);
        router.on_trigger(COIN, CRATE);
        router.on_trigger(PISTON, CRATE);
        assert_eq!(router.into_outcome(), StepOutcome::default());
    }

    #[test]
    fn piston_trigger_kills() {
        let registry = registry();
        let coins = CoinBoard::new(1);
        let router = ContactRouter::new(&registry, &coins);
        router.on_trigger(PISTON, PLAYER);
        assert!(router.into_outcome().die);
    }

    #[test]
    fn routes_real_physics_events() {
        let mut ctx = SimContext::new(GameConfig::default());
        let floor = BodyDesc::fixed(ColliderShape::Cuboid {
            half_extents: Vec3::new(5.0, 0.5, 5.0),
        });
        ctx.spawn_body(FLOOR, &Transform::from_position(Vec3::new(0.0, -0.5, 0.0)), floor, BodyTag::ground())
            .unwrap();
        let coin = BodyDesc::trigger(ColliderShape::Cuboid { half_extents: Vec3::splat(0.3) });
        ctx.spawn_body(COIN, &Transform::from_position(Vec3::new(0.0, 0.5, 0.0)), coin, BodyTag::coin())
            .unwrap();
        let player = BodyDesc::dynamic(ColliderShape::Cuboid { half_extents: Vec3::new(0.2, 0.45, 0.2) })
            .with_upright(true)
            .with_contact_reports(true);
        ctx.spawn_body(PLAYER, &Transform::from_position(Vec3::new(0.0, 0.6, 0.0)), player, BodyTag::player())
            .unwrap();

        let mut coins = CoinBoard::new(1);
        coins.insert(Coin::new(GameObject::new(COIN))).unwrap();

        let mut grounded = false;
        let mut collected = Vec::new();
        for _ in 0..60 {
            let router = ContactRouter::new(&ctx.registry, &coins);
            ctx.physics.step(&router);
            let outcome = router.into_outcome();
            grounded |= outcome.grounded;
            collected.extend(outcome.collected);
        }
        assert!(grounded, "player resting on the floor must be grounded");
        assert_eq!(collected, vec![0], "coin overlap starts exactly once");
    }
}
