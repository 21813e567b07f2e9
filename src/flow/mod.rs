//! Flow card registry: occupancy triggers and the is-occupied condition

use std::sync::Arc;

use crate::models::{keys, CapabilityValue, Side};
use crate::platform::{AutomationBus, CapabilityStore, TriggerCard};

/// Side-keyed trigger firing and condition evaluation, consumed by the
/// synchronizer and by the host automation engine.
pub struct FlowCardRegistry {
    store: Arc<dyn CapabilityStore>,
    bus: Arc<dyn AutomationBus>,
}

impl FlowCardRegistry {
    pub fn new(store: Arc<dyn CapabilityStore>, bus: Arc<dyn AutomationBus>) -> Self {
        Self { store, bus }
    }

    /// Fire the occupancy trigger for one side. Fired on every received
    /// occupancy event; transitions are the device's own edges, so this is
    /// not deduplicated against current capability values.
    pub fn trigger_occupancy_change(&self, side: Side, occupied: bool) {
        let card = if occupied {
            TriggerCard::BecameOccupied
        } else {
            TriggerCard::BecameUnoccupied
        };
        tracing::debug!("[Flow] Firing {} for side {}", card, side);
        self.bus.fire(card, side);
    }

    /// Trigger run-listener predicate: a firing matches a listener only on
    /// exact side equality. `either`/`both` do not subsume `left`/`right`.
    pub fn matches(args_side: Side, event_side: Side) -> bool {
        args_side == event_side
    }

    /// Condition evaluator over the current capability values.
    pub fn is_occupied(&self, side: Side) -> bool {
        let left = self.side_occupied(keys::PRESENCE_LEFT);
        let right = self.side_occupied(keys::PRESENCE_RIGHT);

        match side {
            Side::Left => left,
            Side::Right => right,
            Side::Either => left || right,
            Side::Both => left && right,
        }
    }

    /// Condition entry point for the host, which passes the side as a raw
    /// card argument. Unknown side values evaluate to false.
    pub fn evaluate_condition(&self, side_arg: &str) -> bool {
        match side_arg.parse::<Side>() {
            Ok(side) => self.is_occupied(side),
            Err(e) => {
                tracing::error!("[Flow] Condition with invalid side argument: {}", e);
                false
            }
        }
    }

    fn side_occupied(&self, key: &str) -> bool {
        matches!(self.store.get(key), Some(CapabilityValue::Bool(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryStore, RecordingBus};

    fn make_registry() -> (Arc<MemoryStore>, Arc<RecordingBus>, FlowCardRegistry) {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(RecordingBus::new());
        let registry = FlowCardRegistry::new(store.clone(), bus.clone());
        (store, bus, registry)
    }

    #[test]
    fn test_trigger_fires_matching_card() {
        let (_store, bus, registry) = make_registry();

        registry.trigger_occupancy_change(Side::Left, true);
        registry.trigger_occupancy_change(Side::Right, false);

        assert_eq!(
            bus.fired(),
            vec![
                (TriggerCard::BecameOccupied, Side::Left),
                (TriggerCard::BecameUnoccupied, Side::Right),
            ]
        );
    }

    #[test]
    fn test_match_is_exact() {
        assert!(FlowCardRegistry::matches(Side::Left, Side::Left));
        assert!(!FlowCardRegistry::matches(Side::Either, Side::Left));
        assert!(!FlowCardRegistry::matches(Side::Left, Side::Both));
    }

    #[test]
    fn test_condition_truth_table() {
        let (store, _bus, registry) = make_registry();

        for (left, right) in [(false, false), (true, false), (false, true), (true, true)] {
            store.set_raw(keys::PRESENCE_LEFT, CapabilityValue::Bool(left));
            store.set_raw(keys::PRESENCE_RIGHT, CapabilityValue::Bool(right));

            assert_eq!(registry.is_occupied(Side::Left), left);
            assert_eq!(registry.is_occupied(Side::Right), right);
            assert_eq!(registry.is_occupied(Side::Either), left || right);
            assert_eq!(registry.is_occupied(Side::Both), left && right);
        }
    }

    #[test]
    fn test_condition_with_unset_capabilities() {
        let (_store, _bus, registry) = make_registry();
        assert!(!registry.is_occupied(Side::Either));
        assert!(!registry.is_occupied(Side::Both));
    }

    #[test]
    fn test_condition_rejects_unknown_side() {
        let (store, _bus, registry) = make_registry();
        store.set_raw(keys::PRESENCE_LEFT, CapabilityValue::Bool(true));

        assert!(registry.evaluate_condition("left"));
        assert!(!registry.evaluate_condition("middle"));
        assert!(!registry.evaluate_condition(""));
    }
}
