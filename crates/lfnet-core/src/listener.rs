//! Network event notification.
//!
//! Listeners are owned by the [`crate::LfNetwork`] they observe and are called
//! synchronously, in registration order, in the order mutations happen. A
//! listener receives shared references only: it cannot mutate the network from
//! inside a callback.

use crate::element::{Branch, ElementRef, LossModel, Side};
use crate::units::{PerUnit, Radians};
use crate::zero_impedance::ZeroImpedanceNetwork;

/// Observer of network mutations. Every hook defaults to a no-op.
pub trait NetworkListener: Send {
    fn on_disable_change(&mut self, _element: ElementRef<'_>, _disabled: bool) {}

    fn on_tap_position_change(&mut self, _branch: &Branch, _old_position: usize, _new_position: usize) {}

    fn on_branch_connection_status_change(&mut self, _branch: &Branch, _side: Side, _connected: bool) {}

    fn on_voltage_change(&mut self, _element: ElementRef<'_>, _old: PerUnit, _new: PerUnit) {}

    fn on_angle_change(&mut self, _element: ElementRef<'_>, _old: Radians, _new: Radians) {}

    fn on_zero_impedance_network_split(
        &mut self,
        _model: LossModel,
        _original: &ZeroImpedanceNetwork,
        _parts: &[ZeroImpedanceNetwork],
    ) {
    }

    fn on_zero_impedance_network_merge(
        &mut self,
        _model: LossModel,
        _first: &ZeroImpedanceNetwork,
        _second: &ZeroImpedanceNetwork,
        _merged: &ZeroImpedanceNetwork,
    ) {
    }

    fn on_zero_impedance_network_spanning_tree_change(
        &mut self,
        _branch: &Branch,
        _model: LossModel,
        _spanning_tree_edge: bool,
    ) {
    }
}

/// Logs every notification through `tracing`.
#[derive(Debug, Default)]
pub struct TracingListener;

impl NetworkListener for TracingListener {
    fn on_disable_change(&mut self, element: ElementRef<'_>, disabled: bool) {
        tracing::debug!(kind = element.kind(), id = element.id(), disabled, "disable change");
    }

    fn on_tap_position_change(&mut self, branch: &Branch, old_position: usize, new_position: usize) {
        tracing::debug!(branch = branch.id(), old_position, new_position, "tap position change");
    }

    fn on_branch_connection_status_change(&mut self, branch: &Branch, side: Side, connected: bool) {
        tracing::debug!(branch = branch.id(), ?side, connected, "branch connection change");
    }

    fn on_voltage_change(&mut self, element: ElementRef<'_>, old: PerUnit, new: PerUnit) {
        tracing::trace!(id = element.id(), %old, %new, "voltage change");
    }

    fn on_angle_change(&mut self, element: ElementRef<'_>, old: Radians, new: Radians) {
        tracing::trace!(id = element.id(), %old, %new, "angle change");
    }

    fn on_zero_impedance_network_split(
        &mut self,
        model: LossModel,
        original: &ZeroImpedanceNetwork,
        parts: &[ZeroImpedanceNetwork],
    ) {
        tracing::debug!(
            %model,
            original = %original.id(),
            parts = parts.len(),
            "zero-impedance network split"
        );
    }

    fn on_zero_impedance_network_merge(
        &mut self,
        model: LossModel,
        first: &ZeroImpedanceNetwork,
        second: &ZeroImpedanceNetwork,
        merged: &ZeroImpedanceNetwork,
    ) {
        tracing::debug!(
            %model,
            first = %first.id(),
            second = %second.id(),
            merged = %merged.id(),
            "zero-impedance network merge"
        );
    }

    fn on_zero_impedance_network_spanning_tree_change(
        &mut self,
        branch: &Branch,
        model: LossModel,
        spanning_tree_edge: bool,
    ) {
        tracing::trace!(branch = branch.id(), %model, spanning_tree_edge, "spanning tree change");
    }
}
