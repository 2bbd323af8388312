//! # lfnet-core: Load-Flow Network Topology Core
//!
//! In-memory bus/branch model of an electrical network, kept consistent under
//! repeated, reversible topology changes.
//!
//! ## Design Philosophy
//!
//! - **Dense numbering**: every bus and branch gets a 0-based `num` at
//!   construction, usable directly as an array offset and never reused.
//! - **Single mutation path**: element fields change only through
//!   [`LfNetwork`] setters, which notify [`NetworkListener`]s and keep the
//!   zero-impedance networks in sync.
//! - **Reversible probes**: a [`GraphConnectivity`] tracker answers which buses
//!   and branches leave or rejoin the main component inside nested,
//!   undoable frames.
//! - **Exact undo of element changes**: [`state`] captures restorable fields
//!   and replays them through the same setters.
//!
//! ## Quick Start
//!
//! ```rust
//! use lfnet_core::*;
//! use lfnet_core::slack::FirstBusSelector;
//!
//! let mut builder = LfNetworkBuilder::new();
//! for id in ["B1", "B2", "B3"] {
//!     builder.add_bus(BusSpec::new(id)).unwrap();
//! }
//! builder.add_branch(BranchSpec::line("L12", "B1", "B2", 0.01, 0.1)).unwrap();
//! let l23 = builder.add_branch(BranchSpec::line("L23", "B2", "B3", 0.01, 0.1)).unwrap();
//! let network = builder.build(TopologyConfig::default(), &FirstBusSelector).unwrap();
//!
//! let mut connectivity = network.create_connectivity().unwrap();
//! connectivity.start_temporary_changes();
//! connectivity.remove_edge(l23);
//! let lost = connectivity.vertices_removed_from_main_component();
//! assert_eq!(lost.len(), 1);
//! connectivity.undo_temporary_changes().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`element`] - Bus, branch and tap changer records
//! - [`builder`] - Network construction from loader records
//! - [`network`] - The [`LfNetwork`] container and mutation API
//! - [`connectivity`] - Main-component tracking with nested transactions
//! - [`zero_impedance`] - Zero-impedance sub-networks and their spanning trees
//! - [`state`] - Element-state snapshot/restore
//! - [`listener`] - Mutation notifications
//! - [`graph_utils`] - Topology statistics, islands, DOT export
//! - [`diagnostics`] - Recoverable input issues

pub mod builder;
pub mod config;
pub mod connectivity;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod graph_utils;
pub mod listener;
pub mod network;
pub mod slack;
pub mod snapshot;
pub mod state;
pub mod units;
pub mod zero_impedance;

pub use builder::{BranchSpec, BusSpec, CaseData, LfNetworkBuilder};
pub use config::{ConnectivityAlgorithm, SlackBusSelection, TopologyConfig};
pub use connectivity::{create_connectivity, GraphConnectivity};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use element::{
    Branch, BranchKind, BranchNum, Bus, BusNum, ElementRef, LossModel, Side, TapChanger, TapStep,
};
pub use error::{TopoError, TopoResult};
pub use graph_utils::{export_graph, find_islands, graph_stats, GraphStats, IslandAnalysis};
pub use listener::{NetworkListener, TracingListener};
pub use network::LfNetwork;
pub use snapshot::NetworkSnapshot;
pub use state::{BranchState, BusState, ElementKey, ElementState, NetworkState, RestorableState};
pub use units::{PerUnit, Radians};
pub use zero_impedance::{ZeroImpedanceNetwork, ZeroImpedanceNetworkId, ZeroImpedanceNetworks};
