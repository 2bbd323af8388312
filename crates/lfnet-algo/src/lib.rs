//! # lfnet-algo: contingency analysis on a load-flow topology
//!
//! Builds on [`lfnet_core`] to simulate branch outages and operator actions:
//!
//! - [`contingency`]: contingency and action models, their resolution against
//!   a network and the [`ContingencyApplicator`] state machine
//! - [`security`]: serialized screening of many contingencies on one network,
//!   with a rayon-parallel variant across independent networks
//!
//! ## Example
//!
//! ```
//! use lfnet_algo::{Contingency, ContingencyApplicator, LfContingency};
//! use lfnet_core::slack::FirstBusSelector;
//! use lfnet_core::{BranchSpec, BusSpec, Diagnostics, LfNetworkBuilder, TopologyConfig};
//!
//! let mut builder = LfNetworkBuilder::new();
//! builder.add_bus(BusSpec::new("B1"))?;
//! builder.add_bus(BusSpec::new("B2"))?;
//! builder.add_branch(BranchSpec::line("L12", "B1", "B2", 0.01, 0.1))?;
//! let mut network = builder.build(TopologyConfig::default(), &FirstBusSelector)?;
//!
//! let mut diagnostics = Diagnostics::new();
//! let contingency = LfContingency::create(&network, &Contingency::single("L12"), &mut diagnostics);
//! let mut connectivity = network.create_connectivity()?;
//! let mut applicator = ContingencyApplicator::new(connectivity.as_mut());
//! let (outcome, energized) = applicator.evaluate(&mut network, &contingency, &[], |network, _| {
//!     network.buses().iter().filter(|bus| !bus.is_disabled()).count()
//! })?;
//! assert_eq!(energized, 1);
//! assert_eq!(outcome.classification.disabled_buses.len(), 1);
//! assert!(network.disabled_buses().next().is_none());
//! # Ok::<(), lfnet_core::TopoError>(())
//! ```

pub mod contingency;
pub mod security;

pub use contingency::{
    generate_n1, generate_n2, ActionSpec, ApplicationStage, Classification, Contingency, ContingencyApplicator,
    ContingencyOutcome, LfAction, LfContingency,
};
pub use security::{
    ContingencyReport, OperatorStrategy, ScreeningInput, SecurityAnalysis, SecurityAnalysisConfig,
    SecurityAnalysisResults,
};
