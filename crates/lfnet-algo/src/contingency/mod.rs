//! Contingency and remedial-action application on a load-flow network.
//!
//! ## Key Concepts
//!
//! - **Contingency:** a set of branches lost at once. [`Contingency`] names
//!   them by id; [`LfContingency`] resolves the ids against one network and
//!   skips those that live elsewhere.
//!
//! - **Remedial action:** an operator move after the contingency (switch
//!   open/close, tap move, branch side connection). [`ActionSpec`] is the input
//!   record, [`LfAction`] the validated form.
//!
//! ## Algorithm
//!
//! [`ContingencyApplicator`] runs the contingency and the actions in two nested
//! connectivity frames, reads which buses and branches left or rejoined the
//! main component, closes both frames and writes the result as `disabled`
//! flags. The flags drive zero-impedance split and merge through the network
//! mutation API, so listeners observe the same events as for a manual change.
//!
//! [`ContingencyApplicator::evaluate`] rolls every touched element back after
//! handing the modified network to a caller closure.

pub mod action;
pub mod applicator;
pub mod model;

pub use action::{ActionSpec, LfAction};
pub use applicator::{ApplicationStage, Classification, ContingencyApplicator, ContingencyOutcome};
pub use model::{generate_n1, generate_n2, Contingency, LfContingency};
