//! Contingency screening with operator strategies.
//!
//! [`SecurityAnalysis::run`] probes every contingency on one network, one at
//! a time: apply, report, roll back. Each contingency is evaluated alone and
//! then once per [`OperatorStrategy`] attached to it. Independent networks
//! can be screened concurrently with [`SecurityAnalysis::run_parallel`].

use std::collections::BTreeSet;
use std::path::Path;

use lfnet_core::{BranchNum, BusNum, Diagnostics, LfNetwork, LossModel, TopoError, TopoResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::contingency::{
    ActionSpec, ApplicationStage, Classification, Contingency, ContingencyApplicator, ContingencyOutcome,
    LfAction, LfContingency,
};

/// Remedial actions to try after one contingency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStrategy {
    pub id: String,
    pub contingency_id: String,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// Screening input file: contingencies plus optional strategies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreeningInput {
    pub contingencies: Vec<Contingency>,
    #[serde(default)]
    pub strategies: Vec<OperatorStrategy>,
}

impl ScreeningInput {
    pub fn from_json_str(text: &str) -> TopoResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> TopoResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }
}

/// Configuration for security screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityAnalysisConfig {
    /// Validate the zero-impedance partition in every post-contingency state
    pub check_consistency: bool,
    /// Stop after this many contingencies (None = all)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_contingencies: Option<usize>,
}

impl Default for SecurityAnalysisConfig {
    fn default() -> Self {
        Self {
            check_consistency: true,
            max_contingencies: None,
        }
    }
}

/// Post-contingency topology of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyReport {
    pub contingency_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    pub stage: ApplicationStage,
    /// Bus ids de-energized by the contingency alone
    pub contingency_disabled_buses: Vec<String>,
    pub disabled_buses: Vec<String>,
    pub disabled_branches: Vec<String>,
    pub enabled_buses: Vec<String>,
    pub enabled_branches: Vec<String>,
    pub energized_buses: usize,
    pub zero_impedance_networks_ac: usize,
    pub zero_impedance_networks_dc: usize,
}

impl ContingencyReport {
    fn new(network: &LfNetwork, outcome: &ContingencyOutcome, strategy_id: Option<&str>) -> Self {
        let bus_ids = |nums: &BTreeSet<BusNum>| -> Vec<String> {
            nums.iter()
                .filter_map(|&num| network.bus(num))
                .map(|bus| bus.id().to_string())
                .collect()
        };
        let branch_ids = |nums: &BTreeSet<BranchNum>| -> Vec<String> {
            nums.iter()
                .filter_map(|&num| network.branch(num))
                .map(|branch| branch.id().to_string())
                .collect()
        };
        let zero_impedance =
            |model: LossModel| network.zero_impedance_networks(model).map_or(0, |networks| networks.len());
        let Classification {
            disabled_buses,
            disabled_branches,
            enabled_buses,
            enabled_branches,
        } = &outcome.classification;
        Self {
            contingency_id: outcome.contingency_id.clone(),
            strategy_id: strategy_id.map(str::to_string),
            stage: outcome.stage,
            contingency_disabled_buses: bus_ids(&outcome.contingency_stage.disabled_buses),
            disabled_buses: bus_ids(disabled_buses),
            disabled_branches: branch_ids(disabled_branches),
            enabled_buses: bus_ids(enabled_buses),
            enabled_branches: branch_ids(enabled_branches),
            energized_buses: network.buses().iter().filter(|bus| !bus.is_disabled()).count(),
            zero_impedance_networks_ac: zero_impedance(LossModel::Ac),
            zero_impedance_networks_dc: zero_impedance(LossModel::Dc),
        }
    }

    /// True when this evaluation leaves some bus de-energized.
    pub fn disconnects_buses(&self) -> bool {
        !self.disabled_buses.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SecurityAnalysisResults {
    pub reports: Vec<ContingencyReport>,
    /// Contingencies evaluated
    pub total_contingencies: usize,
    /// Strategy evaluations run
    pub total_strategies: usize,
    pub diagnostics: Diagnostics,
}

impl SecurityAnalysisResults {
    /// Reports of contingencies without actions.
    pub fn contingency_reports(&self) -> impl Iterator<Item = &ContingencyReport> {
        self.reports.iter().filter(|r| r.strategy_id.is_none())
    }

    pub fn strategy_reports(&self) -> impl Iterator<Item = &ContingencyReport> {
        self.reports.iter().filter(|r| r.strategy_id.is_some())
    }

    pub fn summary(&self) -> String {
        let disconnecting = self.contingency_reports().filter(|r| r.disconnects_buses()).count();
        let restored = self
            .strategy_reports()
            .filter(|r| !r.disconnects_buses())
            .count();
        format!(
            "Security screening: {}/{} contingencies disconnect buses, {}/{} strategies leave every bus energized ({})",
            disconnecting,
            self.total_contingencies,
            restored,
            self.total_strategies,
            self.diagnostics.summary()
        )
    }
}

pub struct SecurityAnalysis {
    config: SecurityAnalysisConfig,
}

impl SecurityAnalysis {
    pub fn new(config: SecurityAnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SecurityAnalysisConfig {
        &self.config
    }

    /// Screen `input` on one network. The network is left in its baseline
    /// state. An invariant violation aborts the run; the network should then
    /// be discarded.
    pub fn run(&self, network: &mut LfNetwork, input: &ScreeningInput) -> TopoResult<SecurityAnalysisResults> {
        let mut diagnostics = Diagnostics::new();

        // every action is validated before the first frame opens
        let mut strategies: Vec<(&OperatorStrategy, Vec<LfAction>)> = Vec::with_capacity(input.strategies.len());
        for strategy in &input.strategies {
            match LfAction::create_all(network, &strategy.actions, &mut diagnostics) {
                Ok(actions) => strategies.push((strategy, actions)),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(strategy = %strategy.id, error = %err, "strategy rejected");
                    diagnostics.add_topo_error("strategy", &err);
                }
            }
        }

        let limit = self.config.max_contingencies.unwrap_or(usize::MAX);
        let contingencies: Vec<LfContingency> = input
            .contingencies
            .iter()
            .take(limit)
            .map(|c| LfContingency::create(network, c, &mut diagnostics))
            .collect();

        let mut connectivity = network.create_connectivity()?;
        let mut applicator = ContingencyApplicator::new(connectivity.as_mut());
        let mut results = SecurityAnalysisResults {
            total_contingencies: contingencies.len(),
            ..SecurityAnalysisResults::default()
        };

        for contingency in &contingencies {
            results
                .reports
                .push(self.evaluate(&mut applicator, network, contingency, &[], None)?);
            for (strategy, actions) in strategies
                .iter()
                .filter(|(s, _)| s.contingency_id == contingency.id())
            {
                results.reports.push(self.evaluate(
                    &mut applicator,
                    network,
                    contingency,
                    actions,
                    Some(strategy.id.as_str()),
                )?);
                results.total_strategies += 1;
            }
        }

        results.diagnostics = diagnostics;
        tracing::info!("{}", results.summary());
        Ok(results)
    }

    fn evaluate(
        &self,
        applicator: &mut ContingencyApplicator<'_>,
        network: &mut LfNetwork,
        contingency: &LfContingency,
        actions: &[LfAction],
        strategy_id: Option<&str>,
    ) -> TopoResult<ContingencyReport> {
        let check = self.config.check_consistency;
        let (_, report) = applicator.evaluate(network, contingency, actions, |network, outcome| {
            if check {
                network.check_consistency()?;
            }
            Ok::<_, TopoError>(ContingencyReport::new(network, outcome, strategy_id))
        })?;
        let mut report = report?;
        report.stage = ApplicationStage::RolledBack;
        if check {
            network.check_consistency()?;
        }
        Ok(report)
    }

    /// Screen several independent networks concurrently, each with its own
    /// tracker. Results come back in input order.
    pub fn run_parallel(
        &self,
        networks: Vec<LfNetwork>,
        input: &ScreeningInput,
    ) -> TopoResult<Vec<SecurityAnalysisResults>> {
        networks
            .into_par_iter()
            .map(|mut network| self.run(&mut network, input))
            .collect()
    }

    /// Like [`run_parallel`](Self::run_parallel), with one input per network.
    pub fn run_batch(&self, jobs: Vec<(LfNetwork, ScreeningInput)>) -> TopoResult<Vec<SecurityAnalysisResults>> {
        jobs.into_par_iter()
            .map(|(mut network, input)| self.run(&mut network, &input))
            .collect()
    }
}
