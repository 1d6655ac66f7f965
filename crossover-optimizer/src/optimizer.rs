//! Grid search over crossover parameters, maximizing the Sharpe ratio.

use common::{
    BacktestError, BacktestResult, BacktestSettings, Bar, OptimizerSettings, ParameterGrid,
    Result, StrategyParameters, TrialBudgetPolicy,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::engine::BacktestEngine;

/// Best run found for one price series
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub best: BacktestResult,
    pub trials_run: usize,
}

pub struct Optimizer {
    grid: ParameterGrid,
    settings: OptimizerSettings,
    backtest: BacktestSettings,
}

impl Optimizer {
    pub fn new(grid: ParameterGrid, settings: OptimizerSettings, backtest: BacktestSettings) -> Self {
        Self {
            grid,
            settings,
            backtest,
        }
    }

    /// Combinations that will actually be simulated, in evaluation order.
    ///
    /// With a budget smaller than the candidate pool, the pool is sampled
    /// without replacement from a `StdRng` seeded by `settings.seed`.
    pub fn trial_plan(&self) -> Vec<StrategyParameters> {
        let pool = match self.settings.budget_policy {
            TrialBudgetPolicy::SkipInfeasible => self.grid.feasible_combinations(),
            TrialBudgetPolicy::CountInfeasible => self.grid.combinations(),
        };

        let budget = self.settings.max_trials;
        let sampled = if budget == 0 || budget >= pool.len() {
            pool
        } else {
            let mut rng = StdRng::seed_from_u64(self.settings.seed);
            pool.choose_multiple(&mut rng, budget).copied().collect()
        };

        sampled
            .into_iter()
            .filter(StrategyParameters::is_feasible)
            .collect()
    }

    /// Simulate every planned combination and keep the highest Sharpe ratio
    pub fn optimize(&self, bars: &[Bar]) -> Result<OptimizationOutcome> {
        let plan = self.trial_plan();
        if plan.is_empty() {
            return Err(BacktestError::NoFeasibleParameters);
        }

        let mut best: Option<BacktestResult> = None;
        let mut trials_run = 0;

        for params in plan {
            let result = BacktestEngine::new(params, self.backtest.clone())?.run(bars);
            trials_run += 1;

            let sharpe = result.metrics.sharpe_ratio;
            debug!(
                fast = params.fast_window,
                slow = params.slow_window,
                stop_loss = params.stop_loss_pct,
                take_profit = params.take_profit_pct,
                sharpe,
                trades = result.trades.len(),
                "trial"
            );

            let improves = match &best {
                None => !sharpe.is_nan(),
                Some(current) => sharpe > current.metrics.sharpe_ratio,
            };
            if improves {
                best = Some(result);
            }
        }

        let best = best.ok_or(BacktestError::NoFeasibleParameters)?;
        Ok(OptimizationOutcome { best, trials_run })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate_noise_bars, generate_trending_bars};

    fn optimizer(grid: ParameterGrid, max_trials: usize, policy: TrialBudgetPolicy) -> Optimizer {
        let settings = OptimizerSettings {
            max_trials,
            budget_policy: policy,
            ..Default::default()
        };
        Optimizer::new(grid, settings, BacktestSettings::default())
    }

    #[test]
    fn test_plan_never_contains_infeasible() {
        for policy in [TrialBudgetPolicy::SkipInfeasible, TrialBudgetPolicy::CountInfeasible] {
            let plan = optimizer(ParameterGrid::default(), 50, policy).trial_plan();
            assert!(plan.iter().all(|p| p.fast_window < p.slow_window));
        }
    }

    #[test]
    fn test_skip_infeasible_fills_budget() {
        let plan = optimizer(ParameterGrid::default(), 50, TrialBudgetPolicy::SkipInfeasible)
            .trial_plan();
        assert_eq!(plan.len(), 50);
    }

    #[test]
    fn test_count_infeasible_consumes_budget() {
        // Half the combinations are infeasible, so a full-grid budget keeps only the feasible half
        let grid = ParameterGrid {
            fast_windows: vec![5, 30],
            slow_windows: vec![20],
            stop_loss_pcts: vec![0.01],
            take_profit_pcts: vec![0.03],
        };
        let plan = optimizer(grid.clone(), 2, TrialBudgetPolicy::CountInfeasible).trial_plan();
        assert_eq!(plan.len(), 1);

        let plan = optimizer(grid, 1, TrialBudgetPolicy::SkipInfeasible).trial_plan();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].fast_window, 5);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let a = optimizer(ParameterGrid::default(), 20, TrialBudgetPolicy::SkipInfeasible);
        let b = optimizer(ParameterGrid::default(), 20, TrialBudgetPolicy::SkipInfeasible);
        assert_eq!(a.trial_plan(), b.trial_plan());
    }

    #[test]
    fn test_unlimited_budget_runs_whole_grid() {
        let plan = optimizer(ParameterGrid::default(), 0, TrialBudgetPolicy::SkipInfeasible)
            .trial_plan();
        assert_eq!(plan.len(), 342);
    }

    #[test]
    fn test_no_feasible_parameters() {
        let grid = ParameterGrid {
            fast_windows: vec![50],
            slow_windows: vec![20, 30],
            ..Default::default()
        };
        let bars = generate_trending_bars(100, 100.0);
        let err = optimizer(grid, 50, TrialBudgetPolicy::SkipInfeasible)
            .optimize(&bars)
            .unwrap_err();
        assert!(matches!(err, BacktestError::NoFeasibleParameters));
    }

    #[test]
    fn test_finds_best_on_uptrend() {
        let bars = generate_trending_bars(200, 100.0);
        let outcome = optimizer(ParameterGrid::default(), 0, TrialBudgetPolicy::SkipInfeasible)
            .optimize(&bars)
            .unwrap();

        assert_eq!(outcome.trials_run, 342);
        assert!(outcome.best.metrics.sharpe_ratio > 1.0);
        assert_eq!(outcome.best.params.fast_window, 5);
        assert_eq!(outcome.best.params.slow_window, 20);
    }

    #[test]
    fn test_noise_stays_below_threshold() {
        let bars = generate_noise_bars(200, 7);
        let outcome = optimizer(ParameterGrid::default(), 0, TrialBudgetPolicy::SkipInfeasible)
            .optimize(&bars)
            .unwrap();

        assert!(outcome.best.metrics.sharpe_ratio <= 1.0);
    }
}
