/*
 * Reina
 * Copyright (c) 2020  ThoughtWorks, Inc.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use std::time::Instant;

use ndarray::Array3;

use crate::config::Config;
use crate::context::Context;
use crate::errors::SimulationError;
use crate::listeners::{Listener, Listeners};
use crate::models::custom_types::{Count, Day};
use crate::models::events::{DayState, POP_ATTRS};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The step callback asked to stop; the collected days are still valid.
    Interrupted,
}

pub struct SimulationOutput {
    pub outcome: RunOutcome,
    /// One record per completed day.
    pub days: Vec<DayState>,
    /// day x population attribute x age group.
    pub by_age_group: Array3<Count>,
    pub age_group_labels: Vec<String>,
}

/// Owns a Context and drives it for the configured horizon, feeding
/// listeners and the caller's step callback along the way.
pub struct Epidemiology {
    pub context: Context,
    simulation_days: Day,
}

impl Epidemiology {
    pub fn new(config: &Config) -> Result<Epidemiology, SimulationError> {
        let context = Context::new(config)?;
        Ok(Epidemiology { context, simulation_days: config.simulation_days })
    }

    pub fn run(&mut self, listeners: &mut Listeners) -> SimulationOutput {
        self.run_with_callback(listeners, |_| true)
    }

    /// The callback sees all days completed so far after every day and can
    /// cancel the run by returning false.
    pub fn run_with_callback<F>(&mut self, listeners: &mut Listeners, mut step_callback: F) -> SimulationOutput
    where
        F: FnMut(&[DayState]) -> bool,
    {
        let start_time = Instant::now();
        let mut days: Vec<DayState> = Vec::with_capacity(self.simulation_days as usize);
        let mut outcome = RunOutcome::Completed;
        let mut interventions_reported = 0;

        for day in 0..self.simulation_days {
            self.context.iterate();
            let state = self.context.generate_state();

            let applied = self.context.applied_interventions();
            for (applied_day, intervention) in &applied[interventions_reported..] {
                listeners.intervention_applied(*applied_day, intervention);
            }
            interventions_reported = applied.len();

            listeners.day_completed(&state);
            if (day + 1) % 30 == 0 {
                state.log();
            }
            days.push(state);

            if !step_callback(&days) {
                info!("Simulation interrupted after day {}", day);
                outcome = RunOutcome::Interrupted;
                break;
            }
        }

        info!("Simulated {} days in {:.2} seconds", days.len(), start_time.elapsed().as_secs_f32());
        listeners.simulation_ended();

        let age_group_labels = self.context.population.age_groups.labels.clone();
        let by_age_group = build_age_group_tensor(&days, age_group_labels.len());
        SimulationOutput { outcome, days, by_age_group, age_group_labels }
    }
}

fn build_age_group_tensor(days: &[DayState], groups: usize) -> Array3<Count> {
    let mut tensor = Array3::zeros((days.len(), POP_ATTRS.len(), groups));
    for (day, state) in days.iter().enumerate() {
        for attr in 0..POP_ATTRS.len() {
            for (group, value) in state.pop_attr(attr).iter().enumerate() {
                tensor[[day, attr, group]] = *value;
            }
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::config_fixture;

    #[test]
    fn runs_for_the_configured_horizon() {
        let config = config_fixture(100, 40);
        let mut epidemiology = Epidemiology::new(&config).unwrap();
        let output = epidemiology.run(&mut Listeners::none());

        assert_eq!(output.outcome, RunOutcome::Completed);
        assert_eq!(output.days.len(), 30);
        assert_eq!(output.by_age_group.shape(), &[30, POP_ATTRS.len(), 9]);
        assert_eq!(output.age_group_labels.len(), 9);
    }

    #[test]
    fn callback_cancellation_keeps_partial_results() {
        let config = config_fixture(100, 40);
        let mut epidemiology = Epidemiology::new(&config).unwrap();
        let output = epidemiology.run_with_callback(&mut Listeners::none(), |days| days.len() < 5);

        assert_eq!(output.outcome, RunOutcome::Interrupted);
        assert_eq!(output.days.len(), 5);
        assert_eq!(output.by_age_group.shape(), &[5, POP_ATTRS.len(), 9]);
    }
}
