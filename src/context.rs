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

use chrono::NaiveDate;
use fxhash::FxHashSet;

use crate::config::{Config, InitialCondition};
use crate::disease::Disease;
use crate::disease_state_machine::SymptomSeverity;
use crate::errors::SimulationError;
use crate::healthcare::{HealthcareSystem, TestingMode};
use crate::interventions::{Intervention, InterventionStore};
use crate::models::constants;
use crate::models::custom_types::{Age, Count, Day};
use crate::models::events::DayState;
use crate::population::Population;
use crate::utils::RandomWrapper;

/// Per-day effect derived from a weekly intervention.
#[derive(Clone, Debug)]
enum DailyAction {
    Vaccinate { amount: Count, min_age: Option<Age>, max_age: Option<Age> },
    ImportInfections { amount: Count, variant_weights: Vec<f64> },
}

/// Samples returned by the parameter inspection interface.
#[derive(Clone, Debug)]
pub enum ModelSample {
    Durations(Vec<Day>),
    Severities(Vec<SymptomSeverity>),
    Contacts(Vec<Count>),
    Infectiousness(Vec<(i32, f64)>),
}

/// Top-level aggregate that owns every engine component and drives one
/// simulated day at a time.
pub struct Context {
    pub population: Population,
    pub healthcare: HealthcareSystem,
    pub disease: Disease,
    pub rng: RandomWrapper,
    pub day: Day,
    pub start_date: NaiveDate,
    interventions: InterventionStore,
    scheduled_actions: Vec<(Day, DailyAction)>,
    applied_log: Vec<(Day, Intervention)>,
    exposed_per_day: Count,
    ct_cases_per_day: Count,
    tests_run_per_day: Count,
    total_infectors: Count,
    total_infections: Count,
}

impl Context {
    pub fn new(config: &Config) -> Result<Context, SimulationError> {
        config.validate()?;
        let disease = Disease::from_config(&config.disease, config.max_age)?;
        let population = Population::new(config)?;
        let healthcare = HealthcareSystem::new(config.hospital_beds, config.icu_units);
        let rng = RandomWrapper::seeded(config.random_seed);

        let mut context = Context {
            population,
            healthcare,
            disease,
            rng,
            day: 0,
            start_date: config.start_date,
            interventions: InterventionStore::new(),
            scheduled_actions: Vec::new(),
            applied_log: Vec::new(),
            exposed_per_day: 0,
            ct_cases_per_day: 0,
            tests_run_per_day: 0,
            total_infectors: 0,
            total_infections: 0,
        };

        context.apply_initial_condition(&config.initial_population_condition)?;

        for entry in &config.interventions {
            entry.intervention.validate()?;
            context.check_variant_names(&entry.intervention)?;
            let offset = (entry.date - config.start_date).num_days().max(0) as Day;
            context.interventions.add(offset, entry.intervention.clone());
        }

        Ok(context)
    }

    fn check_variant_names(&self, intervention: &Intervention) -> Result<(), SimulationError> {
        let unknown = |name: &str| SimulationError::InvalidConfig(format!("unknown disease variant: {}", name));
        match intervention {
            Intervention::ImportInfections { variant: Some(name), .. } => {
                self.disease.get_variant_index(name).map(|_| ()).ok_or_else(|| unknown(name))
            }
            Intervention::ImportInfectionsWeekly { variant_shares, .. } => {
                for (name, _) in variant_shares {
                    self.disease.get_variant_index(name).ok_or_else(|| unknown(name))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn apply_initial_condition(&mut self, condition: &InitialCondition) -> Result<(), SimulationError> {
        let seeded_total = condition.dead
            + condition.recovered
            + condition.in_icu
            + condition.in_ward
            + condition.incubating
            + condition.ill;
        if seeded_total as usize > self.population.size() {
            return Err(SimulationError::InvalidConfig(
                "initial population condition seeds more people than exist".to_string(),
            ));
        }
        let pick = |ctx: &mut Context, weighted: bool| {
            ctx.population
                .pick_random_susceptible(weighted, &mut ctx.rng)
                .ok_or_else(|| SimulationError::InvalidConfig("not enough susceptible people to seed".to_string()))
        };

        for _ in 0..condition.dead {
            let idx = pick(self, false)?;
            self.population.seed_dead(idx);
        }
        for _ in 0..condition.recovered {
            let idx = pick(self, false)?;
            self.population.seed_recovered(idx);
        }
        for _ in 0..condition.in_icu {
            let idx = pick(self, true)?;
            if !self.healthcare.allocate_icu_unit() {
                return Err(SimulationError::InvalidConfig("initial in_icu exceeds ICU capacity".to_string()));
            }
            let days = self.disease.get_icu_days(&mut self.rng);
            self.population.seed_in_icu(idx, days);
        }
        for _ in 0..condition.in_ward {
            let idx = pick(self, true)?;
            if !self.healthcare.allocate_bed() {
                return Err(SimulationError::InvalidConfig("initial in_ward exceeds hospital beds".to_string()));
            }
            let days = self.disease.get_ward_days(SymptomSeverity::Severe, &mut self.rng);
            self.population.seed_in_ward(idx, SymptomSeverity::Severe, days);
        }
        for _ in 0..condition.incubating {
            let idx = pick(self, true)?;
            let days = self.disease.get_incubation_days(&mut self.rng);
            self.population.seed_incubating(idx, days);
        }
        for _ in 0..condition.ill {
            let idx = pick(self, true)?;
            let age = self.population.person(idx).age;
            let severity = self.disease.get_symptom_severity(age, &mut self.rng);
            let days = self.disease.get_illness_days(severity, &mut self.rng);
            self.population.seed_ill(idx, severity, days);
        }

        // part of the seeded active cases is already known to the system
        let hospital_confirmed = condition.in_ward + condition.in_icu;
        let mut remaining = condition.confirmed_cases.saturating_sub(hospital_confirmed);
        for idx in 0..self.population.size() {
            if remaining == 0 {
                break;
            }
            let person = self.population.person(idx);
            if person.is_infected() && !person.was_detected {
                self.population.detect_at(idx);
                remaining -= 1;
            }
        }
        Ok(())
    }

    /// Advance the simulation by one day: interventions first, then the
    /// tests queued yesterday, then every infected person.
    pub fn iterate(&mut self) {
        self.population.reset_daily_tallies();
        self.exposed_per_day = 0;
        self.ct_cases_per_day = 0;
        self.tests_run_per_day = 0;
        self.total_infectors = 0;
        self.total_infections = 0;

        // People infected during today's imports or exposures start their
        // own course tomorrow.
        let infected_at_day_start: Vec<usize> =
            (0..self.population.size()).filter(|idx| self.population.person(*idx).is_infected()).collect();

        self.apply_due_interventions();
        self.process_testing();

        for idx in infected_at_day_start {
            if !self.population.person(idx).is_infected() {
                continue;
            }
            let mut person = self.population.take_person(idx);
            person.advance(self);
            self.exposed_per_day += person.other_people_exposed_today;
            if person.state_machine.is_ill() {
                self.total_infectors += 1;
                self.total_infections += person.other_people_infected;
            }
            self.population.put_person(idx, person);
        }

        self.population.assert_conservation();
        self.day += 1;
    }

    fn apply_due_interventions(&mut self) {
        for intervention in self.interventions.take_due(self.day) {
            self.apply_intervention(&intervention);
            self.applied_log.push((self.day, intervention));
        }

        let mut due_actions = Vec::new();
        let mut idx = 0;
        while idx < self.scheduled_actions.len() {
            if self.scheduled_actions[idx].0 <= self.day {
                due_actions.push(self.scheduled_actions.remove(idx).1);
            } else {
                idx += 1;
            }
        }
        for action in due_actions {
            self.apply_daily_action(action);
        }
    }

    fn apply_intervention(&mut self, intervention: &Intervention) {
        match intervention {
            Intervention::TestAllWithSymptoms => {
                self.healthcare.set_testing_mode(TestingMode::AllWithSymptoms, 0.0);
            }
            Intervention::TestOnlySevereSymptoms { mild_detection_rate } => {
                self.healthcare.set_testing_mode(TestingMode::OnlySevereSymptoms, mild_detection_rate / 100.0);
            }
            Intervention::TestWithContactTracing { efficiency } => {
                self.healthcare.set_testing_mode(TestingMode::AllWithContactTracing, efficiency / 100.0);
            }
            Intervention::LimitMobility { reduction, min_age, max_age, place } => {
                self.population.limit_mobility(reduction / 100.0, *min_age, *max_age, *place);
            }
            Intervention::WearMasks { share_of_contacts, min_age, max_age, place } => {
                self.population.set_mask_wearing(share_of_contacts / 100.0, *min_age, *max_age, *place);
            }
            Intervention::Vaccinate { weekly_vaccinations, min_age, max_age } => {
                for offset in 0..constants::DAYS_IN_WEEK {
                    let amount = split_weekly(*weekly_vaccinations, offset);
                    if amount > 0 {
                        self.scheduled_actions.push((
                            self.day + offset,
                            DailyAction::Vaccinate { amount, min_age: *min_age, max_age: *max_age },
                        ));
                    }
                }
            }
            Intervention::ImportInfections { amount, variant } => {
                let weights = self.one_hot_variant_weights(variant.as_deref());
                self.population.import_infections(*amount, &weights, &self.disease, &mut self.rng);
            }
            Intervention::ImportInfectionsWeekly { weekly_amount, variant_shares } => {
                let weights = self.shared_variant_weights(variant_shares);
                for offset in 0..constants::DAYS_IN_WEEK {
                    let amount = split_weekly(*weekly_amount, offset);
                    if amount > 0 {
                        self.scheduled_actions.push((
                            self.day + offset,
                            DailyAction::ImportInfections { amount, variant_weights: weights.clone() },
                        ));
                    }
                }
            }
            Intervention::BuildNewHospitalBeds { beds } => self.healthcare.add_beds(*beds),
            Intervention::BuildNewIcuUnits { units } => self.healthcare.add_icu_units(*units),
        }
    }

    fn apply_daily_action(&mut self, action: DailyAction) {
        match action {
            DailyAction::Vaccinate { amount, min_age, max_age } => {
                self.population.vaccinate(min_age, max_age, amount, &mut self.rng);
            }
            DailyAction::ImportInfections { amount, variant_weights } => {
                self.population.import_infections(amount, &variant_weights, &self.disease, &mut self.rng);
            }
        }
    }

    fn one_hot_variant_weights(&self, variant: Option<&str>) -> Vec<f64> {
        match variant {
            None => vec![1.0],
            Some(name) => {
                let idx = self.disease.get_variant_index(name).expect("variant names are validated at construction");
                let mut weights = vec![0.0; idx + 1];
                weights[idx] = 1.0;
                weights
            }
        }
    }

    fn shared_variant_weights(&self, shares: &[(String, f64)]) -> Vec<f64> {
        if shares.is_empty() {
            return vec![1.0];
        }
        let named_total: f64 = shares.iter().map(|(_, share)| share).sum();
        let top = shares
            .iter()
            .map(|(name, _)| self.disease.get_variant_index(name).expect("variant names are validated at construction"))
            .max()
            .unwrap_or(0);
        let mut weights = vec![0.0; top + 1];
        weights[0] = (100.0 - named_total).max(0.0);
        for (name, share) in shares {
            let idx = self.disease.get_variant_index(name).expect("variant names are validated at construction");
            weights[idx] = *share;
        }
        weights
    }

    /// Run the tests queued yesterday; contact tracing feeds the queue for
    /// tomorrow.
    fn process_testing(&mut self) {
        let queued = self.healthcare.drain_queue();
        self.tests_run_per_day = queued.len() as Count;
        for idx in queued {
            let idx = idx as usize;
            let mut person = self.population.take_person(idx);
            person.queued_for_testing = false;
            let infectious = person.is_infected()
                && self.disease.get_source_infectiousness(&person.state_machine) > 0.0;
            if infectious && !person.was_detected {
                self.population.detect(&mut person);
                self.ct_cases_per_day += 1;
            }
            self.population.put_person(idx, person);
            if self.healthcare.testing_mode() == TestingMode::AllWithContactTracing {
                self.perform_contact_tracing(idx);
            }
        }
    }

    /// BFS over the infection tree up to the tracing depth; every hop
    /// succeeds with the configured tracing efficiency. Found people are
    /// queued and tested the following day.
    fn perform_contact_tracing(&mut self, start: usize) {
        let success_rate = self.healthcare.contact_tracing_success_rate();
        let mut visited: FxHashSet<u32> = FxHashSet::default();
        visited.insert(start as u32);
        let mut frontier = vec![start as u32];

        for _ in 0..constants::CONTACT_TRACING_DEPTH {
            let mut next_frontier = Vec::new();
            for node in frontier {
                let neighbours: Vec<u32> = {
                    let person = self.population.person(node as usize);
                    person.infector.iter().copied().chain(person.infectees.iter().copied()).collect()
                };
                for neighbour in neighbours {
                    if visited.contains(&neighbour) {
                        continue;
                    }
                    if !self.rng.chance(success_rate) {
                        continue;
                    }
                    visited.insert(neighbour);
                    self.queue_for_testing(neighbour as usize);
                    next_frontier.push(neighbour);
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }
    }

    fn queue_for_testing(&mut self, idx: usize) {
        let mut person = self.population.take_person(idx);
        if !person.state_machine.is_deceased() && !person.was_detected && !person.queued_for_testing {
            person.queued_for_testing = true;
            self.healthcare.push_to_queue(idx as u32);
        }
        self.population.put_person(idx, person);
    }

    pub fn current_r(&self) -> f64 {
        if self.total_infectors == 0 {
            0.0
        } else {
            self.total_infections as f64 / self.total_infectors as f64
        }
    }

    /// Snapshot of every reported metric after `self.day` completed days.
    pub fn generate_state(&self) -> DayState {
        let population = &self.population;
        DayState {
            day: self.day,
            date: self.start_date + chrono::Duration::days(self.day as i64),
            susceptible: population.group_sums(&population.susceptible),
            vaccinated: population.group_sums(&population.vaccinated),
            infected: population.group_sums(&population.infected),
            detected: population.group_sums(&population.detected),
            all_detected: population.group_sums(&population.all_detected),
            in_ward: population.group_sums(&population.in_ward),
            in_icu: population.group_sums(&population.in_icu),
            dead: population.group_sums(&population.dead),
            non_hospital_deaths: population.group_sums(&population.non_hospital_deaths),
            recovered: population.group_sums(&population.recovered),
            all_infected: population.group_sums(&population.all_infected),
            new_infections: population.group_sums(&population.new_infections),
            exposed_per_day: self.exposed_per_day,
            available_hospital_beds: self.healthcare.available_beds(),
            available_icu_units: self.healthcare.available_icu_units(),
            total_icu_units: self.healthcare.icu_units(),
            ct_cases_per_day: self.ct_cases_per_day,
            r: self.current_r(),
            mobility_limitation: self.population.mobility_limitation(),
            daily_contacts: population.daily_contacts(),
        }
    }

    pub fn add_intervention(&mut self, date: NaiveDate, intervention: Intervention) -> Result<(), SimulationError> {
        intervention.validate()?;
        self.check_variant_names(&intervention)?;
        let offset = (date - self.start_date).num_days().max(0) as Day;
        self.interventions.add(offset, intervention);
        Ok(())
    }

    pub fn applied_interventions(&self) -> &[(Day, Intervention)] {
        &self.applied_log
    }

    pub fn tests_run_per_day(&self) -> Count {
        self.tests_run_per_day
    }

    /// Draw distributions of the model parameters without running a
    /// simulation, for inspection by external tooling.
    pub fn sample(
        &mut self,
        what: &str,
        age: Age,
        severity: Option<SymptomSeverity>,
    ) -> Result<ModelSample, SimulationError> {
        let samples = constants::SAMPLE_SIZE;
        let result = match what {
            "incubation_period" => {
                ModelSample::Durations((0..samples).map(|_| self.disease.get_incubation_days(&mut self.rng)).collect())
            }
            "illness_period" => {
                let severity = severity.unwrap_or(SymptomSeverity::Mild);
                ModelSample::Durations(
                    (0..samples).map(|_| self.disease.get_illness_days(severity, &mut self.rng)).collect(),
                )
            }
            "hospitalization_period" => {
                let severity = severity.unwrap_or(SymptomSeverity::Severe);
                ModelSample::Durations(
                    (0..samples).map(|_| self.disease.get_ward_days(severity, &mut self.rng)).collect(),
                )
            }
            "icu_period" => {
                ModelSample::Durations((0..samples).map(|_| self.disease.get_icu_days(&mut self.rng)).collect())
            }
            "symptom_severity" => ModelSample::Severities(
                (0..samples).map(|_| self.disease.get_symptom_severity(age, &mut self.rng)).collect(),
            ),
            "contacts_per_day" => {
                let mut draws = Vec::with_capacity(samples);
                for _ in 0..samples {
                    draws.push(self.population.contacts_per_day(
                        age,
                        None,
                        1.0,
                        constants::MAX_DAILY_CONTACTS,
                        &mut self.rng,
                    ));
                }
                ModelSample::Contacts(draws)
            }
            "infectiousness" => ModelSample::Infectiousness(self.disease.infectiousness_profile()),
            _ => return Err(SimulationError::InvalidConfig(format!("unknown sample target: {}", what))),
        };
        Ok(result)
    }
}

fn split_weekly(weekly: Count, offset: Day) -> Count {
    weekly / constants::DAYS_IN_WEEK + if offset < weekly % constants::DAYS_IN_WEEK { 1 } else { 0 }
}
