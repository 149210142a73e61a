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

use crate::config::{expand_age_brackets, DiseaseParams};
use crate::disease_state_machine::{DiseaseStateMachine, State, SymptomSeverity};
use crate::errors::SimulationError;
use crate::models::constants;
use crate::models::custom_types::{Age, Day, Percentage};
use crate::utils::RandomWrapper;

/// Stateless disease policy: severity selection, stage durations, the
/// viral-load curve and death outcomes. All probabilities are fractions
/// here; the configuration carries them as percentages.
#[derive(Clone, Debug, PartialEq)]
pub struct Disease {
    susceptibility: Vec<Percentage>,
    p_symptomatic: Vec<Percentage>,
    p_severe: Vec<Percentage>,
    p_critical: Vec<Percentage>,
    p_fatal: Vec<Percentage>,
    p_death_outside_hospital: Vec<Percentage>,
    p_asymptomatic_infection: Percentage,
    infectiousness_multiplier: f64,
    p_mask_protects_wearer: Percentage,
    p_mask_protects_others: Percentage,
    p_hospital_death: Percentage,
    p_icu_death: Percentage,
    p_hospital_death_no_beds: Percentage,
    p_icu_death_no_beds: Percentage,
    mean_incubation_duration: f64,
    mean_duration_from_onset_to_death: f64,
    mean_duration_from_onset_to_recovery: f64,
    ratio_of_duration_before_hospitalisation: f64,
    ratio_of_duration_in_ward: f64,
    // viral load by day relative to symptom onset, dense over the support
    profile_first_day: i32,
    profile: Vec<f64>,
    variant_names: Vec<String>,
    variant_factors: Vec<f64>,
}

impl Disease {
    pub fn from_config(params: &DiseaseParams, max_age: Age) -> Result<Disease, SimulationError> {
        if params.infectiousness_profile.is_empty() {
            return Err(SimulationError::InvalidConfig("infectiousness_profile must not be empty".to_string()));
        }
        let first_day = params.infectiousness_profile.iter().map(|(d, _)| *d).min().unwrap();
        let last_day = params.infectiousness_profile.iter().map(|(d, _)| *d).max().unwrap();
        let mut profile = vec![0.0; (last_day - first_day + 1) as usize];
        for (day, load) in &params.infectiousness_profile {
            profile[(day - first_day) as usize] = *load;
        }

        // baseline variant at index 0, configured variants after it
        let mut variant_names = vec!["baseline".to_string()];
        let mut variant_factors = vec![1.0];
        for variant in &params.variants {
            variant_names.push(variant.name.clone());
            variant_factors.push(variant.infectiousness_factor);
        }

        Ok(Disease {
            susceptibility: expand_age_brackets(&params.p_susceptibility, max_age, 0.01)?,
            p_symptomatic: expand_age_brackets(&params.p_symptomatic, max_age, 0.01)?,
            p_severe: expand_age_brackets(&params.p_severe, max_age, 0.01)?,
            p_critical: expand_age_brackets(&params.p_critical, max_age, 0.01)?,
            p_fatal: expand_age_brackets(&params.p_fatal, max_age, 0.01)?,
            p_death_outside_hospital: expand_age_brackets(&params.p_death_outside_hospital, max_age, 0.01)?,
            p_asymptomatic_infection: params.p_asymptomatic_infection / 100.0,
            infectiousness_multiplier: params.infectiousness_multiplier,
            p_mask_protects_wearer: params.p_mask_protects_wearer / 100.0,
            p_mask_protects_others: params.p_mask_protects_others / 100.0,
            p_hospital_death: params.p_hospital_death / 100.0,
            p_icu_death: params.p_icu_death / 100.0,
            p_hospital_death_no_beds: params.p_hospital_death_no_beds / 100.0,
            p_icu_death_no_beds: params.p_icu_death_no_beds / 100.0,
            mean_incubation_duration: params.mean_incubation_duration,
            mean_duration_from_onset_to_death: params.mean_duration_from_onset_to_death,
            mean_duration_from_onset_to_recovery: params.mean_duration_from_onset_to_recovery,
            ratio_of_duration_before_hospitalisation: params.ratio_of_duration_before_hospitalisation / 100.0,
            ratio_of_duration_in_ward: params.ratio_of_duration_in_ward / 100.0,
            profile_first_day: first_day,
            profile,
            variant_names,
            variant_factors,
        })
    }

    pub fn get_susceptibility(&self, age: Age) -> Percentage {
        self.susceptibility[age]
    }

    /// Viral load the source sheds today, including the global multiplier,
    /// the variant factor and the asymptomatic discount. Zero outside the
    /// support of the profile and for isolated (hospitalized) cases.
    pub fn get_source_infectiousness(&self, machine: &DiseaseStateMachine) -> f64 {
        match machine.state {
            State::Incubation | State::Illness => {}
            _ => return 0.0,
        }
        let offset = machine.get_day_of_illness() - self.profile_first_day;
        if offset < 0 || offset as usize >= self.profile.len() {
            return 0.0;
        }
        let mut load = self.profile[offset as usize] * self.infectiousness_multiplier;
        load *= self.variant_factors[machine.get_variant()];
        if machine.state == State::Illness && machine.symptom_severity == SymptomSeverity::Asymptomatic {
            load *= self.p_asymptomatic_infection;
        }
        load
    }

    /// Conditional chain: symptomatic, then severe, then critical, then
    /// fatal, each by age.
    pub fn get_symptom_severity(&self, age: Age, rng: &mut RandomWrapper) -> SymptomSeverity {
        if !rng.chance(self.p_symptomatic[age]) {
            return SymptomSeverity::Asymptomatic;
        }
        if !rng.chance(self.p_severe[age]) {
            return SymptomSeverity::Mild;
        }
        if !rng.chance(self.p_critical[age]) {
            return SymptomSeverity::Severe;
        }
        if !rng.chance(self.p_fatal[age]) {
            return SymptomSeverity::Critical;
        }
        SymptomSeverity::Fatal
    }

    pub fn get_incubation_days(&self, rng: &mut RandomWrapper) -> Day {
        let days = rng.lognormal(self.mean_incubation_duration.ln(), constants::INCUBATION_SIGMA).round() as i64;
        days.clamp(constants::MIN_INCUBATION_DAYS as i64, constants::MAX_INCUBATION_DAYS as i64) as Day
    }

    /// Days spent in the ILLNESS state: the whole disease course for cases
    /// that stay at home, the pre-hospitalization share otherwise.
    pub fn get_illness_days(&self, severity: SymptomSeverity, rng: &mut RandomWrapper) -> Day {
        let days = match severity {
            SymptomSeverity::Asymptomatic | SymptomSeverity::Mild => {
                self.sample_duration(self.mean_duration_from_onset_to_recovery, rng)
            }
            SymptomSeverity::Severe | SymptomSeverity::Critical => {
                self.sample_duration(self.mean_duration_from_onset_to_recovery, rng)
                    * self.ratio_of_duration_before_hospitalisation
            }
            SymptomSeverity::Fatal => {
                self.sample_duration(self.mean_duration_from_onset_to_death, rng)
                    * self.ratio_of_duration_before_hospitalisation
            }
        };
        (days.round() as i64).max(1) as Day
    }

    pub fn get_ward_days(&self, severity: SymptomSeverity, rng: &mut RandomWrapper) -> Day {
        let days = match severity {
            // A fatal case keeps its bed until death, so the ward stay is
            // the whole onset-to-death course minus the at-home phase.
            SymptomSeverity::Fatal => {
                self.sample_duration(self.mean_duration_from_onset_to_death, rng)
                    * (1.0 - self.ratio_of_duration_before_hospitalisation)
            }
            _ => self.sample_duration(self.mean_duration_from_onset_to_recovery, rng) * self.ratio_of_duration_in_ward,
        };
        (days.round() as i64).max(1) as Day
    }

    pub fn get_icu_days(&self, rng: &mut RandomWrapper) -> Day {
        let days = self.sample_duration(self.mean_duration_from_onset_to_recovery, rng)
            * (1.0 - self.ratio_of_duration_before_hospitalisation);
        (days.round() as i64).max(1) as Day
    }

    fn sample_duration(&self, mean_days: f64, rng: &mut RandomWrapper) -> f64 {
        rng.lognormal(mean_days.ln(), constants::DURATION_SIGMA)
    }

    pub fn dies_in_hospital(&self, rng: &mut RandomWrapper, in_icu: bool, care_available: bool) -> bool {
        let p = match (in_icu, care_available) {
            (true, true) => self.p_icu_death,
            (true, false) => self.p_icu_death_no_beds,
            (false, true) => self.p_hospital_death,
            (false, false) => self.p_hospital_death_no_beds,
        };
        rng.chance(p)
    }

    pub fn dies_outside_hospital(&self, rng: &mut RandomWrapper, age: Age) -> bool {
        rng.chance(self.p_death_outside_hospital[age])
    }

    pub fn get_mask_protection(&self) -> (Percentage, Percentage) {
        (self.p_mask_protects_wearer, self.p_mask_protects_others)
    }

    pub fn get_variant_index(&self, name: &str) -> Option<usize> {
        self.variant_names.iter().position(|n| n == name)
    }

    pub fn infectiousness_profile(&self) -> Vec<(i32, f64)> {
        self.profile
            .iter()
            .enumerate()
            .map(|(offset, load)| (self.profile_first_day + offset as i32, load * self.infectiousness_multiplier))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::disease_params_fixture;

    fn disease() -> Disease {
        Disease::from_config(&disease_params_fixture(), 100).unwrap()
    }

    #[test]
    fn severity_chain_extremes() {
        let mut params = disease_params_fixture();
        params.p_symptomatic = vec![(0, 0.0)];
        let disease = Disease::from_config(&params, 100).unwrap();
        let mut rng = RandomWrapper::seeded(1);
        for _ in 0..50 {
            assert_eq!(disease.get_symptom_severity(40, &mut rng), SymptomSeverity::Asymptomatic);
        }

        let mut params = disease_params_fixture();
        params.p_symptomatic = vec![(0, 100.0)];
        params.p_severe = vec![(0, 100.0)];
        params.p_critical = vec![(0, 100.0)];
        params.p_fatal = vec![(0, 100.0)];
        let disease = Disease::from_config(&params, 100).unwrap();
        for _ in 0..50 {
            assert_eq!(disease.get_symptom_severity(40, &mut rng), SymptomSeverity::Fatal);
        }
    }

    #[test]
    fn incubation_days_stay_in_range() {
        let disease = disease();
        let mut rng = RandomWrapper::seeded(99);
        for _ in 0..1000 {
            let days = disease.get_incubation_days(&mut rng);
            assert!((1..=14).contains(&days));
        }
    }

    #[test]
    fn stage_durations_are_at_least_one_day() {
        let disease = disease();
        let mut rng = RandomWrapper::seeded(5);
        for severity in
            [SymptomSeverity::Mild, SymptomSeverity::Severe, SymptomSeverity::Critical, SymptomSeverity::Fatal]
        {
            for _ in 0..100 {
                assert!(disease.get_illness_days(severity, &mut rng) >= 1);
            }
        }
        for _ in 0..100 {
            assert!(disease.get_ward_days(SymptomSeverity::Severe, &mut rng) >= 1);
            assert!(disease.get_ward_days(SymptomSeverity::Fatal, &mut rng) >= 1);
            assert!(disease.get_icu_days(&mut rng) >= 1);
        }
    }

    #[test]
    fn infectiousness_is_zero_outside_profile_support() {
        let disease = disease();
        let mut machine = DiseaseStateMachine::new();
        machine.infect(14, 0);

        // 14 days before onset: not shedding yet
        assert_eq!(disease.get_source_infectiousness(&machine), 0.0);

        machine.set_ill(SymptomSeverity::Mild, 10, 0);
        assert!(disease.get_source_infectiousness(&machine) > 0.0);
    }

    #[test]
    fn hospitalized_cases_do_not_shed() {
        let disease = disease();
        let mut machine = DiseaseStateMachine::new();
        machine.set_in_ward(SymptomSeverity::Severe, 3);
        assert_eq!(disease.get_source_infectiousness(&machine), 0.0);
    }

    #[test]
    fn asymptomatic_cases_shed_less() {
        let disease = disease();
        let mut symptomatic = DiseaseStateMachine::new();
        symptomatic.set_ill(SymptomSeverity::Mild, 10, 0);
        let mut silent = DiseaseStateMachine::new();
        silent.set_ill(SymptomSeverity::Asymptomatic, 10, 0);

        let loud = disease.get_source_infectiousness(&symptomatic);
        let quiet = disease.get_source_infectiousness(&silent);
        assert!(quiet < loud);
        assert!(quiet > 0.0);
    }

    #[test]
    fn variant_factor_scales_infectiousness() {
        let mut params = disease_params_fixture();
        params.variants = vec![crate::config::VariantParams {
            name: "beta".to_string(),
            infectiousness_factor: 2.0,
        }];
        let disease = Disease::from_config(&params, 100).unwrap();

        let mut baseline = DiseaseStateMachine::new();
        baseline.set_ill(SymptomSeverity::Mild, 10, 0);
        let mut variant = DiseaseStateMachine::new();
        variant.set_ill(SymptomSeverity::Mild, 10, 1);

        let base_load = disease.get_source_infectiousness(&baseline);
        let variant_load = disease.get_source_infectiousness(&variant);
        assert!((variant_load - 2.0 * base_load).abs() < 1e-12);
        assert_eq!(disease.get_variant_index("beta"), Some(1));
        assert_eq!(disease.get_variant_index("gamma"), None);
    }

    #[test]
    fn death_probability_table() {
        let disease = disease();
        let mut rng = RandomWrapper::seeded(3);
        // ICU without a unit available is always fatal with the fixture
        for _ in 0..20 {
            assert!(disease.dies_in_hospital(&mut rng, true, false));
        }
    }
}
