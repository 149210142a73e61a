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

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::errors::SimulationError;
use crate::interventions::Intervention;
use crate::models::custom_types::{Age, Count, Day, Percentage};
use crate::population::ContactPlace;

/// Expected daily contacts between two age bands at one kind of place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactRow {
    pub place: ContactPlace,
    pub participant_ages: (Age, Age),
    pub contact_ages: (Age, Age),
    pub contacts: f64,
}

/// Population state seeded before day 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialCondition {
    pub dead: Count,
    pub in_icu: Count,
    pub in_ward: Count,
    pub confirmed_cases: Count,
    pub incubating: Count,
    pub ill: Count,
    pub recovered: Count,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeGroupsConfig {
    pub labels: Vec<String>,
    /// One entry per year of age, indexing into `labels`.
    pub age_indices: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantParams {
    pub name: String,
    pub infectiousness_factor: f64,
}

/// Disease parameters as configured. Values for keys starting with `p_` or
/// `ratio_` are percentages; age-bracketed lists give (bracket start, value)
/// pairs that extend to the next bracket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiseaseParams {
    pub p_susceptibility: Vec<(Age, Percentage)>,
    pub p_symptomatic: Vec<(Age, Percentage)>,
    pub p_severe: Vec<(Age, Percentage)>,
    pub p_critical: Vec<(Age, Percentage)>,
    pub p_fatal: Vec<(Age, Percentage)>,
    pub p_death_outside_hospital: Vec<(Age, Percentage)>,
    pub p_asymptomatic_infection: Percentage,
    #[serde(default = "default_infectiousness_multiplier")]
    pub infectiousness_multiplier: f64,
    #[serde(default = "default_mask_protects_wearer")]
    pub p_mask_protects_wearer: Percentage,
    #[serde(default = "default_mask_protects_others")]
    pub p_mask_protects_others: Percentage,
    pub p_hospital_death: Percentage,
    pub p_icu_death: Percentage,
    pub p_hospital_death_no_beds: Percentage,
    pub p_icu_death_no_beds: Percentage,
    pub mean_incubation_duration: f64,
    pub mean_duration_from_onset_to_death: f64,
    pub mean_duration_from_onset_to_recovery: f64,
    pub ratio_of_duration_before_hospitalisation: Percentage,
    pub ratio_of_duration_in_ward: Percentage,
    /// Viral load by day relative to symptom onset.
    pub infectiousness_profile: Vec<(i32, f64)>,
    #[serde(default)]
    pub variants: Vec<VariantParams>,
}

fn default_infectiousness_multiplier() -> f64 {
    1.0
}

fn default_mask_protects_wearer() -> Percentage {
    30.0
}

fn default_mask_protects_others() -> Percentage {
    50.0
}

/// An intervention together with the calendar date it takes effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterventionEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub intervention: Intervention,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_area_name")]
    pub area_name: String,
    pub simulation_days: Day,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub random_seed: u64,
    #[serde(default = "default_max_age")]
    pub max_age: Age,
    pub hospital_beds: Count,
    pub icu_units: Count,
    /// Number of residents per year of age; missing trailing ages count as
    /// zero.
    pub age_structure: Vec<Count>,
    #[serde(default)]
    pub contacts_per_day: Vec<ContactRow>,
    #[serde(default)]
    pub initial_population_condition: InitialCondition,
    #[serde(default)]
    pub age_groups: Option<AgeGroupsConfig>,
    /// Age weighting of imported infections as (bracket start, weight %).
    #[serde(default)]
    pub imported_infection_ages: Vec<(Age, Percentage)>,
    pub disease: DiseaseParams,
    #[serde(default)]
    pub interventions: Vec<InterventionEntry>,
}

fn default_area_name() -> String {
    "area".to_string()
}

fn default_max_age() -> Age {
    100
}

impl Config {
    pub fn read(path: &str) -> Result<Config, SimulationError> {
        let contents = fs::read_to_string(path)?;
        let extension = Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or("yaml");
        let config: Config = if extension == "json" {
            serde_json::from_str(&contents).map_err(|e| SimulationError::Parse(e.to_string()))?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| SimulationError::Parse(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.simulation_days == 0 {
            return Err(invalid("simulation_days must be at least 1"));
        }
        if self.age_structure.is_empty() || self.age_structure.iter().all(|c| *c == 0) {
            return Err(invalid("age_structure must contain at least one person"));
        }
        if self.age_structure.len() > self.max_age + 1 {
            return Err(invalid("age_structure has more entries than max_age allows"));
        }
        if let Some(groups) = &self.age_groups {
            if groups.age_indices.len() != self.max_age + 1 {
                return Err(invalid("age_groups.age_indices must cover every year of age"));
            }
            if groups.age_indices.iter().any(|idx| *idx >= groups.labels.len()) {
                return Err(invalid("age_groups.age_indices points outside labels"));
            }
        }
        for row in &self.contacts_per_day {
            if row.participant_ages.0 > row.participant_ages.1 || row.contact_ages.0 > row.contact_ages.1 {
                return Err(invalid("contact row age ranges must be ascending"));
            }
            if row.contacts < 0.0 {
                return Err(invalid("contact counts must not be negative"));
            }
        }
        for (age, weight) in &self.imported_infection_ages {
            if *age > self.max_age {
                return Err(invalid("imported_infection_ages bracket exceeds max_age"));
            }
            if *weight < 0.0 {
                return Err(invalid("imported infection weights must not be negative"));
            }
        }
        self.validate_disease()?;
        for entry in &self.interventions {
            entry.intervention.validate()?;
        }
        Ok(())
    }

    fn validate_disease(&self) -> Result<(), SimulationError> {
        let d = &self.disease;
        for (name, list) in [
            ("p_susceptibility", &d.p_susceptibility),
            ("p_symptomatic", &d.p_symptomatic),
            ("p_severe", &d.p_severe),
            ("p_critical", &d.p_critical),
            ("p_fatal", &d.p_fatal),
            ("p_death_outside_hospital", &d.p_death_outside_hospital),
        ] {
            if list.is_empty() {
                return Err(invalid(&format!("{} must contain at least one bracket", name)));
            }
            for (age, value) in list {
                if *age > self.max_age {
                    return Err(invalid(&format!("{} bracket exceeds max_age", name)));
                }
                check_percentage(name, *value)?;
            }
        }
        for (name, value) in [
            ("p_asymptomatic_infection", d.p_asymptomatic_infection),
            ("p_mask_protects_wearer", d.p_mask_protects_wearer),
            ("p_mask_protects_others", d.p_mask_protects_others),
            ("p_hospital_death", d.p_hospital_death),
            ("p_icu_death", d.p_icu_death),
            ("p_hospital_death_no_beds", d.p_hospital_death_no_beds),
            ("p_icu_death_no_beds", d.p_icu_death_no_beds),
            ("ratio_of_duration_before_hospitalisation", d.ratio_of_duration_before_hospitalisation),
            ("ratio_of_duration_in_ward", d.ratio_of_duration_in_ward),
        ] {
            check_percentage(name, value)?;
        }
        for (name, value) in [
            ("mean_incubation_duration", d.mean_incubation_duration),
            ("mean_duration_from_onset_to_death", d.mean_duration_from_onset_to_death),
            ("mean_duration_from_onset_to_recovery", d.mean_duration_from_onset_to_recovery),
        ] {
            if value <= 0.0 {
                return Err(invalid(&format!("{} must be positive", name)));
            }
        }
        if d.infectiousness_multiplier <= 0.0 {
            return Err(invalid("infectiousness_multiplier must be positive"));
        }
        if d.infectiousness_profile.is_empty() {
            return Err(invalid("infectiousness_profile must not be empty"));
        }
        if d.infectiousness_profile.iter().any(|(_, load)| *load < 0.0) {
            return Err(invalid("infectiousness_profile values must not be negative"));
        }
        for variant in &d.variants {
            if variant.name.is_empty() || variant.name == "baseline" {
                return Err(invalid("variant names must be non-empty and not shadow the baseline"));
            }
            if variant.infectiousness_factor <= 0.0 {
                return Err(invalid("variant infectiousness_factor must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> SimulationError {
    SimulationError::InvalidConfig(reason.to_string())
}

fn check_percentage(name: &str, value: Percentage) -> Result<(), SimulationError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(invalid(&format!("{} must be between 0 and 100, got {}", name, value)));
    }
    Ok(())
}

/// Expand (bracket start, percent) pairs into a dense per-age vector of
/// fractions. Each bracket extends until the next one; ages before the
/// first bracket get zero.
pub fn expand_age_brackets(
    brackets: &[(Age, Percentage)],
    max_age: Age,
    scale: f64,
) -> Result<Vec<f64>, SimulationError> {
    if brackets.is_empty() {
        return Err(invalid("age bracket list must not be empty"));
    }
    let mut sorted = brackets.to_vec();
    sorted.sort_by_key(|(age, _)| *age);
    let mut expanded = vec![0.0; max_age + 1];
    for (start, value) in sorted {
        if start > max_age {
            return Err(invalid("age bracket start exceeds max_age"));
        }
        for entry in expanded.iter_mut().skip(start) {
            *entry = value * scale;
        }
    }
    Ok(expanded)
}
