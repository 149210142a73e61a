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

use crate::errors::SimulationError;
use crate::models::custom_types::{Age, Count, Day, Percentage};
use crate::population::ContactPlace;

/// Everything external policy can do to a running simulation. Weekly
/// variants spread their effect over the seven days following their
/// effective date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Intervention {
    TestAllWithSymptoms,
    TestOnlySevereSymptoms {
        mild_detection_rate: Percentage,
    },
    TestWithContactTracing {
        efficiency: Percentage,
    },
    LimitMobility {
        reduction: Percentage,
        #[serde(default)]
        min_age: Option<Age>,
        #[serde(default)]
        max_age: Option<Age>,
        #[serde(default)]
        place: Option<ContactPlace>,
    },
    WearMasks {
        share_of_contacts: Percentage,
        #[serde(default)]
        min_age: Option<Age>,
        #[serde(default)]
        max_age: Option<Age>,
        #[serde(default)]
        place: Option<ContactPlace>,
    },
    Vaccinate {
        weekly_vaccinations: Count,
        #[serde(default)]
        min_age: Option<Age>,
        #[serde(default)]
        max_age: Option<Age>,
    },
    ImportInfections {
        amount: Count,
        #[serde(default)]
        variant: Option<String>,
    },
    ImportInfectionsWeekly {
        weekly_amount: Count,
        #[serde(default)]
        variant_shares: Vec<(String, Percentage)>,
    },
    BuildNewHospitalBeds {
        beds: Count,
    },
    BuildNewIcuUnits {
        units: Count,
    },
}

impl Intervention {
    pub fn validate(&self) -> Result<(), SimulationError> {
        match self {
            Intervention::TestAllWithSymptoms => Ok(()),
            Intervention::TestOnlySevereSymptoms { mild_detection_rate } => {
                check_percentage("mild_detection_rate", *mild_detection_rate)
            }
            Intervention::TestWithContactTracing { efficiency } => check_percentage("efficiency", *efficiency),
            Intervention::LimitMobility { reduction, min_age, max_age, .. } => {
                check_percentage("reduction", *reduction)?;
                check_age_range(*min_age, *max_age)
            }
            Intervention::WearMasks { share_of_contacts, min_age, max_age, .. } => {
                check_percentage("share_of_contacts", *share_of_contacts)?;
                check_age_range(*min_age, *max_age)
            }
            Intervention::Vaccinate { min_age, max_age, .. } => check_age_range(*min_age, *max_age),
            Intervention::ImportInfections { .. } => Ok(()),
            Intervention::ImportInfectionsWeekly { variant_shares, .. } => {
                let mut total = 0.0;
                for (name, share) in variant_shares {
                    check_percentage(&format!("variant share for {}", name), *share)?;
                    total += share;
                }
                if total > 100.0 {
                    return Err(SimulationError::InvalidConfig("variant shares exceed 100%".to_string()));
                }
                Ok(())
            }
            Intervention::BuildNewHospitalBeds { .. } => Ok(()),
            Intervention::BuildNewIcuUnits { .. } => Ok(()),
        }
    }
}

fn check_percentage(name: &str, value: Percentage) -> Result<(), SimulationError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(SimulationError::InvalidConfig(format!("{} must be between 0 and 100, got {}", name, value)));
    }
    Ok(())
}

fn check_age_range(min_age: Option<Age>, max_age: Option<Age>) -> Result<(), SimulationError> {
    if let (Some(lo), Some(hi)) = (min_age, max_age) {
        if lo > hi {
            return Err(SimulationError::InvalidConfig(format!("min_age {} is above max_age {}", lo, hi)));
        }
    }
    Ok(())
}

/// Interventions keyed by day offset from the simulation start, applied at
/// the head of each day in insertion order.
#[derive(Default)]
pub struct InterventionStore {
    entries: Vec<(Day, Intervention)>,
}

impl InterventionStore {
    pub fn new() -> InterventionStore {
        InterventionStore { entries: Vec::new() }
    }

    /// Insert while keeping entries sorted by day; insertion order within a
    /// day is preserved.
    pub fn add(&mut self, day: Day, intervention: Intervention) {
        let position = self.entries.iter().rposition(|(d, _)| *d <= day).map(|p| p + 1).unwrap_or(0);
        self.entries.insert(position, (day, intervention));
    }

    pub fn take_due(&mut self, day: Day) -> Vec<Intervention> {
        let mut due = Vec::new();
        let mut remaining = Vec::with_capacity(self.entries.len());
        for (entry_day, intervention) in self.entries.drain(..) {
            if entry_day <= day {
                due.push(intervention);
            } else {
                remaining.push((entry_day, intervention));
            }
        }
        self.entries = remaining;
        due
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_yaml() {
        let parsed: Intervention = serde_yaml::from_str("{ type: limit-mobility, reduction: 30 }").unwrap();
        assert_eq!(
            parsed,
            Intervention::LimitMobility { reduction: 30.0, min_age: None, max_age: None, place: None }
        );

        let parsed: Intervention = serde_yaml::from_str("{ type: test-all-with-symptoms }").unwrap();
        assert_eq!(parsed, Intervention::TestAllWithSymptoms);

        let parsed: Intervention =
            serde_yaml::from_str("{ type: wear-masks, share_of_contacts: 80, place: transport }").unwrap();
        assert_eq!(
            parsed,
            Intervention::WearMasks {
                share_of_contacts: 80.0,
                min_age: None,
                max_age: None,
                place: Some(ContactPlace::Transport),
            }
        );
    }

    #[test]
    fn rejects_unknown_intervention_type() {
        let parsed: Result<Intervention, _> = serde_yaml::from_str("{ type: limit-mass-gatherings, value: 50 }");
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let over_limit = Intervention::LimitMobility { reduction: 120.0, min_age: None, max_age: None, place: None };
        assert!(over_limit.validate().is_err());

        let bad_range =
            Intervention::Vaccinate { weekly_vaccinations: 100, min_age: Some(70), max_age: Some(20) };
        assert!(bad_range.validate().is_err());

        let bad_shares = Intervention::ImportInfectionsWeekly {
            weekly_amount: 70,
            variant_shares: vec![("alpha".to_string(), 80.0), ("beta".to_string(), 40.0)],
        };
        assert!(bad_shares.validate().is_err());
    }

    #[test]
    fn store_applies_in_day_then_insertion_order() {
        let mut store = InterventionStore::new();
        store.add(5, Intervention::BuildNewIcuUnits { units: 1 });
        store.add(0, Intervention::TestAllWithSymptoms);
        store.add(5, Intervention::BuildNewHospitalBeds { beds: 2 });

        assert_eq!(store.take_due(0), vec![Intervention::TestAllWithSymptoms]);
        assert!(store.take_due(1).is_empty());
        assert_eq!(
            store.take_due(5),
            vec![Intervention::BuildNewIcuUnits { units: 1 }, Intervention::BuildNewHospitalBeds { beds: 2 }]
        );
        assert!(store.is_empty());
    }
}
