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

use crate::models::custom_types::Day;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum State {
    Susceptible,
    Incubation,
    Illness,
    HospitalizedWard,
    InIcu,
    Recovered,
    Dead,
}

/// Severity class chosen once at symptom onset and latched for the rest of
/// the disease course.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymptomSeverity {
    Asymptomatic,
    Mild,
    Severe,
    Critical,
    Fatal,
}

impl SymptomSeverity {
    pub fn is_symptomatic(self) -> bool {
        !matches!(self, SymptomSeverity::Asymptomatic)
    }

    pub fn requires_hospital_care(self) -> bool {
        matches!(self, SymptomSeverity::Severe | SymptomSeverity::Critical | SymptomSeverity::Fatal)
    }
}

/// Disease course of a single person: current state, the countdown of the
/// current stage and the day offset relative to symptom onset (negative
/// while incubating).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiseaseStateMachine {
    pub state: State,
    pub symptom_severity: SymptomSeverity,
    days_left: Day,
    day_of_illness: i32,
    variant: usize,
}

impl DiseaseStateMachine {
    pub fn new() -> Self {
        DiseaseStateMachine {
            state: State::Susceptible,
            symptom_severity: SymptomSeverity::Asymptomatic,
            days_left: 0,
            day_of_illness: 0,
            variant: 0,
        }
    }

    pub fn infect(&mut self, incubation_days: Day, variant: usize) {
        match self.state {
            State::Susceptible => {
                self.state = State::Incubation;
                self.days_left = incubation_days;
                self.day_of_illness = -(incubation_days as i32);
                self.variant = variant;
            }
            _ => panic!("Invalid state transition!"),
        }
    }

    /// Advance the stage timers by one simulated day.
    pub fn advance_day(&mut self) {
        self.day_of_illness += 1;
        if self.days_left > 0 {
            self.days_left -= 1;
        }
    }

    pub fn stage_over(&self) -> bool {
        self.days_left == 0
    }

    pub fn begin_illness(&mut self, severity: SymptomSeverity, illness_days: Day) {
        match self.state {
            State::Incubation => {
                self.state = State::Illness;
                self.symptom_severity = severity;
                self.day_of_illness = 0;
                self.days_left = illness_days;
            }
            _ => panic!("Invalid state transition!"),
        }
    }

    pub fn admit_to_ward(&mut self, ward_days: Day) {
        match self.state {
            State::Illness => {
                self.state = State::HospitalizedWard;
                self.days_left = ward_days;
            }
            _ => panic!("Invalid state transition!"),
        }
    }

    pub fn admit_to_icu(&mut self, icu_days: Day) {
        match self.state {
            State::Illness => {
                self.state = State::InIcu;
                self.days_left = icu_days;
            }
            _ => panic!("Invalid state transition!"),
        }
    }

    pub fn recover(&mut self) {
        match self.state {
            State::Incubation | State::Illness | State::HospitalizedWard | State::InIcu => {
                self.state = State::Recovered;
                self.days_left = 0;
            }
            _ => panic!("Invalid state transition!"),
        }
    }

    pub fn decease(&mut self) {
        match self.state {
            State::Incubation | State::Illness | State::HospitalizedWard | State::InIcu => {
                self.state = State::Dead;
                self.days_left = 0;
            }
            _ => panic!("Invalid state transition!"),
        }
    }

    pub fn get_day_of_illness(&self) -> i32 {
        self.day_of_illness
    }

    pub fn get_variant(&self) -> usize {
        self.variant
    }

    pub fn is_susceptible(&self) -> bool {
        matches!(self.state, State::Susceptible)
    }

    pub fn is_infected(&self) -> bool {
        matches!(self.state, State::Incubation | State::Illness | State::HospitalizedWard | State::InIcu)
    }

    pub fn is_incubating(&self) -> bool {
        matches!(self.state, State::Incubation)
    }

    pub fn is_ill(&self) -> bool {
        matches!(self.state, State::Illness)
    }

    pub fn is_hospitalized(&self) -> bool {
        matches!(self.state, State::HospitalizedWard | State::InIcu)
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self.state, State::Recovered)
    }

    pub fn is_deceased(&self) -> bool {
        matches!(self.state, State::Dead)
    }

    // The set_* constructors below are meant for seeding the initial
    // population condition only.

    pub fn set_incubating(&mut self, days_left: Day, variant: usize) {
        self.state = State::Incubation;
        self.days_left = days_left;
        self.day_of_illness = -(days_left as i32);
        self.variant = variant;
    }

    pub fn set_ill(&mut self, severity: SymptomSeverity, days_left: Day, variant: usize) {
        self.state = State::Illness;
        self.symptom_severity = severity;
        self.day_of_illness = 0;
        self.days_left = days_left;
        self.variant = variant;
    }

    pub fn set_in_ward(&mut self, severity: SymptomSeverity, days_left: Day) {
        self.state = State::HospitalizedWard;
        self.symptom_severity = severity;
        self.day_of_illness = 1;
        self.days_left = days_left;
    }

    pub fn set_in_icu(&mut self, days_left: Day) {
        self.state = State::InIcu;
        self.symptom_severity = SymptomSeverity::Critical;
        self.day_of_illness = 1;
        self.days_left = days_left;
    }

    pub fn set_recovered(&mut self) {
        self.state = State::Recovered;
    }

    pub fn set_deceased(&mut self) {
        self.state = State::Dead;
    }
}
