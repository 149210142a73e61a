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

use rand::Rng;

use crate::context::Context;
use crate::disease_state_machine::{DiseaseStateMachine, State, SymptomSeverity};
use crate::models::constants;
use crate::models::custom_types::{Age, Count};

/// One member of the population. Identity is the stable index into the
/// population vector; everything else is mutable disease state plus the
/// infection edges used for contact tracing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub idx: u32,
    pub age: Age,
    pub state_machine: DiseaseStateMachine,
    has_immunity: bool,
    pub was_detected: bool,
    pub queued_for_testing: bool,
    vaccinated: bool,
    pub infector: Option<u32>,
    pub infectees: Vec<u32>,
    pub other_people_infected: Count,
    pub other_people_exposed_today: Count,
}

impl Default for Person {
    fn default() -> Person {
        Person::new(0, 0)
    }
}

impl Person {
    pub fn new(idx: u32, age: Age) -> Person {
        Person {
            idx,
            age,
            state_machine: DiseaseStateMachine::new(),
            has_immunity: false,
            was_detected: false,
            queued_for_testing: false,
            vaccinated: false,
            infector: None,
            infectees: Vec::new(),
            other_people_infected: 0,
            other_people_exposed_today: 0,
        }
    }

    pub fn is_infected(&self) -> bool {
        self.state_machine.is_infected()
    }

    pub fn is_susceptible(&self) -> bool {
        self.state_machine.is_susceptible()
    }

    pub fn has_immunity(&self) -> bool {
        self.has_immunity
    }

    pub fn grant_immunity(&mut self) {
        self.has_immunity = true;
    }

    pub fn is_vaccinated(&self) -> bool {
        self.vaccinated
    }

    pub fn set_vaccinated(&mut self) {
        self.vaccinated = true;
        self.has_immunity = true;
    }

    /// One simulated day for an infected person: shed on today's viral
    /// load, then advance the stage timers and take whatever transition
    /// falls due.
    pub fn advance(&mut self, ctx: &mut Context) {
        self.other_people_exposed_today = 0;

        if ctx.disease.get_source_infectiousness(&self.state_machine) > 0.0 {
            let contacts =
                ctx.population.contacts_per_day(self.age, None, 1.0, constants::MAX_DAILY_CONTACTS, &mut ctx.rng);
            self.expose_others(ctx, contacts);
        }

        self.state_machine.advance_day();

        match self.state_machine.state {
            State::Incubation => {
                if self.state_machine.stage_over() {
                    self.begin_illness(ctx);
                }
            }
            State::Illness => {
                if self.state_machine.stage_over() {
                    if self.state_machine.symptom_severity.requires_hospital_care() {
                        self.hospitalize(ctx);
                    } else {
                        ctx.population.recover(self);
                    }
                }
            }
            State::HospitalizedWard | State::InIcu => {
                if self.state_machine.stage_over() {
                    self.release_from_hospital(ctx);
                }
            }
            _ => panic!("Invalid state transition!"),
        }
    }

    fn expose_others(&mut self, ctx: &mut Context, contacts: Count) {
        let population_size = ctx.population.size();
        for _ in 0..contacts {
            let target_idx = ctx.rng.get().gen_range(0..population_size);
            if target_idx as u32 == self.idx {
                continue;
            }
            let place = ctx.population.sample_contact_place(self.age, &mut ctx.rng);
            self.other_people_exposed_today += 1;
            ctx.population.record_contact(place);
            if ctx.population.expose(target_idx, self, place, &mut ctx.rng, &ctx.disease) {
                self.infectees.push(target_idx as u32);
                self.other_people_infected += 1;
            }
        }
    }

    fn begin_illness(&mut self, ctx: &mut Context) {
        let severity = ctx.disease.get_symptom_severity(self.age, &mut ctx.rng);
        let illness_days = ctx.disease.get_illness_days(severity, &mut ctx.rng);
        self.state_machine.begin_illness(severity, illness_days);
        if severity.is_symptomatic() {
            ctx.healthcare.seek_testing(self, &mut ctx.rng);
        }
    }

    /// A hospital-care severity has run through its at-home illness phase.
    /// Admission depends on free capacity; denial of care has its own death
    /// probabilities. Admission always makes the case known.
    fn hospitalize(&mut self, ctx: &mut Context) {
        ctx.population.detect(self);
        match self.state_machine.symptom_severity {
            SymptomSeverity::Critical => {
                if ctx.healthcare.allocate_icu_unit() {
                    let icu_days = ctx.disease.get_icu_days(&mut ctx.rng);
                    self.state_machine.admit_to_icu(icu_days);
                    ctx.population.enter_icu(self.age);
                } else if ctx.disease.dies_in_hospital(&mut ctx.rng, true, false) {
                    ctx.population.die(self, false);
                } else {
                    ctx.population.recover(self);
                }
            }
            SymptomSeverity::Severe => {
                if ctx.healthcare.allocate_bed() {
                    let ward_days = ctx.disease.get_ward_days(SymptomSeverity::Severe, &mut ctx.rng);
                    self.state_machine.admit_to_ward(ward_days);
                    ctx.population.enter_ward(self.age);
                } else if ctx.disease.dies_in_hospital(&mut ctx.rng, false, false) {
                    ctx.population.die(self, false);
                } else {
                    ctx.population.recover(self);
                }
            }
            SymptomSeverity::Fatal => {
                if ctx.disease.dies_outside_hospital(&mut ctx.rng, self.age) {
                    ctx.population.die(self, false);
                } else if ctx.healthcare.allocate_bed() {
                    let ward_days = ctx.disease.get_ward_days(SymptomSeverity::Fatal, &mut ctx.rng);
                    self.state_machine.admit_to_ward(ward_days);
                    ctx.population.enter_ward(self.age);
                } else {
                    ctx.population.die(self, false);
                }
            }
            _ => panic!("Invalid state transition!"),
        }
    }

    fn release_from_hospital(&mut self, ctx: &mut Context) {
        match self.state_machine.state {
            State::HospitalizedWard => {
                ctx.healthcare.release_bed();
                ctx.population.leave_ward(self.age);
                let dies = self.state_machine.symptom_severity == SymptomSeverity::Fatal
                    || ctx.disease.dies_in_hospital(&mut ctx.rng, false, true);
                if dies {
                    ctx.population.die(self, true);
                } else {
                    ctx.population.recover(self);
                }
            }
            State::InIcu => {
                ctx.healthcare.release_icu_unit();
                ctx.population.leave_icu(self.age);
                if ctx.disease.dies_in_hospital(&mut ctx.rng, true, true) {
                    ctx.population.die(self, true);
                } else {
                    ctx.population.recover(self);
                }
            }
            _ => panic!("Invalid state transition!"),
        }
    }
}
