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

use std::collections::VecDeque;

use crate::models::custom_types::{Count, Percentage};
use crate::person::Person;
use crate::utils::RandomWrapper;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestingMode {
    None,
    OnlySevereSymptoms,
    AllWithSymptoms,
    AllWithContactTracing,
}

/// Ward and ICU capacity plus the testing pipeline. People queued on one
/// day have their test performed on the next day's iteration.
pub struct HealthcareSystem {
    beds: Count,
    icu_units: Count,
    available_beds: Count,
    available_icu_units: Count,
    testing_mode: TestingMode,
    mild_detection_rate: Percentage,
    contact_tracing_success_rate: Percentage,
    testing_queue: VecDeque<u32>,
}

impl HealthcareSystem {
    pub fn new(beds: Count, icu_units: Count) -> HealthcareSystem {
        HealthcareSystem {
            beds,
            icu_units,
            available_beds: beds,
            available_icu_units: icu_units,
            testing_mode: TestingMode::None,
            mild_detection_rate: 0.0,
            contact_tracing_success_rate: 0.0,
            testing_queue: VecDeque::new(),
        }
    }

    /// Switch the testing policy. The meaning of `efficiency` depends on the
    /// mode: detection rate of mild cases for OnlySevereSymptoms, tracing
    /// success per hop for AllWithContactTracing.
    pub fn set_testing_mode(&mut self, mode: TestingMode, efficiency: Percentage) {
        match mode {
            TestingMode::OnlySevereSymptoms => self.mild_detection_rate = efficiency,
            TestingMode::AllWithContactTracing => self.contact_tracing_success_rate = efficiency,
            _ => {}
        }
        self.testing_mode = mode;
    }

    pub fn testing_mode(&self) -> TestingMode {
        self.testing_mode
    }

    pub fn contact_tracing_success_rate(&self) -> Percentage {
        self.contact_tracing_success_rate
    }

    /// A symptomatic person asks for a test at symptom onset.
    pub fn seek_testing(&mut self, person: &mut Person, rng: &mut RandomWrapper) {
        match self.testing_mode {
            TestingMode::None => {}
            TestingMode::AllWithSymptoms | TestingMode::AllWithContactTracing => self.queue_person(person),
            TestingMode::OnlySevereSymptoms => {
                if person.state_machine.symptom_severity.requires_hospital_care()
                    || rng.chance(self.mild_detection_rate)
                {
                    self.queue_person(person);
                }
            }
        }
    }

    fn queue_person(&mut self, person: &mut Person) {
        if person.state_machine.is_deceased() || person.was_detected || person.queued_for_testing {
            return;
        }
        person.queued_for_testing = true;
        self.testing_queue.push_back(person.idx);
    }

    pub(crate) fn push_to_queue(&mut self, idx: u32) {
        self.testing_queue.push_back(idx);
    }

    pub(crate) fn drain_queue(&mut self) -> Vec<u32> {
        self.testing_queue.drain(..).collect()
    }

    pub fn queue_len(&self) -> usize {
        self.testing_queue.len()
    }

    pub fn allocate_bed(&mut self) -> bool {
        if self.available_beds > 0 {
            self.available_beds -= 1;
            true
        } else {
            false
        }
    }

    pub fn release_bed(&mut self) {
        self.available_beds += 1;
        debug_assert!(self.available_beds <= self.beds);
    }

    pub fn allocate_icu_unit(&mut self) -> bool {
        if self.available_icu_units > 0 {
            self.available_icu_units -= 1;
            true
        } else {
            false
        }
    }

    pub fn release_icu_unit(&mut self) {
        self.available_icu_units += 1;
        debug_assert!(self.available_icu_units <= self.icu_units);
    }

    pub fn add_beds(&mut self, count: Count) {
        self.beds += count;
        self.available_beds += count;
    }

    pub fn add_icu_units(&mut self, count: Count) {
        self.icu_units += count;
        self.available_icu_units += count;
    }

    pub fn beds(&self) -> Count {
        self.beds
    }

    pub fn available_beds(&self) -> Count {
        self.available_beds
    }

    pub fn icu_units(&self) -> Count {
        self.icu_units
    }

    pub fn available_icu_units(&self) -> Count {
        self.available_icu_units
    }
}
