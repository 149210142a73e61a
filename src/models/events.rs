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

use crate::models::custom_types::{Count, Day, Percentage};
use crate::population::ContactPlace;

/// Population attributes reported per age group, in snapshot column order.
pub const POP_ATTRS: [&str; 12] = [
    "susceptible",
    "vaccinated",
    "infected",
    "detected",
    "all_detected",
    "in_ward",
    "in_icu",
    "dead",
    "non_hospital_deaths",
    "recovered",
    "all_infected",
    "new_infections",
];

/// Aggregate metrics for one completed simulation day. The per-age-group
/// vectors are indexed by the population's age group table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DayState {
    pub day: Day,
    pub date: NaiveDate,
    pub susceptible: Vec<Count>,
    pub vaccinated: Vec<Count>,
    pub infected: Vec<Count>,
    pub detected: Vec<Count>,
    pub all_detected: Vec<Count>,
    pub in_ward: Vec<Count>,
    pub in_icu: Vec<Count>,
    pub dead: Vec<Count>,
    pub non_hospital_deaths: Vec<Count>,
    pub recovered: Vec<Count>,
    pub all_infected: Vec<Count>,
    pub new_infections: Vec<Count>,
    pub exposed_per_day: Count,
    pub available_hospital_beds: Count,
    pub available_icu_units: Count,
    pub total_icu_units: Count,
    pub ct_cases_per_day: Count,
    pub r: f64,
    pub mobility_limitation: Percentage,
    pub daily_contacts: Vec<(ContactPlace, Count)>,
}

impl DayState {
    pub fn pop_attr(&self, idx: usize) -> &[Count] {
        match POP_ATTRS[idx] {
            "susceptible" => &self.susceptible,
            "vaccinated" => &self.vaccinated,
            "infected" => &self.infected,
            "detected" => &self.detected,
            "all_detected" => &self.all_detected,
            "in_ward" => &self.in_ward,
            "in_icu" => &self.in_icu,
            "dead" => &self.dead,
            "non_hospital_deaths" => &self.non_hospital_deaths,
            "recovered" => &self.recovered,
            "all_infected" => &self.all_infected,
            "new_infections" => &self.new_infections,
            _ => unreachable!(),
        }
    }

    pub fn total(&self, idx: usize) -> Count {
        self.pop_attr(idx).iter().sum()
    }

    pub fn total_contacts(&self) -> Count {
        self.daily_contacts.iter().map(|(_, n)| n).sum()
    }

    pub fn log(&self) {
        info!(
            "{} - infected: {}, detected: {}, in ward: {}, in ICU: {}, dead: {}, recovered: {}, r: {:.2}",
            self.date,
            self.total(2),
            self.total(3),
            self.total(5),
            self.total(6),
            self.total(7),
            self.total(9),
            self.r,
        );
    }
}
