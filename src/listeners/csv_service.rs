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

use std::fs::File;

use crate::listeners::Listener;
use crate::models::events::{DayState, POP_ATTRS};
use crate::population::ContactPlace;

/// Writes one row of population totals and state metrics per simulated day.
pub struct CsvListener {
    output_file_name: String,
    writer: Option<csv::Writer<File>>,
}

impl CsvListener {
    pub fn new(output_file_name: String) -> CsvListener {
        CsvListener { output_file_name, writer: None }
    }

    fn ensure_writer(&mut self) -> Option<&mut csv::Writer<File>> {
        if self.writer.is_none() {
            match File::create(&self.output_file_name) {
                Ok(file) => {
                    let mut writer = csv::Writer::from_writer(file);
                    let mut header: Vec<String> = vec!["date".to_string()];
                    header.extend(POP_ATTRS.iter().map(|attr| attr.to_string()));
                    header.extend(
                        [
                            "exposed_per_day",
                            "available_hospital_beds",
                            "available_icu_units",
                            "total_icu_units",
                            "ct_cases_per_day",
                            "r",
                            "mobility_limitation",
                        ]
                        .iter()
                        .map(|attr| attr.to_string()),
                    );
                    header.extend(ContactPlace::ALL.iter().map(|place| format!("exposures_{}", place.name())));
                    if let Err(e) = writer.write_record(&header) {
                        error!("Failed to write CSV header: {}", e);
                        return None;
                    }
                    self.writer = Some(writer);
                }
                Err(e) => {
                    error!("Failed to create output file {}: {}", self.output_file_name, e);
                    return None;
                }
            }
        }
        self.writer.as_mut()
    }
}

impl Listener for CsvListener {
    fn day_completed(&mut self, state: &DayState) {
        let mut row: Vec<String> = vec![state.date.to_string()];
        for attr in 0..POP_ATTRS.len() {
            row.push(state.total(attr).to_string());
        }
        row.push(state.exposed_per_day.to_string());
        row.push(state.available_hospital_beds.to_string());
        row.push(state.available_icu_units.to_string());
        row.push(state.total_icu_units.to_string());
        row.push(state.ct_cases_per_day.to_string());
        row.push(format!("{:.4}", state.r));
        row.push(format!("{:.1}", state.mobility_limitation));
        for (_, count) in &state.daily_contacts {
            row.push(count.to_string());
        }

        if let Some(writer) = self.ensure_writer() {
            if let Err(e) = writer.write_record(&row) {
                error!("Failed to write CSV row: {}", e);
            }
        }
    }

    fn simulation_ended(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                error!("Failed to flush CSV output: {}", e);
            }
        }
    }
}
