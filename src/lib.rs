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

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;

pub mod config;
pub mod context;
pub mod disease;
pub mod disease_state_machine;
pub mod epidemiology_simulation;
pub mod errors;
pub mod healthcare;
pub mod interventions;
pub mod listeners;
pub mod models;
pub mod person;
pub mod population;
pub mod utils;

pub use crate::context::Context;
pub use crate::epidemiology_simulation::{Epidemiology, RunOutcome, SimulationOutput};
pub use crate::errors::SimulationError;
