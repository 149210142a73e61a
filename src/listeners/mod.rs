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

use crate::interventions::Intervention;
use crate::models::custom_types::Day;
use crate::models::events::DayState;

pub mod csv_service;

/// Observers of the running simulation.
pub trait Listener {
    fn day_completed(&mut self, _state: &DayState) {}

    fn intervention_applied(&mut self, _day: Day, _intervention: &Intervention) {}

    fn simulation_ended(&mut self) {}
}

/// Fans events out to a list of boxed listeners.
pub struct Listeners {
    listeners: Vec<Box<dyn Listener>>,
}

impl Listeners {
    pub fn from(listeners: Vec<Box<dyn Listener>>) -> Listeners {
        Listeners { listeners }
    }

    pub fn none() -> Listeners {
        Listeners { listeners: Vec::new() }
    }
}

impl Listener for Listeners {
    fn day_completed(&mut self, state: &DayState) {
        for listener in &mut self.listeners {
            listener.day_completed(state);
        }
    }

    fn intervention_applied(&mut self, day: Day, intervention: &Intervention) {
        for listener in &mut self.listeners {
            listener.intervention_applied(day, intervention);
        }
    }

    fn simulation_ended(&mut self) {
        for listener in &mut self.listeners {
            listener.simulation_ended();
        }
    }
}
