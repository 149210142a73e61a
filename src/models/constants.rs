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

use crate::models::custom_types::{Count, Day};

/// Sigma of the lognormal draw for incubation duration.
pub const INCUBATION_SIGMA: f64 = 0.4;
/// Sigma of the lognormal draws for illness/hospital stage durations.
pub const DURATION_SIGMA: f64 = 0.3;
/// Incubation period is clamped to this range of days.
pub const MIN_INCUBATION_DAYS: Day = 1;
pub const MAX_INCUBATION_DAYS: Day = 14;

/// Mu and sigma of the per-person daily contact count multiplier.
pub const CONTACTS_MU: f64 = 1.0;
pub const CONTACTS_SIGMA: f64 = 0.7;
/// Hard cap on contacts a single person can have in one day.
pub const MAX_DAILY_CONTACTS: Count = 150;

/// How many hops of the infector/infectee graph contact tracing follows.
pub const CONTACT_TRACING_DEPTH: u32 = 3;

pub const DAYS_IN_WEEK: Day = 7;

/// Number of draws returned by the parameter sampling interface.
pub const SAMPLE_SIZE: usize = 10_000;
