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

use std::mem;

use fxhash::FxHashMap;
use rand::Rng;

use crate::config::{AgeGroupsConfig, Config};
use crate::disease::Disease;
use crate::disease_state_machine::SymptomSeverity;
use crate::errors::SimulationError;
use crate::models::constants;
use crate::models::custom_types::{Age, Count, Day, Percentage};
use crate::person::Person;
use crate::utils::RandomWrapper;

pub const NUM_PLACES: usize = 6;

/// Categorical context a contact happens in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPlace {
    Home,
    Work,
    School,
    Transport,
    Leisure,
    Other,
}

impl ContactPlace {
    pub const ALL: [ContactPlace; NUM_PLACES] = [
        ContactPlace::Home,
        ContactPlace::Work,
        ContactPlace::School,
        ContactPlace::Transport,
        ContactPlace::Leisure,
        ContactPlace::Other,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ContactPlace::Home => "home",
            ContactPlace::Work => "work",
            ContactPlace::School => "school",
            ContactPlace::Transport => "transport",
            ContactPlace::Leisure => "leisure",
            ContactPlace::Other => "other",
        }
    }
}

/// Reporting buckets: one label per group plus a per-year-of-age index.
#[derive(Clone, Debug, PartialEq)]
pub struct AgeGroups {
    pub labels: Vec<String>,
    pub age_to_group: Vec<usize>,
}

impl AgeGroups {
    /// Decade buckets 0–9 … 70–79 plus 80+.
    pub fn decades(max_age: Age) -> AgeGroups {
        let mut labels = Vec::new();
        let mut age_to_group = Vec::with_capacity(max_age + 1);
        for age in 0..=max_age {
            let group = (age / 10).min(8);
            let label = if group >= 8 { "80+".to_string() } else { format!("{}–{}", group * 10, group * 10 + 9) };
            if group >= labels.len() {
                labels.push(label);
            }
            age_to_group.push(group);
        }
        AgeGroups { labels, age_to_group }
    }

    pub fn from_config(config: &AgeGroupsConfig) -> AgeGroups {
        AgeGroups { labels: config.labels.clone(), age_to_group: config.age_indices.clone() }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn group_of(&self, age: Age) -> usize {
        self.age_to_group[age]
    }
}

/// The agent vector plus every per-age counter reported by the engine, the
/// contact distribution derived from the contact matrix and the mutable
/// mobility/mask state interventions act on.
pub struct Population {
    people: Vec<Person>,
    max_age: Age,
    pub age_groups: AgeGroups,
    pub(crate) age_counts: Vec<Count>,
    pub(crate) susceptible: Vec<Count>,
    pub(crate) infected: Vec<Count>,
    pub(crate) detected: Vec<Count>,
    pub(crate) all_detected: Vec<Count>,
    pub(crate) in_ward: Vec<Count>,
    pub(crate) in_icu: Vec<Count>,
    pub(crate) dead: Vec<Count>,
    pub(crate) non_hospital_deaths: Vec<Count>,
    pub(crate) recovered: Vec<Count>,
    pub(crate) vaccinated: Vec<Count>,
    pub(crate) all_infected: Vec<Count>,
    pub(crate) new_infections: Vec<Count>,
    daily_contacts: FxHashMap<ContactPlace, Count>,
    avg_place_contacts: Vec<[f64; NUM_PLACES]>,
    mobility_factor: f64,
    age_place_mobility: Vec<[f64; NUM_PLACES]>,
    mask_share: Vec<[f64; NUM_PLACES]>,
    import_weights: Vec<f64>,
}

impl Population {
    pub fn new(config: &Config) -> Result<Population, SimulationError> {
        let max_age = config.max_age;
        let mut age_counts = vec![0; max_age + 1];
        for (age, count) in config.age_structure.iter().enumerate() {
            age_counts[age] = *count;
        }

        let total: Count = age_counts.iter().sum();
        let mut people = Vec::with_capacity(total as usize);
        for (age, count) in age_counts.iter().enumerate() {
            for _ in 0..*count {
                let idx = people.len() as u32;
                people.push(Person::new(idx, age));
            }
        }

        let mut avg_place_contacts = vec![[0.0; NUM_PLACES]; max_age + 1];
        for row in &config.contacts_per_day {
            let hi = row.participant_ages.1.min(max_age);
            for age in row.participant_ages.0..=hi {
                avg_place_contacts[age][row.place.index()] += row.contacts;
            }
        }

        let import_weights = match config.imported_infection_ages.is_empty() {
            true => vec![1.0; max_age + 1],
            false => {
                let expanded = crate::config::expand_age_brackets(&config.imported_infection_ages, max_age, 1.0)?;
                let peak = expanded.iter().cloned().fold(0.0, f64::max);
                if peak <= 0.0 {
                    return Err(SimulationError::InvalidConfig(
                        "imported_infection_ages weights must not all be zero".to_string(),
                    ));
                }
                expanded.iter().map(|w| w / peak).collect()
            }
        };

        let age_groups = match &config.age_groups {
            Some(groups) => AgeGroups::from_config(groups),
            None => AgeGroups::decades(max_age),
        };

        Ok(Population {
            people,
            max_age,
            age_groups,
            susceptible: age_counts.clone(),
            age_counts,
            infected: vec![0; max_age + 1],
            detected: vec![0; max_age + 1],
            all_detected: vec![0; max_age + 1],
            in_ward: vec![0; max_age + 1],
            in_icu: vec![0; max_age + 1],
            dead: vec![0; max_age + 1],
            non_hospital_deaths: vec![0; max_age + 1],
            recovered: vec![0; max_age + 1],
            vaccinated: vec![0; max_age + 1],
            all_infected: vec![0; max_age + 1],
            new_infections: vec![0; max_age + 1],
            daily_contacts: FxHashMap::default(),
            avg_place_contacts,
            mobility_factor: 1.0,
            age_place_mobility: vec![[1.0; NUM_PLACES]; max_age + 1],
            mask_share: vec![[0.0; NUM_PLACES]; max_age + 1],
            import_weights,
        })
    }

    pub fn size(&self) -> usize {
        self.people.len()
    }

    pub fn max_age(&self) -> Age {
        self.max_age
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn person(&self, idx: usize) -> &Person {
        &self.people[idx]
    }

    pub(crate) fn take_person(&mut self, idx: usize) -> Person {
        mem::take(&mut self.people[idx])
    }

    pub(crate) fn put_person(&mut self, idx: usize, person: Person) {
        self.people[idx] = person;
    }

    /// Stochastic number of contacts this person makes today, optionally at
    /// a single place, after the mobility state is applied.
    pub fn contacts_per_day(
        &self,
        age: Age,
        place: Option<ContactPlace>,
        factor: f64,
        limit: Count,
        rng: &mut RandomWrapper,
    ) -> Count {
        let expected: f64 = match place {
            Some(p) => self.avg_place_contacts[age][p.index()] * self.age_place_mobility[age][p.index()],
            None => (0..NUM_PLACES).map(|p| self.avg_place_contacts[age][p] * self.age_place_mobility[age][p]).sum(),
        };
        let drawn =
            rng.lognormal(constants::CONTACTS_MU, constants::CONTACTS_SIGMA) * expected * self.mobility_factor * factor;
        let floored = drawn.floor().max(0.0) as u64;
        floored.min(limit as u64) as Count
    }

    pub fn sample_contact_place(&self, age: Age, rng: &mut RandomWrapper) -> ContactPlace {
        let mut weights = [0.0; NUM_PLACES];
        for p in 0..NUM_PLACES {
            weights[p] = self.avg_place_contacts[age][p] * self.age_place_mobility[age][p];
        }
        ContactPlace::ALL[rng.weighted_choice(&weights)]
    }

    pub(crate) fn record_contact(&mut self, place: ContactPlace) {
        *self.daily_contacts.entry(place).or_insert(0) += 1;
    }

    pub fn daily_contacts(&self) -> Vec<(ContactPlace, Count)> {
        ContactPlace::ALL.iter().map(|p| (*p, self.daily_contacts.get(p).copied().unwrap_or(0))).collect()
    }

    /// Try to transmit from `source` to the person at `target_idx`. Returns
    /// whether an infection happened; the caller credits the source.
    pub(crate) fn expose(
        &mut self,
        target_idx: usize,
        source: &Person,
        place: ContactPlace,
        rng: &mut RandomWrapper,
        disease: &Disease,
    ) -> bool {
        let (target_age, p_infection) = {
            let target = &self.people[target_idx];
            if target.is_infected() || target.has_immunity() || target.state_machine.is_deceased() {
                return false;
            }
            let p = disease.get_source_infectiousness(&source.state_machine)
                * disease.get_susceptibility(target.age)
                * self.mask_discount(source.age, target.age, place, disease);
            (target.age, p)
        };
        if !rng.chance(p_infection) {
            return false;
        }
        let incubation_days = disease.get_incubation_days(rng);
        let variant = source.state_machine.get_variant();
        let target = &mut self.people[target_idx];
        target.state_machine.infect(incubation_days, variant);
        target.infector = Some(source.idx);
        self.register_infection(target_age);
        true
    }

    fn mask_discount(&self, source_age: Age, target_age: Age, place: ContactPlace, disease: &Disease) -> f64 {
        let (protects_wearer, protects_others) = disease.get_mask_protection();
        let target_share = self.mask_share[target_age][place.index()];
        let source_share = self.mask_share[source_age][place.index()];
        (1.0 - target_share * protects_wearer) * (1.0 - source_share * protects_others)
    }

    fn register_infection(&mut self, age: Age) {
        self.susceptible[age] -= 1;
        self.infected[age] += 1;
        self.all_infected[age] += 1;
        self.new_infections[age] += 1;
    }

    pub(crate) fn detect(&mut self, person: &mut Person) {
        if person.was_detected {
            return;
        }
        person.was_detected = true;
        self.detected[person.age] += 1;
        self.all_detected[person.age] += 1;
    }

    pub(crate) fn detect_at(&mut self, idx: usize) {
        let age = {
            let person = &mut self.people[idx];
            if person.was_detected {
                return;
            }
            person.was_detected = true;
            person.age
        };
        self.detected[age] += 1;
        self.all_detected[age] += 1;
    }

    pub(crate) fn recover(&mut self, person: &mut Person) {
        person.state_machine.recover();
        person.grant_immunity();
        self.infected[person.age] -= 1;
        if person.was_detected {
            self.detected[person.age] -= 1;
        }
        self.recovered[person.age] += 1;
    }

    pub(crate) fn die(&mut self, person: &mut Person, in_hospital: bool) {
        person.state_machine.decease();
        person.grant_immunity();
        self.infected[person.age] -= 1;
        if person.was_detected {
            self.detected[person.age] -= 1;
        }
        self.dead[person.age] += 1;
        if !in_hospital {
            self.non_hospital_deaths[person.age] += 1;
        }
    }

    pub(crate) fn enter_ward(&mut self, age: Age) {
        self.in_ward[age] += 1;
    }

    pub(crate) fn leave_ward(&mut self, age: Age) {
        self.in_ward[age] -= 1;
    }

    pub(crate) fn enter_icu(&mut self, age: Age) {
        self.in_icu[age] += 1;
    }

    pub(crate) fn leave_icu(&mut self, age: Age) {
        self.in_icu[age] -= 1;
    }

    /// Vaccinate up to `count` random susceptible unvaccinated persons in
    /// the age range. Immunity takes effect immediately.
    pub fn vaccinate(
        &mut self,
        min_age: Option<Age>,
        max_age: Option<Age>,
        count: Count,
        rng: &mut RandomWrapper,
    ) -> Count {
        let lo = min_age.unwrap_or(0);
        let hi = max_age.unwrap_or(self.max_age);
        let mut candidates: Vec<usize> = self
            .people
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_susceptible() && !p.has_immunity() && (lo..=hi).contains(&p.age))
            .map(|(idx, _)| idx)
            .collect();

        let mut done = 0;
        while done < count && !candidates.is_empty() {
            let pick = rng.get().gen_range(0..candidates.len());
            let idx = candidates.swap_remove(pick);
            let age = {
                let person = &mut self.people[idx];
                person.set_vaccinated();
                person.age
            };
            self.vaccinated[age] += 1;
            done += 1;
        }
        done
    }

    /// Seed `amount` infections from outside the area, weighting target ages
    /// by the configured import distribution. Only susceptible, non-immune
    /// persons are infected; the infector stays unknown.
    pub fn import_infections(
        &mut self,
        amount: Count,
        variant_weights: &[f64],
        disease: &Disease,
        rng: &mut RandomWrapper,
    ) -> Count {
        let mut imported = 0;
        let mut attempts: u64 = 0;
        let max_attempts = (amount as u64 + 1) * 1000;
        while imported < amount && attempts < max_attempts {
            attempts += 1;
            let idx = rng.get().gen_range(0..self.people.len());
            let (age, eligible) = {
                let person = &self.people[idx];
                (person.age, person.is_susceptible() && !person.has_immunity())
            };
            if !eligible || !rng.chance(self.import_weights[age]) {
                continue;
            }
            let incubation_days = disease.get_incubation_days(rng);
            let variant = if variant_weights.len() > 1 { rng.weighted_choice(variant_weights) } else { 0 };
            self.people[idx].state_machine.infect(incubation_days, variant);
            self.register_infection(age);
            imported += 1;
        }
        imported
    }

    pub(crate) fn pick_random_susceptible(&self, weighted: bool, rng: &mut RandomWrapper) -> Option<usize> {
        for _ in 0..self.people.len() * 10 {
            let idx = rng.get().gen_range(0..self.people.len());
            let person = &self.people[idx];
            if !person.is_susceptible() || person.has_immunity() {
                continue;
            }
            if weighted && !rng.chance(self.import_weights[person.age]) {
                continue;
            }
            return Some(idx);
        }
        None
    }

    /// A population-wide limit replaces the global factor; an age- or
    /// place-targeted limit composes multiplicatively with earlier ones.
    pub fn limit_mobility(
        &mut self,
        reduction: f64,
        min_age: Option<Age>,
        max_age: Option<Age>,
        place: Option<ContactPlace>,
    ) {
        if min_age.is_none() && max_age.is_none() && place.is_none() {
            self.mobility_factor = 1.0 - reduction;
            return;
        }
        let lo = min_age.unwrap_or(0);
        let hi = max_age.unwrap_or(self.max_age).min(self.max_age);
        for age in lo..=hi {
            match place {
                Some(p) => self.age_place_mobility[age][p.index()] *= 1.0 - reduction,
                None => {
                    for p in 0..NUM_PLACES {
                        self.age_place_mobility[age][p] *= 1.0 - reduction;
                    }
                }
            }
        }
    }

    pub fn set_mask_wearing(
        &mut self,
        share: f64,
        min_age: Option<Age>,
        max_age: Option<Age>,
        place: Option<ContactPlace>,
    ) {
        let lo = min_age.unwrap_or(0);
        let hi = max_age.unwrap_or(self.max_age).min(self.max_age);
        for age in lo..=hi {
            match place {
                Some(p) => self.mask_share[age][p.index()] = share,
                None => {
                    for p in 0..NUM_PLACES {
                        self.mask_share[age][p] = share;
                    }
                }
            }
        }
    }

    pub fn mobility_limitation(&self) -> Percentage {
        (1.0 - self.mobility_factor) * 100.0
    }

    pub(crate) fn reset_daily_tallies(&mut self) {
        for count in self.new_infections.iter_mut() {
            *count = 0;
        }
        self.daily_contacts.clear();
    }

    pub fn group_sums(&self, per_age: &[Count]) -> Vec<Count> {
        let mut sums = vec![0; self.age_groups.len()];
        for (age, count) in per_age.iter().enumerate() {
            sums[self.age_groups.group_of(age)] += count;
        }
        sums
    }

    pub(crate) fn assert_conservation(&self) {
        if cfg!(debug_assertions) {
            for age in 0..=self.max_age {
                debug_assert_eq!(
                    self.susceptible[age] + self.infected[age] + self.recovered[age] + self.dead[age],
                    self.age_counts[age],
                    "age {} counters out of balance",
                    age
                );
            }
        }
    }

    // Initial-condition seeding. All of these expect a susceptible person.

    pub(crate) fn seed_dead(&mut self, idx: usize) {
        let age = self.people[idx].age;
        self.people[idx].state_machine.set_deceased();
        self.people[idx].grant_immunity();
        self.susceptible[age] -= 1;
        self.dead[age] += 1;
        self.all_infected[age] += 1;
    }

    pub(crate) fn seed_recovered(&mut self, idx: usize) {
        let age = self.people[idx].age;
        self.people[idx].state_machine.set_recovered();
        self.people[idx].grant_immunity();
        self.susceptible[age] -= 1;
        self.recovered[age] += 1;
        self.all_infected[age] += 1;
    }

    pub(crate) fn seed_incubating(&mut self, idx: usize, days_left: Day) {
        let age = self.people[idx].age;
        self.people[idx].state_machine.set_incubating(days_left, 0);
        self.susceptible[age] -= 1;
        self.infected[age] += 1;
        self.all_infected[age] += 1;
    }

    pub(crate) fn seed_ill(&mut self, idx: usize, severity: SymptomSeverity, days_left: Day) {
        let age = self.people[idx].age;
        self.people[idx].state_machine.set_ill(severity, days_left, 0);
        self.susceptible[age] -= 1;
        self.infected[age] += 1;
        self.all_infected[age] += 1;
    }

    pub(crate) fn seed_in_ward(&mut self, idx: usize, severity: SymptomSeverity, days_left: Day) {
        let age = self.people[idx].age;
        self.people[idx].state_machine.set_in_ward(severity, days_left);
        self.susceptible[age] -= 1;
        self.infected[age] += 1;
        self.all_infected[age] += 1;
        self.in_ward[age] += 1;
        self.detect_at(idx);
    }

    pub(crate) fn seed_in_icu(&mut self, idx: usize, days_left: Day) {
        let age = self.people[idx].age;
        self.people[idx].state_machine.set_in_icu(days_left);
        self.susceptible[age] -= 1;
        self.infected[age] += 1;
        self.all_infected[age] += 1;
        self.in_icu[age] += 1;
        self.detect_at(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::config_fixture;
    use crate::disease::Disease;

    fn population() -> Population {
        Population::new(&config_fixture(100, 40)).unwrap()
    }

    fn disease() -> Disease {
        let config = config_fixture(100, 40);
        Disease::from_config(&config.disease, config.max_age).unwrap()
    }

    #[test]
    fn builds_people_from_age_structure() {
        let population = population();
        assert_eq!(population.size(), 100);
        assert!(population.people().iter().all(|p| p.age == 40));
        assert_eq!(population.susceptible[40], 100);
        population.assert_conservation();
    }

    #[test]
    fn decade_age_groups() {
        let groups = AgeGroups::decades(100);
        assert_eq!(groups.len(), 9);
        assert_eq!(groups.labels[0], "0–9");
        assert_eq!(groups.labels[8], "80+");
        assert_eq!(groups.group_of(45), 4);
        assert_eq!(groups.group_of(95), 8);
    }

    #[test]
    fn contacts_drop_to_zero_under_full_mobility_limit() {
        let mut population = population();
        let mut rng = RandomWrapper::seeded(9);
        population.limit_mobility(1.0, None, None, None);
        for _ in 0..100 {
            assert_eq!(population.contacts_per_day(40, None, 1.0, 150, &mut rng), 0);
        }
    }

    #[test]
    fn place_targeted_limits_compose() {
        let mut population = population();
        population.limit_mobility(0.5, Some(30), Some(50), Some(ContactPlace::Work));
        population.limit_mobility(0.5, Some(30), Some(50), Some(ContactPlace::Work));
        assert!((population.age_place_mobility[40][ContactPlace::Work.index()] - 0.25).abs() < 1e-12);
        // other ages and places untouched
        assert_eq!(population.age_place_mobility[20][ContactPlace::Work.index()], 1.0);
        assert_eq!(population.age_place_mobility[40][ContactPlace::Home.index()], 1.0);
    }

    #[test]
    fn expose_ignores_immune_and_dead() {
        let mut population = population();
        let disease = disease();
        let mut rng = RandomWrapper::seeded(4);

        let mut source = population.take_person(0);
        source.state_machine.set_ill(SymptomSeverity::Mild, 10, 0);

        population.people[1].grant_immunity();
        assert!(!population.expose(1, &source, ContactPlace::Home, &mut rng, &disease));

        population.seed_dead(2);
        assert!(!population.expose(2, &source, ContactPlace::Home, &mut rng, &disease));
        population.assert_conservation();
    }

    #[test]
    fn expose_infects_and_updates_counters() {
        let mut population = population();
        let mut config = config_fixture(100, 40);
        config.disease.p_susceptibility = vec![(0, 100.0)];
        config.disease.infectiousness_profile = vec![(0, 1.0)];
        let disease = Disease::from_config(&config.disease, config.max_age).unwrap();
        let mut rng = RandomWrapper::seeded(4);

        let mut source = population.take_person(0);
        source.state_machine.set_ill(SymptomSeverity::Mild, 10, 0);

        assert!(population.expose(1, &source, ContactPlace::Home, &mut rng, &disease));
        assert_eq!(population.infected[40], 1);
        assert_eq!(population.new_infections[40], 1);
        assert_eq!(population.all_infected[40], 1);
        assert_eq!(population.susceptible[40], 99);
        assert_eq!(population.person(1).infector, Some(0));
        population.assert_conservation();

        // a second exposure of the same person does nothing
        assert!(!population.expose(1, &source, ContactPlace::Home, &mut rng, &disease));
    }

    #[test]
    fn vaccination_is_capped_by_candidates() {
        let mut population = population();
        let mut rng = RandomWrapper::seeded(11);
        let done = population.vaccinate(None, None, 500, &mut rng);
        assert_eq!(done, 100);
        assert_eq!(population.vaccinated[40], 100);
        assert!(population.people().iter().all(|p| p.is_vaccinated() && p.has_immunity()));
        // age-sum invariant untouched by vaccination
        population.assert_conservation();
    }

    #[test]
    fn vaccination_respects_age_range() {
        let mut population = population();
        let mut rng = RandomWrapper::seeded(11);
        let done = population.vaccinate(Some(50), Some(60), 10, &mut rng);
        assert_eq!(done, 0);
    }

    #[test]
    fn imports_infect_exactly_the_requested_amount() {
        let mut population = population();
        let disease = disease();
        let mut rng = RandomWrapper::seeded(2);

        let imported = population.import_infections(10, &[1.0], &disease, &mut rng);
        assert_eq!(imported, 10);
        assert_eq!(population.infected[40], 10);
        assert_eq!(population.all_infected[40], 10);
        assert!(population.people().iter().all(|p| p.infector.is_none()));
        population.assert_conservation();
    }

    #[test]
    fn imports_skip_vaccinated_population() {
        let mut population = population();
        let disease = disease();
        let mut rng = RandomWrapper::seeded(2);
        population.vaccinate(None, None, 100, &mut rng);

        let imported = population.import_infections(10, &[1.0], &disease, &mut rng);
        assert_eq!(imported, 0);
        assert_eq!(population.infected[40], 0);
    }

    #[test]
    fn group_sums_follow_age_group_table() {
        let mut population = population();
        population.seed_dead(0);
        let sums = population.group_sums(&population.dead);
        assert_eq!(sums.len(), 9);
        assert_eq!(sums[4], 1);
        assert_eq!(sums.iter().sum::<Count>(), 1);
    }
}
