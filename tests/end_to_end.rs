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

use reina::config::{Config, ContactRow, DiseaseParams, InitialCondition, InterventionEntry};
use reina::disease_state_machine::State;
use reina::interventions::Intervention;
use reina::listeners::Listeners;
use reina::models::custom_types::Count;
use reina::population::ContactPlace;
use reina::{Epidemiology, RunOutcome};

fn disease_params() -> DiseaseParams {
    DiseaseParams {
        p_susceptibility: vec![(0, 25.0)],
        p_symptomatic: vec![(0, 50.0)],
        p_severe: vec![(0, 5.0)],
        p_critical: vec![(0, 25.0)],
        p_fatal: vec![(0, 20.0)],
        p_death_outside_hospital: vec![(0, 0.0)],
        p_asymptomatic_infection: 50.0,
        infectiousness_multiplier: 1.0,
        p_mask_protects_wearer: 30.0,
        p_mask_protects_others: 50.0,
        p_hospital_death: 10.0,
        p_icu_death: 20.0,
        p_hospital_death_no_beds: 20.0,
        p_icu_death_no_beds: 100.0,
        mean_incubation_duration: 5.1,
        mean_duration_from_onset_to_death: 18.8,
        mean_duration_from_onset_to_recovery: 21.0,
        ratio_of_duration_before_hospitalisation: 30.0,
        ratio_of_duration_in_ward: 45.0,
        infectiousness_profile: vec![
            (-2, 0.12),
            (-1, 0.29),
            (0, 0.27),
            (1, 0.07),
            (2, 0.05),
            (3, 0.04),
            (4, 0.03),
            (5, 0.02),
            (6, 0.01),
            (7, 0.01),
        ],
        variants: Vec::new(),
    }
}

/// 1000 people, all aged 40, one ward bed and one ICU unit, seed 1234.
fn base_config() -> Config {
    let mut age_structure = vec![0; 41];
    age_structure[40] = 1000;
    Config {
        area_name: "test-area".to_string(),
        simulation_days: 30,
        start_date: NaiveDate::from_ymd_opt(2020, 2, 18).unwrap(),
        random_seed: 1234,
        max_age: 100,
        hospital_beds: 1,
        icu_units: 1,
        age_structure,
        contacts_per_day: vec![
            ContactRow { place: ContactPlace::Home, participant_ages: (0, 100), contact_ages: (0, 100), contacts: 4.0 },
            ContactRow { place: ContactPlace::Work, participant_ages: (20, 70), contact_ages: (20, 70), contacts: 5.0 },
            ContactRow {
                place: ContactPlace::Leisure,
                participant_ages: (0, 100),
                contact_ages: (0, 100),
                contacts: 3.0,
            },
        ],
        initial_population_condition: InitialCondition::default(),
        age_groups: None,
        imported_infection_ages: Vec::new(),
        disease: disease_params(),
        interventions: Vec::new(),
    }
}

fn at(config: &Config, day: i64, intervention: Intervention) -> InterventionEntry {
    InterventionEntry { date: config.start_date + chrono::Duration::days(day), intervention }
}

fn total(values: &[Count]) -> Count {
    values.iter().sum()
}

#[test]
fn quiet_area_stays_quiet() {
    let config = base_config();
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    assert_eq!(output.outcome, RunOutcome::Completed);
    assert_eq!(output.days.len(), 30);
    for state in &output.days {
        assert_eq!(total(&state.all_infected), 0);
        assert_eq!(total(&state.infected), 0);
        assert_eq!(total(&state.dead), 0);
        assert_eq!(total(&state.detected), 0);
        assert_eq!(total(&state.new_infections), 0);
        assert_eq!(state.r, 0.0);
        assert_eq!(state.total_contacts(), 0);
        assert_eq!(total(&state.susceptible), 1000);
    }
}

#[test]
fn imported_infections_seed_incubation() {
    let mut config = base_config();
    config.interventions.push(at(&config, 0, Intervention::ImportInfections { amount: 10, variant: None }));
    let mut epidemiology = Epidemiology::new(&config).unwrap();

    let output = epidemiology.run_with_callback(&mut Listeners::none(), |days| days.len() < 2);
    assert_eq!(total(&output.days[0].all_infected), 10);
    assert_eq!(total(&output.days[0].new_infections), 10);

    // the next day the imported cases are incubating, credited to nobody
    let seeded: Vec<_> = epidemiology
        .context
        .population
        .people()
        .iter()
        .filter(|p| p.is_infected() && p.infector.is_none())
        .collect();
    assert_eq!(seeded.len(), 10);
    assert!(seeded.iter().all(|p| p.state_machine.state == State::Incubation || p.state_machine.state == State::Illness));
}

#[test]
fn full_mobility_limit_stops_onward_spread() {
    let mut config = base_config();
    config.interventions.push(at(
        &config,
        0,
        Intervention::LimitMobility { reduction: 100.0, min_age: None, max_age: None, place: None },
    ));
    config.interventions.push(at(&config, 0, Intervention::ImportInfections { amount: 50, variant: None }));
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    assert_eq!(total(&output.days[0].new_infections), 50);
    for state in &output.days[1..] {
        assert_eq!(total(&state.new_infections), 0);
        assert_eq!(total(&state.all_infected), 50);
        assert_eq!(state.total_contacts(), 0);
    }
}

#[test]
fn icu_build_jumps_capacity_on_its_day() {
    let mut config = base_config();
    config.interventions.push(at(&config, 10, Intervention::BuildNewIcuUnits { units: 5 }));
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    for state in &output.days[..10] {
        assert_eq!(state.total_icu_units, 1);
    }
    for state in &output.days[10..] {
        assert_eq!(state.total_icu_units, 6);
        assert_eq!(state.available_icu_units, 6);
    }
}

#[test]
fn contact_tracing_detects_cases_soon_after_onset() {
    let mut config = base_config();
    // make the chain grow quickly so the tracing graph is non-trivial
    config.disease.p_susceptibility = vec![(0, 100.0)];
    config.interventions.push(at(&config, 0, Intervention::TestWithContactTracing { efficiency: 100.0 }));
    config.interventions.push(at(&config, 0, Intervention::ImportInfections { amount: 1, variant: None }));
    config.simulation_days = 25;
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    // the epidemic did spread
    let last = output.days.last().unwrap();
    assert!(total(&last.all_infected) > 1);
    assert!(total(&last.all_detected) > 0);

    // every symptomatic case is known within two days of symptom onset
    for person in epidemiology.context.population.people() {
        if person.state_machine.state == State::Illness
            && person.state_machine.symptom_severity.is_symptomatic()
            && person.state_machine.get_day_of_illness() >= 2
        {
            assert!(person.was_detected, "person {} ill for {} days but undetected", person.idx, person.state_machine.get_day_of_illness());
        }
    }
}

#[test]
fn vaccinating_everyone_blocks_later_imports() {
    let mut config = base_config();
    config.interventions.push(at(
        &config,
        0,
        Intervention::Vaccinate { weekly_vaccinations: 1000, min_age: Some(0), max_age: Some(100) },
    ));
    config.interventions.push(at(&config, 10, Intervention::ImportInfections { amount: 20, variant: None }));
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    assert_eq!(total(&output.days[6].vaccinated), 1000);
    for state in &output.days {
        assert_eq!(total(&state.all_infected), 0);
        assert_eq!(total(&state.new_infections), 0);
    }
}

#[test]
fn zero_susceptibility_keeps_the_outbreak_at_its_seed() {
    let mut config = base_config();
    config.disease.p_susceptibility = vec![(0, 0.0)];
    config.interventions.push(at(&config, 0, Intervention::ImportInfections { amount: 10, variant: None }));
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    for state in &output.days {
        assert_eq!(total(&state.all_infected), 10);
    }
}

#[test]
fn severe_cases_die_without_beds() {
    let mut config = base_config();
    config.hospital_beds = 0;
    config.icu_units = 0;
    config.simulation_days = 60;
    config.disease.p_symptomatic = vec![(0, 100.0)];
    config.disease.p_severe = vec![(0, 100.0)];
    config.disease.p_critical = vec![(0, 0.0)];
    config.disease.p_hospital_death_no_beds = 100.0;
    config.disease.p_susceptibility = vec![(0, 0.0)];
    config.interventions.push(at(&config, 0, Intervention::ImportInfections { amount: 5, variant: None }));
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    let last = output.days.last().unwrap();
    assert_eq!(total(&last.dead), 5);
    assert_eq!(total(&last.non_hospital_deaths), 5);
    for state in &output.days {
        assert_eq!(total(&state.in_ward), 0);
        assert_eq!(total(&state.in_icu), 0);
    }
}

#[test]
fn critical_cases_die_without_icu_units() {
    let mut config = base_config();
    config.hospital_beds = 0;
    config.icu_units = 0;
    config.simulation_days = 60;
    config.disease.p_symptomatic = vec![(0, 100.0)];
    config.disease.p_severe = vec![(0, 100.0)];
    config.disease.p_critical = vec![(0, 100.0)];
    config.disease.p_fatal = vec![(0, 0.0)];
    config.disease.p_susceptibility = vec![(0, 0.0)];
    config.interventions.push(at(&config, 0, Intervention::ImportInfections { amount: 5, variant: None }));
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    let last = output.days.last().unwrap();
    assert_eq!(total(&last.dead), 5);
    for state in &output.days {
        assert_eq!(total(&state.in_icu), 0);
    }
}

#[test]
fn day_end_invariants_hold_through_a_mixed_run() {
    let mut config = base_config();
    let mut age_structure = vec![0; 101];
    for count in age_structure.iter_mut() {
        *count = 20;
    }
    config.age_structure = age_structure;
    config.simulation_days = 40;
    config.hospital_beds = 20;
    config.icu_units = 5;
    config.interventions.push(at(&config, 0, Intervention::TestAllWithSymptoms));
    config.interventions.push(at(&config, 0, Intervention::ImportInfections { amount: 20, variant: None }));
    config.interventions.push(at(
        &config,
        5,
        Intervention::LimitMobility { reduction: 30.0, min_age: None, max_age: None, place: None },
    ));
    config.interventions.push(at(
        &config,
        8,
        Intervention::WearMasks { share_of_contacts: 80.0, min_age: None, max_age: None, place: None },
    ));
    config.interventions.push(at(&config, 12, Intervention::BuildNewHospitalBeds { beds: 10 }));

    let population_total: Count = config.age_structure.iter().sum();
    let mut epidemiology = Epidemiology::new(&config).unwrap();
    let output = epidemiology.run(&mut Listeners::none());

    let mut previous_all_infected = 0;
    let mut previous_all_detected = 0;
    let mut previous_dead = 0;
    let mut previous_recovered = 0;
    for state in &output.days {
        let alive_split =
            total(&state.susceptible) + total(&state.infected) + total(&state.recovered) + total(&state.dead);
        assert_eq!(alive_split, population_total);

        let all_infected = total(&state.all_infected);
        assert_eq!(total(&state.new_infections), all_infected - previous_all_infected);
        assert!(all_infected >= previous_all_infected);
        previous_all_infected = all_infected;

        let all_detected = total(&state.all_detected);
        assert!(all_detected >= previous_all_detected);
        previous_all_detected = all_detected;

        let dead = total(&state.dead);
        assert!(dead >= previous_dead);
        previous_dead = dead;

        let recovered = total(&state.recovered);
        assert!(recovered >= previous_recovered);
        previous_recovered = recovered;

        assert!(state.available_icu_units <= state.total_icu_units);
        assert!(total(&state.in_ward) + state.available_hospital_beds <= 30);
    }
    assert!(previous_all_infected > 20, "the outbreak should have spread");
}

#[test]
fn identical_seeds_produce_identical_series() {
    let mut config = base_config();
    config.interventions.push(at(&config, 0, Intervention::TestWithContactTracing { efficiency: 60.0 }));
    config.interventions.push(at(&config, 0, Intervention::ImportInfections { amount: 15, variant: None }));
    config.interventions.push(at(
        &config,
        5,
        Intervention::Vaccinate { weekly_vaccinations: 70, min_age: None, max_age: None },
    ));

    let mut first = Epidemiology::new(&config).unwrap();
    let first_output = first.run(&mut Listeners::none());
    let mut second = Epidemiology::new(&config).unwrap();
    let second_output = second.run(&mut Listeners::none());

    let first_series = serde_json::to_string(&first_output.days).unwrap();
    let second_series = serde_json::to_string(&second_output.days).unwrap();
    assert_eq!(first_series, second_series);

    let mut third = base_config();
    third.random_seed = 4321;
    third.interventions = config.interventions.clone();
    let third_output = Epidemiology::new(&third).unwrap().run(&mut Listeners::none());
    let third_series = serde_json::to_string(&third_output.days).unwrap();
    assert_ne!(first_series, third_series);
}
