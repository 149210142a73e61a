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

use clap::Parser;
use log::info;

use reina::config::Config;
use reina::listeners::{Listener, Listeners};
use reina::listeners::csv_service::CsvListener;
use reina::models::events::{DayState, POP_ATTRS};
use reina::{Epidemiology, RunOutcome};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config/default.yaml")]
    #[arg(help = "Scenario configuration file (YAML or JSON)")]
    config: String,

    #[arg(short, long, help = "Override the number of simulated days")]
    days: Option<u32>,

    #[arg(short, long, help = "Override the random seed")]
    seed: Option<u64>,

    #[arg(short, long, value_name = "FILE", help = "Write per-day metrics to a CSV file")]
    output: Option<String>,

    #[arg(short, long, default_value_t = false, help = "Suppress the per-day console table")]
    quiet: bool,
}

fn print_header() {
    let mut header = format!("{:<12}", "date");
    for attr in POP_ATTRS.iter() {
        header += &format!("{:>15}", attr);
    }
    header += &format!("{:>15}{:>8}{:>12}", "ct_cases", "r", "exposures");
    println!("{}", header);
}

fn print_day(state: &DayState) {
    let mut row = format!("{:<12}", state.date.to_string());
    for attr in 0..POP_ATTRS.len() {
        row += &format!("{:>15}", state.total(attr));
    }
    row += &format!("{:>15}{:>8.2}{:>12}", state.ct_cases_per_day, state.r, state.total_contacts());
    println!("{}", row);
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = match Config::read(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(days) = args.days {
        config.simulation_days = days;
    }
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }

    info!("Simulating {} for {} days (seed {})", config.area_name, config.simulation_days, config.random_seed);

    let mut listeners = match &args.output {
        Some(path) => Listeners::from(vec![Box::new(CsvListener::new(path.clone())) as Box<dyn Listener>]),
        None => Listeners::none(),
    };

    let mut epidemiology = match Epidemiology::new(&config) {
        Ok(epidemiology) => epidemiology,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if !args.quiet {
        print_header();
    }
    let quiet = args.quiet;
    let output = epidemiology.run_with_callback(&mut listeners, |days| {
        if !quiet {
            if let Some(state) = days.last() {
                print_day(state);
            }
        }
        true
    });

    match output.outcome {
        RunOutcome::Completed => info!("Simulation completed after {} days", output.days.len()),
        RunOutcome::Interrupted => info!("Simulation interrupted after {} days", output.days.len()),
    }
}
