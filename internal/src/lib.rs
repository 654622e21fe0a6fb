use demand::{BiproportionalFit, OdMatrix, ShortestPathIndex};
use model::base_types::InspectorCount;
use model::config::Config;
use model::input::load_instance;
use solver::{FixAndRelax, FlowModel, GreedyBackend, VariableId};

use std::error::Error;
use std::sync::Arc;
use std::time as stdtime;

/// Full pipeline: load the instance, index shortest paths, estimate (or
/// load) the od matrix, build the flow model and schedule with
/// fix-and-relax. Returns the schedule and the od matrix as JSON.
pub fn run(
    arcs_path: &str,
    inspectors_path: &str,
    max_inspectors: InspectorCount,
    delta: InspectorCount,
    od_cache: Option<serde_json::Value>,
) -> Result<serde_json::Value, Box<dyn Error>> {
    let start_time = stdtime::Instant::now();
    let mut config = Config::default();
    if delta < 1 {
        println!("delta must be at least 1; continuing with 1");
    }
    config.scheduling.batch_size = delta.max(1);

    let (network, inspectors) = load_instance(arcs_path, inspectors_path)?;
    let network = Arc::new(network);
    let inspectors = Arc::new(inspectors);
    println!(
        "Loaded network: {} stations, {} nodes, {} edges; roster of {} inspector(s)",
        network.stations().len(),
        network.number_of_nodes(),
        network.number_of_edges(),
        inspectors.len()
    );

    let index = ShortestPathIndex::compute(&network);
    println!(
        "Shortest-path index: {} paths over {} passenger arcs",
        index.number_of_paths(),
        index.number_of_arcs()
    );

    let od = match od_cache {
        Some(value) => {
            let od = OdMatrix::from_json(&value, &network)?;
            println!("Loaded od matrix from cache: {} entries", od.len());
            od
        }
        None => {
            let fit = BiproportionalFit::fit(&index, &config.od_estimation)?;
            println!(
                "Biproportional fitting converged after {} iteration(s)",
                fit.iterations()
            );
            OdMatrix::estimate(&index, &fit)
        }
    };

    let target = max_inspectors.min(inspectors.len() as InspectorCount);
    if target < max_inspectors {
        println!(
            "Requested {} inspectors but the roster only has {}",
            max_inspectors,
            inspectors.len()
        );
    }

    let model = FlowModel::build(
        &network,
        &inspectors,
        &od,
        &index,
        &config.scheduling,
        target,
    );
    println!(
        "Flow model: {} variables, {} constraints",
        model.number_of_variables(),
        model.number_of_constraints()
    );

    let backend = GreedyBackend::new(network.clone(), inspectors.clone());
    let mut scheduler = FixAndRelax::new(
        network.clone(),
        inspectors.clone(),
        config.scheduling.clone(),
        backend,
    );
    let outcome = scheduler.run(model, target)?;
    if let Some(error) = outcome.failure() {
        println!(
            "Scheduling stopped early ({}); reporting the {} inspector(s) fixed so far",
            error,
            outcome.state().known_count()
        );
    }

    let inspected: f64 = od
        .entries_iter()
        .map(|((origin, destination), demand)| {
            demand
                * outcome.assignment().value(&VariableId::InspectedPortion {
                    origin,
                    destination,
                })
        })
        .sum();
    let total = od.total_demand();
    let share = if total > 0.0 { inspected / total } else { 0.0 };

    println!("\nFinal schedule:");
    let mut schedule = Vec::new();
    for inspector in outcome.state().known() {
        let route = outcome.assignment().route_of(&network, inspector);
        if route.len() < 3 {
            continue;
        }
        // strip the synthetic terminals
        let events = &route[1..route.len() - 1];
        let names: Vec<String> = events.iter().map(|&n| network.node_name(n)).collect();
        let departure = network.node(events[0]).as_event().time();
        let arrival = network.node(events[events.len() - 1]).as_event().time();
        let working_seconds =
            network.seconds_since_start(arrival) - network.seconds_since_start(departure);
        println!(
            "  {}: {} -> {} ({} events)",
            inspectors.get(inspector),
            names[0],
            names[names.len() - 1],
            names.len()
        );
        schedule.push(serde_json::json!({
            "inspector": inspectors.get(inspector).name(),
            "depot": network.stations().name(inspectors.get(inspector).depot()),
            "route": names,
            "workingSeconds": working_seconds,
        }));
    }

    println!(
        "Inspected demand: {:.2} of {:.2} ({:.1}%)",
        inspected,
        total,
        100.0 * share
    );
    println!(
        "Running time: {:0.2}sec",
        start_time.elapsed().as_secs_f32()
    );

    Ok(serde_json::json!({
        "inspectedDemand": inspected,
        "totalDemand": total,
        "inspectedShare": share,
        "iterations": outcome.iterations(),
        "schedule": schedule,
        "odMatrix": od.to_json(&network),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const ARCS: &str = "\
HH 2019-07-01T06:00:00 AA 2019-07-01T06:30:00 10 1800
AA 2019-07-01T06:30:00 HH 2019-07-01T07:00:00 8 1800
RR 2019-07-01T06:00:00 BB 2019-07-01T06:40:00 12 2400
BB 2019-07-01T06:40:00 RR 2019-07-01T07:20:00 6 2400
";

    const ROSTER: &str = "\
Inspector_ID,Depot,Max_Hours
W1,HH,8
W2,RR,6
";

    fn fixture_files(tag: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir();
        let arcs = dir.join(format!("inspection_run_{}_{}.arcs", tag, std::process::id()));
        let roster = dir.join(format!("inspection_run_{}_{}.csv", tag, std::process::id()));
        fs::write(&arcs, ARCS).unwrap();
        fs::write(&roster, ROSTER).unwrap();
        (arcs, roster)
    }

    #[test]
    fn pipeline_produces_a_schedule_and_od_matrix() {
        let (arcs, roster) = fixture_files("pipeline");
        let output = run(arcs.to_str().unwrap(), roster.to_str().unwrap(), 2, 1, None).unwrap();

        let schedule = output["schedule"].as_array().unwrap();
        assert_eq!(schedule.len(), 2);
        for entry in schedule {
            assert!(!entry["route"].as_array().unwrap().is_empty());
        }
        assert!(output["inspectedDemand"].as_f64().unwrap() > 0.0);
        assert!(output["totalDemand"].as_f64().unwrap() > 0.0);
        assert!(!output["odMatrix"].as_array().unwrap().is_empty());

        fs::remove_file(arcs).unwrap();
        fs::remove_file(roster).unwrap();
    }

    #[test]
    fn cached_od_matrix_yields_the_same_schedule() {
        let (arcs, roster) = fixture_files("cache");
        let first = run(arcs.to_str().unwrap(), roster.to_str().unwrap(), 2, 1, None).unwrap();
        let second = run(
            arcs.to_str().unwrap(),
            roster.to_str().unwrap(),
            2,
            1,
            Some(first["odMatrix"].clone()),
        )
        .unwrap();

        assert_eq!(first["schedule"], second["schedule"]);
        assert_eq!(first["totalDemand"], second["totalDemand"]);

        fs::remove_file(arcs).unwrap();
        fs::remove_file(roster).unwrap();
    }
}
