use demand::{BiproportionalFit, OdMatrix, ShortestPathIndex};
use model::config::{ConfigOdEstimation, ConfigScheduling};
use model::input::{parse_forward_star, read_inspectors};
use model::inspectors::Inspectors;
use model::network::Network;

use std::sync::Arc;

use crate::flow_model::FlowModel;

// two served lines (HH-AA and RR-BB) with morning round trips
const ARCS: &str = "\
HH 2019-07-01T06:00:00 AA 2019-07-01T06:30:00 10 1800
AA 2019-07-01T06:30:00 HH 2019-07-01T07:00:00 8 1800
HH 2019-07-01T07:00:00 AA 2019-07-01T07:30:00 5 1800
AA 2019-07-01T07:30:00 HH 2019-07-01T08:00:00 4 1800
RR 2019-07-01T06:00:00 BB 2019-07-01T06:40:00 12 2400
BB 2019-07-01T06:40:00 RR 2019-07-01T07:20:00 6 2400
";

const ROSTER: &str = "\
Inspector_ID,Depot,Max_Hours
W1,HH,8
W2,HH,7
W3,RR,6
";

// same timetable, bigger roster; depot ZZ has no events at all
const PARTITIONED_ROSTER: &str = "\
Inspector_ID,Depot,Max_Hours
W1,HH,8
W2,HH,7
W3,HH,6
W4,RR,8
W5,RR,5
W6,ZZ,8
";

pub fn scheduling_config() -> ConfigScheduling {
    ConfigScheduling {
        batch_size: 1,
        acceptance_threshold: 0.9,
        inspection_rate: 12.0,
    }
}

pub fn instance_from(
    arcs: &str,
    roster: &str,
) -> (Arc<Network>, Arc<Inspectors>, OdMatrix, ShortestPathIndex) {
    let mut builder = parse_forward_star(arcs).unwrap();
    let inspectors = read_inspectors(roster.as_bytes(), builder.stations_mut()).unwrap();
    builder.add_depot_terminals(&inspectors);
    let network = Arc::new(builder.freeze());

    let index = ShortestPathIndex::compute(&network);
    let od_config = ConfigOdEstimation {
        relative_tolerance: 0.03,
        max_iterations: 1000,
    };
    let fit = BiproportionalFit::fit(&index, &od_config).unwrap();
    let od = OdMatrix::estimate(&index, &fit);
    (network, Arc::new(inspectors), od, index)
}

pub fn default_instance() -> (Arc<Network>, Arc<Inspectors>, OdMatrix, ShortestPathIndex) {
    instance_from(ARCS, ROSTER)
}

/// five routable inspectors in two depots plus one stranded at ZZ
pub fn partitioned_instance() -> (Arc<Network>, Arc<Inspectors>, OdMatrix, ShortestPathIndex) {
    instance_from(ARCS, PARTITIONED_ROSTER)
}

pub fn default_model(
    network: &Network,
    inspectors: &Inspectors,
    od: &OdMatrix,
    index: &ShortestPathIndex,
    max_inspectors: u32,
) -> FlowModel {
    FlowModel::build(
        network,
        inspectors,
        od,
        index,
        &scheduling_config(),
        max_inspectors,
    )
}
