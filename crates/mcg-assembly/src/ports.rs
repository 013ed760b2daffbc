//! Port-role inference for conversion links.
//!
//! Declared port order in raw link records is not trusted. Roles are derived
//! from the carriers of the resolved buses first and from name markers second:
//!
//! 1. fuel, electricity and heat buses present: combined heat and power, stored
//!    as `(fuel → electricity, heat)`
//! 2. electrolysis marker: input and output swapped when electricity was
//!    declared as the output, extra ports dropped
//! 3. heat pump marker: same swap rule as electrolysis
//! 4. otherwise declared order
//!
//! Each efficiency stays with the bus it was declared for. When the new input
//! came from an output slot, the bus that was declared as input takes over the
//! efficiency of that slot.

use mcg_core::{Carrier, Diagnostics, Efficiency, IssueKind, LinkKind, LinkPort};
use tracing::{debug, warn};

use crate::config::CostConfig;
use crate::rules::{link_marker, LinkMarker};

/// A resolved port before role assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct PortCandidate {
    pub bus: String,
    pub carrier: Option<Carrier>,
    /// Declared efficiency; always `None` for the declared input slot.
    pub efficiency: Option<Efficiency>,
}

impl PortCandidate {
    pub fn new(bus: impl Into<String>, carrier: Option<Carrier>, efficiency: Option<Efficiency>) -> Self {
        Self {
            bus: bus.into(),
            carrier,
            efficiency,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleAssignment {
    pub kind: LinkKind,
    pub input: PortCandidate,
    pub outputs: Vec<PortCandidate>,
    /// Ports discarded by the electrolysis/heat-pump rules.
    pub dropped: Vec<PortCandidate>,
    /// Whether the stored order differs from the declared order.
    pub reordered: bool,
}

fn declared(kind: LinkKind, mut ports: Vec<PortCandidate>) -> RoleAssignment {
    let input = ports.remove(0);
    RoleAssignment {
        kind,
        input,
        outputs: ports,
        dropped: Vec::new(),
        reordered: false,
    }
}

fn combined_heat_power(mut ports: Vec<PortCandidate>, fuel: usize, el: usize, heat: usize) -> RoleAssignment {
    if fuel != 0 {
        let vacated = ports[fuel].efficiency.take();
        ports[0].efficiency = vacated;
    }
    let roles = [fuel, el, heat];
    let order: Vec<usize> = roles
        .into_iter()
        .chain((0..ports.len()).filter(|idx| !roles.contains(idx)))
        .collect();
    let reordered = order.iter().enumerate().any(|(pos, idx)| pos != *idx);

    let mut slots: Vec<Option<PortCandidate>> = ports.into_iter().map(Some).collect();
    let mut sorted = order.into_iter().filter_map(|idx| slots[idx].take());
    let input = sorted.next().unwrap_or_else(|| PortCandidate::new("", None, None));
    RoleAssignment {
        kind: LinkKind::Chp,
        input,
        outputs: sorted.collect(),
        dropped: Vec::new(),
        reordered,
    }
}

/// Electrolysers and heat pumps take electricity in; a declared electricity
/// output means the record has the ports the wrong way round.
fn electricity_driven(kind: LinkKind, mut ports: Vec<PortCandidate>) -> RoleAssignment {
    let dropped = ports.split_off(2.min(ports.len()));
    let mut input = ports.remove(0);
    let Some(mut output) = ports.pop() else {
        return RoleAssignment {
            kind,
            input,
            outputs: Vec::new(),
            dropped,
            reordered: false,
        };
    };

    let swap = input.carrier != Some(Carrier::Electricity) && output.carrier == Some(Carrier::Electricity);
    if swap {
        std::mem::swap(&mut input.bus, &mut output.bus);
        std::mem::swap(&mut input.carrier, &mut output.carrier);
    }
    RoleAssignment {
        kind,
        input,
        outputs: vec![output],
        dropped,
        reordered: swap,
    }
}

/// Assign physical roles to `ports`, where `ports[0]` is the declared input.
///
/// `ports` must hold at least one candidate.
pub fn assign_roles(name: &str, ports: Vec<PortCandidate>) -> RoleAssignment {
    let find = |carrier: Carrier| ports.iter().position(|p| p.carrier == Some(carrier));
    let evidence = (
        find(Carrier::Fuel),
        find(Carrier::Electricity),
        find(Carrier::Heat),
    );
    if let (Some(fuel), Some(el), Some(heat)) = evidence {
        return combined_heat_power(ports, fuel, el, heat);
    }

    match link_marker(name) {
        Some(LinkMarker::Electrolysis) if ports.len() >= 2 => {
            electricity_driven(LinkKind::Electrolyser, ports)
        }
        Some(LinkMarker::HeatPump) if ports.len() >= 2 => electricity_driven(LinkKind::HeatPump, ports),
        Some(LinkMarker::Chp) => declared(LinkKind::Chp, ports),
        _ => declared(LinkKind::Generic, ports),
    }
}

/// Replace an absent or out-of-range efficiency with a defined value in
/// `[0, max]`, recording what was changed.
pub fn sanitize_efficiency(
    efficiency: Option<Efficiency>,
    max: f64,
    link: &str,
    bus: &str,
    diag: &mut Diagnostics,
) -> Efficiency {
    let mut report = |message: String| {
        warn!(link, bus, "{message}");
        diag.add_warning_with_entity(IssueKind::IllPosedEfficiency, &message, link);
    };
    let clamp = |value: f64| {
        if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, max)
        }
    };

    match efficiency {
        None => {
            report(format!("efficiency for output '{bus}' is undefined, using 0"));
            Efficiency::Fixed(0.0)
        }
        Some(Efficiency::Fixed(value)) => {
            let fixed = clamp(value);
            if fixed != value {
                report(format!("efficiency {value} for output '{bus}' clamped to {fixed}"));
            }
            Efficiency::Fixed(fixed)
        }
        Some(Efficiency::Profile(values)) => {
            let clamped: Vec<f64> = values.iter().map(|v| clamp(*v)).collect();
            if clamped.iter().zip(&values).any(|(a, b)| a != b) {
                report(format!("efficiency profile for output '{bus}' clamped to [0, {max}]"));
            }
            Efficiency::Profile(clamped)
        }
    }
}

/// Turn a role assignment into stored output ports with defined efficiencies.
pub fn finalize_outputs(
    link: &str,
    assignment: &RoleAssignment,
    max_efficiency: f64,
    diag: &mut Diagnostics,
) -> Vec<LinkPort> {
    if assignment.reordered {
        debug!(
            link,
            kind = assignment.kind.as_str(),
            input = %assignment.input.bus,
            "link ports reordered"
        );
    }
    for port in &assignment.dropped {
        diag.add_warning_with_entity(
            IssueKind::Structure,
            &format!("extra port '{}' dropped for {}", port.bus, assignment.kind.as_str()),
            link,
        );
    }
    assignment
        .outputs
        .iter()
        .map(|port| LinkPort {
            bus: port.bus.clone(),
            efficiency: sanitize_efficiency(port.efficiency.clone(), max_efficiency, link, &port.bus, diag),
        })
        .collect()
}

/// Marginal cost for a link that declares none: chp < heat pump < backstop.
pub fn default_marginal_cost(kind: LinkKind, costs: &CostConfig) -> f64 {
    match kind {
        LinkKind::Chp => costs.chp,
        LinkKind::HeatPump => costs.heat_pump,
        LinkKind::Electrolyser | LinkKind::Generic => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Carrier::*;

    fn port(bus: &str, carrier: Carrier, eff: Option<f64>) -> PortCandidate {
        PortCandidate::new(bus, Some(carrier), eff.map(Efficiency::Fixed))
    }

    fn buses(assignment: &RoleAssignment) -> Vec<&str> {
        std::iter::once(assignment.input.bus.as_str())
            .chain(assignment.outputs.iter().map(|p| p.bus.as_str()))
            .collect()
    }

    #[test]
    fn chp_ports_reordered_from_carriers() {
        let ports = vec![
            port("A", Heat, None),
            port("B", Fuel, Some(0.4)),
            port("C", Electricity, Some(0.5)),
        ];
        let assignment = assign_roles("plant_7", ports);
        assert_eq!(assignment.kind, LinkKind::Chp);
        assert_eq!(buses(&assignment), vec!["B", "C", "A"]);
        assert!(assignment.reordered);
        // C keeps its own efficiency; A takes the slot B vacated.
        assert_eq!(assignment.outputs[0].efficiency, Some(Efficiency::Fixed(0.5)));
        assert_eq!(assignment.outputs[1].efficiency, Some(Efficiency::Fixed(0.4)));
        assert_eq!(assignment.input.efficiency, None);
    }

    #[test]
    fn chp_order_holds_for_every_permutation() {
        let base = [("F", Fuel), ("E", Electricity), ("H", Heat)];
        let perms = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for perm in perms {
            let ports: Vec<_> = perm
                .iter()
                .enumerate()
                .map(|(slot, idx)| {
                    let (bus, carrier) = base[*idx];
                    port(bus, carrier, (slot > 0).then_some(0.3))
                })
                .collect();
            let assignment = assign_roles("DE_gas_CHP", ports);
            assert_eq!(buses(&assignment), vec!["F", "E", "H"], "{perm:?}");
        }
    }

    #[test]
    fn chp_marker_without_evidence_keeps_declared_order() {
        let ports = vec![port("A", Fuel, None), port("B", Electricity, Some(0.4))];
        let assignment = assign_roles("DE_CHP", ports);
        assert_eq!(assignment.kind, LinkKind::Chp);
        assert_eq!(buses(&assignment), vec!["A", "B"]);
        assert!(!assignment.reordered);
    }

    #[test]
    fn electrolyser_swaps_and_drops_third_port() {
        let ports = vec![
            port("DE_H2", Hydrogen, None),
            port("DE_EL", Electricity, Some(0.7)),
            port("DE_H", Heat, Some(0.1)),
        ];
        let assignment = assign_roles("DE_electrolysis", ports);
        assert_eq!(assignment.kind, LinkKind::Electrolyser);
        assert_eq!(buses(&assignment), vec!["DE_EL", "DE_H2"]);
        assert_eq!(assignment.outputs[0].efficiency, Some(Efficiency::Fixed(0.7)));
        assert_eq!(assignment.dropped.len(), 1);
        assert!(assignment.reordered);
    }

    #[test]
    fn heat_pump_declared_correctly_is_untouched() {
        let ports = vec![port("DE_EL", Electricity, None), port("DE_H", Heat, Some(1.0))];
        let assignment = assign_roles("DE_Wärmepumpe", ports);
        assert_eq!(assignment.kind, LinkKind::HeatPump);
        assert_eq!(buses(&assignment), vec!["DE_EL", "DE_H"]);
        assert!(!assignment.reordered);
    }

    #[test]
    fn generic_links_keep_declared_order() {
        let ports = vec![port("A_EL", Electricity, None), port("B_EL", Electricity, Some(0.97))];
        let assignment = assign_roles("A-B dc", ports);
        assert_eq!(assignment.kind, LinkKind::Generic);
        assert_eq!(buses(&assignment), vec!["A_EL", "B_EL"]);
    }

    #[test]
    fn undefined_and_out_of_range_efficiencies() {
        let mut diag = Diagnostics::new();
        assert_eq!(sanitize_efficiency(None, 1.0, "l", "b", &mut diag), Efficiency::Fixed(0.0));
        assert_eq!(
            sanitize_efficiency(Some(Efficiency::Fixed(-0.2)), 1.0, "l", "b", &mut diag),
            Efficiency::Fixed(0.0)
        );
        assert_eq!(
            sanitize_efficiency(Some(Efficiency::Fixed(3.2)), 1.0, "l", "b", &mut diag),
            Efficiency::Fixed(1.0)
        );
        assert_eq!(
            sanitize_efficiency(Some(Efficiency::Fixed(0.5)), 1.0, "l", "b", &mut diag),
            Efficiency::Fixed(0.5)
        );
        assert_eq!(
            sanitize_efficiency(Some(Efficiency::Profile(vec![0.2, f64::NAN, 1.5])), 1.0, "l", "b", &mut diag),
            Efficiency::Profile(vec![0.2, 0.0, 1.0])
        );
        assert_eq!(diag.issues_of_kind(IssueKind::IllPosedEfficiency).count(), 4);
    }

    #[test]
    fn finalize_reports_dropped_ports() {
        let ports = vec![
            port("DE_EL", Electricity, None),
            port("DE_H", Heat, None),
            port("DE_H2", Hydrogen, Some(0.5)),
        ];
        let assignment = assign_roles("DE_heatpump", ports);
        let mut diag = Diagnostics::new();
        let outputs = finalize_outputs("DE_heatpump", &assignment, 1.0, &mut diag);
        assert_eq!(outputs, vec![LinkPort::new("DE_H", 0.0)]);
        assert_eq!(diag.issues_of_kind(IssueKind::Structure).count(), 1);
        assert_eq!(diag.issues_of_kind(IssueKind::IllPosedEfficiency).count(), 1);
    }

    #[test]
    fn cost_defaults_are_ordered() {
        let costs = CostConfig::default();
        assert!(default_marginal_cost(LinkKind::Chp, &costs) < default_marginal_cost(LinkKind::HeatPump, &costs));
        assert_eq!(default_marginal_cost(LinkKind::Generic, &costs), 0.0);
    }
}
