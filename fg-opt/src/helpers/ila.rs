//! Wraps a target vendor's logic analyzer IP around a list of probe
//! signals, ported in spirit from `original_source/utils/XilinxILA.py` and
//! `utils/IntelSignalTapII.py`. Unlike the original scripts this doesn't
//! emit a companion `.tcl`/IP-config file; that belongs to the backend's
//! side-file writers (spec.md §4.J doesn't require it of the helper itself).
use fg_ir::{Expr, Id, Instance, InstanceList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    XilinxIla,
    IntelSignalTap,
}

impl Vendor {
    fn module_name(self) -> &'static str {
        match self {
            Vendor::XilinxIla => "ila_0",
            Vendor::IntelSignalTap => "sld_signaltap",
        }
    }
}

/// Builds the `InstanceList` wiring `clock` and every `probes` signal into a
/// vendor debug-core instance named `instance_name`. Widths accumulate in
/// declaration order (spec.md §4.J), so `probes`' order is significant.
///
/// Xilinx's ILA exposes one port per probe (`XilinxILA.py`'s `probe{i}`
/// ports); Intel's SignalTap instead takes a single `acq_data_in` port, so
/// there every probe is concatenated onto that one port instead.
pub fn wrap(vendor: Vendor, instance_name: Id, clock: Id, probes: &[Id]) -> InstanceList {
    let clock_port = match vendor {
        Vendor::XilinxIla => "clk",
        Vendor::IntelSignalTap => "acq_clk",
    };
    let mut port_bindings = vec![(Id::new(clock_port), Expr::Ident(clock))];

    match vendor {
        Vendor::XilinxIla => {
            port_bindings.extend(
                probes
                    .iter()
                    .enumerate()
                    .map(|(i, &probe)| (Id::new(format!("probe{i}")), Expr::Ident(probe))),
            );
        }
        Vendor::IntelSignalTap => {
            port_bindings
                .push((Id::new("acq_data_in"), Expr::Concat(probes.iter().map(|&p| Expr::Ident(p)).collect())));
        }
    }

    let params = vec![(Id::new("C_NUM_OF_PROBES"), Expr::IntConst {
        width: None,
        signed: false,
        text: probes.len().to_string(),
    })];

    InstanceList {
        module: Id::new(vendor.module_name()),
        instances: vec![Instance { name: instance_name, params, port_bindings }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_ports_are_numbered_in_order() {
        let list =
            wrap(Vendor::XilinxIla, Id::from("dbg0"), Id::from("top.clk"), &[Id::from("a"), Id::from("b")]);
        assert_eq!(list.instances[0].port_bindings[1].0, Id::from("probe0"));
        assert_eq!(list.instances[0].port_bindings[2].0, Id::from("probe1"));
    }

    #[test]
    fn signaltap_concatenates_probes_onto_one_port() {
        let list = wrap(
            Vendor::IntelSignalTap,
            Id::from("dbg0"),
            Id::from("top.clk"),
            &[Id::from("a"), Id::from("b")],
        );
        assert_eq!(list.instances[0].port_bindings.len(), 2);
        assert!(matches!(&list.instances[0].port_bindings[1].1, Expr::Concat(items) if items.len() == 2));
    }
}
