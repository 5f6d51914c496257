//! Altera `scfifo`/`dcfifo`, ported from
//! `original_source/model/scfifo_simple_model.py`. The dual-clock variant
//! follows the same port shape (spec.md §4.I), so one struct serves both,
//! parameterized by which Verilog module name it black-boxes.
use super::MemoryModel;

pub struct ScfifoModel {
    target: &'static str,
}

impl ScfifoModel {
    pub fn scfifo() -> Self {
        ScfifoModel { target: "scfifo" }
    }

    pub fn dcfifo() -> Self {
        ScfifoModel { target: "dcfifo" }
    }
}

impl MemoryModel for ScfifoModel {
    fn target_module(&self) -> &'static str {
        self.target
    }

    fn companion_module(&self) -> &'static str {
        "scfifo_simple_model"
    }

    fn clock_port(&self) -> &'static str {
        "clock"
    }

    fn input_ports(&self) -> &'static [&'static str] {
        &["data"]
    }

    fn output_ports(&self) -> &'static [&'static str] {
        &["q"]
    }

    fn narrowed_params(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }
}
