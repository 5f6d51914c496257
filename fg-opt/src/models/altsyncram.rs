//! Altera `altsyncram` dual-port RAM, ported from
//! `original_source/model/altsyncram_simple_model.py`.
use super::MemoryModel;

pub struct AltsyncramModel;

impl MemoryModel for AltsyncramModel {
    fn target_module(&self) -> &'static str {
        "altsyncram"
    }

    fn companion_module(&self) -> &'static str {
        "altsyncram"
    }

    fn clock_port(&self) -> &'static str {
        "clock0"
    }

    fn input_ports(&self) -> &'static [&'static str] {
        &["data_a", "data_b"]
    }

    fn output_ports(&self) -> &'static [&'static str] {
        &["q_a", "q_b"]
    }

    fn narrowed_params(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("width_a", "1"),
            ("width_b", "1"),
            ("width_byteena_a", "1"),
            ("width_byteena_b", "1"),
        ]
    }
}
