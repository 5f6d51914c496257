//! Reads an elaborated Verilog/SystemVerilog design (produced upstream by an
//! SV elaborator, out of scope here) into `fg-ir`'s AST and term table.

pub mod description_file;
pub mod xml_importer;

pub use description_file::{read_filter_list, DescriptionFile};
pub use fg_ir::TermTable;
pub use xml_importer::{Importer, XmlImporter};
