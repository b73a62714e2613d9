//! I/O operations for reading and writing vector layers

mod shapefile_io;

pub use shapefile_io::{column_name, prj_path, read_layer, read_prj, write_layer, Field, FieldKind};
