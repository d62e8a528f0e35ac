mod io;
pub use io::{derived_path, load_light_curve, read_light_curve, write_table};

mod light_curve;
pub use light_curve::{LightCurve, std_dev};
