pub mod filtros;
pub mod pdv;

pub use filtros::{transform_filtros, FiltrosConfig};
pub use pdv::{transform_pdv, PdvConfig};
