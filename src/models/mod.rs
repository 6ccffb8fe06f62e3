pub mod bulletin;
pub mod counter;
pub mod enums;
pub mod procedure;
pub mod stay;

pub use bulletin::*;
pub use counter::*;
pub use enums::*;
pub use procedure::*;
pub use stay::*;
