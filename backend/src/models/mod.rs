pub mod detection;
pub mod sample;
pub mod schedule;
pub mod section;
pub mod time;
pub mod vehicle;
pub mod weather;

pub use detection::*;
pub use sample::*;
pub use schedule::*;
pub use section::*;
pub use time::*;
pub use vehicle::*;
pub use weather::*;
