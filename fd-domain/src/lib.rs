pub mod dispatch;
pub mod events;
pub mod fuel;
pub mod market;
pub mod model;
pub mod quantity;
pub mod scout;
pub mod trading;

pub use dispatch::*;
pub use events::*;
pub use market::*;
pub use model::*;
pub use trading::*;
