mod steps;

pub use world::CanteenWorld;
