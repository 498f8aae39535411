pub mod dust;
pub mod rng;
