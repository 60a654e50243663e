pub mod composer;
pub mod errors;
pub mod flow;
pub mod moves;
pub mod trader;
pub mod tx;
pub mod types;
pub mod wallet;
