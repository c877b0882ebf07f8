pub mod binomial;
pub mod feasibility;
pub mod power;
pub mod threshold;
