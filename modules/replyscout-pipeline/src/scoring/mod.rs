pub mod opportunity;

pub use opportunity::OpportunityScorer;
