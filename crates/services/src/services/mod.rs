pub mod corpus;
pub mod extraction;
pub mod llm;
pub mod mind_map;
pub mod query;
pub mod speech;
pub mod tables;
pub mod text;
pub mod verification;
