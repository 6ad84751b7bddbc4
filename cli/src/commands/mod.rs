pub mod cli;
pub mod plan;
pub mod pyproject;
pub mod run;
