pub mod health;
pub mod pagination;
pub mod presentation;
pub mod run;
pub mod section;
pub mod validation;
