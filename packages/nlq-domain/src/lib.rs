pub mod age;
pub mod filter;
pub mod label;
pub mod person;
pub mod summary;
pub mod time_serde;

pub use age::{AgeGroup, age_on};
pub use filter::PersonFilter;
pub use person::{DocumentType, Gender, PersonRecord};
pub use summary::person_summary;
