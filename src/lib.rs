pub mod annotations;
pub mod blueprint;
pub mod collection;
pub mod convert;
pub mod error;
pub mod uri;
