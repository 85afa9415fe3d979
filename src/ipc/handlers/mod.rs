pub mod auth;
pub mod backup_exchange;
pub mod checkboards;
pub mod classrooms;
pub mod core;
pub mod run;
pub mod students;
