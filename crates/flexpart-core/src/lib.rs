pub mod calculations;
pub mod dates;
pub mod domain;
pub mod inputs;
pub mod jobs;
pub mod meteo;
pub mod models;
pub mod namelist;
pub mod parsers;
pub mod settings;
pub mod time_window;
pub mod workflow;
