pub mod jwt;
pub mod pwd;
pub mod record_id;
pub mod single_flight;
pub mod time;
pub mod validated_form;
