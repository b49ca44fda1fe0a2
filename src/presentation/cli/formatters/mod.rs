pub mod status_fmt;
