#![crate_type = "lib"]

mod model;
