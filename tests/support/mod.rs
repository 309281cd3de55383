#![allow(dead_code)]

pub mod labelmodel_env;
pub mod synthetic;
