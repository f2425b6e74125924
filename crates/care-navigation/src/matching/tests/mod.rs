mod common;
mod navigator;
