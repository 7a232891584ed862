//! Test Pressing library - audio spectra pressed into printable radial solids

pub mod audio;
pub mod camera;
pub mod cli;
pub mod mesh;
pub mod pacer;
pub mod params;
pub mod pressing;
pub mod rendering;
pub mod spectrum;
