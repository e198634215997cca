#![cfg_attr(not(test), no_std)]

pub mod peripheral;
pub mod peripheral_traits;
