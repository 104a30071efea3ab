//! Core items shared by the `bo-tie` HCI crates
//!
//! This crate carries the buffer traits and the double ended buffer used for every HCI packet
//! that moves through the H4 transport, along with the controller error codes carried within the
//! status parameter of command events.

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod buffer;
pub mod errors;
