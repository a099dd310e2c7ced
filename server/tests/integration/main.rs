//! Integration tests for hibernate
//!
//! These tests run the real binary or the real HTTP adapters against local
//! mock servers. They are slower and should be run separately from unit
//! tests.

mod end_to_end;
