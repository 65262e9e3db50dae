#![allow(clippy::unwrap_used, clippy::expect_used)]

pub(crate) mod helpers;

mod tree;
