#![allow(clippy::cast_precision_loss)]

mod chains;
mod graph;
mod numerics;
