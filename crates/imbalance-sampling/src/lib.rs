//! imbalance-sampling: resampling of class-imbalanced datasets.
//!
//! This crate provides nearest-neighbour filtering rules (Edited Nearest
//! Neighbour, Near-Miss 1-3, Neighbourhood Cleaning Rule) and IPADE, an
//! evolutionary prototype generator driven by a wrapped classifier. The
//! supporting pieces are a kd-tree index, Euclidean and heterogeneous
//! distances, a CART tree whose leaves seed IPADE, GBDT and tree fitness
//! oracles, and CSV reading and writing with nominal attribute encoding.
//!
//! Every algorithm implements [`sampling::Resampler`] and is reproducible
//! under a fixed seed.
pub mod config;
pub mod data_handling;
pub mod distance;
pub mod error;
pub mod io;
pub mod models;
pub mod neighbours;
pub mod oracle;
pub mod preprocessing;
pub mod report;
pub mod sampling;
pub mod spatial;
pub mod stats;
