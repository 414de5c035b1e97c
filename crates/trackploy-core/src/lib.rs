//! Building blocks for trackploy deployments.
//!
//! This crate has no knowledge of git. It provides subprocess execution with
//! a timeout ([`runner`]), local and SSH shell handles ([`remote`]), the
//! staged-tree comparison ([`diff`]) and the destructive tree sync used to
//! stage a deployment ([`mirror`]).

pub mod diff;
pub mod mirror;
pub mod remote;
pub mod runner;

pub use diff::{ChangeSet, diff_trees};
pub use mirror::{MirrorError, MirrorMethod, MirrorStats, mirror_tree};
pub use remote::{LocalHandle, RemoteHandle, SshHandle};
pub use runner::{CommandError, CommandOutput, CommandRunner};
