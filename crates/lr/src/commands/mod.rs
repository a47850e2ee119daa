//! CLI command implementations.

pub(crate) mod snippet;
pub(crate) mod watch;

pub(crate) use snippet::SnippetArgs;
pub(crate) use watch::WatchArgs;
